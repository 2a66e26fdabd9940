//! Function-signature extraction.
//!
//! Recognizes `function [outs] = name(ins)` declaration headers and
//! call-shaped statements (`outs = name(args)` / `name(args)`), yielding the
//! name lists the analyzer and call-graph builder match positionally.

/// Declared header of a function file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHeader {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// One call-shaped statement: callee name, argument texts, assignment
/// targets. Whether `name` is actually a function is the caller's problem;
/// slice reads have the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Split at the first `=` that is an assignment, i.e. not part of `==`,
/// `~=`, `<=` or `>=`. Returns `None` for the left side when the statement
/// is not an assignment.
pub fn split_assignment(stmt: &str) -> (Option<&str>, &str) {
    let stmt = stmt.trim().trim_end_matches(';').trim_end();
    let bytes = stmt.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'=' {
            continue;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        if matches!(prev, Some(b'=') | Some(b'~') | Some(b'<') | Some(b'>')) {
            continue;
        }
        if bytes.get(i + 1) == Some(&b'=') {
            continue;
        }
        return (Some(stmt[..i].trim()), stmt[i + 1..].trim());
    }
    (None, stmt)
}

/// Split a `[a, b]` / `{a, b}` / bare `a, b` list into element texts.
/// Commas inside brackets do not separate, so a nested call stays one
/// element.
pub fn parse_name_list(text: &str) -> Vec<String> {
    let inner = text.trim_matches(['[', ']', '{', '}', ' ']);
    let mut elements = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                elements.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        elements.push(current.trim().to_string());
    }
    elements
}

/// Split `name(args)` into the name and the raw argument list, requiring
/// the text to end at the closing bracket.
fn call_shape(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let open = text.find('(')?;
    if !text.ends_with(')') {
        return None;
    }
    let name = text[..open].trim();
    let args = &text[open + 1..text.len() - 1];
    is_identifier(name).then_some((name, args))
}

/// Parse a `function` declaration header. Handles the bracketed
/// multi-output, single-output, output-less and argument-less forms.
pub fn function_decl(stmt: &str) -> Option<FunctionHeader> {
    let stmt = stmt.trim().trim_end_matches(';').trim_end();
    let rest = stmt.strip_prefix("function")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let (left, right) = split_assignment(rest);
    let outputs = left.map(parse_name_list).unwrap_or_default();

    let (name, inputs) = match call_shape(right) {
        Some((name, args)) => (name, parse_name_list(args)),
        None => {
            let name = right.trim();
            if !is_identifier(name) {
                return None;
            }
            (name, Vec::new())
        }
    };

    Some(FunctionHeader {
        name: name.to_string(),
        inputs,
        outputs,
    })
}

/// Parse a call-shaped statement. Control lines (`if cond(x)`, `while ..`)
/// fall out naturally because their callee position is not a bare
/// identifier.
pub fn call_attributes(stmt: &str) -> Option<CallSite> {
    let stmt = stmt.trim();
    if stmt.is_empty() || stmt.starts_with("function") {
        return None;
    }
    let (left, right) = split_assignment(stmt);
    let (name, args) = call_shape(right)?;
    Some(CallSite {
        name: name.to_string(),
        inputs: parse_name_list(args),
        outputs: left.map(parse_name_list).unwrap_or_default(),
    })
}

/// First declaration header of a source file, if any.
pub fn extract_signature(source: &str) -> Option<FunctionHeader> {
    crate::assembler::Statements::new(source).find_map(|stmt| function_decl(&stmt.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assignment_split_ignores_comparisons() {
        assert_eq!(split_assignment("x = y + 1;"), (Some("x"), "y + 1"));
        assert_eq!(split_assignment("if a == b"), (None, "if a == b"));
        assert_eq!(split_assignment("ok = a ~= b;"), (Some("ok"), "a ~= b"));
        assert_eq!(split_assignment("x <= 2"), (None, "x <= 2"));
    }

    #[test]
    fn name_list_respects_nesting() {
        assert_eq!(parse_name_list("[a, b]"), vec!["a", "b"]);
        assert_eq!(
            parse_name_list("f(x, y), z"),
            vec!["f(x, y)".to_string(), "z".to_string()]
        );
        assert_eq!(parse_name_list(""), Vec::<String>::new());
    }

    #[test]
    fn declaration_forms() {
        assert_eq!(
            function_decl("function [m, s] = stats(data, window)"),
            Some(FunctionHeader {
                name: "stats".to_string(),
                inputs: vec!["data".to_string(), "window".to_string()],
                outputs: vec!["m".to_string(), "s".to_string()],
            })
        );
        assert_eq!(
            function_decl("function y = identity(x)"),
            Some(FunctionHeader {
                name: "identity".to_string(),
                inputs: vec!["x".to_string()],
                outputs: vec!["y".to_string()],
            })
        );
        assert_eq!(
            function_decl("function setup()"),
            Some(FunctionHeader {
                name: "setup".to_string(),
                inputs: vec![],
                outputs: vec![],
            })
        );
        assert_eq!(function_decl("functionx = 3"), None);
        assert_eq!(function_decl("x = 3"), None);
    }

    #[test]
    fn call_site_shapes() {
        assert_eq!(
            call_attributes("y = f(x, 2);"),
            Some(CallSite {
                name: "f".to_string(),
                inputs: vec!["x".to_string(), "2".to_string()],
                outputs: vec!["y".to_string()],
            })
        );
        assert_eq!(
            call_attributes("Slope = abs(my_slope(a, b));"),
            Some(CallSite {
                name: "abs".to_string(),
                inputs: vec!["my_slope(a, b)".to_string()],
                outputs: vec!["Slope".to_string()],
            })
        );
        assert_eq!(
            call_attributes("plot(t, y);"),
            Some(CallSite {
                name: "plot".to_string(),
                inputs: vec!["t".to_string(), "y".to_string()],
                outputs: vec![],
            })
        );
    }

    #[test]
    fn non_calls_are_rejected() {
        assert_eq!(call_attributes("if isempty(x)"), None);
        assert_eq!(call_attributes("while check(x)"), None);
        assert_eq!(call_attributes("y = f(x) + 1;"), None);
        assert_eq!(call_attributes("s.method(x)"), None);
        assert_eq!(call_attributes("end"), None);
    }

    #[test]
    fn signature_skips_leading_comments() {
        let src = "\
% Computes a running mean.
%{
internal notes
%}
function out = running_mean(x, n)
out = x;
end
";
        let header = extract_signature(src).unwrap();
        assert_eq!(header.name, "running_mean");
        assert_eq!(header.inputs, vec!["x", "n"]);
        assert_eq!(header.outputs, vec!["out"]);
    }
}
