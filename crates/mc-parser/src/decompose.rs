//! Text-level nested-call flattening.
//!
//! [`decompose`] linearizes every parenthesized span of a statement into an
//! ordered list of single-call steps addressable by `#N` placeholders, so
//! each call site can be analyzed independently even when several calls are
//! nested in one statement. [`compose`] reverses the substitution to a fixed
//! point, reconstructing the original call text.

/// Ordered placeholder table produced by [`decompose`]: `#N` -> source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapTable {
    entries: Vec<(String, String)>,
}

impl MapTable {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in resolution order (innermost spans first).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, value: String) -> String {
        let key = format!("#{}", self.entries.len());
        self.entries.push((key.clone(), value));
        key
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '#'
}

/// Decompose the parenthesized spans of `line` into placeholder steps.
/// Returns the placeholder table and the flattened remainder of the line:
///
/// ```text
/// Slope=abs(my_slope(a,b))
///   => #0: my_slope(a,b)
///      #1: abs(#0)
///      final: Slope=#1
/// ```
pub fn decompose(line: &str) -> (MapTable, String) {
    let mut map = MapTable::default();
    let mut stack: Vec<String> = Vec::new();
    let mut opens: Vec<usize> = Vec::new();
    let mut cur = String::new();

    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if is_word_char(ch) {
            cur.push(ch);
            i += 1;
            continue;
        }
        if ch == ' ' || ch == '\t' {
            if !cur.is_empty() {
                stack.push(std::mem::take(&mut cur));
            }
            i += 1;
            continue;
        }
        if !cur.is_empty() {
            stack.push(std::mem::take(&mut cur));
        }
        match ch {
            '(' => {
                opens.push(stack.len());
                stack.push("(".to_string());
            }
            ')' => match opens.pop() {
                Some(pos) => {
                    // include the token before the bracket (callee or base)
                    let start = pos.saturating_sub(1);
                    let span: String = stack.split_off(start).concat();
                    let key = map.push(format!("{})", span));
                    stack.push(key);
                }
                None => stack.push(")".to_string()),
            },
            _ => stack.push(ch.to_string()),
        }
        i += 1;
    }
    if !cur.is_empty() && cur != ";" {
        stack.push(cur);
    }

    let final_text = stack.concat();
    (map, final_text.trim_end_matches(';').to_string())
}

/// Substitute placeholders back into `text` until none remain. Longer keys
/// are replaced first so `#1` never clobbers `#10`.
pub fn compose(text: &str, map: &MapTable) -> String {
    let mut keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(b.cmp(a)));
    let mut out = text.to_string();
    loop {
        let mut changed = false;
        for key in &keys {
            if out.contains(key) {
                out = out.replace(key, map.get(key).unwrap_or(""));
                changed = true;
            }
        }
        if !changed {
            return out;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flattens_the_nested_slope_call() {
        let (map, final_call) =
            decompose("Slope=abs(my_slope(tHRV(i-x0+1:i),RR_Interv(i-x0+1:i)));");
        let steps: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(
            steps,
            vec![
                ("#0", "tHRV(i-x0+1:i)"),
                ("#1", "RR_Interv(i-x0+1:i)"),
                ("#2", "my_slope(#0,#1)"),
                ("#3", "abs(#2)"),
            ]
        );
        assert_eq!(final_call, "Slope=#3");
    }

    #[test]
    fn compose_reverses_decompose() {
        let original = "Slope=abs(my_slope(tHRV(i-x0+1:i),RR_Interv(i-x0+1:i)))";
        let (map, final_call) = decompose(original);
        assert_eq!(compose(&final_call, &map), original);
    }

    #[test]
    fn flat_statement_has_no_steps() {
        let (map, final_call) = decompose("x = a + b;");
        assert!(map.is_empty());
        assert_eq!(final_call, "x=a+b");
    }

    #[test]
    fn single_call_single_step() {
        let (map, final_call) = decompose("y = f(x, 2);");
        let steps: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(steps, vec![("#0", "f(x,2)")]);
        assert_eq!(final_call, "y=#0");
    }

    #[test]
    fn placeholder_order_is_innermost_first() {
        let (map, _) = decompose("r = outer(inner(a), b);");
        let steps: Vec<(&str, &str)> = map.iter().collect();
        assert_eq!(steps[0], ("#0", "inner(a)"));
        assert_eq!(steps[1], ("#1", "outer(#0,b)"));
    }

    #[test]
    fn many_placeholders_do_not_collide() {
        // build a statement with more than ten spans so #1/#10 coexist
        let src = "t = f(a(1),b(2),c(3),d(4),e(5),g(6),h(7),k(8),m(9),n(10),p(11));";
        let (map, final_call) = decompose(src);
        assert_eq!(map.len(), 12);
        let recomposed = compose(&final_call, &map);
        assert_eq!(
            recomposed,
            "t=f(a(1),b(2),c(3),d(4),e(5),g(6),h(7),k(8),m(9),n(10),p(11))"
        );
    }
}
