//! Expression parsing without a formal grammar.
//!
//! A statement side is parsed in priority order: numeric literal, quoted
//! string, identifier, bracket decomposition, binary-operator scan. The
//! bracket matcher replaces every resolved sub-expression with a `#N`
//! placeholder token so the enclosing text parses uniformly; placeholders are
//! resolved against a shared map threaded through the recursion.

use mc_core::ast::{BracketKind, Expr};
use mc_core::binding::SymbolTable;
use mc_core::ops::BinOpKind;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("cannot parse expression `{0}`")]
    Unparseable(String),
}

/// Which statement side is being parsed. On the left-hand side a bracketed
/// identifier is always a slice target, bound or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
}

type Placeholders = HashMap<String, Expr>;

pub fn parse_expr(text: &str, table: &SymbolTable, side: Side) -> Result<Expr, ParseError> {
    let mut map = Placeholders::new();
    parse_with(text, table, side, &mut map)
}

fn parse_with(
    text: &str,
    table: &SymbolTable,
    side: Side,
    map: &mut Placeholders,
) -> Result<Expr, ParseError> {
    let t = text.trim().trim_end_matches(';').trim();
    if t.is_empty() || t == "~" {
        return Ok(Expr::Empty);
    }
    if let Some(expr) = map.get(t) {
        return Ok(expr.clone());
    }
    if let Some(value) = parse_number(t) {
        return Ok(Expr::number(t, value));
    }
    if is_identifier(t) {
        return Ok(Expr::var(t));
    }
    if let Some(inner) = string_literal(t) {
        return Ok(Expr::Str(inner.to_string()));
    }
    if t.contains(['(', '[', '{']) {
        return parse_bracketed(t, table, side, map);
    }
    if has_binary_op(t) {
        return parse_binary(t, table, side, map);
    }
    Err(ParseError::Unparseable(t.to_string()))
}

/// Numeric literal, excluding the reserved not-a-number token.
fn parse_number(t: &str) -> Option<f64> {
    if t.eq_ignore_ascii_case("nan") {
        return None;
    }
    t.parse::<f64>().ok()
}

fn is_identifier(t: &str) -> bool {
    let mut chars = t.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Whole-text quoted string; a quote following an identifier, closing bracket
/// or number is transpose and never reaches here (the text then fails the
/// start-quote check).
fn string_literal(t: &str) -> Option<&str> {
    let quote = t.chars().next()?;
    if (quote != '\'' && quote != '"') || t.len() < 2 || !t.ends_with(quote) {
        return None;
    }
    let inner = &t[1..t.len() - 1];
    if inner.contains(quote) {
        return None;
    }
    Some(inner)
}

/// True when the previous significant character makes a following quote a
/// transpose rather than a string open.
fn value_ends_before(prefix: &str) -> bool {
    matches!(
        prefix.trim_end().chars().last(),
        Some(c) if c.is_alphanumeric() || c == '_' || c == ')' || c == ']' || c == '}' || c == '\''
    )
}

fn has_binary_op(t: &str) -> bool {
    t.char_indices()
        .any(|(i, _)| BinOpKind::at(t, i).is_some())
}

/// Left-to-right scan for the first top-level binary operator, checking
/// two-character operators before one-character ones. Identifier and numeric
/// runs (including a leading negative sign) are skipped over; string
/// literals are opaque to the scan.
fn parse_binary(
    t: &str,
    table: &SymbolTable,
    side: Side,
    map: &mut Placeholders,
) -> Result<Expr, ParseError> {
    let chars: Vec<(usize, char)> = t.char_indices().collect();
    let mut cur = String::new();
    let mut i = 0;
    while i < chars.len() {
        let (bi, ch) = chars[i];
        if ch == '"' || (ch == '\'' && !value_ends_before(&t[..bi])) {
            // skip the string literal wholesale
            let close = chars[i + 1..]
                .iter()
                .position(|&(_, c)| c == ch)
                .ok_or_else(|| ParseError::Unparseable(t.to_string()))?;
            i += close + 2;
            cur = String::from("''");
            continue;
        }
        let joined = format!("{}{}", cur, ch);
        if is_identifier(&joined) {
            cur = joined;
            i += 1;
            continue;
        }
        if parse_number(&joined).is_some() {
            cur = joined;
            i += 1;
            continue;
        }
        if ch == '-'
            && cur.is_empty()
            && chars
                .get(i + 1)
                .map(|&(_, c)| c.is_ascii_digit())
                .unwrap_or(false)
        {
            cur.push(ch);
            i += 1;
            continue;
        }
        if let Some((op, len)) = BinOpKind::at(t, bi) {
            let lhs = parse_with(&t[..bi], table, side, map)?;
            let rhs = parse_with(&t[bi + len..], table, side, map)?;
            return Ok(Expr::binary(op, lhs, rhs));
        }
        i += 1;
    }
    Err(ParseError::Unparseable(t.to_string()))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '#' || c == '.'
}

/// Substitute `#N` placeholders back to rendered text, to a fixed point.
/// Longer keys go first so `#1` never corrupts `#10`.
fn resolve_placeholders(text: &str, map: &Placeholders) -> String {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then(b.cmp(a)));
    let mut out = text.to_string();
    loop {
        let mut changed = false;
        for key in &keys {
            if out.contains(key.as_str()) {
                out = out.replace(key.as_str(), &map[*key].render());
                changed = true;
            }
        }
        if !changed {
            return out;
        }
    }
}

/// Character-level bracket matcher. Tokens accumulate on a stack; each
/// `(`/`[`/`{` records the stack position, and the matching close bracket
/// slices out the span and resolves it into a slice, call, cell literal or
/// concatenation, substituting a placeholder token in its place.
fn parse_bracketed(
    t: &str,
    table: &SymbolTable,
    side: Side,
    map: &mut Placeholders,
) -> Result<Expr, ParseError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut opens: Vec<(usize, char)> = Vec::new();
    let mut cur = String::new();
    let chars: Vec<(usize, char)> = t.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (bi, ch) = chars[i];
        if ch == '"' || (ch == '\'' && !value_ends_before(&t[..bi])) {
            if !cur.is_empty() {
                tokens.push(std::mem::take(&mut cur));
            }
            let close = chars[i + 1..]
                .iter()
                .position(|&(_, c)| c == ch)
                .ok_or_else(|| ParseError::Unparseable(t.to_string()))?;
            let end = chars[i + close + 1].0;
            tokens.push(t[bi..=end].to_string());
            i += close + 2;
            continue;
        }
        if is_word_char(ch) {
            cur.push(ch);
            i += 1;
            continue;
        }
        if !cur.is_empty() {
            tokens.push(std::mem::take(&mut cur));
        }
        match ch {
            ' ' | '\t' => {}
            '(' | '[' | '{' => {
                opens.push((tokens.len(), ch));
                tokens.push(ch.to_string());
            }
            ')' | ']' | '}' => {
                let (start, open) = opens
                    .pop()
                    .ok_or_else(|| ParseError::Unparseable(t.to_string()))?;
                let inner: Vec<String> = tokens.split_off(start + 1);
                tokens.pop(); // the open bracket token
                let resolved = resolve_span(open, &inner, &mut tokens, table, side, map)?;
                let key = format!("#{}", map.len());
                map.insert(key.clone(), resolved);
                tokens.push(key);
            }
            _ => tokens.push(ch.to_string()),
        }
        i += 1;
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }
    if !opens.is_empty() {
        return Err(ParseError::Unparseable(t.to_string()));
    }

    let flat = tokens.concat();
    parse_with(&flat, table, side, map)
}

/// Resolve one bracketed span. `before` still holds the tokens preceding the
/// open bracket; a consumed callee/base token is popped from it.
fn resolve_span(
    open: char,
    inner: &[String],
    before: &mut Vec<String>,
    table: &SymbolTable,
    side: Side,
    map: &mut Placeholders,
) -> Result<Expr, ParseError> {
    let elements = split_elements(inner);
    let prev = before.last().cloned().filter(|p| is_identifier(p));

    match (open, prev) {
        ('(', Some(name)) => {
            before.pop();
            if table.is_bound(&name) || side == Side::Lhs {
                let index = slice_index(&elements, table, map);
                Ok(Expr::Slice {
                    base: name,
                    index: Box::new(index),
                })
            } else {
                let args = elements
                    .iter()
                    .map(|e| parse_with(e, table, Side::Rhs, map))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Call { callee: name, args })
            }
        }
        // `name{...}` is cell indexing whether or not the base is bound; a
        // literal cell never follows an identifier
        ('{', Some(name)) => {
            before.pop();
            let index = slice_index(&elements, table, map);
            Ok(Expr::Slice {
                base: name,
                index: Box::new(index),
            })
        }
        ('(', None) => {
            if elements.len() == 1 {
                parse_with(&elements[0], table, Side::Rhs, map)
            } else {
                concat_elements(&elements, BracketKind::Matrix, table, map)
            }
        }
        ('[', _) => concat_elements(&elements, BracketKind::Matrix, table, map),
        ('{', None) => concat_elements(&elements, BracketKind::Cell, table, map),
        _ => Err(ParseError::Unparseable(inner.concat())),
    }
}

/// Split the token run of a bracket body on top-level `,`/`;` separators.
/// Nested spans were already collapsed into placeholders, so every separator
/// token seen here belongs to this bracket.
fn split_elements(inner: &[String]) -> Vec<String> {
    if inner.is_empty() {
        return Vec::new();
    }
    let mut elements = Vec::new();
    let mut cur = String::new();
    for tok in inner {
        if tok == "," || tok == ";" {
            elements.push(std::mem::take(&mut cur));
        } else {
            cur.push_str(tok);
        }
    }
    elements.push(cur);
    elements
}

/// Slice indices are best-effort: ranges like `1:end` parse as expressions,
/// anything else is kept verbatim as opaque text (the original index
/// spelling, placeholders substituted back).
fn slice_index(elements: &[String], table: &SymbolTable, map: &mut Placeholders) -> Expr {
    if elements.len() == 1 {
        match parse_with(&elements[0], table, Side::Rhs, map) {
            Ok(expr) => expr,
            Err(_) => Expr::Opaque(resolve_placeholders(&elements[0], map)),
        }
    } else {
        Expr::Opaque(resolve_placeholders(&elements.join(","), map))
    }
}

fn concat_elements(
    elements: &[String],
    kind: BracketKind,
    table: &SymbolTable,
    map: &mut Placeholders,
) -> Result<Expr, ParseError> {
    let elems = elements
        .iter()
        .map(|e| parse_with(e, table, Side::Rhs, map))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Expr::Concat { elems, kind })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_core::binding::VarId;
    use pretty_assertions::assert_eq;

    fn table_with(names: &[&str]) -> SymbolTable {
        let mut table = SymbolTable::new();
        for (i, name) in names.iter().enumerate() {
            table.bind(*name, VarId(i));
        }
        table
    }

    #[test]
    fn literals_and_identifiers() {
        let table = SymbolTable::new();
        assert_eq!(
            parse_expr("3.5", &table, Side::Rhs).unwrap(),
            Expr::number("3.5", 3.5)
        );
        assert_eq!(
            parse_expr("'hello'", &table, Side::Rhs).unwrap(),
            Expr::Str("hello".into())
        );
        assert_eq!(
            parse_expr("alpha_2", &table, Side::Rhs).unwrap(),
            Expr::var("alpha_2")
        );
        assert!(parse_expr("NaN", &table, Side::Rhs).is_err());
    }

    #[test]
    fn binary_two_char_before_one_char() {
        let table = table_with(&["a", "b"]);
        let expr = parse_expr("a >= b", &table, Side::Rhs).unwrap();
        assert_eq!(
            expr,
            Expr::binary(BinOpKind::Ge, Expr::var("a"), Expr::var("b"))
        );
    }

    #[test]
    fn negative_literal_is_not_a_subtraction() {
        let table = SymbolTable::new();
        let expr = parse_expr("-3+x", &table, Side::Rhs).unwrap();
        assert_eq!(
            expr,
            Expr::binary(BinOpKind::Add, Expr::number("-3", -3.0), Expr::var("x"))
        );
    }

    #[test]
    fn bound_name_before_paren_is_a_slice() {
        let table = table_with(&["x", "i"]);
        let expr = parse_expr("x(i-1)", &table, Side::Rhs).unwrap();
        let Expr::Slice { base, index } = expr else {
            panic!("expected slice");
        };
        assert_eq!(base, "x");
        assert_eq!(index.render(), "i-1");
    }

    #[test]
    fn unbound_name_before_paren_is_a_call() {
        let table = table_with(&["x"]);
        let expr = parse_expr("f(x, 2)", &table, Side::Rhs).unwrap();
        assert_eq!(
            expr,
            Expr::call("f", vec![Expr::var("x"), Expr::number("2", 2.0)])
        );
    }

    #[test]
    fn lhs_side_forces_slice() {
        let table = SymbolTable::new();
        let expr = parse_expr("out(3)", &table, Side::Lhs).unwrap();
        assert!(matches!(expr, Expr::Slice { .. }));
    }

    #[test]
    fn nested_calls_flatten_and_recompose() {
        let table = table_with(&["tHRV", "RR_Interv", "i", "x0"]);
        let expr = parse_expr(
            "abs(my_slope(tHRV(i-x0+1:i),RR_Interv(i-x0+1:i)))",
            &table,
            Side::Rhs,
        )
        .unwrap();
        assert_eq!(
            expr.render(),
            "abs(my_slope(tHRV(i-x0+1:i),RR_Interv(i-x0+1:i)))"
        );
        let Expr::Call { callee, args } = expr else {
            panic!("expected call");
        };
        assert_eq!(callee, "abs");
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].callee(), Some("my_slope"));
    }

    #[test]
    fn matrix_and_cell_literals() {
        let table = table_with(&["a", "b"]);
        let expr = parse_expr("[a, b; 3]", &table, Side::Rhs).unwrap();
        let Expr::Concat { elems, kind } = expr else {
            panic!("expected concat");
        };
        assert_eq!(kind, BracketKind::Matrix);
        assert_eq!(elems.len(), 3);

        let cell = parse_expr("{'low', 'high'}", &table, Side::Rhs).unwrap();
        assert!(matches!(
            cell,
            Expr::Concat {
                kind: BracketKind::Cell,
                ..
            }
        ));
    }

    #[test]
    fn struct_field_access() {
        let table = table_with(&["cfg"]);
        let expr = parse_expr("cfg.window", &table, Side::Rhs).unwrap();
        let Expr::Binary { op, lhs, rhs } = expr else {
            panic!("expected binary");
        };
        assert!(op.is_struct_field());
        assert_eq!(*lhs, Expr::var("cfg"));
        assert_eq!(*rhs, Expr::var("window"));
    }

    #[test]
    fn range_in_slice_parses() {
        let table = table_with(&["sig"]);
        let expr = parse_expr("sig(1:n)", &table, Side::Rhs).unwrap();
        let Expr::Slice { index, .. } = expr else {
            panic!("expected slice");
        };
        assert_eq!(index.render(), "1:n");
    }

    #[test]
    fn unparseable_reports_offending_text() {
        let table = SymbolTable::new();
        let err = parse_expr("@@@", &table, Side::Rhs).unwrap_err();
        assert_eq!(err, ParseError::Unparseable("@@@".into()));
    }

    #[test]
    fn unbalanced_brackets_fail() {
        let table = SymbolTable::new();
        assert!(parse_expr("f(x", &table, Side::Rhs).is_err());
        assert!(parse_expr("x)", &table, Side::Rhs).is_err());
    }
}
