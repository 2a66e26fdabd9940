use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// MATLAB binary operators. The struct field accessor `.` is treated as a
/// binary operator whose right operand is a field name, and the range colon
/// `:` as a binary operator so slice bounds like `1:n` parse uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    LeftDiv,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    AndAnd,
    OrOr,
    And,
    Or,
    ElemMul,
    ElemDiv,
    ElemLeftDiv,
    ElemPow,
    Range,
    Field,
}

/// Two-character operators, checked before the one-character fallback.
pub const TWO_CHAR_OPS: &[(&str, BinOpKind)] = &[
    (">=", BinOpKind::Ge),
    ("<=", BinOpKind::Le),
    ("==", BinOpKind::Eq),
    ("~=", BinOpKind::Ne),
    ("&&", BinOpKind::AndAnd),
    ("||", BinOpKind::OrOr),
    (".*", BinOpKind::ElemMul),
    ("./", BinOpKind::ElemDiv),
    (".\\", BinOpKind::ElemLeftDiv),
    (".^", BinOpKind::ElemPow),
];

pub const ONE_CHAR_OPS: &[(char, BinOpKind)] = &[
    ('+', BinOpKind::Add),
    ('-', BinOpKind::Sub),
    ('*', BinOpKind::Mul),
    ('/', BinOpKind::Div),
    ('^', BinOpKind::Pow),
    ('\\', BinOpKind::LeftDiv),
    ('>', BinOpKind::Gt),
    ('<', BinOpKind::Lt),
    ('&', BinOpKind::And),
    ('|', BinOpKind::Or),
    (':', BinOpKind::Range),
    ('.', BinOpKind::Field),
];

impl BinOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Pow => "^",
            BinOpKind::LeftDiv => "\\",
            BinOpKind::Gt => ">",
            BinOpKind::Lt => "<",
            BinOpKind::Ge => ">=",
            BinOpKind::Le => "<=",
            BinOpKind::Eq => "==",
            BinOpKind::Ne => "~=",
            BinOpKind::AndAnd => "&&",
            BinOpKind::OrOr => "||",
            BinOpKind::And => "&",
            BinOpKind::Or => "|",
            BinOpKind::ElemMul => ".*",
            BinOpKind::ElemDiv => "./",
            BinOpKind::ElemLeftDiv => ".\\",
            BinOpKind::ElemPow => ".^",
            BinOpKind::Range => ":",
            BinOpKind::Field => ".",
        }
    }

    pub fn is_struct_field(&self) -> bool {
        matches!(self, BinOpKind::Field)
    }

    /// Match the operator starting at byte offset `at` of `text`, longest
    /// first. Returns the operator and its textual length.
    pub fn at(text: &str, at: usize) -> Option<(BinOpKind, usize)> {
        let rest = &text[at..];
        for (sym, op) in TWO_CHAR_OPS {
            if rest.starts_with(sym) {
                return Some((*op, sym.len()));
            }
        }
        let first = rest.chars().next()?;
        ONE_CHAR_OPS
            .iter()
            .find(|(c, _)| *c == first)
            .map(|(_, op)| (*op, 1))
    }
}

impl Display for BinOpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_char_before_one_char() {
        assert_eq!(BinOpKind::at("a>=b", 1), Some((BinOpKind::Ge, 2)));
        assert_eq!(BinOpKind::at("a>b", 1), Some((BinOpKind::Gt, 1)));
        assert_eq!(BinOpKind::at("a.*b", 1), Some((BinOpKind::ElemMul, 2)));
        assert_eq!(BinOpKind::at("s.f", 1), Some((BinOpKind::Field, 1)));
    }
}
