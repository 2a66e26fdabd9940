use crate::ops::BinOpKind;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Bracket flavor of a concatenation literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketKind {
    /// `[...]` row/column matrix literal.
    Matrix,
    /// `{...}` cell literal.
    Cell,
}

/// One expression node of the analyzed script dialect.
///
/// Every consumer matches exhaustively; adding a node kind is a compile-time
/// event, not a runtime type probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal. Keeps the source spelling for rendering.
    Number { text: String, value: f64 },
    /// Quoted string content (quotes stripped).
    Str(String),
    /// Identifier reference; unresolved names stay opaque externals.
    Var { name: String },
    /// `base(index)` over an already-bound variable.
    Slice { base: String, index: Box<Expr> },
    Binary {
        op: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Concat {
        elems: Vec<Expr>,
        kind: BracketKind,
    },
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    /// A bare statement kept verbatim when it is not an expression of the
    /// supported grammar (command syntax such as `hold on`).
    Opaque(String),
    /// Absence marker: `~` discard, blank statement.
    Empty,
}

impl Expr {
    pub fn number(text: impl Into<String>, value: f64) -> Self {
        Expr::Number {
            text: text.into(),
            value,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            args,
        }
    }

    pub fn binary(op: BinOpKind, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    /// Name of the called function, if this node is a call.
    pub fn callee(&self) -> Option<&str> {
        match self {
            Expr::Call { callee, .. } => Some(callee.as_str()),
            _ => None,
        }
    }

    /// Deterministic textual rendering. Used for structural deduplication of
    /// usage lists and for decompose bookkeeping, so it must stay stable for
    /// structurally equal nodes.
    pub fn render(&self) -> String {
        match self {
            Expr::Number { text, .. } => text.clone(),
            Expr::Str(s) => format!("'{}'", s),
            Expr::Var { name } => name.clone(),
            Expr::Slice { base, index } => format!("{}({})", base, index.render()),
            Expr::Binary { op, lhs, rhs } => {
                format!("{}{}{}", lhs.render(), op, rhs.render())
            }
            Expr::Concat { elems, kind } => {
                let inner = elems.iter().map(Expr::render).join(",");
                match kind {
                    BracketKind::Matrix => format!("[{}]", inner),
                    BracketKind::Cell => format!("{{{}}}", inner),
                }
            }
            Expr::Call { callee, args } => {
                format!("{}({})", callee, args.iter().map(Expr::render).join(","))
            }
            Expr::Opaque(text) => text.clone(),
            Expr::Empty => String::new(),
        }
    }

    /// Visit every variable reference in the tree together with the innermost
    /// expression consuming it (the reference's parent node, or the node
    /// itself for a bare `Var`/`Slice` at the root).
    pub fn visit_var_refs<'a>(&'a self, f: &mut impl FnMut(&'a str, &'a Expr)) {
        self.visit_var_refs_inner(self, f)
    }

    fn visit_var_refs_inner<'a>(
        &'a self,
        parent: &'a Expr,
        f: &mut impl FnMut(&'a str, &'a Expr),
    ) {
        match self {
            Expr::Var { name } => f(name, parent),
            Expr::Slice { base, index } => {
                f(base, parent);
                index.visit_var_refs_inner(self, f);
            }
            Expr::Binary { op, lhs, rhs } => {
                lhs.visit_var_refs_inner(self, f);
                // The rhs of a field access is a field name, not a variable.
                if !op.is_struct_field() {
                    rhs.visit_var_refs_inner(self, f);
                }
            }
            Expr::Concat { elems, .. } => {
                for e in elems {
                    e.visit_var_refs_inner(self, f);
                }
            }
            Expr::Call { args, .. } => {
                for a in args {
                    a.visit_var_refs_inner(self, f);
                }
            }
            Expr::Number { .. } | Expr::Str(_) | Expr::Opaque(_) | Expr::Empty => {}
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_is_deterministic() {
        let call = Expr::call(
            "f",
            vec![
                Expr::var("x"),
                Expr::binary(BinOpKind::Add, Expr::var("a"), Expr::number("2", 2.0)),
            ],
        );
        assert_eq!(call.render(), "f(x,a+2)");
        assert_eq!(call.render(), call.clone().render());
    }

    #[test]
    fn field_rhs_is_not_a_var_ref() {
        let field = Expr::binary(BinOpKind::Field, Expr::var("s"), Expr::var("len"));
        let mut seen = Vec::new();
        field.visit_var_refs(&mut |name, _| seen.push(name.to_string()));
        assert_eq!(seen, vec!["s"]);
    }
}
