use crate::ast::Expr;
use crate::block::BlockId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a binding inside one file's binding arena. Doubles as the
/// sequential notation id: unique within the enclosing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarRole {
    Input,
    Internal,
    Output,
}

/// Branch context recorded on a binding at creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchAttrs {
    /// Index of the `if`/`elseif` branch the binding was declared in;
    /// -1 for the `else` branch.
    pub cond_index: Option<i32>,
    /// Label of the innermost enclosing `case`.
    pub switch_case: Option<String>,
    /// Declared inside a `catch` arm.
    pub caught: bool,
}

impl BranchAttrs {
    pub fn is_plain(&self) -> bool {
        self.cond_index.is_none() && self.switch_case.is_none() && !self.caught
    }
}

/// One production of a binding: the right-hand expression, optionally keyed
/// by the slice index it assigned into (`x(2) = ...`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub slice: Option<Expr>,
    pub value: Expr,
    /// 0-based line index of the producing statement.
    pub line_index: u32,
    /// The assignment ran inside a loop body. Tracked per production because
    /// a slice assignment in a loop extends a binding declared outside it.
    pub in_loop: bool,
}

impl Production {
    /// Callee name when this production is a direct function call.
    pub fn call_target(&self) -> Option<&str> {
        self.value.callee()
    }
}

/// Def-use record of one variable within one lexical scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub id: VarId,
    pub role: VarRole,
    /// Declaring block; `None` for bindings created outside any block
    /// (script-level code, reserved identifiers).
    pub block: Option<BlockId>,
    pub in_loop: bool,
    pub branch: BranchAttrs,
    pub productions: Vec<Production>,
    /// Expressions consuming this binding, ordered, deduplicated by rendered
    /// text so `x + x` contributes one entry.
    pub usages: Vec<Expr>,
}

impl Binding {
    pub fn new(name: impl Into<String>, id: VarId, role: VarRole, block: Option<BlockId>) -> Self {
        Self {
            name: name.into(),
            id,
            role,
            block,
            in_loop: false,
            branch: BranchAttrs::default(),
            productions: Vec::new(),
            usages: Vec::new(),
        }
    }

    pub fn add_production(
        &mut self,
        slice: Option<Expr>,
        value: Expr,
        line_index: u32,
        in_loop: bool,
    ) {
        self.productions.push(Production {
            slice,
            value,
            line_index,
            in_loop,
        });
    }

    /// Record a consuming expression, skipping duplicates of the same
    /// rendered form.
    pub fn mark_usage(&mut self, expr: &Expr) {
        if expr.is_empty() {
            return;
        }
        let rendered = expr.render();
        if self.usages.iter().any(|u| u.render() == rendered) {
            return;
        }
        self.usages.push(expr.clone());
    }

    pub fn is_used(&self) -> bool {
        !self.usages.is_empty()
    }

    /// True when any production assigned into a slice of the variable rather
    /// than the whole value.
    pub fn is_slice_produced(&self) -> bool {
        self.productions.iter().any(|p| p.slice.is_some())
    }
}

/// Scope-local name resolution, threaded as an owned value through the
/// analyzer. The parser only reads it (slice-vs-call decisions).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    map: HashMap<String, VarId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<VarId> {
        self.map.get(name).copied()
    }

    /// Bind `name`, replacing any prior binding of the same name: the table
    /// always holds the latest.
    pub fn bind(&mut self, name: impl Into<String>, id: VarId) {
        self.map.insert(name.into(), id);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::BinOpKind;

    #[test]
    fn usage_dedup_by_rendered_text() {
        let mut b = Binding::new("x", VarId(0), VarRole::Internal, Some(BlockId(0)));
        let sum = Expr::binary(BinOpKind::Add, Expr::var("x"), Expr::var("x"));
        b.mark_usage(&sum);
        b.mark_usage(&sum);
        assert_eq!(b.usages.len(), 1);

        let other = Expr::binary(BinOpKind::Mul, Expr::var("x"), Expr::var("x"));
        b.mark_usage(&other);
        assert_eq!(b.usages.len(), 2);
    }

    #[test]
    fn rebind_replaces() {
        let mut table = SymbolTable::new();
        table.bind("x", VarId(0));
        table.bind("x", VarId(3));
        assert_eq!(table.get("x"), Some(VarId(3)));
    }
}
