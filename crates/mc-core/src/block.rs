use crate::ast::Expr;
use crate::binding::VarId;
use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Index of a block inside one file's [`BlockArena`]. Blocks reference each
/// other by id only; the arena owns every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockKind {
    Function {
        name: String,
        inputs: Vec<String>,
        outputs: Vec<String>,
    },
    For {
        loop_var: String,
        start: Expr,
        end: Expr,
    },
    While {
        cond: Expr,
    },
    If {
        conds: Vec<Expr>,
        /// Index of the branch currently being filled; -1 once `else` is
        /// reached.
        branch_index: i32,
    },
    Switch {
        selector: Expr,
        cases: Vec<String>,
    },
    Try {
        /// True once the `catch` marker has been seen.
        caught: bool,
    },
}

impl BlockKind {
    pub fn is_loop(&self) -> bool {
        matches!(self, BlockKind::For { .. } | BlockKind::While { .. })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            BlockKind::Function { .. } => "function",
            BlockKind::For { .. } => "for",
            BlockKind::While { .. } => "while",
            BlockKind::If { .. } => "if",
            BlockKind::Switch { .. } => "switch",
            BlockKind::Try { .. } => "try",
        }
    }
}

/// One lexical block. The block owns its body statements and, once closed,
/// the ids of the bindings declared directly in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub is_loop: bool,
    pub parent: Option<BlockId>,
    pub span: Span,
    pub body: Vec<Expr>,
    /// Populated when the block is finalized on `end`.
    pub bindings: Vec<VarId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockArena {
    blocks: Vec<Block>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new block; `is_loop` is inherited from the parent unless the
    /// kind is itself a loop.
    pub fn alloc(&mut self, kind: BlockKind, parent: Option<BlockId>, span: Span) -> BlockId {
        let inherited = parent
            .map(|p| self.blocks[p.0].is_loop)
            .unwrap_or(false);
        let is_loop = kind.is_loop() || inherited;
        self.blocks.push(Block {
            kind,
            is_loop,
            parent,
            span,
            body: Vec::new(),
            bindings: Vec::new(),
        });
        BlockId(self.blocks.len() - 1)
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn get_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockId(i), b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_context_is_inherited() {
        let mut arena = BlockArena::new();
        let func = arena.alloc(
            BlockKind::Function {
                name: "f".into(),
                inputs: vec![],
                outputs: vec![],
            },
            None,
            Span::new(0),
        );
        let for_block = arena.alloc(
            BlockKind::For {
                loop_var: "i".into(),
                start: Expr::number("1", 1.0),
                end: Expr::number("10", 10.0),
            },
            Some(func),
            Span::new(1),
        );
        let if_block = arena.alloc(
            BlockKind::If {
                conds: vec![Expr::var("c")],
                branch_index: 0,
            },
            Some(for_block),
            Span::new(2),
        );
        assert!(!arena.get(func).is_loop);
        assert!(arena.get(for_block).is_loop);
        assert!(arena.get(if_block).is_loop);
    }
}
