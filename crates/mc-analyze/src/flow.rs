//! Per-file variable-flow analysis.
//!
//! Drives the statement assembler and expression parser over one source file,
//! maintaining a stack of open lexical blocks and a scope-local symbol table.
//! Every assignment creates or extends a [`Binding`] with its production and
//! loop/branch context; every right-hand reference appends to the consumed
//! binding's usage list. `end` pops the block stack, and when the stack
//! empties the finished function's bindings are sealed and the table reset,
//! so each top-level function gets an independent scope.

use mc_core::ast::Expr;
use mc_core::binding::{Binding, BranchAttrs, SymbolTable, VarId, VarRole};
use mc_core::block::{BlockArena, BlockId, BlockKind};
use mc_core::registry::FunctionSignature;
use mc_core::span::Span;
use mc_core::{Error, Result};
use mc_parser::assembler::{Statement, Statements};
use mc_parser::expr::{parse_expr, ParseError, Side};
use mc_parser::signature::{function_decl, split_assignment};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Identifiers treated as always-defined: the argument-count pseudo-variable
/// and builtin constants the analyzed scripts index into.
const RESERVED: &[&str] = &["nargin", "pi", "exp"];

/// Flow-analysis result for one file: the block arena, the binding arena,
/// and the statements that ran outside any block.
#[derive(Debug, Clone)]
pub struct FileFlow {
    pub path: PathBuf,
    pub blocks: BlockArena,
    pub bindings: Vec<Binding>,
    pub top_statements: Vec<Expr>,
    top_blocks: Vec<BlockId>,
}

impl FileFlow {
    pub fn binding(&self, id: VarId) -> &Binding {
        &self.bindings[id.0]
    }

    /// First block opened at file top level, usually the function definition.
    pub fn top_block(&self) -> Option<BlockId> {
        self.top_blocks.first().copied()
    }

    /// Bindings sealed into `block` when it closed.
    pub fn block_bindings(&self, block: BlockId) -> impl Iterator<Item = &Binding> {
        self.blocks
            .get(block)
            .bindings
            .iter()
            .map(|&id| &self.bindings[id.0])
    }

    /// Declared signature of the file's first function, for registry
    /// extension by the caller.
    pub fn signature(&self) -> Option<(String, FunctionSignature)> {
        self.top_blocks.iter().find_map(|&id| {
            if let BlockKind::Function {
                name,
                inputs,
                outputs,
            } = &self.blocks.get(id).kind
            {
                Some((
                    name.clone(),
                    FunctionSignature::new(inputs.clone(), outputs.clone()),
                ))
            } else {
                None
            }
        })
    }
}

pub fn analyze_file(path: &Path) -> Result<FileFlow> {
    let source = fs::read_to_string(path).map_err(|e| Error::from_io(e, path))?;
    analyze_source(&source, path)
}

pub fn analyze_source(source: &str, path: impl Into<PathBuf>) -> Result<FileFlow> {
    Analyzer::new(path.into()).run(source)
}

struct Analyzer {
    path: PathBuf,
    blocks: BlockArena,
    bindings: Vec<Binding>,
    table: SymbolTable,
    stack: Vec<BlockId>,
    top_statements: Vec<Expr>,
    top_blocks: Vec<BlockId>,
    reserved: Vec<VarId>,
}

impl Analyzer {
    fn new(path: PathBuf) -> Self {
        let mut analyzer = Self {
            path,
            blocks: BlockArena::new(),
            bindings: Vec::new(),
            table: SymbolTable::new(),
            stack: Vec::new(),
            top_statements: Vec::new(),
            top_blocks: Vec::new(),
            reserved: Vec::new(),
        };
        analyzer.seed_reserved();
        analyzer
    }

    fn run(mut self, source: &str) -> Result<FileFlow> {
        for stmt in Statements::new(source) {
            self.statement(&stmt)?;
        }
        // a missing final `end` seals whatever is still open
        while let Some(id) = self.stack.pop() {
            self.finalize(id);
        }
        Ok(FileFlow {
            path: self.path,
            blocks: self.blocks,
            bindings: self.bindings,
            top_statements: self.top_statements,
            top_blocks: self.top_blocks,
        })
    }

    fn seed_reserved(&mut self) {
        for name in RESERVED {
            let id = VarId(self.bindings.len());
            self.bindings
                .push(Binding::new(*name, id, VarRole::Input, None));
            self.reserved.push(id);
            self.table.bind(*name, id);
        }
    }

    /// Rebind the file-wide reserved bindings into a freshly cleared table.
    /// One binding per reserved name for the whole file, not per scope.
    fn reseed_reserved(&mut self) {
        for &id in &self.reserved {
            let name = self.bindings[id.0].name.clone();
            self.table.bind(name, id);
        }
    }

    fn statement(&mut self, stmt: &Statement) -> Result<()> {
        let text = stmt.text.trim().trim_end_matches(';').trim_end();
        let line = stmt.line_index;
        if text.is_empty() {
            return Ok(());
        }
        if text == "end" {
            self.close_block();
            return Ok(());
        }
        if let Some(header) = function_decl(text) {
            self.open_function(header.name, header.inputs, header.outputs, line);
            return Ok(());
        }
        match first_word(text) {
            "for" => self.open_for(&text[3..], line),
            "while" => self.open_while(&text[5..], line),
            "if" => self.open_if(&text[2..], line),
            "elseif" => self.elseif_branch(&text[6..], line),
            "else" => {
                self.else_branch();
                Ok(())
            }
            "switch" => self.open_switch(&text[6..], line),
            "case" => {
                self.case_branch(&text[4..]);
                Ok(())
            }
            "otherwise" => {
                self.case_branch("otherwise");
                Ok(())
            }
            "try" => {
                self.open_block(BlockKind::Try { caught: false }, line);
                Ok(())
            }
            "catch" => {
                self.catch_branch();
                Ok(())
            }
            _ => self.assignment_or_bare(text, line),
        }
    }

    fn parse(&self, text: &str, side: Side, line: u32) -> Result<Expr> {
        parse_expr(text, &self.table, side).map_err(|ParseError::Unparseable(text)| {
            Error::UnparseableExpression {
                file: self.path.clone(),
                line: line + 1,
                text,
            }
        })
    }

    fn open_block(&mut self, kind: BlockKind, line: u32) -> BlockId {
        let parent = self.stack.last().copied();
        let id = self.blocks.alloc(kind, parent, Span::new(line));
        if parent.is_none() {
            self.top_blocks.push(id);
        }
        self.stack.push(id);
        id
    }

    fn open_function(&mut self, name: String, inputs: Vec<String>, outputs: Vec<String>, line: u32) {
        debug!(function = %name, line = line + 1, "open function scope");
        let id = self.open_block(
            BlockKind::Function {
                name,
                inputs: inputs.clone(),
                outputs,
            },
            line,
        );
        // parameters are assumed-defined at entry
        for input in inputs {
            self.create_binding(input, VarRole::Input, Some(id));
        }
    }

    fn open_for(&mut self, rest: &str, line: u32) -> Result<()> {
        let (left, range) = split_assignment(rest);
        let Some(loop_var) = left else {
            return Err(Error::UnparseableExpression {
                file: self.path.clone(),
                line: line + 1,
                text: format!("for{}", rest),
            });
        };
        let (start_text, end_text) = split_range(range);
        let start = self.parse(start_text, Side::Rhs, line)?;
        let end = self.parse(end_text, Side::Rhs, line)?;
        self.record_consumers(&start);
        self.record_consumers(&end);
        let loop_var = loop_var.to_string();
        let id = self.open_block(
            BlockKind::For {
                loop_var: loop_var.clone(),
                start,
                end,
            },
            line,
        );
        self.create_binding(loop_var, VarRole::Internal, Some(id));
        Ok(())
    }

    fn open_while(&mut self, rest: &str, line: u32) -> Result<()> {
        let cond = self.parse(rest, Side::Rhs, line)?;
        self.record_consumers(&cond);
        self.open_block(BlockKind::While { cond }, line);
        Ok(())
    }

    fn open_if(&mut self, rest: &str, line: u32) -> Result<()> {
        let cond = self.parse(rest, Side::Rhs, line)?;
        self.record_consumers(&cond);
        self.open_block(
            BlockKind::If {
                conds: vec![cond],
                branch_index: 0,
            },
            line,
        );
        Ok(())
    }

    fn open_switch(&mut self, rest: &str, line: u32) -> Result<()> {
        let selector = self.parse(rest, Side::Rhs, line)?;
        self.record_consumers(&selector);
        self.open_block(
            BlockKind::Switch {
                selector,
                cases: Vec::new(),
            },
            line,
        );
        Ok(())
    }

    /// `elseif`/`else`/`case`/`catch` do not open scopes; they mutate the
    /// nearest enclosing block of the matching kind.
    fn innermost(&mut self, want: fn(&BlockKind) -> bool) -> Option<BlockId> {
        self.stack
            .iter()
            .rev()
            .copied()
            .find(|&id| want(&self.blocks.get(id).kind))
    }

    fn elseif_branch(&mut self, rest: &str, line: u32) -> Result<()> {
        let cond = self.parse(rest, Side::Rhs, line)?;
        self.record_consumers(&cond);
        if let Some(id) = self.innermost(|k| matches!(k, BlockKind::If { .. })) {
            if let BlockKind::If {
                conds,
                branch_index,
            } = &mut self.blocks.get_mut(id).kind
            {
                conds.push(cond);
                *branch_index += 1;
            }
        }
        Ok(())
    }

    fn else_branch(&mut self) {
        if let Some(id) = self.innermost(|k| matches!(k, BlockKind::If { .. })) {
            if let BlockKind::If { branch_index, .. } = &mut self.blocks.get_mut(id).kind {
                *branch_index = -1;
            }
        }
    }

    fn case_branch(&mut self, label: &str) {
        if let Some(id) = self.innermost(|k| matches!(k, BlockKind::Switch { .. })) {
            if let BlockKind::Switch { cases, .. } = &mut self.blocks.get_mut(id).kind {
                cases.push(label.trim().to_string());
            }
        }
    }

    fn catch_branch(&mut self) {
        if let Some(id) = self.innermost(|k| matches!(k, BlockKind::Try { .. })) {
            if let BlockKind::Try { caught } = &mut self.blocks.get_mut(id).kind {
                *caught = true;
            }
        }
    }

    fn close_block(&mut self) {
        let Some(id) = self.stack.pop() else {
            warn!(file = %self.path.display(), "stray `end` outside any block");
            return;
        };
        self.finalize(id);
        if self.stack.is_empty() {
            // the function scope closed: the next one starts clean
            self.table.clear();
            self.reseed_reserved();
        }
    }

    fn finalize(&mut self, id: BlockId) {
        let sealed: Vec<VarId> = self
            .bindings
            .iter()
            .filter(|b| b.block == Some(id))
            .map(|b| b.id)
            .collect();
        self.blocks.get_mut(id).bindings = sealed;
    }

    fn assignment_or_bare(&mut self, text: &str, line: u32) -> Result<()> {
        let (left, right) = split_assignment(text);
        let Some(left) = left else {
            // command-syntax statements (`hold on`) stay opaque
            let expr = match parse_expr(text, &self.table, Side::Rhs) {
                Ok(e) => e,
                Err(ParseError::Unparseable(_)) => Expr::Opaque(text.to_string()),
            };
            self.record_consumers(&expr);
            self.attach(expr);
            return Ok(());
        };

        // rhs first, so lhs slice indices can reference prior bindings
        let rhs = self.parse(right, Side::Rhs, line)?;
        let lhs = self.parse(left, Side::Lhs, line)?;

        // resolve consumers against the table before rebinding, so
        // `x = x + 1` attributes the usage to the old binding
        let consumers = self.collect_consumers(&rhs);

        for (name, slice) in lhs_targets(&lhs) {
            self.bind_target(name, slice, &rhs, line);
        }
        for (id, parent) in consumers {
            self.bindings[id.0].mark_usage(&parent);
            self.bindings[id.0].mark_usage(&lhs);
        }
        self.attach(rhs);
        Ok(())
    }

    fn collect_consumers(&self, rhs: &Expr) -> Vec<(VarId, Expr)> {
        let mut consumers = Vec::new();
        rhs.visit_var_refs(&mut |name, parent| {
            if let Some(id) = self.table.get(name) {
                consumers.push((id, parent.clone()));
            }
        });
        consumers
    }

    /// Usage bookkeeping for expressions with no assignment target:
    /// bare statements and control-block headers.
    fn record_consumers(&mut self, expr: &Expr) {
        for (id, parent) in self.collect_consumers(expr) {
            self.bindings[id.0].mark_usage(&parent);
        }
    }

    fn bind_target(&mut self, name: String, slice: Option<Expr>, rhs: &Expr, line: u32) {
        let in_loop = self
            .stack
            .last()
            .map(|&b| self.blocks.get(b).is_loop)
            .unwrap_or(false);
        if slice.is_some() {
            // partial assignment extends the existing binding, which may live
            // outside the loop currently running
            if let Some(id) = self.table.get(&name) {
                self.bindings[id.0].add_production(slice, rhs.clone(), line, in_loop);
                return;
            }
        }
        let role = if self.declared_output(&name) {
            VarRole::Output
        } else {
            VarRole::Internal
        };
        let block = self.stack.last().copied();
        let id = self.create_binding(name, role, block);
        self.bindings[id.0].add_production(slice, rhs.clone(), line, in_loop);
    }

    fn create_binding(&mut self, name: String, role: VarRole, block: Option<BlockId>) -> VarId {
        let id = VarId(self.bindings.len());
        let mut binding = Binding::new(name.clone(), id, role, block);
        binding.in_loop = block.map(|b| self.blocks.get(b).is_loop).unwrap_or(false);
        binding.branch = self.branch_attrs();
        self.bindings.push(binding);
        self.table.bind(name, id);
        id
    }

    fn branch_attrs(&self) -> BranchAttrs {
        let mut attrs = BranchAttrs::default();
        if let Some(&top) = self.stack.last() {
            match &self.blocks.get(top).kind {
                BlockKind::If { branch_index, .. } => attrs.cond_index = Some(*branch_index),
                BlockKind::Switch { cases, .. } => attrs.switch_case = cases.last().cloned(),
                BlockKind::Try { caught } => attrs.caught = *caught,
                _ => {}
            }
        }
        attrs
    }

    fn declared_output(&self, name: &str) -> bool {
        self.stack.iter().rev().any(|&id| {
            matches!(
                &self.blocks.get(id).kind,
                BlockKind::Function { outputs, .. } if outputs.iter().any(|o| o == name)
            )
        })
    }

    fn attach(&mut self, expr: Expr) {
        match self.stack.last() {
            Some(&top) => self.blocks.get_mut(top).body.push(expr),
            None => self.top_statements.push(expr),
        }
    }
}

fn first_word(text: &str) -> &str {
    let end = text
        .find(|c: char| !c.is_alphanumeric() && c != '_')
        .unwrap_or(text.len());
    &text[..end]
}

/// Split a loop range on its top-level colons, keeping the first and last
/// segment (`1:n` and `1:2:n` both range from `1` to `n`).
fn split_range(range: &str) -> (&str, &str) {
    let mut depth = 0i32;
    let mut cuts = Vec::new();
    for (i, c) in range.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => cuts.push(i),
            _ => {}
        }
    }
    match (cuts.first(), cuts.last()) {
        (Some(&first), Some(&last)) => (&range[..first], &range[last + 1..]),
        _ => (range, range),
    }
}

/// Assignment targets of a parsed left-hand side: `(name, slice index)`
/// pairs. `~` discards contribute nothing; a struct-field write binds the
/// struct name.
fn lhs_targets(lhs: &Expr) -> Vec<(String, Option<Expr>)> {
    match lhs {
        Expr::Var { name } => vec![(name.clone(), None)],
        Expr::Slice { base, index } => vec![(base.clone(), Some((**index).clone()))],
        Expr::Binary { op, lhs, .. } if op.is_struct_field() => lhs_targets(lhs),
        Expr::Concat { elems, .. } => elems.iter().flat_map(lhs_targets).collect(),
        _ => Vec::new(),
    }
}
