//! Front end for MATLAB-style `.m` sources.
//!
//! Raw text is assembled into logical statements (comments resolved, `...`
//! continuations merged), then parsed into `mc_core::ast::Expr` trees without
//! a formal grammar: a character-level bracket matcher linearizes nested
//! sub-expressions into placeholder steps, and the remaining flat text is
//! scanned for binary operators. The same placeholder machinery is exposed at
//! the text level as [`decompose`]/[`compose`] for call-site flattening.

pub mod assembler;
pub mod decompose;
pub mod expr;
pub mod signature;

pub use assembler::{Statement, Statements};
pub use decompose::{compose, decompose, MapTable};
pub use expr::{parse_expr, ParseError, Side};
pub use signature::{
    call_attributes, extract_signature, function_decl, parse_name_list, split_assignment,
    CallSite, FunctionHeader,
};
