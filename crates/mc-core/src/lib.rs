pub mod ast;
pub mod binding;
pub mod block;
pub mod error;
pub mod ops;
pub mod registry;
pub mod span;

pub use ast::Expr;
pub use binding::{Binding, SymbolTable, VarId, VarRole};
pub use block::{Block, BlockArena, BlockId, BlockKind};
pub use error::{Error, Result};
pub use registry::{FunctionSignature, SignatureRegistry};
