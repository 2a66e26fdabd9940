//! Analysis passes over parsed `.m` sources.
//!
//! Three passes build on the `mc-parser` front end: [`flow`] produces the
//! per-file def-use picture (blocks, bindings, productions, usages),
//! [`callgraph`] connects functions across files through positional variable
//! pairings, and [`cacheable`] uses both to decide which intermediate
//! results are safe to memoize.

pub mod cacheable;
pub mod callgraph;
pub mod flow;

pub use cacheable::{select_cacheable, select_cacheable_bindings};
pub use callgraph::{CallGraph, FunctionNode, NodeId, ParentRef};
pub use flow::{analyze_file, analyze_source, FileFlow};
