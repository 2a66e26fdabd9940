//! Command layer of the `mc` binary.
//!
//! Thin wrappers over `mc-parser` and `mc-analyze`: each subcommand builds an
//! in-memory result and serializes it, either to a file or to stdout. No
//! analysis logic lives here.

pub mod commands;

pub use commands::{cache_command, graph_command, tag_command, CacheArgs, GraphArgs, TagArgs};
pub use mc_core::{Error, Result};
