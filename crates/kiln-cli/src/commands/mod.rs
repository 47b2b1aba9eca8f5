//! CLI command implementations.

pub mod apply;
pub mod compile;
pub mod infer;
pub mod lint;
pub mod map;
pub mod plan;
pub mod split;

/// Result of a command: the process exit code on success.
pub type CommandResult = Result<i32, Box<dyn std::error::Error>>;
