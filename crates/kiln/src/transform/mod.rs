//! The command language: vocabulary, script form and interpreter.

mod command;
mod context;
mod interpreter;
mod operations;
mod script;

pub use command::Command;
pub use context::{ActiveSheet, ExecutionContext};
pub use interpreter::CommandInterpreter;
pub use operations::{RowAudit, TransformChange, TransformResult};
pub use script::{parse_line, parse_script, render_script};
