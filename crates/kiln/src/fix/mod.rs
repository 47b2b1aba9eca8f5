//! Second-pass repair: inferred types and configurations become commands.

mod compiler;
mod configuration;

pub use compiler::{FixCompiler, FixOptions};
pub use configuration::Configuration;
