//! Delimited file input and output.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig, sheet_name, write_document, write_document_to};
pub use source::SourceMetadata;
