//! Tabular document model.

mod forms;
mod table;
mod workbook;

pub use forms::{FormSplit, form_slug, split_by_form};
pub use table::Document;
pub use workbook::Workbook;
