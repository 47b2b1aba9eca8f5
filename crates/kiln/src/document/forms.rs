//! Partition a finished dictionary into one document per form.

use indexmap::IndexMap;

use crate::error::Result;
use crate::schema::CanonicalHeader;

use super::table::Document;

/// Result of splitting a dictionary by its `Form Name` column.
#[derive(Debug, Clone, Default)]
pub struct FormSplit {
    /// Per-form documents in order of first appearance.
    pub forms: IndexMap<String, Document>,
    /// Rows skipped because their form name was blank.
    pub blank_rows: usize,
}

/// Split a dictionary by form name.
pub fn split_by_form(document: &Document) -> Result<FormSplit> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    let mut blank_rows = 0;

    for (row, value) in document
        .column_values(CanonicalHeader::FormName.name())?
        .enumerate()
    {
        let form = value.trim();
        if form.is_empty() {
            blank_rows += 1;
            continue;
        }
        groups.entry(form.to_string()).or_default().push(row + 1);
    }

    let forms = groups
        .into_iter()
        .map(|(form, rows)| (form, document.select_rows(&rows)))
        .collect();

    Ok(FormSplit { forms, blank_rows })
}

/// File-name friendly slug for a form name.
pub fn form_slug(name: &str) -> String {
    let mut slug = String::new();
    for c in name.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() { "form".to_string() } else { slug }
}
