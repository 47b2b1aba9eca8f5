//! Header name normalization and the synonym table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::CanonicalHeader;

/// Synonyms shorter than this only match by equality, never by containment.
const MIN_CONTAINMENT_LEN: usize = 5;

const DEFAULT_SYNONYMS: &[(&str, CanonicalHeader)] = &[
    ("variable", CanonicalHeader::VariableName),
    ("var", CanonicalHeader::VariableName),
    ("fieldname", CanonicalHeader::VariableName),
    ("fieldid", CanonicalHeader::VariableName),
    ("varname", CanonicalHeader::VariableName),
    ("crf", CanonicalHeader::FormName),
    ("instrument", CanonicalHeader::FormName),
    ("label", CanonicalHeader::FieldLabel),
    ("fieldlabel", CanonicalHeader::FieldLabel),
    ("description", CanonicalHeader::FieldLabel),
    ("fielddescription", CanonicalHeader::FieldLabel),
    ("question", CanonicalHeader::FieldLabel),
    ("type", CanonicalHeader::FieldType),
    ("datatype", CanonicalHeader::FieldType),
    ("fieldtype", CanonicalHeader::FieldType),
    ("notes", CanonicalHeader::FieldNote),
    ("note", CanonicalHeader::FieldNote),
    ("branchinglogic", CanonicalHeader::BranchingLogic),
    ("showfieldonlyif", CanonicalHeader::BranchingLogic),
    ("sectionheader", CanonicalHeader::SectionHeader),
    ("section", CanonicalHeader::SectionHeader),
    ("identifier", CanonicalHeader::Identifier),
    ("phi", CanonicalHeader::Identifier),
    ("required", CanonicalHeader::RequiredField),
    ("align", CanonicalHeader::CustomAlignment),
    ("questionnumber", CanonicalHeader::QuestionNumber),
    ("annotation", CanonicalHeader::FieldAnnotation),
    ("choices", CanonicalHeader::Choices),
    ("permissiblevalues", CanonicalHeader::Choices),
    ("validvalues", CanonicalHeader::Choices),
    ("codes", CanonicalHeader::Choices),
    ("validation", CanonicalHeader::ValidationType),
    ("min", CanonicalHeader::ValidationMin),
    ("validationmin", CanonicalHeader::ValidationMin),
    ("minvalue", CanonicalHeader::ValidationMin),
    ("minimum", CanonicalHeader::ValidationMin),
    ("max", CanonicalHeader::ValidationMax),
    ("validationmax", CanonicalHeader::ValidationMax),
    ("maxvalue", CanonicalHeader::ValidationMax),
    ("maximum", CanonicalHeader::ValidationMax),
];

/// Lowercase a header and drop everything but ASCII letters and digits.
pub fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalized synonym → canonical header.
///
/// Serializes as a flat JSON object so operators can ship their own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynonymTable {
    entries: IndexMap<String, CanonicalHeader>,
}

impl SynonymTable {
    /// An empty table.
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add or replace a synonym. The key is normalized first.
    pub fn with_synonym(mut self, synonym: &str, header: CanonicalHeader) -> Self {
        self.insert(synonym, header);
        self
    }

    pub fn insert(&mut self, synonym: &str, header: CanonicalHeader) {
        let key = normalize_header(synonym);
        if !key.is_empty() {
            self.entries.insert(key, header);
        }
    }

    /// Add every entry of `other`, overriding existing keys.
    pub fn extend(&mut self, other: &SynonymTable) {
        for (key, header) in &other.entries {
            self.entries.insert(key.clone(), *header);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synonyms registered for `header`, in insertion order.
    pub fn synonyms_for(&self, header: CanonicalHeader) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(_, h)| **h == header)
            .map(|(k, _)| k.as_str())
    }

    /// Whether a normalized raw header equals a synonym of `header`.
    pub fn matches_exactly(&self, normalized: &str, header: CanonicalHeader) -> bool {
        self.entries.get(normalized) == Some(&header)
    }

    /// Whether a normalized raw header contains a long-enough synonym of `header`.
    pub fn matches_within(&self, normalized: &str, header: CanonicalHeader) -> bool {
        self.synonyms_for(header)
            .any(|syn| syn.len() >= MIN_CONTAINMENT_LEN && normalized.contains(syn))
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for (synonym, header) in DEFAULT_SYNONYMS {
            table.insert(synonym, *header);
        }
        table
    }
}
