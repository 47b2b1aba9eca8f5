//! Header mapping records and the per-workbook mapping file.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{KilnError, Result};
use crate::persistence::{load_json, save_json};
use crate::schema::CanonicalHeader;

/// How a raw header was associated with a canonical one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Normalized name equals the canonical name.
    Exact,
    /// Normalized name equals or contains a synonym.
    Synonym,
    /// Name similarity cleared the threshold.
    Fuzzy,
    /// Column values looked like the canonical header's content.
    Content,
    /// Operator-supplied, never renamed by the compiler.
    Override,
    /// Hand-edited entry without provenance.
    #[default]
    Manual,
}

/// One canonical header's resolved source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    /// Raw column name, or a constant value when `is_override` is set and no
    /// such column exists.
    pub field_name: String,
    #[serde(rename = "override")]
    pub is_override: bool,
    pub method: MatchMethod,
    pub confidence: f64,
}

impl FieldMapping {
    pub fn new(field_name: impl Into<String>, method: MatchMethod, confidence: f64) -> Self {
        Self {
            field_name: field_name.into(),
            is_override: method == MatchMethod::Override,
            method,
            confidence,
        }
    }

    /// An operator override.
    pub fn operator(field_name: impl Into<String>) -> Self {
        Self::new(field_name, MatchMethod::Override, 1.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldMappingRepr {
    Name(String),
    Full {
        field_name: String,
        #[serde(rename = "override", default)]
        is_override: bool,
        #[serde(default)]
        method: Option<MatchMethod>,
        #[serde(default = "full_confidence")]
        confidence: f64,
    },
}

fn full_confidence() -> f64 {
    1.0
}

// Hand-written files may map a header straight to a column name.
impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match FieldMappingRepr::deserialize(deserializer)? {
            FieldMappingRepr::Name(field_name) => FieldMapping {
                field_name,
                is_override: false,
                method: MatchMethod::Manual,
                confidence: 1.0,
            },
            FieldMappingRepr::Full {
                field_name,
                is_override,
                method,
                confidence,
            } => FieldMapping {
                field_name,
                is_override,
                method: method.unwrap_or(if is_override {
                    MatchMethod::Override
                } else {
                    MatchMethod::Manual
                }),
                confidence,
            },
        })
    }
}

/// Equal best scores for one canonical header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambiguity {
    pub canonical: CanonicalHeader,
    /// Tied raw headers in column order; the first one was assigned.
    pub candidates: Vec<String>,
    pub score: f64,
}

impl Ambiguity {
    pub fn to_error(&self) -> KilnError {
        KilnError::AmbiguousMapping {
            canonical: self.canonical.name().to_string(),
            candidates: self.candidates.clone(),
        }
    }
}

/// Best match below the acceptance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedCandidate {
    pub canonical: CanonicalHeader,
    pub raw: String,
    pub score: f64,
}

fn default_start_row() -> usize {
    1
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Mapping for one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMapping {
    pub mapping: IndexMap<CanonicalHeader, FieldMapping>,
    #[serde(default)]
    pub missing_required: Vec<CanonicalHeader>,
    /// 1-based row of the header within the raw sheet.
    #[serde(default = "default_start_row")]
    pub start_row: usize,
    /// Constants written into every surviving row.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub immediate: IndexMap<CanonicalHeader, String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore: bool,
    /// Raw headers that matched nothing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmapped: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguities: Vec<Ambiguity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<UnresolvedCandidate>,
}

impl Default for HeaderMapping {
    fn default() -> Self {
        Self {
            mapping: IndexMap::new(),
            missing_required: Vec::new(),
            start_row: default_start_row(),
            immediate: IndexMap::new(),
            ignore: false,
            unmapped: Vec::new(),
            ambiguities: Vec::new(),
            unresolved: Vec::new(),
        }
    }
}

impl HeaderMapping {
    /// Raw column (or override constant) mapped to `header`.
    pub fn source_for(&self, header: CanonicalHeader) -> Option<&FieldMapping> {
        self.mapping.get(&header)
    }

    /// Whether `header` has a mapping entry or an immediate value.
    pub fn covers(&self, header: CanonicalHeader) -> bool {
        self.mapping.contains_key(&header) || self.immediate.contains_key(&header)
    }

    /// Canonical header a raw column was assigned to.
    pub fn canonical_for(&self, raw: &str) -> Option<CanonicalHeader> {
        self.mapping
            .iter()
            .find(|(_, m)| m.field_name == raw)
            .map(|(h, _)| *h)
    }

    /// Recompute `missing_required` from `mapping` and `immediate`.
    pub fn refresh_missing(&mut self) {
        self.missing_required = CanonicalHeader::REQUIRED
            .iter()
            .copied()
            .filter(|h| !self.covers(*h))
            .collect();
    }

    /// Fail with `MissingRequiredHeader` when required headers are unresolved.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.missing_required.is_empty() {
            Ok(())
        } else {
            Err(KilnError::MissingRequiredHeader(
                self.missing_required.iter().map(|h| h.name().to_string()).collect(),
            ))
        }
    }

    /// Fail with the first recorded `AmbiguousMapping`.
    pub fn ensure_unambiguous(&self) -> Result<()> {
        match self.ambiguities.first() {
            Some(ambiguity) => Err(ambiguity.to_error()),
            None => Ok(()),
        }
    }
}

/// Mappings for every sheet of a workbook, keyed by sheet name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingFile {
    pub sheets: IndexMap<String, HeaderMapping>,
}

impl MappingFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sheet: impl Into<String>, mapping: HeaderMapping) {
        self.sheets.insert(sheet.into(), mapping);
    }

    pub fn get(&self, sheet: &str) -> Option<&HeaderMapping> {
        self.sheets.get(sheet)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderMapping)> {
        self.sheets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Sheets not flagged `ignore`, in file order.
    pub fn active_sheets(&self) -> impl Iterator<Item = (&str, &HeaderMapping)> {
        self.iter().filter(|(_, m)| !m.ignore)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hand_written_mapping_parses() {
        let json = r#"{
            "Demographics": {
                "mapping": {
                    "Variable / Field Name": "VarRaw",
                    "Field Label": {"field_name": "Label", "override": false, "method": "synonym", "confidence": 1.0},
                    "Form Name": {"field_name": "demographics", "override": true}
                },
                "missing_required": ["Field Type"],
                "start_row": 3
            }
        }"#;
        let file: MappingFile = serde_json::from_str(json).unwrap();
        let sheet = file.get("Demographics").unwrap();

        assert_eq!(sheet.start_row, 3);
        assert_eq!(sheet.mapping[&CanonicalHeader::VariableName].method, MatchMethod::Manual);
        assert_eq!(sheet.mapping[&CanonicalHeader::FieldLabel].method, MatchMethod::Synonym);
        let form = &sheet.mapping[&CanonicalHeader::FormName];
        assert!(form.is_override);
        assert_eq!(form.method, MatchMethod::Override);
        assert!(!sheet.ignore);
        assert_eq!(sheet.canonical_for("Label"), Some(CanonicalHeader::FieldLabel));
    }

    #[test]
    fn test_refresh_missing_counts_immediates() {
        let mut mapping = HeaderMapping::default();
        mapping
            .mapping
            .insert(CanonicalHeader::VariableName, FieldMapping::new("var", MatchMethod::Synonym, 1.0));
        mapping
            .immediate
            .insert(CanonicalHeader::FormName, "intake".to_string());
        mapping.refresh_missing();

        assert_eq!(
            mapping.missing_required,
            vec![CanonicalHeader::FieldType, CanonicalHeader::FieldLabel]
        );
        match mapping.ensure_complete() {
            Err(KilnError::MissingRequiredHeader(names)) => {
                assert_eq!(names, vec!["Field Type", "Field Label"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ambiguity_surfaces_as_error() {
        let mapping = HeaderMapping {
            ambiguities: vec![Ambiguity {
                canonical: CanonicalHeader::FieldLabel,
                candidates: vec!["Label A".to_string(), "Label B".to_string()],
                score: 0.9,
            }],
            ..HeaderMapping::default()
        };
        assert!(matches!(
            mapping.ensure_unambiguous(),
            Err(KilnError::AmbiguousMapping { .. })
        ));
    }

    #[test]
    fn test_mapping_file_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");

        let mut file = MappingFile::new();
        let mut sheet = HeaderMapping {
            start_row: 2,
            ignore: true,
            ..HeaderMapping::default()
        };
        sheet
            .mapping
            .insert(CanonicalHeader::FormName, FieldMapping::operator("visit_1"));
        file.insert("Sheet1", sheet);
        file.save(&path).unwrap();

        let loaded = MappingFile::load(&path).unwrap();
        assert_eq!(loaded, file);
        assert_eq!(loaded.active_sheets().count(), 0);
    }
}
