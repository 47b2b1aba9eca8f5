//! Raw header → canonical header assignment.

use indexmap::IndexMap;
use rapidfuzz::distance::jaro_winkler::similarity as jaro_similarity;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::{Document, Workbook};
use crate::schema::CanonicalHeader;

use super::detect::content_score;
use super::record::{
    Ambiguity, FieldMapping, HeaderMapping, MappingFile, MatchMethod, UnresolvedCandidate,
};
use super::synonyms::{SynonymTable, normalize_header};

/// Fuzzy scores at or above this are accepted.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Rows searched for the header row of a raw sheet.
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 20;

/// Scores closer than this count as a tie.
const TIE_EPSILON: f64 = 1e-9;

/// Settings for [`HeaderMapper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub threshold: f64,
    pub max_header_scan: usize,
    /// Score column values as well as names during the fuzzy phase.
    pub use_content: bool,
    pub synonyms: SynonymTable,
    /// Operator-supplied sources: a raw column name, or a constant.
    pub overrides: IndexMap<CanonicalHeader, String>,
    /// Immediate values for canonical headers the sheet does not map.
    pub defaults: IndexMap<CanonicalHeader, String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_header_scan: DEFAULT_HEADER_SCAN_ROWS,
            use_content: true,
            synonyms: SynonymTable::default(),
            overrides: IndexMap::new(),
            defaults: IndexMap::new(),
        }
    }
}

impl MapperConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_header_scan(mut self, rows: usize) -> Self {
        self.max_header_scan = rows;
        self
    }

    pub fn without_content(mut self) -> Self {
        self.use_content = false;
        self
    }

    /// Merge extra synonyms into the table.
    pub fn with_synonyms(mut self, synonyms: &SynonymTable) -> Self {
        self.synonyms.extend(synonyms);
        self
    }

    pub fn with_override(mut self, header: CanonicalHeader, source: impl Into<String>) -> Self {
        self.overrides.insert(header, source.into());
        self
    }

    pub fn with_default(mut self, header: CanonicalHeader, value: impl Into<String>) -> Self {
        self.defaults.insert(header, value.into());
        self
    }
}

/// Proposes which raw column feeds each canonical header.
///
/// Assignment runs in phases, each walking canonical headers in declaration
/// order: operator overrides, exact normalized names, synonyms, then fuzzy
/// scoring over name similarity and column content. A raw column is assigned
/// at most once. The mapper never fails; gaps are reported as data.
#[derive(Debug, Clone, Default)]
pub struct HeaderMapper {
    config: MapperConfig,
}

struct Columns<'a> {
    headers: &'a [String],
    normalized: Vec<String>,
    values: Vec<Vec<&'a str>>,
    used: Vec<bool>,
}

impl<'a> Columns<'a> {
    fn new(document: &'a Document) -> Self {
        let headers = document.columns();
        let mut values: Vec<Vec<&str>> = vec![Vec::new(); headers.len()];
        for (_, cells) in document.rows() {
            for (i, cell) in cells.iter().enumerate() {
                values[i].push(cell.as_str());
            }
        }
        Self {
            headers,
            normalized: headers.iter().map(|h| normalize_header(h)).collect(),
            values,
            used: vec![false; headers.len()],
        }
    }

    fn free(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.headers.len()).filter(|&i| !self.used[i])
    }
}

impl HeaderMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MapperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Map a document whose first line was the header.
    pub fn map_document(&self, document: &Document) -> HeaderMapping {
        let mut columns = Columns::new(document);
        let mut mapping = HeaderMapping::default();

        self.seed_overrides(&mut columns, &mut mapping);
        self.match_exact(&mut columns, &mut mapping);
        self.match_synonyms(&mut columns, &mut mapping);
        self.match_fuzzy(&mut columns, &mut mapping);

        mapping.unmapped = columns
            .free()
            .map(|i| columns.headers[i].clone())
            .collect();
        mapping.refresh_missing();
        mapping
    }

    /// Map a raw sheet: find its header row, resolve headers, add immediates.
    pub fn map_sheet(&self, sheet_name: &str, grid: &[Vec<String>]) -> HeaderMapping {
        let start_row = self.detect_header_row(grid);
        let document = sheet_at(grid, start_row);

        let mut mapping = self.map_document(&document);
        mapping.start_row = start_row;
        self.apply_immediates(&mut mapping, sheet_name);

        info!(
            sheet = sheet_name,
            start_row,
            mapped = mapping.mapping.len(),
            missing = mapping.missing_required.len(),
            "sheet mapped"
        );
        mapping
    }

    /// Map every sheet of a workbook.
    pub fn map_workbook(&self, workbook: &Workbook) -> MappingFile {
        let mut file = MappingFile::new();
        for (name, grid) in workbook.sheets() {
            file.insert(name, self.map_sheet(name, grid));
        }
        file
    }

    /// 1-based header row: the row among the first `max_header_scan` that
    /// resolves the most canonical headers. Earlier rows win ties.
    pub fn detect_header_row(&self, grid: &[Vec<String>]) -> usize {
        let limit = self.config.max_header_scan.min(grid.len());
        let mut best_row = 1;
        let mut best_count = 0;

        for start_row in 1..=limit {
            if grid[start_row - 1].iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            let mapping = self.map_document(&sheet_at(grid, start_row));
            let count = mapping.mapping.values().filter(|m| !m.is_override).count();
            debug!(start_row, count, "header row candidate");
            if count > best_count {
                best_count = count;
                best_row = start_row;
            }
        }
        best_row
    }

    /// Fill `immediate` for canonical headers the sheet leaves unmapped.
    ///
    /// The sheet name becomes the Form Name; configured defaults cover the rest.
    pub fn apply_immediates(&self, mapping: &mut HeaderMapping, sheet_name: &str) {
        if !mapping.mapping.contains_key(&CanonicalHeader::FormName) && !sheet_name.is_empty() {
            mapping
                .immediate
                .insert(CanonicalHeader::FormName, sheet_name.to_string());
        }
        for (header, value) in &self.config.defaults {
            if !mapping.covers(*header) {
                mapping.immediate.insert(*header, value.clone());
            }
        }
        mapping.refresh_missing();
    }

    fn assign(
        columns: &mut Columns<'_>,
        mapping: &mut HeaderMapping,
        canonical: CanonicalHeader,
        index: usize,
        method: MatchMethod,
        confidence: f64,
    ) {
        columns.used[index] = true;
        let raw = &columns.headers[index];
        debug!(canonical = canonical.name(), raw = raw.as_str(), ?method, confidence, "header assigned");
        mapping
            .mapping
            .insert(canonical, FieldMapping::new(raw.clone(), method, confidence));
    }

    fn unassigned(mapping: &HeaderMapping) -> Vec<CanonicalHeader> {
        CanonicalHeader::ALL
            .iter()
            .copied()
            .filter(|h| !mapping.mapping.contains_key(h))
            .collect()
    }

    fn seed_overrides(&self, columns: &mut Columns<'_>, mapping: &mut HeaderMapping) {
        for (canonical, source) in &self.config.overrides {
            let found = columns.free().find(|&i| columns.headers[i] == *source);
            if let Some(i) = found {
                columns.used[i] = true;
            }
            mapping
                .mapping
                .insert(*canonical, FieldMapping::operator(source.clone()));
        }
    }

    fn match_exact(&self, columns: &mut Columns<'_>, mapping: &mut HeaderMapping) {
        for canonical in Self::unassigned(mapping) {
            let target = normalize_header(canonical.name());
            let found = columns
                .free()
                .find(|&i| columns.headers[i].trim() == canonical.name())
                .or_else(|| columns.free().find(|&i| columns.normalized[i] == target));
            if let Some(i) = found {
                Self::assign(columns, mapping, canonical, i, MatchMethod::Exact, 1.0);
            }
        }
    }

    fn match_synonyms(&self, columns: &mut Columns<'_>, mapping: &mut HeaderMapping) {
        let synonyms = &self.config.synonyms;
        for contained in [false, true] {
            for canonical in Self::unassigned(mapping) {
                let found = columns.free().find(|&i| {
                    let name = &columns.normalized[i];
                    if contained {
                        synonyms.matches_within(name, canonical)
                    } else {
                        synonyms.matches_exactly(name, canonical)
                    }
                });
                if let Some(i) = found {
                    Self::assign(columns, mapping, canonical, i, MatchMethod::Synonym, 1.0);
                }
            }
        }
    }

    /// Score one column against one canonical header.
    fn score(&self, columns: &Columns<'_>, canonical: CanonicalHeader, index: usize) -> (f64, MatchMethod) {
        let name = &columns.normalized[index];
        let name_score = if name.is_empty() {
            0.0
        } else {
            let canonical_name = normalize_header(canonical.name());
            std::iter::once(canonical_name.as_str())
                .chain(self.config.synonyms.synonyms_for(canonical))
                .map(|target| jaro_similarity(name.chars(), target.chars()))
                .fold(0.0, f64::max)
        };

        let content = if self.config.use_content {
            content_score(canonical, &columns.headers[index], &columns.values[index])
        } else {
            0.0
        };

        if content > name_score {
            (content, MatchMethod::Content)
        } else {
            (name_score, MatchMethod::Fuzzy)
        }
    }

    fn match_fuzzy(&self, columns: &mut Columns<'_>, mapping: &mut HeaderMapping) {
        for canonical in Self::unassigned(mapping) {
            let view: &Columns<'_> = columns;
            let scored: Vec<(usize, f64, MatchMethod)> = view
                .free()
                .map(|i| {
                    let (score, method) = self.score(view, canonical, i);
                    (i, score, method)
                })
                .collect();

            let best = scored.iter().map(|(_, s, _)| *s).fold(0.0, f64::max);
            if best <= 0.0 {
                continue;
            }
            let tied: Vec<&(usize, f64, MatchMethod)> = scored
                .iter()
                .filter(|(_, s, _)| (best - s).abs() < TIE_EPSILON)
                .collect();
            let (index, score, method) = *tied[0];

            if best >= self.config.threshold {
                if tied.len() > 1 {
                    mapping.ambiguities.push(Ambiguity {
                        canonical,
                        candidates: tied.iter().map(|(i, _, _)| columns.headers[*i].clone()).collect(),
                        score,
                    });
                }
                Self::assign(columns, mapping, canonical, index, method, score);
            } else {
                mapping.unresolved.push(UnresolvedCandidate {
                    canonical,
                    raw: columns.headers[index].clone(),
                    score,
                });
            }
        }
    }
}

/// A raw grid read with its header at the 1-based `start_row`.
fn sheet_at(grid: &[Vec<String>], start_row: usize) -> Document {
    if grid.is_empty() || start_row == 0 || start_row > grid.len() {
        return Document::new();
    }
    let header = grid[start_row - 1]
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    Document::from_rows(header, grid[start_row..].to_vec())
}
