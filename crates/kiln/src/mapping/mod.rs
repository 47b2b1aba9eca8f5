//! Header mapping: raw spreadsheet columns → canonical REDCap headers.

mod detect;
mod mapper;
mod planner;
mod record;
mod synonyms;

pub use detect::content_score;
pub use mapper::{DEFAULT_HEADER_SCAN_ROWS, DEFAULT_THRESHOLD, HeaderMapper, MapperConfig};
pub use planner::{DEFAULT_OUTPUT_SHEET, PlannerConfig, StructuralPlanner};
pub use record::{
    Ambiguity, FieldMapping, HeaderMapping, MappingFile, MatchMethod, UnresolvedCandidate,
};
pub use synonyms::{SynonymTable, normalize_header};
