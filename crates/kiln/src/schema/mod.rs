//! The target REDCap dictionary schema.

mod choices;
mod headers;
mod types;

pub use choices::{Choice, SliderLabels, duplicate_codes, format_choices, parse_choices};
pub use headers::{CHOICES_COLUMN, CanonicalHeader, VALIDATION_TYPE_COLUMN};
pub use types::{
    FieldType, MAX_VARIABLE_NAME_LEN, VALIDATION_TYPES, is_date_format, is_datetime_format,
    is_numeric_validation, is_valid_variable_name, is_validation_type, sanitize_variable_name,
};
