//! Inference collaborator trait and types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::Result;
use crate::validation::ValidationRecord;

/// A field type and configuration proposed for one report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    /// One of the REDCap field types, lowercase.
    pub field_type: String,

    /// Shape depends on the field type; `{}` when nothing is needed.
    #[serde(default = "empty_object")]
    pub configuration: Value,

    /// Replacement for a malformed variable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Inference {
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            configuration: empty_object(),
            variable_name: None,
        }
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_variable_name(mut self, name: impl Into<String>) -> Self {
        self.variable_name = Some(name.into());
        self
    }

    /// Copy this inference onto a report record.
    pub fn apply_to(self, record: &mut ValidationRecord) {
        record.inferred_field_type = Some(self.field_type);
        record.configuration = Some(self.configuration);
        if self.variable_name.is_some() {
            record.inferred_variable_name = self.variable_name;
        }
    }
}

/// Which collaborator fills in inferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceProvider {
    #[default]
    Heuristic,
    OpenAi,
}

/// Settings for inference collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub provider: InferenceProvider,

    /// Model to use for remote providers.
    pub model: String,

    /// Maximum tokens in response.
    pub max_tokens: usize,

    /// Temperature for generation (0.0-1.0).
    pub temperature: f64,

    /// Chat completions endpoint.
    pub api_url: String,

    /// Re-infer rows that already carry an inference.
    pub overwrite: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: InferenceProvider::Heuristic,
            model: "gpt-4o".to_string(),
            max_tokens: 512,
            temperature: 0.0,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            overwrite: false,
        }
    }
}

impl InferenceConfig {
    pub fn with_provider(mut self, provider: InferenceProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Proposes a field type and configuration for a report row.
///
/// Implementations must be thread-safe (Send + Sync) so one inferrer can be
/// shared across report chunks.
pub trait FieldInferrer: Send + Sync {
    /// Infer what the row should look like.
    fn infer(&self, record: &ValidationRecord) -> Result<Inference>;

    /// Get the name of this inferrer (for logging/debugging).
    fn name(&self) -> &str;
}

/// Fill in inferences for every invalid record, in report order.
///
/// Records that already carry an inference are kept unless `overwrite` is
/// set. Returns the number of records augmented.
pub fn augment_report(
    inferrer: &dyn FieldInferrer,
    records: &mut [ValidationRecord],
    overwrite: bool,
) -> Result<usize> {
    let mut augmented = 0;
    for record in records.iter_mut() {
        if record.is_valid() || (record.has_inference() && !overwrite) {
            continue;
        }
        let inference = inferrer.infer(record)?;
        debug!(
            line = record.line,
            inferrer = inferrer.name(),
            field_type = %inference.field_type,
            "row inferred"
        );
        inference.apply_to(record);
        augmented += 1;
    }

    info!(
        inferrer = inferrer.name(),
        records = records.len(),
        augmented,
        "report augmented"
    );
    Ok(augmented)
}
