//! Inference collaborators: propose field types and configurations for
//! invalid report rows.
//!
//! Inference is optional; a report can also be augmented by hand or by an
//! external tool before it reaches the fix compiler.
//!
//! # Inferrers
//!
//! - **Heuristic** - deterministic, works offline from the row's own cells
//! - **OpenAI** - GPT models via API (requires `OPENAI_API_KEY`)
//!
//! # Example
//!
//! ```no_run
//! use kiln::llm::{HeuristicInferrer, augment_report};
//! use kiln::validation::load_report;
//!
//! let mut report = load_report("report.json").unwrap();
//! augment_report(&HeuristicInferrer::new(), &mut report, false).unwrap();
//! ```

mod heuristic;
mod openai;
mod prompts;
mod provider;

pub use heuristic::HeuristicInferrer;
pub use openai::OpenAiInferrer;
pub use provider::{
    FieldInferrer, Inference, InferenceConfig, InferenceProvider, augment_report,
};

use crate::error::Result;

/// Build the inferrer a configuration asks for.
pub fn inferrer_for(config: &InferenceConfig) -> Result<Box<dyn FieldInferrer>> {
    Ok(match config.provider {
        InferenceProvider::Heuristic => Box::new(HeuristicInferrer::new()),
        InferenceProvider::OpenAi => Box::new(OpenAiInferrer::from_env(config.clone())?),
    })
}
