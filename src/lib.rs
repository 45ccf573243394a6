//! Photography critique engine with citation-grounded reference retrieval.
//!
//! Given a newly scored image's dimensional profile, the engine finds the
//! most relevant historical reference photographs and book passages for an
//! advisor, injects them into a vision-model prompt behind opaque citation
//! handles, runs a single inference, and validates that the structured
//! response only cites material it was actually given.

pub mod analysis;
pub mod config;
pub mod db;
pub mod dimension;
pub mod engine;
pub mod error;
pub mod export;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod retrieval;

pub use analysis::{CritiqueResponse, DimensionAssessment, RepairStats};
pub use config::Config;
pub use db::{BookPassage, Database, DimensionalProfile};
pub use dimension::Dimension;
pub use engine::{AnalysisOutcome, CritiqueEngine};
pub use error::CritiqueError;
pub use llm::LlmClient;
