//! Reference retrieval: nearest-profile ranking, diversity sampling and
//! weak-dimension passage selection.

pub mod passages;
pub mod sampler;
pub mod similarity;

pub use passages::{select_passages, weak_dimensions};
pub use sampler::{sample_diverse, WeightedCandidate};
pub use similarity::{find_similar, SimilarityMatch};

/// Canonical policy constants. [`crate::config::RetrievalConfig`] defaults
/// to these; they are never overridable per call.
pub const DEFAULT_TOP_K_PROFILES: usize = 10;
pub const MAX_IMAGE_CITATIONS: usize = 3;
pub const MAX_QUOTE_CITATIONS: usize = 3;
pub const WEAK_SCORE_THRESHOLD: f64 = 5.0;
