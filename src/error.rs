//! Error taxonomy for the critique pipeline.
//!
//! Only two conditions are true failures that propagate to callers: the
//! model returning unparseable output, and the backing store being
//! unreachable. Empty retrieval results are ordinary data, and citation
//! problems in model output are repaired in place, never raised.

use thiserror::Error;

/// Failure conditions surfaced by [`crate::engine::CritiqueEngine`].
///
/// Each variant names the pipeline stage that failed, so callers can decide
/// between retrying inference and surfacing a user-facing error.
#[derive(Debug, Error)]
pub enum CritiqueError {
    /// The profile or passage store could not be read. Distinct from an
    /// advisor simply having no reference material, which is a legitimate
    /// empty result from a reachable store.
    #[error("reference store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    /// The vision model call itself failed (transport error, non-2xx,
    /// empty completion). The engine issues at most one inference call per
    /// analysis; retry policy belongs to the caller.
    #[error("model inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    /// The model's raw text did not parse into the critique schema.
    #[error("model returned malformed output: {reason}")]
    MalformedModelOutput { reason: String },

    /// A passage offered for import violated the store invariants
    /// (empty or unknown dimension tags).
    #[error("invalid passage: {0}")]
    InvalidPassage(String),
}
