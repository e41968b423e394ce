//! Error taxonomy for the generation pipeline.
//!
//! Every failure mode a single generation request can hit has its own
//! variant, so the boundary can distinguish "retry this" from "abort this
//! request" from "the process is misconfigured". Only
//! [`GenerateError::SchemaValidation`] is transient; everything else aborts
//! the current request without retrying.

use thiserror::Error;

/// All failure modes of the news generation pipeline.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Missing credentials or endpoint. Raised before any generation attempt.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The corpus file does not exist.
    #[error("corpus not found: {0}")]
    CorpusNotFound(String),

    /// The corpus file exists but yielded zero usable rows.
    #[error("corpus is empty: {0}")]
    CorpusEmpty(String),

    /// The caller-supplied target date could not be parsed.
    #[error("invalid target date: {0}")]
    InvalidTargetDate(String),

    /// Embedding the corpus failed; the semantic index could not be built.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// The similarity query against the index failed.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The model responded but its output did not conform to the report
    /// schema, even after best-effort extraction. Retried up to the
    /// controller's attempt budget. Carries the raw model output for
    /// diagnostics when available.
    #[error("schema validation failed: {message}")]
    SchemaValidation {
        message: String,
        raw: Option<String>,
    },

    /// The model call itself failed (network, auth, timeout). Not retried.
    #[error("model invocation failed: {0}")]
    Invocation(String),
}

impl GenerateError {
    /// Whether the retry controller may attempt the generation again.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenerateError::SchemaValidation { .. })
    }

    /// Raw model output preserved for diagnostics, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            GenerateError::SchemaValidation { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }
}
