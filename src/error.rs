//! Error types for request-level failures
//!
//! Startup loading uses `anyhow` with context (a failed load is fatal and
//! only ever reported). Errors a caller can react to are typed here.

use thiserror::Error;

/// Failure inside the scoring step
#[derive(Debug, Error)]
pub enum ScorerError {
    /// Vector was assembled against a different column schema
    #[error("feature vector has {got} columns, model expects {expected}")]
    SchemaMismatch { expected: usize, got: usize },

    /// Model produced NaN or infinity
    #[error("model produced a non-finite score ({0})")]
    NonFinite(f64),

    /// Any other failure reported by a scorer implementation
    #[error("model evaluation failed: {0}")]
    Model(String),
}

/// Errors returned by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller supplied something the engine refuses to guess about
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Scoring failed; never replaced by a default yield
    #[error("scoring failed for {date}: {source}")]
    Scorer {
        date: chrono::NaiveDate,
        #[source]
        source: ScorerError,
    },

    /// Required artifact absent at startup
    #[error("missing artifact: {0}")]
    MissingArtifact(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
