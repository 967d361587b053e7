//! Error types for topological joins.

use topolink_types::ParseRelationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, JoinError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JoinError {
    /// A link threshold must be strictly positive.
    #[error("invalid threshold {0}: must be strictly positive")]
    InvalidThreshold(f64),

    #[error("invalid relation: {0}")]
    InvalidRelation(String),

    #[error("invalid link expression: {0}")]
    InvalidExpression(String),

    #[error("invalid join configuration: {0}")]
    InvalidConfig(String),

    /// The exact predicate failed (or panicked) on a candidate pair.
    #[error("predicate failed on ({source_id}, {target_id}): {message}")]
    Predicate {
        source_id: String,
        target_id: String,
        message: String,
    },

    /// A collection has more indexable geometries than the grid can address.
    #[error("grid index capacity of {0} entries exceeded")]
    IndexCapacity(usize),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("join cancelled")]
    Cancelled,

    #[error("failed to decode geometry: {0}")]
    Decode(String),
}

impl From<ParseRelationError> for JoinError {
    fn from(e: ParseRelationError) -> Self {
        JoinError::InvalidRelation(e.0)
    }
}

impl From<rayon::ThreadPoolBuildError> for JoinError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        JoinError::ThreadPool(e.to_string())
    }
}

impl From<std::io::Error> for JoinError {
    fn from(e: std::io::Error) -> Self {
        JoinError::ThreadPool(e.to_string())
    }
}
