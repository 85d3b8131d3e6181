//! Error types for navigation tree operations.

use thiserror::Error;

/// Navigation store errors
#[derive(Error, Debug)]
pub enum NavError {
    /// Store could not be reached at all; callers may fall back to the
    /// bundled default tree.
    #[error("navigation store unavailable: {0}")]
    Unavailable(#[source] sea_orm::DbErr),

    /// Store is reachable but holds no rows; distinct from `Unavailable`
    /// so callers can tell "no data yet" apart from an outage.
    #[error("navigation store is empty")]
    Empty,

    /// Node not found by business key
    #[error("node '{0}' not found")]
    NodeNotFound(String),

    /// Referenced parent not found by business key
    #[error("parent node '{0}' not found")]
    ParentNotFound(String),

    /// Business key already in use
    #[error("node '{0}' already exists")]
    DuplicateKey(String),

    /// Candidate tree or operation failed validation
    #[error("invalid navigation tree: {0}")]
    Validation(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Result type alias for navigation operations
pub type NavResult<T> = Result<T, NavError>;
