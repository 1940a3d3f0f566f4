//! Error types for the query execution core.

use thiserror::Error;

/// Errors produced while building or evaluating an executor tree.
#[derive(Error, Debug)]
pub enum CallunaError {
    /// Index access failed.
    #[error("Index error: {0}")]
    Index(String),

    /// An argument violated a documented precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Match data bookkeeping failed.
    #[error("Match data error: {0}")]
    MatchData(String),

    /// Generic error.
    #[error("Error: {0}")]
    Other(String),
}

impl CallunaError {
    /// Create an index error.
    pub fn index<S: Into<String>>(message: S) -> Self {
        CallunaError::Index(message.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        CallunaError::InvalidArgument(message.into())
    }

    /// Create a match data error.
    pub fn match_data<S: Into<String>>(message: S) -> Self {
        CallunaError::MatchData(message.into())
    }

    /// Create a generic error.
    pub fn other<S: Into<String>>(message: S) -> Self {
        CallunaError::Other(message.into())
    }
}

/// Result type alias using [`CallunaError`].
pub type Result<T> = std::result::Result<T, CallunaError>;
