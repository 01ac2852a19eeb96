//! Error types for remote chat operations.

use thiserror::Error;

/// Failure of a remote chat operation.
///
/// Every variant wraps the underlying cause; callers log at the call site
/// and nothing is retried automatically.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A remote read (bulk fetch) failed.
    #[error("remote read failed: {0}")]
    Read(#[source] anyhow::Error),

    /// A remote write (insert or delete) failed.
    #[error("remote write failed: {0}")]
    Write(#[source] anyhow::Error),

    /// The change-notification subscription could not be opened or broke.
    #[error("subscription failed: {0}")]
    Subscription(#[source] anyhow::Error),
}

impl ChatError {
    pub fn read(err: impl Into<anyhow::Error>) -> Self {
        Self::Read(err.into())
    }

    pub fn write(err: impl Into<anyhow::Error>) -> Self {
        Self::Write(err.into())
    }

    pub fn subscription(err: impl Into<anyhow::Error>) -> Self {
        Self::Subscription(err.into())
    }
}

/// Result type alias for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
