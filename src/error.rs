//! Error types for feedpin.

use thiserror::Error;

/// Common error type for feedpin.
#[derive(Error, Debug)]
pub enum FeedpinError {
    /// The feed could not be retrieved or is not a feed document.
    #[error("feed fetch error: {0}")]
    FeedFetch(String),

    /// A feed item block is missing one of its required fields.
    ///
    /// `index` is the zero-based position of the item in the feed.
    #[error("malformed feed item #{index}: missing <{field}>")]
    MalformedFeedItem {
        /// Position of the item in the feed.
        index: usize,
        /// Name of the missing element.
        field: &'static str,
    },

    /// A stored post id no longer resolves to a live post.
    #[error("stale post reference: {0}")]
    StaleReference(String),

    /// The platform rejected a pin request.
    #[error("pin conflict: {0}")]
    PinConflict(String),

    /// Any other content platform failure.
    #[error("platform error: {0}")]
    Platform(String),

    /// Database error.
    ///
    /// Errors from sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for moderator input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),
}

impl From<sqlx::Error> for FeedpinError {
    fn from(e: sqlx::Error) -> Self {
        FeedpinError::Database(e.to_string())
    }
}

/// Result type alias for feedpin operations.
pub type Result<T> = std::result::Result<T, FeedpinError>;
