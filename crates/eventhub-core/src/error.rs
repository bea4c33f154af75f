//! Error types for `EventHub` core library.

use thiserror::Error;

/// Result type alias using `EventHub` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `EventHub` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
