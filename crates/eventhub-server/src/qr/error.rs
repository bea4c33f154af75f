//! Errors produced by QR issuance, scanning and attendance marking.

use eventhub_core::db::DatabaseError;
use eventhub_crypto::SignerError;

/// Message returned for any code that fails to parse or verify.
pub const INVALID_CODE_MESSAGE: &str = "Invalid or expired QR code";

#[derive(Debug, thiserror::Error)]
pub enum QrError {
    /// Unparsable, unsigned, tampered or malformed payload.
    #[error("{INVALID_CODE_MESSAGE}")]
    InvalidCode,

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("QR encoding failed: {0}")]
    Encoding(String),

    /// A valid code presented at an endpoint that does not consume its type.
    #[error("QR code of type {0} is not accepted here")]
    WrongCheckpoint(&'static str),

    #[error("QR code belongs to a different hackathon")]
    HackathonMismatch,

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

impl From<DatabaseError> for QrError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Conflict(what) => Self::Conflict(what),
            other => Self::Database(other),
        }
    }
}

impl From<SignerError> for QrError {
    fn from(e: SignerError) -> Self {
        Self::Encoding(e.to_string())
    }
}
