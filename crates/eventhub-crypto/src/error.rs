//! Signing error types.

/// Errors from constructing or using a [`crate::SignatureEngine`].
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("QR signing secret must not be empty")]
    EmptySecret,

    #[error("Failed to canonicalize payload: {0}")]
    Canonicalization(String),
}

/// Structural problems converting a wire payload into a typed one.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload of type {kind} is missing field {field}")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("payload of type {kind} must not carry field {field}")]
    UnexpectedField {
        kind: &'static str,
        field: &'static str,
    },
}
