//! Error types for credential and session storage

/// Errors from reading or writing account documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("session parse error: {0}")]
    SessionParse(String),
}

/// Result alias for auth storage operations.
pub type Result<T> = std::result::Result<T, Error>;
