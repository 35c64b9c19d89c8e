//! Service-specific error types

use thiserror::Error;

/// Fatal startup errors. Per-account failures never surface here; they are
/// handled and logged inside the account lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no accounts configured in {0}")]
    NoAccounts(String),

    #[error("invalid menu choice: {0:?}")]
    InvalidChoice(String),

    #[error("failed to read menu choice: {0}")]
    Stdin(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
