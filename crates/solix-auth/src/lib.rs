//! Solix account authentication and session storage
//!
//! Provides the API endpoint table, credential loading, the per-account
//! session model with its durable `SessionRepository`, the `CredentialStore`
//! that keeps both consistent, and the login and point-read requests. All
//! HTTP goes through `relay::RequestExecutor`.
//!
//! Session flow:
//! 1. `credentials::load_credentials()` reads the account list once
//! 2. `CredentialStore::open()` loads persisted sessions
//! 3. `CredentialStore::sync_with_credentials()` reconciles the two
//! 4. `login::login()` obtains tokens, saved via `CredentialStore::record_tokens()`
//! 5. A 401 on any read clears tokens via `CredentialStore::clear_tokens()`

pub mod constants;
pub mod credentials;
pub mod error;
pub mod login;
pub mod points;
pub mod session;
pub mod store;

pub use constants::*;
pub use credentials::{AccountCredential, load_credentials, parse_credentials};
pub use error::{Error, Result};
pub use login::login;
pub use session::{SessionDocument, SessionRepository, SessionState, TokenPair, YamlSessionFile};
pub use store::{CredentialStore, SyncReport};
