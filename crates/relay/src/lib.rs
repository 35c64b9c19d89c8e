//! Resilient request execution through a rotating proxy pool
//!
//! Every outbound call to the remote service goes through `RequestExecutor`.
//! One logical call may span several HTTP attempts:
//!
//! 1. `ProxyRotator::next()` picks the proxy for the attempt (or none)
//! 2. The attempt runs with default browser headers and a per-attempt timeout
//! 3. `classify()` maps the outcome to a `FailureKind`
//! 4. The kind decides: return, swap proxy, back off and retry, or fail
//!
//! Proxy faults are kept off the backoff ledger: a bad proxy costs a short
//! fixed pause and a swap, not one of the account's retry attempts.

pub mod classify;
pub mod error;
pub mod executor;
pub mod headers;
pub mod policy;
pub mod rotator;
pub mod telemetry;

pub use classify::{AttemptFault, FailureKind, TransportFault, classify};
pub use error::{Error, Result};
pub use executor::{RequestExecutor, RequestSpec};
pub use policy::RetryPolicy;
pub use rotator::{ProxyEntry, ProxyRotator};
