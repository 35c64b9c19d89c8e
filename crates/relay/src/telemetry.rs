//! Request metrics
//!
//! Emitted through the `metrics` facade; with no recorder installed these are
//! no-ops.

use metrics::{counter, histogram};

/// One attempt finished with `outcome` ("success" or a failure kind label).
pub fn record_attempt(outcome: &'static str) {
    counter!("relay_attempts_total", "outcome" => outcome).increment(1);
}

/// One logical request finished.
pub fn record_request(outcome: &'static str, duration_secs: f64) {
    counter!("relay_requests_total", "outcome" => outcome).increment(1);
    histogram!("relay_request_duration_seconds").record(duration_secs);
}
