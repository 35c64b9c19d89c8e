//! Prometheus metrics exposition
//!
//! Installs the recorder behind the `metrics` facade used by the library
//! crates:
//!
//! - `relay_attempts_total` (counter): label `outcome`
//! - `relay_requests_total` (counter): label `outcome`
//! - `relay_request_duration_seconds` (histogram)
//! - `account_logins_total` (counter): label `outcome`
//! - `account_polls_total` (counter): labels `cycle`, `outcome`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Request duration buckets, 50ms up to the longest backoff chain.
const DURATION_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full("relay_request_duration_seconds".to_string()),
        DURATION_BUCKETS,
    )
}

/// Install the Prometheus recorder and return a handle for rendering.
///
/// The duration metric gets explicit buckets so it renders as a histogram
/// with `_bucket` lines rather than a summary.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}
