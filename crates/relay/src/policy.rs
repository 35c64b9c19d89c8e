//! Retry budget and backoff tiers

use crate::classify::FailureKind;
use std::time::Duration;

/// Limits and delays for one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retryable attempts before `RequestExhausted`
    pub max_attempts: u32,
    /// Maximum proxy swaps, counted separately from attempts
    pub max_proxy_swaps: u32,
    /// Standard backoff base
    pub retry_delay: Duration,
    /// Multiplier applied to the standard delay for 429 responses
    pub rate_limit_multiplier: u32,
    /// Fixed pause before swapping to the next proxy
    pub proxy_retry_delay: Duration,
    /// Timeout for a single attempt
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_proxy_swaps: 10,
            retry_delay: Duration::from_secs(15),
            rate_limit_multiplier: 3,
            proxy_retry_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after the `tier`-th failure of `kind`.
    ///
    /// `tier` starts at 1. Proxy faults always wait the fixed proxy delay.
    pub fn delay_for(&self, kind: FailureKind, tier: u32) -> Duration {
        let tier = tier.max(1);
        match kind {
            FailureKind::Proxy => self.proxy_retry_delay,
            FailureKind::RateLimited => self
                .retry_delay
                .saturating_mul(self.rate_limit_multiplier)
                .saturating_mul(tier),
            _ => self.retry_delay.saturating_mul(tier),
        }
    }
}
