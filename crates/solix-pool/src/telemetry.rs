//! Account-level metrics

use metrics::counter;

/// One login finished with `outcome` ("success", "invalid_credentials", "failed").
pub fn record_login(outcome: &'static str) {
    counter!("account_logins_total", "outcome" => outcome).increment(1);
}

/// One account poll in `cycle` ("status", "full", "verify") finished.
pub fn record_poll(cycle: &'static str, outcome: &'static str) {
    counter!("account_polls_total", "cycle" => cycle, "outcome" => outcome).increment(1);
}
