//! Account lifecycle and periodic polling for Solix accounts
//!
//! Drives every configured account through login, token invalidation and
//! re-login, and runs the three independent schedules. All requests go
//! through one shared `relay::RequestExecutor`; all token state lives in
//! `solix_auth::CredentialStore`.
//!
//! Account lifecycle:
//! 1. Startup: sessions synced with the account list, stored tokens probed
//! 2. Accounts needing a login go through `AccountLifecycle::run_login_cycle()`
//! 3. Status and full-data polls read with the stored access token
//! 4. A 401 on any read clears the tokens (`handle_unauthorized`)
//! 5. The next login cycle logs the account back in

pub mod lifecycle;
pub mod poll;
pub mod schedule;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use lifecycle::{AccountLifecycle, LoginCycleSummary, LoginOutcome};
pub use poll::{
    CycleSummary, PollOutcome, poll_full, poll_status, run_full_cycle, run_status_cycle,
    verify_existing_tokens,
};
pub use schedule::{ScheduleConfig, Schedulers, spawn_periodic, spawn_schedulers};
