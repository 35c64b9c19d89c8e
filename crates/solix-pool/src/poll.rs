//! Status and full-data polling
//!
//! Both cycles walk the configured accounts sequentially with a pause
//! between accounts. Each poll re-reads the session so a token cleared
//! mid-cycle is honored. Accounts without an access token are skipped.

use std::collections::BTreeSet;
use std::time::Duration;

use common::mask_identity;
use solix_auth::points;
use tracing::{info, warn};

use crate::lifecycle::AccountLifecycle;
use crate::telemetry;

/// Result of polling one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No access token stored
    Skipped,
    Reported,
    /// The service rejected the token; it has been cleared
    Unauthorized,
    Failed,
}

impl PollOutcome {
    fn label(self) -> &'static str {
        match self {
            PollOutcome::Skipped => "skipped",
            PollOutcome::Reported => "reported",
            PollOutcome::Unauthorized => "unauthorized",
            PollOutcome::Failed => "failed",
        }
    }
}

/// Per-outcome counts for one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub reported: usize,
    pub skipped: usize,
    pub unauthorized: usize,
    pub failed: usize,
}

impl CycleSummary {
    fn add(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Skipped => self.skipped += 1,
            PollOutcome::Reported => self.reported += 1,
            PollOutcome::Unauthorized => self.unauthorized += 1,
            PollOutcome::Failed => self.failed += 1,
        }
    }
}

async fn access_token(lifecycle: &AccountLifecycle, identity: &str) -> Option<String> {
    lifecycle
        .store()
        .get(identity)
        .await
        .and_then(|s| s.access_token().map(str::to_string))
}

async fn handle_error(
    lifecycle: &AccountLifecycle,
    identity: &str,
    read: &'static str,
    error: relay::Error,
) -> PollOutcome {
    if error.root().is_unauthorized() {
        lifecycle.handle_unauthorized(identity).await;
        PollOutcome::Unauthorized
    } else {
        warn!(account = %mask_identity(identity), read, error = %error, "poll failed");
        PollOutcome::Failed
    }
}

/// Read the lightweight status for one account.
pub async fn poll_status(lifecycle: &AccountLifecycle, identity: &str) -> PollOutcome {
    let Some(token) = access_token(lifecycle, identity).await else {
        return PollOutcome::Skipped;
    };
    let label = mask_identity(identity);

    let outcome = match points::fetch_connection_quality(
        lifecycle.executor(),
        lifecycle.endpoints(),
        &token,
        &label,
    )
    .await
    {
        Ok(quality) => {
            info!(account = %label, connection_quality = %quality, "status");
            PollOutcome::Reported
        }
        Err(e) => handle_error(lifecycle, identity, "connection_quality", e).await,
    };
    telemetry::record_poll("status", outcome.label());
    outcome
}

/// Read the aggregate metric and the lightweight status for one account.
pub async fn poll_full(lifecycle: &AccountLifecycle, identity: &str) -> PollOutcome {
    let Some(token) = access_token(lifecycle, identity).await else {
        return PollOutcome::Skipped;
    };
    let label = mask_identity(identity);
    let executor = lifecycle.executor();
    let endpoints = lifecycle.endpoints();

    let outcome = match points::fetch_total_points(executor, endpoints, &token, &label).await {
        Err(e) => handle_error(lifecycle, identity, "total_points", e).await,
        Ok(total) => {
            match points::fetch_connection_quality(executor, endpoints, &token, &label).await {
                Ok(quality) => {
                    info!(
                        account = %label,
                        total_points = %total,
                        connection_quality = %quality,
                        "account summary"
                    );
                    PollOutcome::Reported
                }
                Err(e) => handle_error(lifecycle, identity, "connection_quality", e).await,
            }
        }
    };
    telemetry::record_poll("full", outcome.label());
    outcome
}

async fn run_cycle<'a, F, Fut>(
    lifecycle: &'a AccountLifecycle,
    pause: Duration,
    cycle: &'static str,
    poll: F,
) -> CycleSummary
where
    F: Fn(&'a AccountLifecycle, &'a str) -> Fut,
    Fut: std::future::Future<Output = PollOutcome>,
{
    let mut summary = CycleSummary::default();
    let credentials = lifecycle.credentials();
    for (index, credential) in credentials.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(pause).await;
        }
        summary.add(poll(lifecycle, &credential.identity).await);
    }
    info!(
        cycle,
        reported = summary.reported,
        skipped = summary.skipped,
        unauthorized = summary.unauthorized,
        failed = summary.failed,
        "polling cycle finished"
    );
    summary
}

/// Poll the lightweight status of every account in order.
pub async fn run_status_cycle(lifecycle: &AccountLifecycle, pause: Duration) -> CycleSummary {
    run_cycle(lifecycle, pause, "status", poll_status).await
}

/// Poll the aggregate metric and status of every account in order.
pub async fn run_full_cycle(lifecycle: &AccountLifecycle, pause: Duration) -> CycleSummary {
    run_cycle(lifecycle, pause, "full", poll_full).await
}

/// Probe every account that already holds tokens with one status read.
///
/// Returns the identities whose probe failed for any reason; they need a
/// fresh login before polling can succeed. A rejected token is also
/// cleared so the account reads as signed out until that login succeeds.
pub async fn verify_existing_tokens(lifecycle: &AccountLifecycle, pause: Duration) -> BTreeSet<String> {
    let mut stale = BTreeSet::new();
    let sessions = lifecycle.store().snapshot().await;
    let mut probed = 0usize;

    for session in sessions.iter().filter(|s| !s.needs_login()) {
        let Some(token) = session.access_token() else {
            continue;
        };
        if probed > 0 {
            tokio::time::sleep(pause).await;
        }
        probed += 1;

        let label = mask_identity(&session.identity);
        let outcome = match points::fetch_connection_quality(
            lifecycle.executor(),
            lifecycle.endpoints(),
            token,
            &label,
        )
        .await
        {
            Ok(_) => "valid",
            Err(e) => {
                warn!(account = %label, error = %e, "stored session failed verification");
                if e.root().is_unauthorized() {
                    lifecycle.handle_unauthorized(&session.identity).await;
                }
                stale.insert(session.identity.clone());
                "stale"
            }
        };
        telemetry::record_poll("verify", outcome);
    }

    info!(probed, stale = stale.len(), "verified stored sessions");
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use std::sync::Arc;

    async fn lifecycle_with(sessions: Vec<(&str, Option<&str>)>) -> (AccountLifecycle, Calls) {
        let (endpoints, calls) = start_mock_service().await;
        let credentials = sessions
            .iter()
            .map(|(identity, _)| credential(identity, GOOD_PASSWORD))
            .collect();
        let repo = Arc::new(MemoryRepo::with(
            sessions
                .iter()
                .map(|(identity, token)| session(identity, *token))
                .collect(),
        ));
        let store = store_with(repo).await;
        (
            AccountLifecycle::new(fast_executor(), endpoints, Arc::new(credentials), store),
            calls,
        )
    }

    #[tokio::test]
    async fn tokenless_account_is_skipped_without_request() {
        let (lifecycle, calls) = lifecycle_with(vec![("a@b.c", None)]).await;

        assert_eq!(poll_status(&lifecycle, "a@b.c").await, PollOutcome::Skipped);
        assert_eq!(poll_full(&lifecycle, "a@b.c").await, PollOutcome::Skipped);
        assert_eq!(calls.quality() + calls.total(), 0);
    }

    #[tokio::test]
    async fn valid_token_reports() {
        let (lifecycle, calls) = lifecycle_with(vec![("a@b.c", Some(GOOD_TOKEN))]).await;

        assert_eq!(poll_status(&lifecycle, "a@b.c").await, PollOutcome::Reported);
        assert_eq!(calls.quality(), 1);

        assert_eq!(poll_full(&lifecycle, "a@b.c").await, PollOutcome::Reported);
        assert_eq!(calls.total(), 1);
        assert_eq!(calls.quality(), 2);
    }

    #[tokio::test]
    async fn revoked_token_is_cleared_and_next_poll_skips() {
        let (lifecycle, calls) = lifecycle_with(vec![("a@b.c", Some(REVOKED_TOKEN))]).await;

        assert_eq!(
            poll_status(&lifecycle, "a@b.c").await,
            PollOutcome::Unauthorized
        );
        assert!(lifecycle.store().get("a@b.c").await.unwrap().needs_login());

        assert_eq!(poll_status(&lifecycle, "a@b.c").await, PollOutcome::Skipped);
        assert_eq!(calls.quality(), 1);
    }

    #[tokio::test]
    async fn full_poll_stops_after_unauthorized_total() {
        let (lifecycle, calls) = lifecycle_with(vec![("a@b.c", Some(REVOKED_TOKEN))]).await;

        assert_eq!(poll_full(&lifecycle, "a@b.c").await, PollOutcome::Unauthorized);
        assert_eq!(calls.total(), 1);
        assert_eq!(calls.quality(), 0);
    }

    #[tokio::test]
    async fn other_errors_are_failures_and_keep_tokens() {
        let (lifecycle, _) = lifecycle_with(vec![("a@b.c", Some("at_unknown"))]).await;

        assert_eq!(poll_status(&lifecycle, "a@b.c").await, PollOutcome::Failed);
        assert!(!lifecycle.store().get("a@b.c").await.unwrap().needs_login());
    }

    #[tokio::test]
    async fn status_cycle_counts_each_outcome() {
        let (lifecycle, calls) = lifecycle_with(vec![
            ("a@b.c", Some(GOOD_TOKEN)),
            ("d@e.f", None),
            ("g@h.i", Some(REVOKED_TOKEN)),
        ])
        .await;

        let summary = run_status_cycle(&lifecycle, Duration::from_millis(1)).await;

        assert_eq!(
            summary,
            CycleSummary {
                reported: 1,
                skipped: 1,
                unauthorized: 1,
                failed: 0,
            }
        );
        assert_eq!(calls.quality(), 2);
    }

    #[tokio::test]
    async fn full_cycle_reads_both_endpoints() {
        let (lifecycle, calls) = lifecycle_with(vec![
            ("a@b.c", Some(GOOD_TOKEN)),
            ("d@e.f", Some(GOOD_TOKEN)),
        ])
        .await;

        let summary = run_full_cycle(&lifecycle, Duration::from_millis(1)).await;

        assert_eq!(summary.reported, 2);
        assert_eq!(calls.total(), 2);
        assert_eq!(calls.quality(), 2);
    }

    #[tokio::test]
    async fn verification_flags_failed_probes_only() {
        let (lifecycle, calls) = lifecycle_with(vec![
            ("a@b.c", Some(GOOD_TOKEN)),
            ("d@e.f", None),
            ("g@h.i", Some(REVOKED_TOKEN)),
            ("j@k.l", Some("at_unknown")),
        ])
        .await;

        let stale = verify_existing_tokens(&lifecycle, Duration::from_millis(1)).await;

        assert_eq!(
            stale,
            BTreeSet::from(["g@h.i".to_string(), "j@k.l".to_string()])
        );
        assert_eq!(calls.quality(), 3);

        let store = lifecycle.store();
        assert!(store.get("g@h.i").await.unwrap().needs_login());
        assert!(!store.get("j@k.l").await.unwrap().needs_login());
        assert!(!store.get("a@b.c").await.unwrap().needs_login());
    }

    #[tokio::test]
    async fn rejected_session_stays_cleared_when_relogin_fails() {
        let (endpoints, _) = start_mock_service().await;
        let repo = Arc::new(MemoryRepo::with(vec![session("g@h.i", Some(REVOKED_TOKEN))]));
        let store = store_with(repo.clone()).await;
        let lifecycle = AccountLifecycle::new(
            fast_executor(),
            endpoints,
            Arc::new(vec![credential("g@h.i", "wrong")]),
            store,
        );

        let stale = verify_existing_tokens(&lifecycle, Duration::from_millis(1)).await;
        assert_eq!(stale, BTreeSet::from(["g@h.i".to_string()]));
        assert_eq!(repo.saves(), 1);

        lifecycle.run_login_cycle(Some(&stale)).await;

        let after = lifecycle.store().get("g@h.i").await.unwrap();
        assert!(after.needs_login());
        assert!(after.access_token().is_none());
    }
}
