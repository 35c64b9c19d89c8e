//! Login, invalidation and re-login for configured accounts
//!
//! Failures never leave one account's processing: `login` folds every error
//! into a `LoginOutcome`, and a login cycle always runs every target to
//! completion before recording the successful token pairs in one batch.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::future::join_all;
use relay::RequestExecutor;
use solix_auth::constants::Endpoints;
use solix_auth::{AccountCredential, CredentialStore, TokenPair};
use tracing::{info, instrument, warn};

use crate::telemetry;

/// Result of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success(TokenPair),
    /// The service answered 401: the configured password is wrong
    InvalidCredentials,
    Failed(String),
}

impl LoginOutcome {
    fn label(&self) -> &'static str {
        match self {
            LoginOutcome::Success(_) => "success",
            LoginOutcome::InvalidCredentials => "invalid_credentials",
            LoginOutcome::Failed(_) => "failed",
        }
    }
}

/// Counts from one login cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginCycleSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub invalid_credentials: usize,
    pub failed: usize,
    /// Successful logins whose tokens differed from the stored ones
    pub updated: usize,
}

/// Orchestrates account authentication over a shared executor and store.
pub struct AccountLifecycle {
    executor: Arc<RequestExecutor>,
    endpoints: Endpoints,
    credentials: Arc<Vec<AccountCredential>>,
    store: Arc<CredentialStore>,
}

impl AccountLifecycle {
    pub fn new(
        executor: Arc<RequestExecutor>,
        endpoints: Endpoints,
        credentials: Arc<Vec<AccountCredential>>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            executor,
            endpoints,
            credentials,
            store,
        }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn credentials(&self) -> &[AccountCredential] {
        &self.credentials
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Log in one account. Never fails: errors become `InvalidCredentials`
    /// (401) or `Failed`.
    #[instrument(skip_all, fields(account = %credential.label()))]
    pub async fn login(&self, credential: &AccountCredential) -> LoginOutcome {
        let outcome = match solix_auth::login(&self.executor, &self.endpoints, credential).await {
            Ok(tokens) => {
                info!("login succeeded");
                LoginOutcome::Success(tokens)
            }
            Err(e) if e.root().is_unauthorized() => {
                warn!("login rejected, check the account password");
                LoginOutcome::InvalidCredentials
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                LoginOutcome::Failed(e.to_string())
            }
        };
        telemetry::record_login(outcome.label());
        outcome
    }

    /// Log in `subset` (or every account) concurrently and record all
    /// successes with a single persistence.
    pub async fn run_login_cycle(&self, subset: Option<&BTreeSet<String>>) -> LoginCycleSummary {
        let targets: Vec<&AccountCredential> = self
            .credentials
            .iter()
            .filter(|c| subset.is_none_or(|s| s.contains(&c.identity)))
            .collect();

        if targets.is_empty() {
            info!("no accounts need a login");
            return LoginCycleSummary::default();
        }
        info!(accounts = targets.len(), "starting login cycle");

        let outcomes = join_all(
            targets
                .iter()
                .map(|credential| async move { (*credential, self.login(credential).await) }),
        )
        .await;

        let mut summary = LoginCycleSummary {
            attempted: outcomes.len(),
            ..Default::default()
        };
        let mut updates = Vec::new();
        for (credential, outcome) in outcomes {
            match outcome {
                LoginOutcome::Success(tokens) => {
                    summary.succeeded += 1;
                    updates.push((credential.identity.clone(), tokens));
                }
                LoginOutcome::InvalidCredentials => summary.invalid_credentials += 1,
                LoginOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary.updated = self.store.record_tokens_batch(&updates).await;

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            invalid_credentials = summary.invalid_credentials,
            failed = summary.failed,
            updated = summary.updated,
            "login cycle finished"
        );
        summary
    }

    /// Drop the identity's tokens after a 401. The next login cycle logs it
    /// back in. Returns whether tokens were present.
    pub async fn handle_unauthorized(&self, identity: &str) -> bool {
        let cleared = self.store.clear_tokens(identity).await;
        if cleared {
            warn!(
                account = %common::mask_identity(identity),
                "session rejected, tokens cleared until next login cycle"
            );
        }
        cleared
    }
}
