//! In-memory session collection kept consistent with durable storage
//!
//! One `SessionState` per configured identity. Every mutation persists the
//! whole collection while still holding the lock, so writes land in the
//! order the mutations happened. Persistence failures are logged and
//! swallowed: the in-memory state stays authoritative for this process.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use common::mask_identity;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credentials::AccountCredential;
use crate::session::{SessionDocument, SessionRepository, SessionState, TokenPair};

/// Outcome of reconciling sessions with the credential set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Identities whose tokens are absent or empty
    pub needs_login: BTreeSet<String>,
    /// Placeholders created for new identities
    pub added: usize,
    /// Sessions pruned for identities no longer configured
    pub removed: usize,
}

/// Session tokens for every configured account.
pub struct CredentialStore {
    repository: Arc<dyn SessionRepository>,
    state: Mutex<Vec<SessionState>>,
}

impl CredentialStore {
    /// Load persisted sessions. A store that cannot be read starts empty.
    pub async fn open(repository: Arc<dyn SessionRepository>) -> Self {
        let sessions = match repository.load().await {
            Ok(document) => document.accounts,
            Err(e) => {
                warn!(error = %e, "failed to load sessions, starting empty");
                Vec::new()
            }
        };
        Self {
            repository,
            state: Mutex::new(sessions),
        }
    }

    /// Reconcile with the configured credentials: placeholders for new
    /// identities, pruning for unknown ones. Always persists.
    pub async fn sync_with_credentials(&self, credentials: &[AccountCredential]) -> SyncReport {
        let mut state = self.state.lock().await;
        let configured: HashSet<&str> = credentials.iter().map(|c| c.identity.as_str()).collect();

        let mut report = SyncReport::default();
        let mut previous = std::mem::take(&mut *state);

        for identity in previous.iter().map(|s| s.identity.as_str()) {
            if !configured.contains(identity) {
                debug!(account = %mask_identity(identity), "pruning session for removed account");
                report.removed += 1;
            }
        }

        let mut synced = Vec::with_capacity(credentials.len());
        for credential in credentials {
            let session = match previous
                .iter()
                .position(|s| s.identity == credential.identity)
            {
                Some(index) => previous.swap_remove(index),
                None => {
                    report.added += 1;
                    SessionState::placeholder(&credential.identity)
                }
            };
            if session.needs_login() {
                report.needs_login.insert(session.identity.clone());
            }
            synced.push(session);
        }
        *state = synced;

        info!(
            accounts = state.len(),
            added = report.added,
            removed = report.removed,
            needs_login = report.needs_login.len(),
            "synced sessions with account list"
        );
        self.persist(&state).await;
        report
    }

    /// Store tokens for `identity`, inserting it if unknown. Persists only
    /// when the stored tokens actually change. Returns whether they did.
    pub async fn record_tokens(&self, identity: &str, tokens: &TokenPair) -> bool {
        let mut state = self.state.lock().await;
        let changed = upsert(&mut state, identity, tokens);
        if changed {
            debug!(account = %mask_identity(identity), "recorded tokens");
            self.persist(&state).await;
        }
        changed
    }

    /// Store tokens for many identities, persisting at most once. Returns
    /// how many sessions changed.
    pub async fn record_tokens_batch(&self, updates: &[(String, TokenPair)]) -> usize {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for (identity, tokens) in updates {
            if upsert(&mut state, identity, tokens) {
                changed += 1;
            }
        }
        if changed > 0 {
            debug!(changed, "recorded token batch");
            self.persist(&state).await;
        }
        changed
    }

    /// Drop both tokens for `identity`. Persists only if a token was
    /// present. Returns whether anything changed.
    pub async fn clear_tokens(&self, identity: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(session) = state.iter_mut().find(|s| s.identity == identity) else {
            return false;
        };
        if session.access_token.is_none() && session.refresh_token.is_none() {
            return false;
        }
        session.access_token = None;
        session.refresh_token = None;
        debug!(account = %mask_identity(identity), "cleared tokens");
        self.persist(&state).await;
        true
    }

    pub async fn get(&self, identity: &str) -> Option<SessionState> {
        let state = self.state.lock().await;
        state.iter().find(|s| s.identity == identity).cloned()
    }

    /// Clone of every session, in credential order.
    pub async fn snapshot(&self) -> Vec<SessionState> {
        self.state.lock().await.clone()
    }

    /// Identities that currently need a login.
    pub async fn needs_login(&self) -> BTreeSet<String> {
        let state = self.state.lock().await;
        state
            .iter()
            .filter(|s| s.needs_login())
            .map(|s| s.identity.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    async fn persist(&self, sessions: &[SessionState]) {
        let document = SessionDocument {
            accounts: sessions.to_vec(),
        };
        if let Err(e) = self.repository.save(&document).await {
            warn!(error = %e, "failed to persist sessions");
        }
    }
}

fn upsert(state: &mut Vec<SessionState>, identity: &str, tokens: &TokenPair) -> bool {
    let session = match state.iter().position(|s| s.identity == identity) {
        Some(index) => &mut state[index],
        None => {
            state.push(SessionState::placeholder(identity));
            let last = state.len() - 1;
            &mut state[last]
        }
    };
    if session.holds(tokens) {
        return false;
    }
    session.access_token = Some(tokens.access_token.clone());
    session.refresh_token = Some(tokens.refresh_token.clone());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::session::YamlSessionFile;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory repository counting saves.
    #[derive(Default)]
    struct CountingRepo {
        initial: SessionDocument,
        saved: std::sync::Mutex<Option<SessionDocument>>,
        saves: AtomicUsize,
        fail_saves: bool,
    }

    impl CountingRepo {
        fn with(accounts: Vec<SessionState>) -> Self {
            Self {
                initial: SessionDocument { accounts },
                ..Default::default()
            }
        }

        fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        fn last_saved(&self) -> Option<SessionDocument> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl SessionRepository for CountingRepo {
        fn load(&self) -> Pin<Box<dyn Future<Output = Result<SessionDocument>> + Send + '_>> {
            Box::pin(async move { Ok(self.initial.clone()) })
        }

        fn save<'a>(
            &'a self,
            document: &'a SessionDocument,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.saves.fetch_add(1, Ordering::SeqCst);
                if self.fail_saves {
                    return Err(Error::Io("disk full".into()));
                }
                *self.saved.lock().unwrap() = Some(document.clone());
                Ok(())
            })
        }
    }

    fn tokens(suffix: &str) -> TokenPair {
        TokenPair {
            access_token: format!("at_{suffix}"),
            refresh_token: format!("rt_{suffix}"),
        }
    }

    fn session(identity: &str, suffix: &str) -> SessionState {
        SessionState {
            identity: identity.into(),
            access_token: Some(format!("at_{suffix}")),
            refresh_token: Some(format!("rt_{suffix}")),
        }
    }

    fn creds(identities: &[&str]) -> Vec<AccountCredential> {
        identities
            .iter()
            .map(|i| AccountCredential::new(*i, "pw"))
            .collect()
    }

    #[tokio::test]
    async fn sync_adds_new_and_prunes_unknown() {
        let repo = Arc::new(CountingRepo::with(vec![
            session("b", "1"),
            session("d", "1"),
        ]));
        let store = CredentialStore::open(repo.clone()).await;

        let report = store.sync_with_credentials(&creds(&["a", "b", "c"])).await;

        assert!(report.needs_login.contains("a"));
        assert!(report.needs_login.contains("c"));
        assert!(!report.needs_login.contains("b"));
        assert_eq!(report.added, 2);
        assert_eq!(report.removed, 1);

        let keys: Vec<String> = store
            .snapshot()
            .await
            .into_iter()
            .map(|s| s.identity)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(store.get("b").await, Some(session("b", "1")));
        assert!(store.get("d").await.is_none());

        assert_eq!(repo.saves(), 1);
        assert_eq!(repo.last_saved().unwrap().accounts.len(), 3);
    }

    #[tokio::test]
    async fn sync_flags_empty_tokens() {
        let mut half = session("a", "1");
        half.refresh_token = Some(String::new());
        let repo = Arc::new(CountingRepo::with(vec![half]));
        let store = CredentialStore::open(repo).await;

        let report = store.sync_with_credentials(&creds(&["a"])).await;
        assert_eq!(report.needs_login, BTreeSet::from(["a".to_string()]));
    }

    #[tokio::test]
    async fn record_tokens_persists_only_on_change() {
        let repo = Arc::new(CountingRepo::default());
        let store = CredentialStore::open(repo.clone()).await;

        assert!(store.record_tokens("a", &tokens("1")).await);
        assert_eq!(repo.saves(), 1);

        assert!(!store.record_tokens("a", &tokens("1")).await);
        assert_eq!(repo.saves(), 1);

        assert!(store.record_tokens("a", &tokens("2")).await);
        assert_eq!(repo.saves(), 2);
        assert!(!store.get("a").await.unwrap().needs_login());
    }

    #[tokio::test]
    async fn batch_persists_once() {
        let repo = Arc::new(CountingRepo::with(vec![session("b", "1")]));
        let store = CredentialStore::open(repo.clone()).await;

        let changed = store
            .record_tokens_batch(&[
                ("a".to_string(), tokens("1")),
                ("b".to_string(), tokens("1")),
                ("c".to_string(), tokens("1")),
            ])
            .await;

        assert_eq!(changed, 2);
        assert_eq!(repo.saves(), 1);

        assert_eq!(store.record_tokens_batch(&[("a".to_string(), tokens("1"))]).await, 0);
        assert_eq!(repo.saves(), 1);
    }

    #[tokio::test]
    async fn clear_twice_on_tokenless_identity_does_not_persist() {
        let repo = Arc::new(CountingRepo::default());
        let store = CredentialStore::open(repo.clone()).await;
        store.sync_with_credentials(&creds(&["a"])).await;
        let baseline = repo.saves();

        assert!(!store.clear_tokens("a").await);
        assert!(!store.clear_tokens("a").await);
        assert_eq!(repo.saves(), baseline);
    }

    #[tokio::test]
    async fn clear_removes_tokens_and_persists_once() {
        let repo = Arc::new(CountingRepo::with(vec![session("a", "1")]));
        let store = CredentialStore::open(repo.clone()).await;

        assert!(store.clear_tokens("a").await);
        assert!(!store.clear_tokens("a").await);
        assert_eq!(repo.saves(), 1);
        assert!(store.needs_login().await.contains("a"));
    }

    #[tokio::test]
    async fn persistence_failure_is_swallowed() {
        let repo = Arc::new(CountingRepo {
            fail_saves: true,
            ..Default::default()
        });
        let store = CredentialStore::open(repo.clone()).await;

        assert!(store.record_tokens("a", &tokens("1")).await);
        assert_eq!(repo.saves(), 1);
        assert_eq!(store.get("a").await, Some(session("a", "1")));
    }

    #[tokio::test]
    async fn file_backed_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.yaml");

        let store = CredentialStore::open(Arc::new(YamlSessionFile::new(&path))).await;
        store.sync_with_credentials(&creds(&["a@b.c"])).await;
        store.record_tokens("a@b.c", &tokens("x")).await;

        let reopened = CredentialStore::open(Arc::new(YamlSessionFile::new(&path))).await;
        assert_eq!(reopened.get("a@b.c").await, Some(session("a@b.c", "x")));
    }
}
