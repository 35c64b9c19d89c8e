//! Mock Solix service and in-memory session repository for tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use relay::{ProxyRotator, RequestExecutor, RetryPolicy};
use serde_json::{Value, json};
use solix_auth::constants::Endpoints;
use solix_auth::{
    AccountCredential, CredentialStore, SessionDocument, SessionRepository, SessionState,
};
use tokio::net::TcpListener;

pub const GOOD_PASSWORD: &str = "right";
pub const UNAVAILABLE_PASSWORD: &str = "unavailable";
pub const GOOD_TOKEN: &str = "at_good";
pub const REVOKED_TOKEN: &str = "at_revoked";

/// Per-route call counters of the mock service.
#[derive(Clone, Default)]
pub struct Calls {
    pub login: Arc<AtomicUsize>,
    pub quality: Arc<AtomicUsize>,
    pub total: Arc<AtomicUsize>,
}

impl Calls {
    pub fn login(&self) -> usize {
        self.login.load(Ordering::SeqCst)
    }

    pub fn quality(&self) -> usize {
        self.quality.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

fn bearer(headers: &HeaderMap) -> &str {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("")
}

fn authorized(token: &str) -> Result<(), (StatusCode, Json<Value>)> {
    match token {
        GOOD_TOKEN => Ok(()),
        REVOKED_TOKEN => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Unauthorized" })),
        )),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "unknown token" })),
        )),
    }
}

/// Start the mock service. Logins with `GOOD_PASSWORD` get
/// `GOOD_TOKEN`, `UNAVAILABLE_PASSWORD` always gets 503 and other
/// passwords get 401. Reads accept `GOOD_TOKEN` and
/// answer 401 for `REVOKED_TOKEN`.
pub async fn start_mock_service() -> (Endpoints, Calls) {
    let calls = Calls::default();
    let app = axum::Router::new()
        .route(
            "/api/auth/login-password",
            post(|State(calls): State<Calls>, Json(body): Json<Value>| async move {
                calls.login.fetch_add(1, Ordering::SeqCst);
                if body["password"] == UNAVAILABLE_PASSWORD {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "message": "maintenance" })),
                    )
                } else if body["password"] == GOOD_PASSWORD {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "result": "success",
                            "data": { "accessToken": GOOD_TOKEN, "refreshToken": "rt_good" }
                        })),
                    )
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "result": "fail", "message": "Invalid credentials" })),
                    )
                }
            }),
        )
        .route(
            "/api/point/get-connection-quality",
            get(|State(calls): State<Calls>, headers: HeaderMap| async move {
                calls.quality.fetch_add(1, Ordering::SeqCst);
                authorized(bearer(&headers))?;
                Ok::<_, (StatusCode, Json<Value>)>(Json(json!({ "data": 92 })))
            }),
        )
        .route(
            "/api/point/get-total-point",
            get(|State(calls): State<Calls>, headers: HeaderMap| async move {
                calls.total.fetch_add(1, Ordering::SeqCst);
                authorized(bearer(&headers))?;
                Ok::<_, (StatusCode, Json<Value>)>(Json(json!({ "data": { "total": 1500 } })))
            }),
        )
        .with_state(calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Endpoints::new(format!("http://{addr}")), calls)
}

pub fn fast_executor() -> Arc<RequestExecutor> {
    let policy = RetryPolicy {
        max_attempts: 2,
        retry_delay: Duration::from_millis(5),
        proxy_retry_delay: Duration::from_millis(1),
        request_timeout: Duration::from_secs(5),
        ..RetryPolicy::default()
    };
    Arc::new(RequestExecutor::new(ProxyRotator::direct(), policy).unwrap())
}

/// In-memory session repository counting saves.
#[derive(Default)]
pub struct MemoryRepo {
    initial: SessionDocument,
    saves: AtomicUsize,
}

impl MemoryRepo {
    pub fn with(accounts: Vec<SessionState>) -> Self {
        Self {
            initial: SessionDocument { accounts },
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SessionRepository for MemoryRepo {
    fn load(
        &self,
    ) -> Pin<Box<dyn Future<Output = solix_auth::Result<SessionDocument>> + Send + '_>> {
        Box::pin(async move { Ok(self.initial.clone()) })
    }

    fn save<'a>(
        &'a self,
        _document: &'a SessionDocument,
    ) -> Pin<Box<dyn Future<Output = solix_auth::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

pub fn session(identity: &str, access: Option<&str>) -> SessionState {
    SessionState {
        identity: identity.into(),
        access_token: access.map(str::to_string),
        refresh_token: access.map(|_| "rt".to_string()),
    }
}

pub fn credential(identity: &str, password: &str) -> AccountCredential {
    AccountCredential::new(identity, password)
}

pub async fn store_with(repo: Arc<MemoryRepo>) -> Arc<CredentialStore> {
    Arc::new(CredentialStore::open(repo).await)
}
