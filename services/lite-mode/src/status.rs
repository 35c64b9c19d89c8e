//! Optional health and metrics listener
//!
//! Serves `GET /health` (account and proxy summary as JSON) and
//! `GET /metrics` (Prometheus text) when `[status] listen_addr` is set.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use solix_auth::CredentialStore;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared state for the status handlers
#[derive(Clone)]
pub struct StatusState {
    pub store: Arc<CredentialStore>,
    pub proxies: usize,
    pub started_at: Instant,
    pub prometheus: PrometheusHandle,
}

pub fn build_router(state: StatusState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Serve until the task is aborted.
pub async fn serve(listener: TcpListener, router: Router) {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "status listener ready");
    }
    if let Err(e) = axum::serve(listener, router).await {
        error!(error = %e, "status listener stopped");
    }
}

/// 200 while at least one account holds a session, 503 otherwise.
async fn health_handler(State(state): State<StatusState>) -> impl IntoResponse {
    let accounts = state.store.len().await;
    let needs_login = state.store.needs_login().await.len();
    let authenticated = accounts.saturating_sub(needs_login);

    let (status_code, status) = if authenticated > 0 {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = serde_json::json!({
        "status": status,
        "accounts": accounts,
        "authenticated": authenticated,
        "needs_login": needs_login,
        "proxies": state.proxies,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });

    (
        status_code,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

async fn metrics_handler(State(state): State<StatusState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus.render(),
    )
}
