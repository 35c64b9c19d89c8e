//! Solix lite-mode account runner
//!
//! Single binary that:
//! 1. Loads accounts, stored sessions and the proxy list
//! 2. Verifies stored sessions and logs in every account that needs it
//! 3. Runs one full-data pass over all accounts
//! 4. Keeps the login, status and full-data schedules running until
//!    SIGINT/SIGTERM

mod config;
mod error;
mod menu;
mod metrics;
mod status;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use relay::{ProxyRotator, RequestExecutor};
use solix_auth::{CredentialStore, YamlSessionFile};
use solix_pool::{AccountLifecycle, run_full_cycle, spawn_schedulers, verify_existing_tokens};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::menu::MenuChoice;
use crate::status::StatusState;

/// Initialize tracing with LOG_LEVEL / RUST_LOG support. JSON output when
/// LOG_FORMAT=json, human-readable otherwise since the binary is interactive.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    // CLI: --config <path>, --run skips the menu
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let skip_menu = args.iter().any(|a| a == "--run");

    let choice = if skip_menu {
        MenuChoice::Run
    } else {
        menu::prompt().await?
    };
    if choice == MenuChoice::Exit {
        info!("exit selected");
        return Ok(());
    }

    let config_path = Config::resolve_path(cli_config_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        base_url = %config.api.base_url,
        accounts_file = %config.files.accounts.display(),
        sessions_file = %config.files.sessions.display(),
        "configuration loaded"
    );

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder().context("failed to install metrics recorder")?;

    let proxies = config::load_proxies(&config.files.proxies)
        .await
        .with_context(|| format!("failed to read {}", config.files.proxies.display()))?;
    if proxies.is_empty() {
        warn!("no proxies configured, all requests go direct");
    }
    let proxy_count = proxies.len();

    let credentials = solix_auth::load_credentials(&config.files.accounts)
        .await
        .with_context(|| format!("failed to read {}", config.files.accounts.display()))?;
    if credentials.is_empty() {
        return Err(error::Error::NoAccounts(config.files.accounts.display().to_string()).into());
    }
    let credentials = Arc::new(credentials);

    let repository = Arc::new(YamlSessionFile::new(&config.files.sessions));
    let store = Arc::new(CredentialStore::open(repository).await);
    let report = store.sync_with_credentials(&credentials).await;

    let executor = RequestExecutor::new(ProxyRotator::new(proxies), config.retry_policy())
        .context("failed to build HTTP client")?;
    let lifecycle = Arc::new(AccountLifecycle::new(
        Arc::new(executor),
        config.endpoints(),
        credentials,
        store.clone(),
    ));

    let status_task = match config.status.listen_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind status listener to {addr}"))?;
            let router = status::build_router(StatusState {
                store: store.clone(),
                proxies: proxy_count,
                started_at: Instant::now(),
                prometheus,
            });
            Some(tokio::spawn(status::serve(listener, router)))
        }
        None => None,
    };

    let schedule = config.schedule();
    let startup = async {
        let mut needs_login = report.needs_login;
        needs_login.extend(verify_existing_tokens(&lifecycle, schedule.status_pause).await);
        lifecycle.run_login_cycle(Some(&needs_login)).await;
        run_full_cycle(&lifecycle, schedule.full_pause).await;
    };

    tokio::select! {
        _ = startup => {}
        _ = shutdown_signal() => {
            if let Some(task) = &status_task {
                task.abort();
            }
            info!("shutdown during startup");
            return Ok(());
        }
    }

    let schedulers = spawn_schedulers(lifecycle, schedule);
    info!(accounts = store.len().await, proxies = proxy_count, "running");

    shutdown_signal().await;

    schedulers.abort_all();
    if let Some(task) = status_task {
        task.abort();
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
