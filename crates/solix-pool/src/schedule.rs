//! The three periodic schedules
//!
//! Login, status and full-data cycles each run on their own spawned task
//! with their own interval. A slow full-data cycle may overlap status
//! cycles; runs of the same cycle never overlap (missed ticks are skipped).
//! Each schedule's first run happens one period after spawning, since the
//! startup sequence has just done the same work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::lifecycle::AccountLifecycle;
use crate::poll::{run_full_cycle, run_status_cycle};

/// Intervals and inter-account pauses for the schedules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub login_interval: Duration,
    pub status_interval: Duration,
    pub full_interval: Duration,
    pub status_pause: Duration,
    pub full_pause: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            login_interval: Duration::from_secs(3590),
            status_interval: Duration::from_secs(15),
            full_interval: Duration::from_secs(600),
            status_pause: Duration::from_millis(150),
            full_pause: Duration::from_millis(200),
        }
    }
}

/// Handles to the running schedule tasks.
pub struct Schedulers {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Schedulers {
    /// Stop every schedule. In-flight cycles are cancelled at their next
    /// await point.
    pub fn abort_all(self) {
        for (name, handle) in self.handles {
            handle.abort();
            debug!(task = name, "schedule aborted");
        }
    }
}

/// Spawn a task running `job` every `period`, starting one period from now.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut job: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            debug!(task = name, "schedule tick");
            job().await;
        }
    })
}

/// Spawn the login, status and full-data schedules.
pub fn spawn_schedulers(lifecycle: Arc<AccountLifecycle>, config: ScheduleConfig) -> Schedulers {
    let login = {
        let lifecycle = lifecycle.clone();
        spawn_periodic("login", config.login_interval, move || {
            let lifecycle = lifecycle.clone();
            async move {
                lifecycle.run_login_cycle(None).await;
            }
        })
    };

    let status = {
        let lifecycle = lifecycle.clone();
        let pause = config.status_pause;
        spawn_periodic("status", config.status_interval, move || {
            let lifecycle = lifecycle.clone();
            async move {
                run_status_cycle(&lifecycle, pause).await;
            }
        })
    };

    let full = {
        let pause = config.full_pause;
        spawn_periodic("full", config.full_interval, move || {
            let lifecycle = lifecycle.clone();
            async move {
                run_full_cycle(&lifecycle, pause).await;
            }
        })
    };

    info!(
        login_secs = config.login_interval.as_secs(),
        status_secs = config.status_interval.as_secs(),
        full_secs = config.full_interval.as_secs(),
        "schedules started"
    );

    Schedulers {
        handles: vec![("login", login), ("status", status), ("full", full)],
    }
}
