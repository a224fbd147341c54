use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use upwatch_backend::{CheckOutcome, UpdateInfo, UpdaterBackend};

use crate::checker::UpdateChecker;
use crate::store::SettingsStore;

/// Store key holding the JSON-encoded list of ignored version strings.
pub const IGNORED_VERSIONS_KEY: &str = "ignoredVersion";
/// Store key holding the auto-check toggle. Absent means enabled.
pub const AUTO_CHECK_KEY: &str = "automaticallyCheckForUpdates";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Runtime gate for the polling loop. When false, `start` is a
    /// guaranteed no-op; development environments run with this off.
    pub polling_enabled: bool,

    /// Delay between periodic checks.
    pub check_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            polling_enabled: true,
            check_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Public surface of the update-check coordinator.
pub trait UpdateService: Send + Sync {
    /// Subscribe to check outcomes. The stream immediately carries the
    /// outcome current at subscription time, then every later broadcast.
    fn subscribe(&self) -> OutcomeStream;

    /// Begin periodic checking. Idempotent; a no-op when polling is
    /// disabled by configuration.
    fn start(&self);

    /// Stop periodic checking, cancelling any pending wait. Idempotent.
    fn stop(&self);

    /// Fire one out-of-loop check session. With an update already staged
    /// this makes the backend install it and relaunch the application.
    /// Failures are logged and swallowed.
    fn relaunch(&self);

    fn is_ignored(&self, update: Option<&UpdateInfo>) -> bool;

    /// Append the update's version to the persisted ignore list.
    fn ignore(&self, update: Option<&UpdateInfo>);
}

/// Per-subscriber sequence of check outcomes.
pub struct OutcomeStream {
    rx: mpsc::UnboundedReceiver<CheckOutcome>,
}

impl OutcomeStream {
    /// Receive the next outcome, or `None` once the coordinator is gone.
    pub async fn recv(&mut self) -> Option<CheckOutcome> {
        self.rx.recv().await
    }
}

impl Stream for OutcomeStream {
    type Item = CheckOutcome;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<CheckOutcome>> {
        self.rx.poll_recv(cx)
    }
}

struct CoordinatorState {
    current: CheckOutcome,
    loop_active: bool,
    subscribers: Vec<mpsc::UnboundedSender<CheckOutcome>>,
    loop_handle: Option<JoinHandle<()>>,
}

struct Inner {
    backend: Arc<dyn UpdaterBackend>,
    store: Arc<dyn SettingsStore>,
    config: ServiceConfig,
    state: Mutex<CoordinatorState>,
}

/// Background update-check coordinator.
///
/// All mutable state lives behind one mutex; broadcasts happen under it,
/// so subscribers observe outcome changes in assignment order. `start`,
/// `stop`, and `relaunch` must be called from within a Tokio runtime.
pub struct BackgroundUpdateService {
    inner: Arc<Inner>,
}

impl BackgroundUpdateService {
    #[must_use]
    pub fn new(
        backend: Arc<dyn UpdaterBackend>,
        store: Arc<dyn SettingsStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                config,
                state: Mutex::new(CoordinatorState {
                    current: CheckOutcome::NoUpdate,
                    loop_active: false,
                    subscribers: Vec::new(),
                    loop_handle: None,
                }),
            }),
        }
    }

    /// Whether the polling loop is currently marked active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.lock_state().loop_active
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_outcome(&self, outcome: CheckOutcome) {
        let mut state = self.lock_state();
        state.current = outcome.clone();
        state
            .subscribers
            .retain(|tx| tx.send(outcome.clone()).is_ok());
    }

    fn ignored_versions(&self) -> Vec<String> {
        // A malformed stored list reads as empty, never as an error.
        self.store
            .get(IGNORED_VERSIONS_KEY)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            {
                let mut state = self.lock_state();
                if !state.loop_active {
                    break;
                }
                if state.current != CheckOutcome::NoUpdate {
                    // An available update is never re-checked away; only a
                    // fresh coordinator instance resumes polling.
                    info!("Update already available, stopping periodic checks");
                    state.loop_active = false;
                    break;
                }
            }

            let checker = UpdateChecker::new(Arc::clone(&self.backend));
            match checker.check_once().await {
                Ok(outcome) => {
                    info!(
                        "Update check completed: {}",
                        if outcome.is_update_available() {
                            "update available"
                        } else {
                            "no update"
                        }
                    );
                    self.set_outcome(outcome);
                }
                Err(error) => warn!("Update check failed: {error}"),
            }

            tokio::time::sleep(self.config.check_interval).await;
        }
    }
}

impl UpdateService for BackgroundUpdateService {
    fn subscribe(&self) -> OutcomeStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock_state();
        let _ = tx.send(state.current.clone());
        state.subscribers.push(tx);
        OutcomeStream { rx }
    }

    fn start(&self) {
        if !self.inner.config.polling_enabled {
            info!("Periodic update checks are disabled in this environment");
            return;
        }

        let mut state = self.inner.lock_state();
        if state.loop_active {
            return;
        }
        if let Some(handle) = state.loop_handle.take() {
            handle.abort();
        }
        state.loop_active = true;
        state.loop_handle = Some(tokio::spawn(Arc::clone(&self.inner).run_loop()));
    }

    fn stop(&self) {
        let mut state = self.inner.lock_state();
        state.loop_active = false;
        if let Some(handle) = state.loop_handle.take() {
            handle.abort();
        }
    }

    fn relaunch(&self) {
        let backend = Arc::clone(&self.inner.backend);
        tokio::spawn(async move {
            let checker = UpdateChecker::new(backend);
            if let Err(error) = checker.check_once().await {
                warn!("Relaunch check failed: {error}");
            }
        });
    }

    fn is_ignored(&self, update: Option<&UpdateInfo>) -> bool {
        let Some(update) = update else {
            return false;
        };
        self.inner.ignored_versions().contains(&update.version)
    }

    fn ignore(&self, update: Option<&UpdateInfo>) {
        let Some(update) = update else {
            error!("No version provided to ignore update");
            return;
        };

        let mut versions = self.inner.ignored_versions();
        versions.push(update.version.clone());
        match serde_json::to_string(&versions) {
            Ok(json) => {
                self.inner.store.set(IGNORED_VERSIONS_KEY, &json);
                info!("Ignored update version: {}", update.version);
            }
            Err(error) => error!("Failed to encode ignored versions: {error}"),
        }
    }
}
