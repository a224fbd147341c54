use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::oneshot;

use upwatch_backend::{
    BackendError, CheckOutcome, PermissionResponse, UpdateChoice, UpdateDriver, UpdateInfo,
    UpdaterBackend,
};

const STABLE_CHANNEL: &str = "stable";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("An update check is already in progress")]
    AlreadyInProgress,

    #[error("The backend session ended without reporting a result")]
    SessionDropped,
}

/// Runs one backend check session and resolves its many callbacks into a
/// single outcome.
pub struct UpdateChecker {
    backend: Arc<dyn UpdaterBackend>,
    in_flight: AtomicBool,
}

impl UpdateChecker {
    #[must_use]
    pub fn new(backend: Arc<dyn UpdaterBackend>) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Run a single update check to completion.
    ///
    /// Backend-reported failures resolve as [`CheckOutcome::NoUpdate`] with
    /// a logged warning; only overlapping calls surface an error.
    ///
    /// # Errors
    /// Fails with [`CheckError::AlreadyInProgress`] when a check is already
    /// pending on this checker or the backend reports a live session, and
    /// with [`CheckError::SessionDropped`] when the backend drops the
    /// session without a terminal callback.
    pub async fn check_once(&self) -> Result<CheckOutcome, CheckError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(CheckError::AlreadyInProgress);
        }
        let _guard = InFlightGuard {
            flag: &self.in_flight,
        };

        if self.backend.session_in_progress() {
            return Err(CheckError::AlreadyInProgress);
        }

        let (tx, rx) = oneshot::channel();
        let driver = Arc::new(BackgroundDriver {
            slot: Mutex::new(Some(tx)),
            found: Mutex::new(None),
        });

        // The backend throttles on its cached last-check timestamp; drop it
        // so this session is never silently skipped.
        self.backend.clear_last_check_time();
        if let Err(error) = self.backend.start(driver) {
            debug!("Backend start reported: {error}");
        }
        self.backend.reset_cycle();
        self.backend.check_for_updates();

        rx.await.map_err(|_| CheckError::SessionDropped)
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Driver that answers every backend prompt silently so a session never
/// blocks on user interaction.
struct BackgroundDriver {
    slot: Mutex<Option<oneshot::Sender<CheckOutcome>>>,
    found: Mutex<Option<UpdateInfo>>,
}

impl BackgroundDriver {
    fn complete(&self, outcome: CheckOutcome) {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    debug!("Check result arrived after the caller stopped waiting");
                }
            }
            None => warn!("Terminal backend callback arrived with no pending check"),
        }
    }
}

impl UpdateDriver for BackgroundDriver {
    fn permission_request(&self) -> PermissionResponse {
        info!("Answering update permission request");
        // send_system_profile stays false for user privacy
        PermissionResponse {
            automatic_checks: true,
            automatic_downloads: true,
            send_system_profile: false,
        }
    }

    fn allowed_channels(&self) -> Vec<String> {
        vec![STABLE_CHANNEL.to_string()]
    }

    fn should_check(&self) -> bool {
        true
    }

    fn update_found(&self, info: UpdateInfo) -> UpdateChoice {
        info!("Update found: {}", info.version);
        *self.found.lock().unwrap_or_else(PoisonError::into_inner) = Some(info);
        UpdateChoice::Install
    }

    fn ready_to_install(&self) -> UpdateChoice {
        info!("Update staged and ready to install");
        let found = self
            .found
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.complete(CheckOutcome::UpdateAvailable(found));
        UpdateChoice::Dismiss
    }

    fn download_initiated(&self) {
        debug!("Download initiated");
    }

    fn download_progress(&self, received: u64, total: u64) {
        debug!("Download progress: {received}/{total} bytes");
    }

    fn extraction_progress(&self, fraction: f64) {
        debug!("Extraction progress: {:.0}%", fraction * 100.0);
    }

    fn no_update_found(&self, error: &BackendError) {
        if error.is_no_update() {
            info!("No update available");
        } else {
            warn!("Update check did not find an update: {error}");
        }
        self.complete(CheckOutcome::NoUpdate);
    }

    fn aborted(&self, error: &BackendError) {
        warn!("Update session aborted: {error}");
        self.complete(CheckOutcome::NoUpdate);
    }
}
