use std::sync::Arc;

use crate::error::BackendError;
use crate::types::UpdateInfo;

/// Answer to the backend's one-time permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionResponse {
    pub automatic_checks: bool,
    pub automatic_downloads: bool,
    pub send_system_profile: bool,
}

/// Reply to a backend decision point during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateChoice {
    Install,
    Dismiss,
    Skip,
}

/// Callback sink a backend session reports into.
///
/// Query callbacks must be answered synchronously; the backend blocks its
/// session on them. Exactly one terminal callback (`no_update_found` or
/// `aborted`) or a `ready_to_install` reply ends a session.
pub trait UpdateDriver: Send + Sync {
    fn permission_request(&self) -> PermissionResponse;

    /// Release channels the host is willing to receive updates from.
    fn allowed_channels(&self) -> Vec<String>;

    /// Whether the backend may begin a check right now.
    fn should_check(&self) -> bool;

    /// An update was found in the feed. The reply decides whether the
    /// backend proceeds to download and stage it.
    fn update_found(&self, info: UpdateInfo) -> UpdateChoice;

    /// The update is downloaded, verified, and staged for installation.
    fn ready_to_install(&self) -> UpdateChoice;

    fn download_initiated(&self) {}

    fn download_progress(&self, _received: u64, _total: u64) {}

    fn extraction_progress(&self, _fraction: f64) {}

    /// Terminal: the session ended without an update. The error is either
    /// the benign no-update condition or a genuine failure.
    fn no_update_found(&self, error: &BackendError);

    /// Terminal: the session aborted before reaching a result.
    fn aborted(&self, error: &BackendError);
}

/// The opaque updater engine. Feed retrieval, download, verification, and
/// installation all live behind this boundary.
pub trait UpdaterBackend: Send + Sync {
    /// Attach a driver and prepare the backend for sessions.
    ///
    /// # Errors
    /// Returns an error when the backend cannot initialize, for example
    /// when its feed configuration is missing.
    fn start(&self, driver: Arc<dyn UpdateDriver>) -> Result<(), BackendError>;

    /// Reset any scheduling state left over from a previous session.
    fn reset_cycle(&self);

    /// Fire one check session. The result arrives through the driver.
    fn check_for_updates(&self);

    fn session_in_progress(&self) -> bool;

    /// Drop the backend's cached last-check timestamp so the next session
    /// is not skipped by backend-side throttling.
    fn clear_last_check_time(&self);
}
