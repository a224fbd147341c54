use std::sync::Arc;

use log::debug;
use tokio::task::JoinHandle;

use crate::service::{AUTO_CHECK_KEY, UpdateService};
use crate::store::SettingsStore;

/// Whether automatic update checks are enabled in the store. Defaults to
/// true when the key has never been written or holds garbage.
#[must_use]
pub fn auto_check_enabled(store: &dyn SettingsStore) -> bool {
    store
        .get(AUTO_CHECK_KEY)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(true)
}

/// Keeps the coordinator's running state in sync with the persisted
/// auto-check preference.
///
/// The preference is applied once at construction, so the coordinator
/// matches the stored value at boot, and re-applied on every store change
/// notification. Dropping the bridge stops following changes.
pub struct SettingsBridge {
    watcher: JoinHandle<()>,
}

impl SettingsBridge {
    pub fn new(store: Arc<dyn SettingsStore>, service: Arc<dyn UpdateService>) -> Self {
        apply(store.as_ref(), service.as_ref());

        let mut changes = store.watch();
        let watcher = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                apply(store.as_ref(), service.as_ref());
            }
        });

        Self { watcher }
    }
}

impl Drop for SettingsBridge {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

fn apply(store: &dyn SettingsStore, service: &dyn UpdateService) {
    if auto_check_enabled(store) {
        debug!("Automatic update checks enabled");
        service.start();
    } else {
        debug!("Automatic update checks disabled");
        service.stop();
    }
}
