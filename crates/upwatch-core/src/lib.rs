//! Background update-check coordination.
//!
//! This crate turns a callback-driven updater backend into a small,
//! observable service:
//! - Bridging one backend session into a single awaitable check.
//! - A polling loop that broadcasts check outcomes to subscribers.
//! - Persistence for the ignored-version list and the auto-check toggle.
//! - A bridge that follows the persisted auto-check preference.

mod bridge;
mod checker;
pub mod logging;
mod service;
mod store;

#[cfg(test)]
pub(crate) mod testing;

/// Persisted-preference bridge and the auto-check default rule.
pub use bridge::{SettingsBridge, auto_check_enabled};
/// Single-session backend adapter and its error taxonomy.
pub use checker::{CheckError, UpdateChecker};
/// The coordinator service, its configuration, and subscription stream.
pub use service::{
    AUTO_CHECK_KEY, BackgroundUpdateService, IGNORED_VERSIONS_KEY, OutcomeStream, ServiceConfig,
    UpdateService,
};
/// String-keyed settings persistence.
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
