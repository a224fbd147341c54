mod error;
mod traits;
mod types;

pub use error::BackendError;
pub use traits::{PermissionResponse, UpdateChoice, UpdateDriver, UpdaterBackend};
pub use types::{CheckOutcome, UpdateInfo};
