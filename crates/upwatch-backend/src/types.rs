/// Metadata for an update the backend has found and staged.
///
/// Created once per detected update and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct UpdateInfo {
    pub version: String,
    pub download_url: Option<String>,
    pub release_notes_url: Option<String>,
}

/// Result of a single update check.
#[derive(Debug, Clone, Default)]
pub enum CheckOutcome {
    #[default]
    NoUpdate,
    UpdateAvailable(Option<UpdateInfo>),
}

impl PartialEq for CheckOutcome {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NoUpdate, Self::NoUpdate) => true,
            (Self::UpdateAvailable(lhs), Self::UpdateAvailable(rhs)) => {
                // Outcomes are deduplicated by version string only; two
                // metadata-less outcomes compare equal.
                lhs.as_ref().map(|info| &info.version) == rhs.as_ref().map(|info| &info.version)
            }
            _ => false,
        }
    }
}

impl Eq for CheckOutcome {}

impl CheckOutcome {
    #[must_use]
    pub fn is_update_available(&self) -> bool {
        matches!(self, Self::UpdateAvailable(_))
    }
}
