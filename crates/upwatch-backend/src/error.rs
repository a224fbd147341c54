use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("No update available")]
    NoUpdate,

    #[error("An update session is already in progress")]
    SessionInProgress,

    #[error("Feed error during {stage}: {details}")]
    Feed {
        stage: &'static str,
        details: String,
    },

    #[error("Installation failed during {phase}: {details}")]
    InstallFailed {
        phase: &'static str,
        details: String,
    },

    #[error("Backend-specific error in {context}: {details}")]
    BackendSpecific {
        context: &'static str,
        details: String,
    },
}

impl BackendError {
    pub fn feed(stage: &'static str, details: impl Into<String>) -> Self {
        Self::Feed {
            stage,
            details: details.into(),
        }
    }

    pub fn install_failed(phase: &'static str, details: impl Into<String>) -> Self {
        Self::InstallFailed {
            phase,
            details: details.into(),
        }
    }

    pub fn backend_specific(context: &'static str, details: impl Into<String>) -> Self {
        Self::BackendSpecific {
            context,
            details: details.into(),
        }
    }

    /// Whether this is the benign "checked, nothing newer" condition rather
    /// than a genuine failure.
    #[must_use]
    pub fn is_no_update(&self) -> bool {
        matches!(self, Self::NoUpdate)
    }
}
