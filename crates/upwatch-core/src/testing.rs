//! Scriptable updater backend for exercising the checker and the service.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use upwatch_backend::{
    BackendError, PermissionResponse, UpdateChoice, UpdateDriver, UpdateInfo, UpdaterBackend,
};

pub fn sample_info(version: &str) -> UpdateInfo {
    UpdateInfo {
        version: version.to_string(),
        download_url: Some(format!("https://example.com/app-{version}.zip")),
        release_notes_url: Some(format!("https://example.com/notes/{version}")),
    }
}

/// What a scripted session reports through its driver.
#[derive(Clone)]
pub enum Script {
    UpdateFound(UpdateInfo),
    NoUpdate,
    FeedFailure(BackendError),
    Aborted(BackendError),
    /// Ends the session without any terminal callback.
    Silent,
}

struct MockState {
    script: Script,
    delay: Duration,
    driver: Mutex<Option<Arc<dyn UpdateDriver>>>,
    in_session: AtomicBool,
    checks: AtomicUsize,
    clears: AtomicUsize,
    permission_responses: Mutex<Vec<PermissionResponse>>,
    channel_answers: Mutex<Vec<Vec<String>>>,
    install_choices: Mutex<Vec<UpdateChoice>>,
}

pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new(script: Script) -> Self {
        Self {
            state: Arc::new(MockState {
                script,
                delay: Duration::ZERO,
                driver: Mutex::new(None),
                in_session: AtomicBool::new(false),
                checks: AtomicUsize::new(0),
                clears: AtomicUsize::new(0),
                permission_responses: Mutex::new(Vec::new()),
                channel_answers: Mutex::new(Vec::new()),
                install_choices: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Delay the scripted session before it starts reporting callbacks.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        let state = Arc::get_mut(&mut self.state).expect("mock not yet shared");
        state.delay = delay;
        self
    }

    pub fn checks(&self) -> usize {
        self.state.checks.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.state.clears.load(Ordering::SeqCst)
    }

    pub fn permission_responses(&self) -> Vec<PermissionResponse> {
        self.state
            .permission_responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn channel_answers(&self) -> Vec<Vec<String>> {
        self.state
            .channel_answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn install_choices(&self) -> Vec<UpdateChoice> {
        self.state
            .install_choices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UpdaterBackend for MockBackend {
    fn start(&self, driver: Arc<dyn UpdateDriver>) -> Result<(), BackendError> {
        *self
            .state
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(driver);
        Ok(())
    }

    fn reset_cycle(&self) {}

    fn check_for_updates(&self) {
        let state = Arc::clone(&self.state);
        state.checks.fetch_add(1, Ordering::SeqCst);

        let Some(driver) = state
            .driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            return;
        };

        // The session flag flips synchronously so an overlapping call sees
        // it before the session task has run.
        state.in_session.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            if !state.delay.is_zero() {
                tokio::time::sleep(state.delay).await;
            }

            state
                .permission_responses
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(driver.permission_request());
            state
                .channel_answers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(driver.allowed_channels());

            if driver.should_check() {
                match state.script.clone() {
                    Script::UpdateFound(info) => {
                        let choice = driver.update_found(info);
                        state
                            .install_choices
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(choice);
                        if choice == UpdateChoice::Install {
                            driver.download_initiated();
                            driver.download_progress(512, 1024);
                            driver.extraction_progress(1.0);
                            let _ = driver.ready_to_install();
                        } else {
                            driver.no_update_found(&BackendError::NoUpdate);
                        }
                    }
                    Script::NoUpdate => driver.no_update_found(&BackendError::NoUpdate),
                    Script::FeedFailure(error) => driver.no_update_found(&error),
                    Script::Aborted(error) => driver.aborted(&error),
                    Script::Silent => {
                        // Drop every driver handle so the pending check
                        // observes a vanished session.
                        *state
                            .driver
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner) = None;
                    }
                }
            }

            drop(driver);
            state.in_session.store(false, Ordering::SeqCst);
        });
    }

    fn session_in_progress(&self) -> bool {
        self.state.in_session.load(Ordering::SeqCst)
    }

    fn clear_last_check_time(&self) {
        self.state.clears.fetch_add(1, Ordering::SeqCst);
    }
}
