use crate::config::Settings;
use crate::pipeline::Session;
use std::sync::{Mutex, MutexGuard};

/// Shared by all handlers. The session's memo tables live as long as the
/// server, so repeated dashboard refreshes hit the network once.
pub struct AppState {
    pub settings: Settings,
    pub session: Mutex<Session>,
}

impl AppState {
    pub fn new(settings: Settings, session: Session) -> Self {
        Self {
            settings,
            session: Mutex::new(session),
        }
    }

    /// Lock the session, recovering from poisoning. The caches only ever
    /// hold completed outcomes.
    pub fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
