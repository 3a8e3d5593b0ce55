//! Application state for the registration HTTP server.
//!
//! Built once in `main` and handed to every handler. Holds the shared
//! record store, the pass generator and the session registry; each session
//! gets a [`PassEnvironment`] assembled from the same handles.

use crate::reducer::PassEnvironment;
use crate::sessions::SessionRegistry;
use eventpass_core::code::CodeGenerator;
use eventpass_core::environment::Clock;
use eventpass_core::record_store::RecordStore;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Registration records
    pub records: Arc<dyn RecordStore>,

    /// Pass image generator
    pub codes: Arc<dyn CodeGenerator>,

    /// Clock handed to session reducers
    pub clock: Arc<dyn Clock>,

    /// Live interaction sessions
    pub sessions: Arc<SessionRegistry>,

    /// How long a handler waits for a session's effects
    pub effect_timeout: Duration,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        records: Arc<dyn RecordStore>,
        codes: Arc<dyn CodeGenerator>,
        clock: Arc<dyn Clock>,
        sessions: Arc<SessionRegistry>,
        effect_timeout: Duration,
    ) -> Self {
        Self {
            records,
            codes,
            clock,
            sessions,
            effect_timeout,
        }
    }

    /// Reducer environment for a new session
    #[must_use]
    pub fn environment(&self) -> PassEnvironment {
        PassEnvironment::new(
            Arc::clone(&self.records),
            Arc::clone(&self.codes),
            Arc::clone(&self.clock),
        )
    }
}
