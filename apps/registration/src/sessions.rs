//! In-memory registry of interaction sessions.
//!
//! Every browser session gets its own [`PassStore`] so the form and pass
//! screens of different users never share state. The registry is bounded:
//! when it is full, creating a session evicts the oldest one.

use crate::reducer::{PassEnvironment, PassReducer};
use crate::types::PassState;
use eventpass_runtime::Store;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Store type for one interaction session
pub type PassStore = Store<PassState, crate::types::PassAction, PassEnvironment, PassReducer>;

#[derive(Default)]
struct Sessions {
    stores: HashMap<Uuid, Arc<PassStore>>,
    /// Creation order, oldest first
    order: VecDeque<Uuid>,
}

/// Bounded map from session id to session store
pub struct SessionRegistry {
    capacity: usize,
    inner: Mutex<Sessions>,
}

impl SessionRegistry {
    /// Create a registry holding at most `capacity` sessions (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Sessions::default()),
        }
    }

    /// Maximum number of live sessions
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        // The map stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new session on the form screen
    pub fn create(&self, environment: PassEnvironment) -> (Uuid, Arc<PassStore>) {
        let id = Uuid::new_v4();
        let store = Arc::new(Store::new(
            PassState::default(),
            PassReducer::new(),
            environment,
        ));

        let mut sessions = self.lock();
        while sessions.stores.len() >= self.capacity {
            let Some(oldest) = sessions.order.pop_front() else {
                break;
            };
            sessions.stores.remove(&oldest);
            tracing::debug!(session_id = %oldest, "Evicted oldest session");
            metrics::counter!("sessions.evicted").increment(1);
        }
        sessions.stores.insert(id, Arc::clone(&store));
        sessions.order.push_back(id);
        metrics::gauge!("sessions.active").set(sessions.stores.len() as f64);
        drop(sessions);

        tracing::debug!(session_id = %id, "Session created");
        (id, store)
    }

    /// Look up a live session
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<Arc<PassStore>> {
        self.lock().stores.get(id).cloned()
    }

    /// End a session, returning its store if it existed
    pub fn remove(&self, id: &Uuid) -> Option<Arc<PassStore>> {
        let mut sessions = self.lock();
        let removed = sessions.stores.remove(id)?;
        sessions.order.retain(|other| other != id);
        metrics::gauge!("sessions.active").set(sessions.stores.len() as f64);
        Some(removed)
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().stores.len()
    }

    /// Whether no session is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut down every session store, waiting up to `timeout` for each
    ///
    /// Returns the number of sessions whose effects did not finish in time.
    pub async fn shutdown_all(&self, timeout: Duration) -> usize {
        let stores: Vec<(Uuid, Arc<PassStore>)> = {
            let mut sessions = self.lock();
            sessions.order.clear();
            sessions.stores.drain().collect()
        };

        let mut timed_out = 0;
        for (id, store) in stores {
            if let Err(error) = store.shutdown(timeout).await {
                tracing::warn!(session_id = %id, %error, "Session did not shut down cleanly");
                timed_out += 1;
            }
        }
        metrics::gauge!("sessions.active").set(0.0);
        timed_out
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}
