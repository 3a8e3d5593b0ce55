//! # Event Pass Runtime
//!
//! Runtime implementation for the event pass reducers.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling. The registration service keeps one Store per user
//! session: every interaction becomes an action, the reducer updates the
//! session state, and the effects it returns (record store writes, download
//! accounting) run on spawned tasks and feed their outcome back as actions.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **`EffectHandle`**: Lets a caller wait until the effects of one action are done
//!
//! ## Example
//!
//! ```ignore
//! use eventpass_runtime::Store;
//!
//! let store = Store::new(PassState::default(), PassReducer::new(), environment);
//!
//! // Send an action and wait for its effects (and their feedback actions)
//! let mut handle = store.send(PassAction::Submit { form }).await?;
//! handle.wait_with_timeout(Duration::from_secs(5)).await?;
//!
//! // Read state
//! let screen = store.state(|s| s.screen.clone()).await;
//! ```

use eventpass_core::{effect::Effect, reducer::Reducer};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// A task join error occurred during effect execution
        ///
        /// This typically means a spawned task panicked.
        #[error("Task failed during effect execution: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),

        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects or a terminal action
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Health check status levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthStatus {
    /// Component is fully operational
    Healthy,

    /// Component is operational but experiencing issues
    Degraded,

    /// Component is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Get the worst status between two statuses
    #[must_use]
    pub const fn worst(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unhealthy, _) | (_, Self::Unhealthy) => Self::Unhealthy,
            (Self::Degraded, _) | (_, Self::Degraded) => Self::Degraded,
            _ => Self::Healthy,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// Name of the component being checked
    pub component: String,

    /// Current health status
    pub status: HealthStatus,

    /// Optional message providing details
    pub message: Option<String>,

    /// Optional metadata (e.g., pending effect counts)
    pub metadata: Vec<(String, String)>,
}

impl HealthCheck {
    /// Create a healthy check result
    #[must_use]
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            message: None,
            metadata: Vec::new(),
        }
    }

    /// Create a degraded check result
    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Create an unhealthy check result
    #[must_use]
    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            metadata: Vec::new(),
        }
    }

    /// Add metadata to the health check
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for effects to complete.
/// An effect counts as complete once the action it produced (if any) has
/// been reduced, so after `wait()` returns the state reflects the outcome.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(PassAction::DownloadRequested).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle and the tracking context that drives it.
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects still running for this action
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    ///
    /// Returns when the effect counter reaches zero.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, so no effect can still be running
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            self.notifier.send_replace(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, Effect,
        EffectHandle, EffectTracking, HealthCheck, Ordering, Reducer, RwLock, StoreError,
    };
    use tokio::sync::broadcast;

    /// Default capacity of the action broadcast channel
    const DEFAULT_BROADCAST_CAPACITY: usize = 16;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    ///
    /// Cloning a Store is cheap and every clone shares the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here before it
        /// is fed back into the reducer.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(
                initial_state,
                reducer,
                environment,
                DEFAULT_BROADCAST_CAPACITY,
            )
        }

        /// Create a new Store with custom action broadcast capacity
        ///
        /// Increase the capacity if observers of [`Store::subscribe_actions`]
        /// frequently lag.
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Number of effects currently running across all actions
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Perform a health check on the Store
        ///
        /// Unhealthy once shutdown has started; healthy otherwise.
        #[must_use]
        pub fn health(&self) -> HealthCheck {
            let check = if self.shutdown.load(Ordering::Acquire) {
                HealthCheck::unhealthy("store", "Store is shutting down")
            } else {
                HealthCheck::healthy("store")
            };

            check.with_metadata("pending_effects", self.pending_effects().to_string())
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for pending effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::debug!("Initiating store shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::debug!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::warn!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running",
                        pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Executes returned effects asynchronously
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// `send()` returns after starting effect execution, not completion.
        /// Use the returned [`EffectHandle`] to wait.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// If the reducer panics, the panic propagates to the caller.
        /// Reducers should be pure functions that do not panic.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            Ok(handle)
        }

        /// Send an action and wait for a terminal action produced by its effects
        ///
        /// Subscribes to the action broadcast before sending so no matching
        /// action can be missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        /// - [`StoreError::Timeout`]: no matching action arrived in time
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to all actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let screen = store.state(|s| s.screen.clone()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Execute an effect with tracking
        ///
        /// # Error Handling Strategy
        ///
        /// **Reducer panics**: Propagate (fail fast).
        ///
        /// **Effect failures**: Log and continue. A panicking effect task is
        /// isolated in its spawned task; [`DecrementGuard`] keeps the counters
        /// correct.
        fn execute_effect(&self, effect: Effect<A>, tracking: &EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");

                            // No receivers is fine
                            let _ = store.action_broadcast.send(action.clone());

                            if let Err(error) = store.send(action).await {
                                tracing::warn!(%error, "Dropped feedback action");
                            }
                        }
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect(effect, tracking);
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential")
                        .increment(1);
                    tracking.increment();

                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;

                        for effect in effects {
                            let (mut sub_handle, sub_tracking) = EffectHandle::new();
                            store.execute_effect(effect, &sub_tracking);
                            drop(sub_tracking);
                            sub_handle.wait().await;
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use eventpass_core::{smallvec, SmallVec};

    #[derive(Debug, Clone)]
    struct TestState {
        downloads: u32,
        last_identifier: Option<String>,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Download,
        Downloaded(String),
        Lookup(String),
        Found(String),
        DownloadTwiceInOrder,
        DownloadThreeInParallel,
        PanickingEffect,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Download => {
                    state.downloads += 1;
                    smallvec![Effect::None]
                },
                TestAction::Downloaded(identifier) | TestAction::Found(identifier) => {
                    state.last_identifier = Some(identifier);
                    SmallVec::new()
                },
                TestAction::Lookup(identifier) => {
                    smallvec![Effect::future(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(TestAction::Found(identifier))
                    })]
                },
                TestAction::DownloadTwiceInOrder => smallvec![Effect::chain(vec![
                    Effect::future(async { Some(TestAction::Downloaded("first".to_string())) }),
                    Effect::future(async { Some(TestAction::Downloaded("second".to_string())) }),
                ])],
                TestAction::DownloadThreeInParallel => smallvec![Effect::merge(vec![
                    Effect::future(async { Some(TestAction::Download) }),
                    Effect::future(async { Some(TestAction::Download) }),
                    Effect::future(async { Some(TestAction::Download) }),
                ])],
                TestAction::PanickingEffect => {
                    #[allow(clippy::panic)] // Intentional panic for testing error handling
                    {
                        smallvec![Effect::future(async {
                            panic!("Intentional panic in effect for testing");
                        })]
                    }
                },
            }
        }
    }

    fn test_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(
            TestState {
                downloads: 0,
                last_identifier: None,
            },
            TestReducer,
            TestEnv,
        )
    }

    #[tokio::test]
    async fn test_send_action() -> Result<(), StoreError> {
        let store = test_store();

        store.send(TestAction::Download).await?;
        store.send(TestAction::Download).await?;

        assert_eq!(store.state(|s| s.downloads).await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_waits_for_feedback_action() -> Result<(), StoreError> {
        let store = test_store();

        let mut handle = store.send(TestAction::Lookup("EMP1".to_string())).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert_eq!(handle.pending(), 0);
        assert_eq!(
            store.state(|s| s.last_identifier.clone()).await.as_deref(),
            Some("EMP1")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_effect_parallel() -> Result<(), StoreError> {
        let store = test_store();

        let mut handle = store.send(TestAction::DownloadThreeInParallel).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert_eq!(store.state(|s| s.downloads).await, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_effect_sequential_preserves_order() -> Result<(), StoreError> {
        let store = test_store();

        let mut handle = store.send(TestAction::DownloadTwiceInOrder).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        assert_eq!(
            store.state(|s| s.last_identifier.clone()).await.as_deref(),
            Some("second")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_send_and_wait_for() -> Result<(), StoreError> {
        let store = test_store();

        let action = store
            .send_and_wait_for(
                TestAction::Lookup("EMP2".to_string()),
                |a| matches!(a, TestAction::Found(_)),
                Duration::from_secs(1),
            )
            .await?;

        assert!(matches!(action, TestAction::Found(id) if id == "EMP2"));
        Ok(())
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out() {
        let store = test_store();

        let result = store
            .send_and_wait_for(
                TestAction::Download,
                |a| matches!(a, TestAction::Found(_)),
                Duration::from_millis(20),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_effect_panic_isolation() -> Result<(), StoreError> {
        let store = test_store();

        let mut handle = store.send(TestAction::PanickingEffect).await?;
        handle.wait_with_timeout(Duration::from_secs(1)).await?;

        // Store remains usable after a panicking effect
        store.send(TestAction::Download).await?;
        assert_eq!(store.state(|s| s.downloads).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() -> Result<(), StoreError> {
        let store = test_store();

        store.shutdown(Duration::from_secs(1)).await?;

        assert!(matches!(
            store.send(TestAction::Download).await,
            Err(StoreError::ShutdownInProgress)
        ));
        assert_eq!(store.health().status, HealthStatus::Unhealthy);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_clone_shares_state() -> Result<(), StoreError> {
        let first = test_store();
        let second = first.clone();

        first.send(TestAction::Download).await?;
        assert_eq!(second.state(|s| s.downloads).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        handle.wait().await;
        assert_eq!(handle.pending(), 0);
    }

    #[test]
    fn test_health_status_worst() {
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Unhealthy.worst(HealthStatus::Healthy),
            HealthStatus::Unhealthy
        );
    }
}
