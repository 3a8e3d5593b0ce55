//! # Event Pass Core
//!
//! Core traits and domain types for the event pass registration service.
//!
//! The service is built around the Reducer pattern: every user interaction
//! is an action fed into a pure function that updates session state and
//! returns descriptions of the side effects to perform. The runtime crate
//! executes those descriptions.
//!
//! ## Core Concepts
//!
//! - **State**: Ephemeral per-session interaction state
//! - **Action**: All possible inputs to a reducer (commands and their outcomes)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (clock, record store, code generator)
//!
//! ## Ports
//!
//! - [`record_store::RecordStore`]: durable storage for registration records
//! - [`code::CodeGenerator`]: turns an identifier into a scannable image
//!
//! ## Example
//!
//! ```ignore
//! use eventpass_core::*;
//!
//! impl Reducer for PassReducer {
//!     type State = PassState;
//!     type Action = PassAction;
//!     type Environment = PassEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut PassState,
//!         action: PassAction,
//!         env: &PassEnvironment,
//!     ) -> SmallVec<[Effect<PassAction>; 4]> {
//!         // Business logic goes here
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{smallvec, SmallVec};

/// Code generator port (identifier → scannable image)
pub mod code;

/// Record store port and registration record types
pub mod record_store;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```
    /// use eventpass_core::{effect::Effect, reducer::Reducer, SmallVec};
    ///
    /// #[derive(Default)]
    /// struct Counter { downloads: u64 }
    ///
    /// enum CounterAction { Downloaded }
    ///
    /// struct CounterReducer;
    ///
    /// impl Reducer for CounterReducer {
    ///     type State = Counter;
    ///     type Action = CounterAction;
    ///     type Environment = ();
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut Counter,
    ///         action: CounterAction,
    ///         _env: &(),
    ///     ) -> SmallVec<[Effect<CounterAction>; 4]> {
    ///         match action {
    ///             CounterAction::Downloaded => state.downloads += 1,
    ///         }
    ///         SmallVec::new()
    ///     }
    /// }
    ///
    /// let mut state = Counter::default();
    /// let effects = CounterReducer.reduce(&mut state, CounterAction::Downloaded, &());
    /// assert_eq!(state.downloads, 1);
    /// assert!(effects.is_empty());
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::None => write!(f, "Effect::None"),
                Self::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Self::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Self::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Wrap an async computation as an effect
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Self::Future(Box::pin(fut))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Self>) -> Self {
            Self::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Self>) -> Self {
            Self::Sequential(effects)
        }

        /// Whether this effect does nothing when executed
        #[must_use]
        pub fn is_none(&self) -> bool {
            match self {
                Self::None => true,
                Self::Parallel(effects) | Self::Sequential(effects) => {
                    effects.iter().all(Self::is_none)
                },
                Self::Future(_) => false,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use eventpass_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let earlier = clock.now();
    /// assert!(clock.now() >= earlier);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
