//! # Event Pass Testing
//!
//! Testing utilities and helpers for the event pass crates.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, code generator)
//! - An in-memory [`RecordStore`](eventpass_core::record_store::RecordStore)
//!   with failure injection and call counters
//! - A Given-When-Then harness and assertion helpers for reducers
//!
//! ## Example
//!
//! ```ignore
//! use eventpass_testing::{test_clock, InMemoryRecordStore};
//! use eventpass_runtime::Store;
//!
//! #[tokio::test]
//! async fn test_registration_flow() {
//!     let records = InMemoryRecordStore::new();
//!     let env = PassEnvironment::new(Arc::new(records.clone()), codes, Arc::new(test_clock()));
//!     let store = Store::new(PassState::default(), PassReducer::new(), env);
//!
//!     let mut handle = store.send(PassAction::Submit { form }).await?;
//!     handle.wait().await;
//!
//!     assert_eq!(records.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use eventpass_core::environment::Clock;


/// In-memory record store
pub mod record_store_mocks;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use eventpass_core::code::{CodeError, CodeGenerator};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use eventpass_testing::mocks::FixedClock;
    /// use eventpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Code generator that "renders" an identifier as its own bytes.
    ///
    /// Accepts printable ASCII only, like the Code 128 set B generator, so
    /// reducer tests exercise the same validation path without rasterising.
    ///
    /// ```
    /// use eventpass_testing::mocks::FakeCodeGenerator;
    /// use eventpass_core::code::CodeGenerator;
    ///
    /// let codes = FakeCodeGenerator;
    /// assert_eq!(codes.generate("EMP1").ok(), Some(b"CODE:EMP1".to_vec()));
    /// assert!(codes.check("caf\u{e9}").is_err());
    /// ```
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FakeCodeGenerator;

    impl CodeGenerator for FakeCodeGenerator {
        fn check(&self, identifier: &str) -> Result<(), CodeError> {
            match identifier.chars().find(|c| !(' '..='~').contains(c)) {
                Some(c) => Err(CodeError::Unsupported {
                    identifier: identifier.to_string(),
                    reason: format!("character {c:?} is not printable ASCII"),
                }),
                None => Ok(()),
            }
        }

        fn generate(&self, identifier: &str) -> Result<Vec<u8>, CodeError> {
            self.check(identifier)?;
            Ok(format!("CODE:{identifier}").into_bytes())
        }
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FakeCodeGenerator, FixedClock};
pub use record_store_mocks::{InMemoryRecordStore, Operation};
pub use reducer_test::{assertions, ReducerTest};
