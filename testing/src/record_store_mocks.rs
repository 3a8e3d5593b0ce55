//! In-memory record store for fast, deterministic testing
//!
//! [`InMemoryRecordStore`] honours the same contract as the PostgreSQL
//! store: conditional create under a single lock, atomic increments, and a
//! store-assigned `created_at` taken from an injected [`Clock`]. It also
//! exposes failure injection and call counters so tests can assert what a
//! service did (or did not) ask of the store.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use crate::mocks::test_clock;
use eventpass_core::environment::Clock;
use eventpass_core::record_store::{
    NewRegistration, RecordStore, RecordStoreError, Registration, StoreFuture,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Which record store operation a call counter or injected failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `exists`
    Exists,
    /// `create`
    Create,
    /// `increment_downloads`
    IncrementDownloads,
    /// `scan_all`
    ScanAll,
}

#[derive(Default)]
struct CallCounters {
    exists: AtomicUsize,
    create: AtomicUsize,
    increment_downloads: AtomicUsize,
    scan_all: AtomicUsize,
}

impl CallCounters {
    const fn get(&self, operation: Operation) -> &AtomicUsize {
        match operation {
            Operation::Exists => &self.exists,
            Operation::Create => &self.create,
            Operation::IncrementDownloads => &self.increment_downloads,
            Operation::ScanAll => &self.scan_all,
        }
    }
}

/// In-memory record store for tests and local runs.
///
/// Cloning shares the underlying records, counters and failure settings.
///
/// # Example
///
/// ```
/// use eventpass_testing::InMemoryRecordStore;
/// use eventpass_core::record_store::{Gender, NewRegistration, RecordStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryRecordStore::new();
///
/// store
///     .create(NewRegistration {
///         identifier: "EMP1".to_string(),
///         name: "Alice".to_string(),
///         gender: Gender::Female,
///         email: "alice@example.com".to_string(),
///     })
///     .await?;
///
/// store.increment_downloads("EMP1").await?;
/// assert_eq!(store.get("EMP1").map(|r| r.download_count), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<HashMap<String, Registration>>>,
    clock: Arc<dyn Clock>,
    calls: Arc<CallCounters>,
    /// Failures returned by every call of an operation until cleared
    persistent_failures: Arc<Mutex<HashMap<Operation, RecordStoreError>>>,
    /// Failures returned once, by the next call of an operation
    next_failures: Arc<Mutex<HashMap<Operation, RecordStoreError>>>,
}

impl InMemoryRecordStore {
    /// Create an empty store whose timestamps come from [`test_clock`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(test_clock()))
    }

    /// Create an empty store whose timestamps come from `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            clock,
            calls: Arc::new(CallCounters::default()),
            persistent_failures: Arc::new(Mutex::new(HashMap::new())),
            next_failures: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Insert a record directly, bypassing the conditional create.
    ///
    /// Useful for seeding a given state. Does not count as a `create` call.
    pub fn seed(&self, registration: Registration) {
        self.records
            .write()
            .unwrap()
            .insert(registration.identifier.clone(), registration);
    }

    /// Look up a record without going through the async contract.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<Registration> {
        self.records.read().unwrap().get(identifier).cloned()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    /// How many times `operation` has been called.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.get(operation).load(Ordering::SeqCst)
    }

    /// Make every call of `operation` fail with `error` until
    /// [`InMemoryRecordStore::clear_failures`] is called.
    pub fn set_failing(&self, operation: Operation, error: RecordStoreError) {
        self.persistent_failures
            .lock()
            .unwrap()
            .insert(operation, error);
    }

    /// Make only the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: Operation, error: RecordStoreError) {
        self.next_failures.lock().unwrap().insert(operation, error);
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        self.persistent_failures.lock().unwrap().clear();
        self.next_failures.lock().unwrap().clear();
    }

    /// Count the call and return the injected failure, if any.
    fn enter(&self, operation: Operation) -> Result<(), RecordStoreError> {
        self.calls.get(operation).fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.next_failures.lock().unwrap().remove(&operation) {
            return Err(error);
        }

        match self.persistent_failures.lock().unwrap().get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn exists<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.enter(Operation::Exists)?;
            Ok(self.records.read().unwrap().contains_key(identifier))
        })
    }

    fn create(&self, registration: NewRegistration) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.enter(Operation::Create)?;

            let mut records = self.records.write().unwrap();
            if records.contains_key(&registration.identifier) {
                return Err(RecordStoreError::AlreadyExists {
                    identifier: registration.identifier,
                });
            }

            let record = Registration {
                identifier: registration.identifier.clone(),
                name: registration.name,
                gender: registration.gender,
                email: registration.email,
                download_count: 0,
                created_at: self.clock.now(),
            };
            records.insert(registration.identifier, record);
            Ok(())
        })
    }

    fn increment_downloads<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter(Operation::IncrementDownloads)?;

            let mut records = self.records.write().unwrap();
            match records.get_mut(identifier) {
                Some(record) => {
                    record.download_count += 1;
                    Ok(())
                },
                None => Err(RecordStoreError::NotFound {
                    identifier: identifier.to_string(),
                }),
            }
        })
    }

    fn scan_all(&self) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            self.enter(Operation::ScanAll)?;

            let mut records: Vec<Registration> =
                self.records.read().unwrap().values().cloned().collect();
            records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            Ok(records)
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use eventpass_core::record_store::Gender;

    fn registration(identifier: &str) -> NewRegistration {
        NewRegistration {
            identifier: identifier.to_string(),
            name: "Alice".to_string(),
            gender: Gender::Female,
            email: "alice@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_store_fields() {
        let store = InMemoryRecordStore::new();
        store.create(registration("EMP1")).await.expect("create");

        let record = store.get("EMP1").expect("record");
        assert_eq!(record.download_count, 0);
        assert_eq!(record.created_at, test_clock().now());
    }

    #[tokio::test]
    async fn test_create_never_overwrites() {
        let store = InMemoryRecordStore::new();
        store.create(registration("EMP1")).await.expect("create");

        let mut second = registration("EMP1");
        second.name = "Mallory".to_string();
        let result = store.create(second).await;

        assert_eq!(
            result,
            Err(RecordStoreError::AlreadyExists {
                identifier: "EMP1".to_string()
            })
        );
        assert_eq!(store.get("EMP1").map(|r| r.name).as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_increment_unknown_identifier() {
        let store = InMemoryRecordStore::new();
        let result = store.increment_downloads("missing").await;
        assert!(matches!(result, Err(RecordStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let store = InMemoryRecordStore::new();
        store.fail_next(
            Operation::Exists,
            RecordStoreError::Database("connection refused".to_string()),
        );

        assert!(store.exists("EMP1").await.is_err());
        assert_eq!(store.exists("EMP1").await, Ok(false));
        assert_eq!(store.calls(Operation::Exists), 2);
    }

    #[tokio::test]
    async fn test_set_failing_until_cleared() {
        let store = InMemoryRecordStore::new();
        store.set_failing(
            Operation::ScanAll,
            RecordStoreError::Database("timeout".to_string()),
        );

        assert!(store.scan_all().await.is_err());
        assert!(store.scan_all().await.is_err());

        store.clear_failures();
        assert_eq!(store.scan_all().await, Ok(Vec::new()));
    }
}
