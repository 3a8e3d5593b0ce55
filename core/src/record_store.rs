//! Record store trait and registration record types.
//!
//! This module defines the abstraction for the store that owns every
//! registration record. The store is the only shared mutable resource of the
//! service, so its contract is kept to the operations that are safe under
//! concurrent callers:
//!
//! - Existence checks
//! - Conditional creation (fails when the identifier is already taken)
//! - Atomic increment of the download counter (no read-modify-write)
//! - Full scan for aggregate statistics
//!
//! # Implementations
//!
//! - `PostgresRecordStore` (in `eventpass-postgres`): Production implementation
//! - `InMemoryRecordStore` (in `eventpass-testing`): Fast, deterministic testing
//!
//! # Example
//!
//! ```no_run
//! use eventpass_core::record_store::{Gender, NewRegistration, RecordStore, RecordStoreError};
//!
//! async fn example(store: &dyn RecordStore) -> Result<(), RecordStoreError> {
//!     if !store.exists("EMP12345").await? {
//!         store
//!             .create(NewRegistration {
//!                 identifier: "EMP12345".to_string(),
//!                 name: "John Doe".to_string(),
//!                 gender: Gender::Male,
//!                 email: "john@example.com".to_string(),
//!             })
//!             .await?;
//!     }
//!
//!     store.increment_downloads("EMP12345").await?;
//!     let all = store.scan_all().await?;
//!     assert!(!all.is_empty());
//!     Ok(())
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use thiserror::Error;

/// Boxed future returned by [`RecordStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RecordStoreError>> + Send + 'a>>;

/// Gender category collected by the registration form.
///
/// Serialized with the form labels (`"Male"`, `"Female"`, `"Other"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
    /// Other
    Other,
}

impl Gender {
    /// Every category, in form order.
    pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Other];

    /// Form label and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known [`Gender`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gender: {0}")]
pub struct UnknownGender(pub String);

impl FromStr for Gender {
    type Err = UnknownGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|gender| gender.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownGender(s.to_string()))
    }
}

/// A persisted registration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// User-supplied unique key (e.g. an employee or badge number)
    pub identifier: String,
    /// Full name
    pub name: String,
    /// Gender category
    pub gender: Gender,
    /// Email address (format is not validated)
    pub email: String,
    /// Number of times the pass was downloaded
    pub download_count: u64,
    /// Assigned by the store when the record was written
    pub created_at: DateTime<Utc>,
}

/// Write-side shape of a registration.
///
/// The store assigns `download_count = 0` and `created_at` itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    /// User-supplied unique key
    pub identifier: String,
    /// Full name
    pub name: String,
    /// Gender category
    pub gender: Gender,
    /// Email address
    pub email: String,
}

/// Errors that can occur during record store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordStoreError {
    /// A record with this identifier already exists.
    ///
    /// Returned by [`RecordStore::create`], which never overwrites.
    #[error("Record already exists: {identifier}")]
    AlreadyExists {
        /// The identifier that was taken.
        identifier: String,
    },

    /// No record with this identifier exists.
    #[error("Record not found: {identifier}")]
    NotFound {
        /// The identifier that was looked up.
        identifier: String,
    },

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be mapped back into a [`Registration`].
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Store abstraction for registration records.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// session of the service.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
/// `async fn` so it can be used as `Arc<dyn RecordStore>` from reducer
/// environments and HTTP state.
pub trait RecordStore: Send + Sync {
    /// Whether a record with `identifier` exists.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    fn exists<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, bool>;

    /// Create a record, failing if the identifier is already taken.
    ///
    /// The check and the write are a single conditional operation, so two
    /// concurrent creates of the same identifier cannot both succeed.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: the identifier is taken
    /// - `Database`: connection or query failed
    fn create(&self, registration: NewRegistration) -> StoreFuture<'_, ()>;

    /// Atomically add one to the record's download counter.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no record with this identifier
    /// - `Database`: connection or query failed
    fn increment_downloads<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, ()>;

    /// Read every record.
    ///
    /// Full scan; acceptable only at small scale.
    ///
    /// # Errors
    ///
    /// - `Database`: connection or query failed
    /// - `Corrupt`: a row could not be decoded
    fn scan_all(&self) -> StoreFuture<'_, Vec<Registration>>;
}
