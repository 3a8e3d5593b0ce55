//! Registration, download accounting and statistics.
//!
//! These are the only operations that touch the record store. Each takes the
//! store explicitly so the same functions serve the reducer effects, the HTTP
//! handlers and the tests.

use eventpass_core::record_store::{
    Gender, NewRegistration, RecordStore, RecordStoreError, Registration,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a registration was not written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The identifier is already registered.
    #[error("This identifier is already registered.")]
    AlreadyExists {
        /// The taken identifier
        identifier: String,
    },

    /// The record store failed; nothing was written.
    #[error("An error occurred: {0}")]
    Store(RecordStoreError),
}

/// Register a new record.
///
/// Checks for an existing record first so the common duplicate case never
/// attempts a write; the create itself is conditional, so a concurrent
/// registration of the same identifier that slips between the two calls is
/// also reported as [`RegistrationError::AlreadyExists`].
///
/// # Errors
///
/// - `AlreadyExists`: the identifier is taken
/// - `Store`: the record store failed
#[tracing::instrument(skip(store, registration), fields(identifier = %registration.identifier))]
pub async fn register(
    store: &dyn RecordStore,
    registration: NewRegistration,
) -> Result<(), RegistrationError> {
    let identifier = registration.identifier.clone();

    let outcome = match store.exists(&identifier).await {
        Ok(true) => Err(RegistrationError::AlreadyExists {
            identifier: identifier.clone(),
        }),
        Ok(false) => store.create(registration).await.map_err(|e| match e {
            RecordStoreError::AlreadyExists { identifier } => {
                RegistrationError::AlreadyExists { identifier }
            },
            other => RegistrationError::Store(other),
        }),
        Err(e) => Err(RegistrationError::Store(e)),
    };

    match &outcome {
        Ok(()) => {
            tracing::info!("Registration created");
            metrics::counter!("registrations.created").increment(1);
        },
        Err(RegistrationError::AlreadyExists { .. }) => {
            tracing::info!("Registration rejected: identifier already registered");
            metrics::counter!("registrations.rejected", "reason" => "duplicate").increment(1);
        },
        Err(RegistrationError::Store(error)) => {
            tracing::error!(%error, "Registration failed");
            metrics::counter!("registrations.rejected", "reason" => "store").increment(1);
        },
    }

    outcome
}

/// Add one to the download counter of `identifier`.
///
/// Never fails: accounting problems are logged and counted, and the caller
/// delivers the download regardless.
#[tracing::instrument(skip(store))]
pub async fn record_download(store: &dyn RecordStore, identifier: &str) {
    match store.increment_downloads(identifier).await {
        Ok(()) => {
            tracing::debug!("Download recorded");
            metrics::counter!("downloads.recorded").increment(1);
        },
        Err(RecordStoreError::NotFound { .. }) => {
            tracing::warn!("Download recorded for an unknown identifier");
            metrics::counter!("downloads.failed").increment(1);
        },
        Err(error) => {
            tracing::error!(%error, "Failed to record download");
            metrics::counter!("downloads.failed").increment(1);
        },
    }
}

/// Aggregate counts over every registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationStats {
    /// Number of records
    pub total_registrations: u64,
    /// Sum of all download counters
    pub total_downloads: u64,
    /// Record count per gender; only genders that occur are present
    pub gender_breakdown: BTreeMap<Gender, u64>,
}

/// Statistics plus the error that degraded them, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    /// The statistics (empty when `error` is set)
    #[serde(flatten)]
    pub stats: RegistrationStats,
    /// Store failure that forced the empty result
    pub error: Option<String>,
}

/// Compute statistics over a set of records.
#[must_use]
pub fn aggregate(records: &[Registration]) -> RegistrationStats {
    records
        .iter()
        .fold(RegistrationStats::default(), |mut stats, record| {
            stats.total_registrations += 1;
            stats.total_downloads += record.download_count;
            *stats.gender_breakdown.entry(record.gender).or_insert(0) += 1;
            stats
        })
}

/// Read every record and aggregate.
///
/// A store failure degrades to empty statistics with the failure reported in
/// [`StatsReport::error`]; it is never propagated.
#[tracing::instrument(skip(store))]
pub async fn get_stats(store: &dyn RecordStore) -> StatsReport {
    match store.scan_all().await {
        Ok(records) => StatsReport {
            stats: aggregate(&records),
            error: None,
        },
        Err(error) => {
            tracing::error!(%error, "Failed to fetch stats");
            StatsReport {
                stats: RegistrationStats::default(),
                error: Some(format!("Failed to fetch stats: {error}")),
            }
        },
    }
}
