//! `PostgreSQL` record store for the event pass service.
//!
//! This crate provides [`PostgresRecordStore`], the production implementation
//! of the [`RecordStore`] trait from `eventpass-core`. It uses sqlx with a
//! shared connection pool and supports:
//!
//! - Conditional creation (`INSERT … ON CONFLICT DO NOTHING`)
//! - Atomic download counting (`download_count = download_count + 1`)
//! - Idempotent schema initialisation, run at most once per store
//!
//! # Example
//!
//! ```ignore
//! use eventpass_postgres::PostgresRecordStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresRecordStore::connect(
//!         "postgres://localhost/eventpass",
//!         10,
//!         std::time::Duration::from_secs(30),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use eventpass_core::record_store::{
    Gender, NewRegistration, RecordStore, RecordStoreError, Registration, StoreFuture,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Schema for the registration records.
///
/// `created_at` is assigned by the database and never supplied by callers.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS registrations (
    identifier TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    gender TEXT NOT NULL CHECK (gender IN ('Male', 'Female', 'Other')),
    email TEXT NOT NULL,
    download_count BIGINT NOT NULL DEFAULT 0 CHECK (download_count >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
";

/// Row shape returned by `scan_all`.
type RegistrationRow = (String, String, String, String, i64, DateTime<Utc>);

/// `PostgreSQL`-backed [`RecordStore`].
///
/// Cheap to clone; clones share the pool and the schema guard.
#[derive(Clone, Debug)]
pub struct PostgresRecordStore {
    pool: PgPool,
    schema: Arc<OnceCell<()>>,
}

impl PostgresRecordStore {
    /// Wrap an existing pool.
    ///
    /// The schema is not touched until [`PostgresRecordStore::ensure_schema`]
    /// is called.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: Arc::new(OnceCell::new()),
        }
    }

    /// Connect to the database and make sure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Database`] if the connection or the schema
    /// initialisation fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, RecordStoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| RecordStoreError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");

        let store = Self::from_pool(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the `registrations` table if it does not exist.
    ///
    /// Runs the DDL at most once per store (and its clones); later calls
    /// return immediately. A failed attempt is retried on the next call.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Database`] if the DDL fails.
    pub async fn ensure_schema(&self) -> Result<(), RecordStoreError> {
        self.schema
            .get_or_try_init(|| async {
                sqlx::query(SCHEMA)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        RecordStoreError::Database(format!("Schema initialisation failed: {e}"))
                    })?;
                tracing::info!("Registration schema ready");
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn row_to_registration(row: RegistrationRow) -> Result<Registration, RecordStoreError> {
    let (identifier, name, gender, email, download_count, created_at) = row;

    let gender: Gender = gender
        .parse()
        .map_err(|e| RecordStoreError::Corrupt(format!("{identifier}: {e}")))?;
    let download_count = u64::try_from(download_count).map_err(|_| {
        RecordStoreError::Corrupt(format!(
            "{identifier}: negative download count {download_count}"
        ))
    })?;

    Ok(Registration {
        identifier,
        name,
        gender,
        email,
        download_count,
        created_at,
    })
}

impl RecordStore for PostgresRecordStore {
    fn exists<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let (exists,): (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM registrations WHERE identifier = $1)")
                    .bind(identifier)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| {
                        RecordStoreError::Database(format!("Failed to check existence: {e}"))
                    })?;
            Ok(exists)
        })
    }

    fn create(&self, registration: NewRegistration) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                INSERT INTO registrations (identifier, name, gender, email)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (identifier) DO NOTHING
                ",
            )
            .bind(&registration.identifier)
            .bind(&registration.name)
            .bind(registration.gender.as_str())
            .bind(&registration.email)
            .execute(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(format!("Failed to create record: {e}")))?;

            if result.rows_affected() == 0 {
                return Err(RecordStoreError::AlreadyExists {
                    identifier: registration.identifier,
                });
            }

            tracing::debug!(identifier = %registration.identifier, "Registration record created");
            Ok(())
        })
    }

    fn increment_downloads<'a>(&'a self, identifier: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE registrations SET download_count = download_count + 1 WHERE identifier = $1",
            )
            .bind(identifier)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RecordStoreError::Database(format!("Failed to increment downloads: {e}"))
            })?;

            if result.rows_affected() == 0 {
                return Err(RecordStoreError::NotFound {
                    identifier: identifier.to_string(),
                });
            }
            Ok(())
        })
    }

    fn scan_all(&self) -> StoreFuture<'_, Vec<Registration>> {
        Box::pin(async move {
            let rows: Vec<RegistrationRow> = sqlx::query_as(
                r"
                SELECT identifier, name, gender, email, download_count, created_at
                FROM registrations
                ORDER BY identifier
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RecordStoreError::Database(format!("Failed to scan records: {e}")))?;

            rows.into_iter().map(row_to_registration).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(gender: &str, download_count: i64) -> RegistrationRow {
        (
            "EMP1".to_string(),
            "Alice".to_string(),
            gender.to_string(),
            "alice@example.com".to_string(),
            download_count,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[test]
    fn test_row_mapping() {
        let record = row_to_registration(row("Female", 3));
        assert_eq!(
            record.map(|r| (r.gender, r.download_count)),
            Ok((Gender::Female, 3))
        );
    }

    #[test]
    fn test_row_with_unknown_gender_is_corrupt() {
        assert!(matches!(
            row_to_registration(row("Unknown", 0)),
            Err(RecordStoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_row_with_negative_count_is_corrupt() {
        assert!(matches!(
            row_to_registration(row("Male", -1)),
            Err(RecordStoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_schema_uses_form_labels() {
        for gender in Gender::ALL {
            assert!(SCHEMA.contains(&format!("'{gender}'")));
        }
    }
}
