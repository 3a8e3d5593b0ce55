//! Axum integration for the event pass service.
//!
//! This crate holds the HTTP plumbing that is independent of the
//! registration flow itself, implementing the "Functional Core, Imperative
//! Shell" split: handlers in the application translate requests into
//! reducer actions, and this crate turns the outcomes into responses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, images
//! │  - Request parsing                      │  ← Correlation IDs
//! │  - Response serialization               │  ← Logging, metrics
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Pass reducer (per session)           │  ← Testable at memory speed
//! │  - State transformations                │  ← No I/O, no side effects
//! │  - Effect descriptions (values)         │  ← Record store calls
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Contents
//!
//! - [`AppError`]: `{code, message}` error responses, with conversions from
//!   the record store, code generator and runtime errors
//! - [`middleware::correlation_id_layer`]: `X-Correlation-ID` handling
//! - [`handlers`]: liveness and record store readiness

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use middleware::{correlation_id_layer, CorrelationId, CORRELATION_ID_HEADER};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
