//! HTTP API endpoints.
//!
//! - [`sessions`]: the per-session registration flow
//! - [`admin`]: aggregate statistics

pub mod admin;
pub mod sessions;
