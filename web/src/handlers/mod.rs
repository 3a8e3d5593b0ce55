//! HTTP request handlers shared by the event pass services.

pub mod health;

pub use health::{health_check, record_store_readiness};
