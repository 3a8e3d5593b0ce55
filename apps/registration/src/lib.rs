//! Event pass registration service.
//!
//! Attendees fill in a short form (name, identifier, email, gender), receive
//! a Code 128 pass encoding their identifier, and may download it as a PNG.
//! Each registration is a record in PostgreSQL; downloads are counted per
//! record and an admin endpoint reports totals.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)            per-session Store            shared services
//! ┌──────────────┐      ┌──────────────────────┐      ┌──────────────────┐
//! │ api::sessions│─────▶│ PassReducer          │─────▶│ services::       │
//! │ api::admin   │      │  Form ⇄ PassShown    │      │  register        │
//! └──────────────┘      │  effects: register,  │      │  record_download │
//!        │              │  record download     │      │  get_stats       │
//!        ▼              └──────────────────────┘      └────────┬─────────┘
//! ┌──────────────┐                                             ▼
//! │ barcode      │  Code 128 → PNG                    ┌──────────────────┐
//! └──────────────┘                                    │ RecordStore      │
//!                                                     │ (PostgreSQL)     │
//!                                                     └──────────────────┘
//! ```
//!
//! Registration uses a conditional create, so two sessions racing for the
//! same identifier produce exactly one record.

pub mod api;
pub mod barcode;
pub mod config;
pub mod reducer;
pub mod server;
pub mod services;
pub mod sessions;
pub mod types;

pub use barcode::Code128Generator;
pub use config::Config;
pub use reducer::{PassEnvironment, PassReducer};
pub use sessions::{PassStore, SessionRegistry};
pub use types::{PassAction, PassState, RegistrationForm, Screen};
