//! Core data models for the gateway.
//!
//! Object records map to the SQLite `objects` table via `sqlx::FromRow` and
//! serialize as JSON via `serde`.

pub mod batch;
pub mod listing;
pub mod object;
