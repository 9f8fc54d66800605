//! Core data models for the client registration service.
//!
//! A client owns zero or more pictures; picture binaries live in the object
//! store while both rows map to SQLite tables via `sqlx::FromRow` and
//! serialize naturally as JSON via `serde`.

pub mod client;
pub mod picture;
