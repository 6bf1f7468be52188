//! Database layer for siteloom
//!
//! SQLite-backed mirror of the in-memory studio state:
//! - Schema migrations via PRAGMA user_version
//! - Repository pattern for project/version/asset/comment queries
//!
//! In-memory state stays authoritative; a failed mirror write is logged
//! (or surfaced, for explicit user actions) and the session continues.

pub mod repo;
pub mod schema;

pub use repo::Database;
