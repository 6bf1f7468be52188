//! # siteloom-core
//!
//! Core library for siteloom - a prompt-to-website generation studio.
//!
//! This library provides:
//! - The response parser that turns free-form streamed model text into a
//!   reasoning string plus an ordered set of named files
//! - The streaming session against the generation backend
//! - The preview composition engine (reference resolver, blob store,
//!   runtime shim, composer)
//! - Studio state: projects, assets, append-only version history, plugins
//! - SQLite persistence mirroring the in-memory state
//!
//! ## Architecture
//!
//! One generation flows through the pipeline left to right:
//! prompt -> streaming session -> per-snapshot reasoning re-parse ->
//! final file set -> version + asset updates -> recomposed preview.
//!
//! ## Example
//!
//! ```rust,no_run
//! use siteloom_core::{Config, Database, Studio};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//! let studio = Studio::with_database(db).expect("failed to load projects");
//! ```

// Re-export commonly used items at the crate root
pub use backend::BackendClient;
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use generate::{run_generation, GenerationOutcome};
pub use parse::{parse_response, ParsedResponse};
pub use preview::PreviewComposer;
pub use studio::Studio;
pub use types::*;

// Public modules
pub mod backend;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod format;
pub mod generate;
pub mod logging;
pub mod parse;
pub mod preview;
pub mod studio;
pub mod types;
