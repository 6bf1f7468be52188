//! Error types for siteloom-core

use thiserror::Error;

/// Main error type for the siteloom-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Generation backend failure (transport or non-success status)
    #[error("generation failed: {0}")]
    Generation(String),

    /// A second generation was attempted while one is running
    #[error("generation already in progress for project {0}")]
    GenerationInProgress(String),

    /// Project not found
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Version not found
    #[error("version not found: v{0}")]
    VersionNotFound(u32),

    /// Asset not found
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// An asset with the same name already exists in the project
    #[error("asset already exists: {0}")]
    DuplicateAsset(String),

    /// Composition failure (missing entry document, bad plugin payload)
    #[error("preview composition error: {0}")]
    Compose(String),
}

/// Result type alias for siteloom-core
pub type Result<T> = std::result::Result<T, Error>;
