//! # Resources - Embedded Asset Store
//!
//! A single portable SQLite file holding named, compressed binary resources
//! for a graphics application.
//!
//! Resources provides:
//! - zlib (DEFLATE) codec with optional preallocated decompression
//! - Texture and shader repositories keyed by a unique human-readable name
//! - A busy-retrying query executor over prepared statements
//! - Read support for both schema generations (with and without stored sizes)
//! - A packer CLI that ingests image and shader files

pub mod codec;
pub mod config;
pub mod confirm;
pub mod loader;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use confirm::{Confirmation, ConsolePrompt, FixedAnswer, TypeConfirmer, TypePolicy};
pub use loader::{DecodedImage, ImageFileLoader, ImageLoader};
pub use storage::{AccessMode, AssetStore, SchemaGeneration, Texture};

/// Result type alias for asset store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for asset store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot open store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Cannot create store directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("Prepare error: {0}")]
    Prepare(#[source] rusqlite::Error),

    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Resource name already exists: {name}")]
    DuplicateName {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    #[error("Store was opened read-only; writes need packer mode")]
    ReadOnly,

    #[error("Creation of shader type '{0}' was declined")]
    UserDeclined(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Shader source is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True when the error is a refusal from the type-creation prompt.
    pub fn is_declined(&self) -> bool {
        matches!(self, Error::UserDeclined(_))
    }
}
