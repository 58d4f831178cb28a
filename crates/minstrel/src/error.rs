//! Error types for the Minstrel runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the Minstrel runtime.
#[derive(Debug, Error)]
pub enum MinstrelError {
    /// Engine error.
    #[error("Engine error: {0}")]
    Engine(#[from] minstrel_intercept::EngineError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Instrument spec error.
    #[error("Instrument spec error: {0}")]
    Spec(#[from] SpecError),
}

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML was malformed.
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of range.
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// Field path, e.g. `deny[0].type`.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Errors while parsing an instrument spec.
#[derive(Debug, Error)]
pub enum SpecError {
    /// No type names were given.
    #[error("'{0}' names no types")]
    Empty(String),
}

/// Result type for runtime operations.
pub type MinstrelResult<T> = std::result::Result<T, MinstrelError>;
