//! Error types for the interception engine.
//!
//! Only engine construction can fail. Wrapping itself never surfaces an
//! error: unresolved names become deferred requests and methods that cannot
//! be bound fall back to dynamic lookup.

use minstrel_core::RegistryError;
use minstrel_deny::DenyError;
use thiserror::Error;

/// Errors while constructing an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The registry rejected the control type or the load hook.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The deny list could not be built.
    #[error("Deny list error: {0}")]
    Deny(#[from] DenyError),
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
