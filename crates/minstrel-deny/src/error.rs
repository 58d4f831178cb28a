//! Error types for the deny list.

use thiserror::Error;

/// Errors while building a deny list.
#[derive(Debug, Error)]
pub enum DenyError {
    /// A rule names a type the registry does not know.
    #[error("Deny rule refers to unknown type: {0}")]
    UnknownType(String),

    /// A rule lists no methods.
    #[error("Deny rule for '{0}' lists no methods")]
    EmptyRule(String),
}

/// Result type for deny-list operations.
pub type DenyResult<T> = std::result::Result<T, DenyError>;
