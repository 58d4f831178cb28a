//! Core error types for Minstrel.
//!
//! Two families live here: [`CallError`], raised by dispatched methods and
//! carried unchanged through interception, and [`RegistryError`], raised while
//! defining types and loading modules.

use thiserror::Error;

/// Error raised by a dispatched method call.
///
/// `CallError` is `Clone + PartialEq` so that an error re-raised by a wrapper
/// can be compared against the one the original implementation produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// An error raised by method code itself.
    #[error("{kind}: {message}")]
    Raised {
        /// Error kind (for example `ArgumentError`).
        kind: String,
        /// Human-readable message.
        message: String,
    },

    /// No method with this name is reachable from the receiver's type.
    #[error("undefined method '{method}' for {type_name}")]
    NoMethod {
        /// Receiver type name.
        type_name: String,
        /// Requested method name.
        method: String,
    },

    /// The method was called with the wrong number of positional arguments.
    #[error("wrong number of arguments for '{method}' (given {given}, expected {expected})")]
    Arity {
        /// Method name.
        method: String,
        /// Number of positional arguments given.
        given: usize,
        /// Number of positional arguments expected.
        expected: usize,
    },

    /// An argument had an unexpected shape.
    #[error("invalid argument for '{method}': {message}")]
    InvalidArgument {
        /// Method name.
        method: String,
        /// Description of the problem.
        message: String,
    },

    /// An observer rejected or failed while handling a call event.
    #[error("observer failed: {0}")]
    Observer(String),
}

impl CallError {
    /// Create a raised error with the given kind and message.
    pub fn raised(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Raised {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Check whether this error was raised by method code.
    pub fn is_raised(&self) -> bool {
        matches!(self, CallError::Raised { .. })
    }
}

/// Errors while defining types or loading modules.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A type with this name already exists.
    #[error("Type already defined: {0}")]
    DuplicateType(String),

    /// The declared parent type does not exist.
    #[error("Unknown parent '{parent}' for type '{type_name}'")]
    UnknownParent {
        /// The type being defined.
        type_name: String,
        /// The missing parent.
        parent: String,
    },

    /// An included interface does not exist.
    #[error("Unknown interface '{interface}' included by '{type_name}'")]
    UnknownInterface {
        /// The type being defined.
        type_name: String,
        /// The missing interface.
        interface: String,
    },

    /// A class was included as if it were an interface.
    #[error("Type '{type_name}' cannot include '{interface}': not an interface")]
    NotAnInterface {
        /// The type being defined.
        type_name: String,
        /// The included type.
        interface: String,
    },

    /// An interface was used as a parent, or given a parent itself.
    #[error("Invalid parent '{parent}' for type '{type_name}'")]
    InvalidParent {
        /// The type being defined.
        type_name: String,
        /// The rejected parent.
        parent: String,
    },

    /// A load hook is already installed on this registry.
    #[error("Load hook already installed")]
    HookAlreadyInstalled,
}

/// Result type alias for method calls.
pub type CallResult<T> = std::result::Result<T, CallError>;

/// Result type alias for registry operations.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raised_display() {
        let err = CallError::raised("RuntimeError", "boom");
        assert_eq!(err.to_string(), "RuntimeError: boom");
        assert!(err.is_raised());
    }

    #[test]
    fn test_no_method_is_not_raised() {
        let err = CallError::NoMethod {
            type_name: "Widget".to_string(),
            method: "fly".to_string(),
        };
        assert!(!err.is_raised());
        assert_eq!(err.to_string(), "undefined method 'fly' for Widget");
    }
}
