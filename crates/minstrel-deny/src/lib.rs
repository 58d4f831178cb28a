//! Minstrel Deny List
//!
//! This crate decides which methods the interception engine must never wrap.
//! Wrapping the engine's own control surface would make it observe itself,
//! and rebinding reflective operations (dispatch by name, identity) would
//! destabilise the machinery the engine relies on.
//!
//! # Evaluation
//!
//! A [`DenyList`] maps type identities to sets of method names, kept apart
//! per [`Scope`](minstrel_core::Scope). A method of a type is denied when any
//! element of the type's ancestor chain has an entry containing that method
//! in the same scope; the first match along the chain is reported.
//!
//! Entries are keyed by [`TypeId`](minstrel_core::TypeId), never by name, so
//! unrelated types that happen to share a name cannot match each other.
//! Name-based [`DenyRule`]s (as found in configuration files) are resolved to
//! identities once, when the list is built.
//!
//! # Usage
//!
//! ```
//! use minstrel_core::{Scope, TypeRegistry, TypeSpec};
//! use minstrel_deny::{DenyListBuilder, DenyRule};
//!
//! let registry = TypeRegistry::new();
//! registry.define(TypeSpec::class("Base")).unwrap();
//!
//! let deny = DenyListBuilder::new()
//!     .rule(DenyRule::new("Base", ["identity"]))
//!     .build(&registry)
//!     .unwrap();
//!
//! let base = registry.resolve("Base").unwrap();
//! assert!(deny.evaluate(&base, Scope::Instance, "identity").is_denied());
//! ```

pub mod builtin;
pub mod entry;
pub mod error;
pub mod list;

// Re-export main types
pub use builtin::{REFLECTIVE_METHODS, REFLECTIVE_STATICS};
pub use entry::{DenialReason, DenyDecision, DenyEntry, DenyRule};
pub use error::{DenyError, DenyResult};
pub use list::{DenyList, DenyListBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::entry::{DenyDecision, DenyRule};
    pub use crate::error::{DenyError, DenyResult};
    pub use crate::list::{DenyList, DenyListBuilder};
}
