//! Minstrel Core - runtime object model
//!
//! This crate provides the dynamically dispatched object model that the
//! Minstrel interception engine instruments. It includes:
//!
//! - [`TypeRegistry`]: every type known to the program, plus the load hook
//! - [`TypeDef`]: a type with replaceable instance and static method tables
//! - [`Instance`]: an object whose calls go through its type's live tables
//! - [`Arguments`] and [`Value`]: opaque call values
//!
//! # Quick Start
//!
//! ```
//! use minstrel_core::prelude::*;
//!
//! let registry = TypeRegistry::new();
//! let widget = registry
//!     .define(TypeSpec::class("Widget").method("build", |_, args| {
//!         match args.get(0).and_then(Value::as_i64) {
//!             Some(0) => Err(CallError::raised("RuntimeError", "boom")),
//!             _ => Ok(Value::from("built")),
//!         }
//!     }))
//!     .unwrap();
//!
//! let w = widget.instantiate();
//! assert_eq!(w.call("build", &Arguments::new().with(1)).unwrap(), "built");
//! assert!(w.call("build", &Arguments::new().with(0)).is_err());
//! ```
//!
//! # Dispatch
//!
//! Method lookup walks the ancestor chain (the type, its interfaces, then its
//! parents up to `Object`) and takes the first table entry with a matching
//! name. Lookup happens on every call, so replacing an entry changes the
//! behaviour of existing instances immediately.

pub mod error;
pub mod instance;
pub mod method;
pub mod registry;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use error::{CallError, CallResult, RegistryError, RegistryResult};
pub use instance::{Instance, InstanceId};
pub use method::{InstanceFn, Method, MethodName, Scope, StaticFn, StaticMethod};
pub use registry::{
    IntoShared, LoadEvent, LoadHook, LoadOutcome, ModuleDef, ModuleInfo, OBJECT, SharedRegistry,
    TypeRegistry,
};
pub use types::{BUILTIN_STATICS, TypeDef, TypeId, TypeKind, TypeRef, TypeSpec};
pub use value::{Arguments, Value};

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use minstrel_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{CallError, CallResult};
    pub use crate::instance::Instance;
    pub use crate::method::{MethodName, Scope};
    pub use crate::registry::{IntoShared, ModuleDef, SharedRegistry, TypeRegistry};
    pub use crate::types::{TypeId, TypeRef, TypeSpec};
    pub use crate::value::{Arguments, Value};
}
