//! Minstrel Intercept
//!
//! This crate is the call-interception engine. Given a type chosen at
//! runtime, it replaces every method the type exposes with a wrapper that
//! reports the call to an [`Observer`] immediately before and after the real
//! invocation. It includes:
//!
//! - [`Engine`]: wrapping, deferred requests, wrap-all and the load hook
//! - [`Observer`] and [`CallEvent`]: the contract consumers write against
//! - [`WrapTracker`], [`OriginalStore`], [`DeferredRegistry`]: the engine's
//!   bookkeeping
//!
//! # Wrapping
//!
//! ```
//! use std::sync::Arc;
//! use minstrel_core::prelude::*;
//! use minstrel_intercept::{CallEvent, Engine, EventKind, SharedObserver};
//!
//! let registry = TypeRegistry::new().into_shared();
//! let widget = registry
//!     .define(TypeSpec::class("Widget").method("build", |_, args| {
//!         match args.get(0).and_then(Value::as_i64) {
//!             Some(0) => Err(CallError::raised("RuntimeError", "boom")),
//!             _ => Ok(Value::from("built")),
//!         }
//!     }))
//!     .unwrap();
//!
//! let engine = Engine::new(Arc::clone(&registry)).unwrap();
//! let observer: SharedObserver = Arc::new(|event: &CallEvent<'_>| -> CallResult<()> {
//!     if event.kind == EventKind::ExitException {
//!         eprintln!("{}#{} raised", event.type_name, event.method);
//!     }
//!     Ok(())
//! });
//! engine.wrap(&widget, observer);
//!
//! let err = widget.instantiate().call("build", &Arguments::new().with(0)).unwrap_err();
//! assert_eq!(err, CallError::raised("RuntimeError", "boom"));
//! ```
//!
//! # Guarantees
//!
//! - A type is wrapped at most once; later requests are no-ops.
//! - Every wrapped call produces one enter event and then exactly one exit or
//!   exit-exception event, with the same type, method and arguments.
//! - Return values and errors reach the caller unchanged.
//! - Deny-listed methods are never wrapped.
//! - Requests for undefined types are fulfilled by the load hook as soon as
//!   the type is defined.

pub mod config;
pub mod deferred;
pub mod engine;
pub mod error;
pub mod interceptor;
pub mod observer;
pub mod original;
pub mod tracker;

// Re-export main types
pub use config::{DEFAULT_CONTROL_TYPE, EngineConfig};
pub use deferred::{ALL_SENTINEL, DeferredRegistry, Target};
pub use engine::{CONTROL_OPERATIONS, DrainReport, Engine, EngineBuilder, SharedEngine};
pub use error::{EngineError, EngineResult};
pub use interceptor::{SkippedMethod, WrapOutcome, WrapReport, WrappedMethod};
pub use observer::{CallEvent, EventKind, Observer, SharedObserver};
pub use original::{OriginalHandle, OriginalKey, OriginalStore, Receiver};
pub use tracker::WrapTracker;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::deferred::Target;
    pub use crate::engine::{Engine, EngineBuilder};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::interceptor::WrapOutcome;
    pub use crate::observer::{CallEvent, EventKind, Observer, SharedObserver};
}
