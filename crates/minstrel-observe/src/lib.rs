//! Minstrel Observe
//!
//! Ready-made [`Observer`](minstrel_intercept::Observer) implementations:
//!
//! - [`CollectingObserver`]: keeps owned copies of events for inspection
//! - [`LoggingObserver`]: emits events through `tracing`
//! - [`TraceObserver`]: writes one human-readable or JSON line per event
//! - [`CallCounter`]: per-method call and exception counts, nesting depth
//! - [`ObserverSet`]: fans events out to several observers
//!
//! # Tracing to stderr
//!
//! ```
//! use std::sync::Arc;
//! use minstrel_core::prelude::*;
//! use minstrel_intercept::Engine;
//! use minstrel_observe::{TraceFormat, TraceObserver};
//!
//! let registry = TypeRegistry::new().into_shared();
//! let engine = Engine::new(Arc::clone(&registry)).unwrap();
//! engine.wrap_name("Widget", Arc::new(TraceObserver::stderr(TraceFormat::Human)));
//! ```
//!
//! # Counting
//!
//! ```
//! use std::sync::Arc;
//! use minstrel_core::prelude::*;
//! use minstrel_intercept::{Engine, SharedObserver};
//! use minstrel_observe::CallCounter;
//!
//! let registry = TypeRegistry::new().into_shared();
//! let doubler = registry
//!     .define(TypeSpec::class("Doubler").method("double", |_, args| {
//!         Ok(Value::from(args.get(0).and_then(Value::as_i64).unwrap_or(0) * 2))
//!     }))
//!     .unwrap();
//!
//! let engine = Engine::new(Arc::clone(&registry)).unwrap();
//! let counter = Arc::new(CallCounter::new());
//! engine.wrap(&doubler, Arc::clone(&counter) as SharedObserver);
//!
//! doubler.instantiate().call("double", &Arguments::new().with(2)).unwrap();
//! assert_eq!(counter.stats("Doubler#double").unwrap().calls, 1);
//! ```

pub mod events;
pub mod metrics;
pub mod trace;

// Re-export main types
pub use events::{CollectingObserver, LoggingObserver, ObserverSet, RecordedEvent};
pub use metrics::{CallCounter, CallSnapshot, MethodStats};
pub use trace::{TraceFormat, TraceObserver, format_line};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::events::{CollectingObserver, LoggingObserver, ObserverSet};
    pub use crate::metrics::{CallCounter, CallSnapshot};
    pub use crate::trace::{TraceFormat, TraceObserver};
}
