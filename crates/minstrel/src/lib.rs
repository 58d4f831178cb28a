//! # Minstrel - Runtime Call Interception
//!
//! Minstrel wraps every method of a type, chosen at runtime, so that an
//! observer runs immediately before and after each real call. Types that do
//! not exist yet can be requested by name; the request is fulfilled as soon
//! as a module defining them is loaded.
//!
//! ## Quick Start
//!
//! ```
//! use minstrel::prelude::*;
//! use minstrel::minstrel_core::ModuleDef;
//!
//! let runtime = Minstrel::builder().build().unwrap();
//! let collector = Arc::new(CollectingObserver::default());
//!
//! // Nothing named Widget is loaded yet, so the request is deferred.
//! let spec = InstrumentSpec::parse("Widget").unwrap();
//! let report = runtime.instrument(&spec, collector.clone());
//! assert_eq!(report.deferred.len(), 1);
//!
//! runtime
//!     .registry()
//!     .load(ModuleDef::new("widgets").with_type(
//!         TypeSpec::class("Widget").method("build", |_, args| Ok(args.len().into())),
//!     ))
//!     .unwrap();
//!
//! let widget = runtime.registry().resolve("Widget").unwrap().instantiate();
//! let built = widget.call("build", &Arguments::new().with(0)).unwrap();
//! assert_eq!(built, 1);
//! assert_eq!(collector.len(), 2);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Your Application                     │
//! ├─────────────────────────────────────────────────────────┤
//! │                    minstrel (facade)                    │
//! │      MinstrelBuilder · MinstrelConfig · InstrumentSpec  │
//! │                             │                           │
//! │  ┌─────────────────────┬────┴─────────┬──────────────┐  │
//! │  │ minstrel-intercept  │ minstrel-deny│ minstrel-    │  │
//! │  │ (engine, originals, │ (deny list)  │ observe      │  │
//! │  │  deferred requests) │              │ (observers)  │  │
//! │  └─────────────────────┴──────────────┴──────────────┘  │
//! ├─────────────────────────────────────────────────────────┤
//! │         minstrel-core (types, dispatch, loading)        │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use minstrel_core::{IntoShared, SharedRegistry, TypeId, TypeRegistry};
use minstrel_deny::DenyRule;
use minstrel_intercept::{Engine, EngineConfig, SharedObserver, Target};
use minstrel_observe::{TraceFormat, TraceObserver};

pub mod config;
pub mod error;
pub mod frontend;

// Re-export main types
pub use config::{MinstrelConfig, TraceConfig};
pub use error::{ConfigError, MinstrelError, MinstrelResult, SpecError};
pub use frontend::{INSTRUMENT_ENV, InstrumentSpec};

// Re-export from sub-crates
pub use minstrel_core;
pub use minstrel_deny;
pub use minstrel_intercept;
pub use minstrel_observe;

/// Main entry point for Minstrel.
pub struct Minstrel;

impl Minstrel {
    /// Create a new runtime builder.
    pub fn builder() -> MinstrelBuilder {
        MinstrelBuilder::new()
    }

    /// Create a runtime over a fresh registry with default configuration.
    pub fn with_defaults() -> MinstrelResult<MinstrelRuntime> {
        MinstrelBuilder::new().build()
    }
}

/// Builder for configuring a Minstrel runtime.
pub struct MinstrelBuilder {
    registry: Option<SharedRegistry>,
    engine_config: EngineConfig,
    trace_format: TraceFormat,
    instrument: Option<String>,
}

impl MinstrelBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            registry: None,
            engine_config: EngineConfig::default(),
            trace_format: TraceFormat::default(),
            instrument: None,
        }
    }

    /// Instrument an existing registry instead of a fresh one.
    pub fn with_registry(mut self, registry: SharedRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the engine configuration.
    pub fn with_engine_config(mut self, config: EngineConfig) -> Self {
        self.engine_config = config;
        self
    }

    /// Add a deny rule.
    pub fn with_deny_rule(mut self, rule: DenyRule) -> Self {
        self.engine_config.deny.push(rule);
        self
    }

    /// Report skipped methods at `info`.
    pub fn with_log_skips(mut self, enabled: bool) -> Self {
        self.engine_config.log_skips = enabled;
        self
    }

    /// Set the format of the trace observer.
    pub fn with_trace_format(mut self, format: TraceFormat) -> Self {
        self.trace_format = format;
        self
    }

    /// Apply a file configuration.
    pub fn with_config(mut self, config: MinstrelConfig) -> Self {
        self.engine_config = config.engine_config();
        self.trace_format = config.trace.format;
        self.instrument = config.instrument;
        self
    }

    /// Build the runtime.
    ///
    /// # Errors
    ///
    /// Fails if the registry already has an engine or a deny rule names a
    /// type the registry does not know.
    pub fn build(self) -> MinstrelResult<MinstrelRuntime> {
        let registry = self
            .registry
            .unwrap_or_else(|| TypeRegistry::new().into_shared());
        let engine = Engine::builder(Arc::clone(&registry))
            .with_config(self.engine_config)
            .build()?;

        Ok(MinstrelRuntime {
            engine,
            registry,
            trace_format: self.trace_format,
            instrument: self.instrument,
        })
    }
}

impl Default for MinstrelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What [`MinstrelRuntime::instrument`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentReport {
    /// Types wrapped right away.
    pub wrapped: Vec<String>,
    /// Requests left pending until a load defines their type.
    pub deferred: Vec<Target>,
}

/// A configured Minstrel runtime.
pub struct MinstrelRuntime {
    engine: Engine,
    registry: SharedRegistry,
    trace_format: TraceFormat,
    instrument: Option<String>,
}

impl MinstrelRuntime {
    /// Get a reference to the engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Get the instrumented registry.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// The configured trace format.
    pub fn trace_format(&self) -> TraceFormat {
        self.trace_format
    }

    /// A trace observer writing to standard error.
    pub fn trace_observer(&self) -> SharedObserver {
        Arc::new(TraceObserver::stderr(self.trace_format))
    }

    /// Request wrapping of every target in `spec`.
    pub fn instrument(&self, spec: &InstrumentSpec, observer: SharedObserver) -> InstrumentReport {
        let mut report = InstrumentReport::default();

        for target in spec.targets() {
            match target {
                Target::Named(name) => {
                    if self.engine.wrap_name(&name, Arc::clone(&observer)) {
                        report.wrapped.push(name);
                    } else {
                        report.deferred.push(Target::Named(name));
                    }
                }
                Target::All => {
                    let before = self.wrapped_ids();
                    self.engine.request(Target::All, Arc::clone(&observer));
                    report.wrapped.extend(
                        self.engine
                            .wrapped_types()
                            .iter()
                            .filter(|ty| !before.contains(&ty.id()))
                            .map(|ty| ty.name().to_string()),
                    );
                    report.deferred.push(Target::All);
                }
            }
        }

        info!(
            spec = %spec,
            wrapped = report.wrapped.len(),
            deferred = report.deferred.len(),
            "Applied instrument spec"
        );
        report
    }

    /// The spec to apply at startup.
    ///
    /// `env` is the value of [`INSTRUMENT_ENV`]; when it is unset or blank
    /// the configured `instrument` value is used.
    pub fn startup_spec(&self, env: Option<String>) -> Result<Option<InstrumentSpec>, SpecError> {
        match InstrumentSpec::from_env_value(env)? {
            Some(spec) => Ok(Some(spec)),
            None => InstrumentSpec::from_env_value(self.instrument.clone()),
        }
    }

    /// Instrument from [`INSTRUMENT_ENV`] with a stderr trace observer.
    ///
    /// Returns `None` when neither the environment nor the configuration
    /// names anything to instrument.
    pub fn install_from_env(&self) -> MinstrelResult<Option<InstrumentReport>> {
        let env = std::env::var(INSTRUMENT_ENV).ok();
        let Some(spec) = self.startup_spec(env)? else {
            return Ok(None);
        };
        Ok(Some(self.instrument(&spec, self.trace_observer())))
    }

    fn wrapped_ids(&self) -> BTreeSet<TypeId> {
        self.engine
            .wrapped_types()
            .iter()
            .map(|ty| ty.id())
            .collect()
    }
}

impl std::fmt::Debug for MinstrelRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinstrelRuntime")
            .field("engine", &self.engine)
            .field("trace_format", &self.trace_format)
            .finish()
    }
}

/// Prelude module for convenient imports.
pub mod prelude {
    // Main types
    pub use crate::{
        InstrumentReport, InstrumentSpec, Minstrel, MinstrelBuilder, MinstrelConfig,
        MinstrelError, MinstrelRuntime,
    };

    // Core types
    pub use minstrel_core::{
        Arguments, CallError, CallResult, Instance, Scope, TypeRef, TypeRegistry, TypeSpec, Value,
    };

    // Engine types
    pub use minstrel_deny::DenyRule;
    pub use minstrel_intercept::{
        CallEvent, Engine, EngineConfig, EventKind, Observer, SharedObserver, Target,
    };

    // Observer types
    pub use minstrel_observe::{
        CallCounter, CollectingObserver, LoggingObserver, ObserverSet, TraceFormat, TraceObserver,
    };

    // Common std types
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use minstrel_core::{Arguments, ModuleDef, TypeSpec, Value};
    use minstrel_intercept::EventKind;
    use minstrel_observe::CollectingObserver;

    fn widget() -> TypeSpec {
        TypeSpec::class("Widget")
            .method("build", |_, _| Ok(Value::from("built")))
            .method("reset", |_, _| Ok(Value::Null))
    }

    #[test]
    fn test_builder() {
        let runtime = Minstrel::builder()
            .with_log_skips(true)
            .with_trace_format(TraceFormat::Json)
            .build()
            .unwrap();

        assert!(runtime.engine().config().log_skips);
        assert_eq!(runtime.trace_format(), TraceFormat::Json);
        assert!(runtime.registry().has_load_hook());
    }

    #[test]
    fn test_instrument_now_and_later() {
        let runtime = Minstrel::with_defaults().unwrap();
        runtime.registry().define(widget()).unwrap();
        let collector = Arc::new(CollectingObserver::default());

        let spec = InstrumentSpec::parse("Widget,Gadget").unwrap();
        let report = runtime.instrument(&spec, collector.clone());
        assert_eq!(report.wrapped, vec!["Widget".to_string()]);
        assert_eq!(report.deferred, vec![Target::named("Gadget")]);

        runtime
            .registry()
            .load(ModuleDef::new("gadgets").with_type(
                TypeSpec::class("Gadget").method("spin", |_, _| Ok(Value::Bool(true))),
            ))
            .unwrap();
        assert!(runtime.engine().pending().is_empty());

        let gadget = runtime.registry().resolve("Gadget").unwrap().instantiate();
        assert_eq!(gadget.call("spin", &Arguments::new()).unwrap(), true);

        let kinds: Vec<EventKind> = collector.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Enter, EventKind::Exit]);
    }

    #[test]
    fn test_instrument_all() {
        let runtime = Minstrel::with_defaults().unwrap();
        runtime.registry().define(widget()).unwrap();
        let collector = Arc::new(CollectingObserver::default());

        let report = runtime.instrument(&InstrumentSpec::All, collector.clone());
        assert!(report.wrapped.contains(&"Widget".to_string()));
        assert_eq!(report.deferred, vec![Target::All]);
        assert_eq!(runtime.engine().pending(), vec![Target::All]);

        let second = runtime.instrument(&InstrumentSpec::All, collector);
        assert!(second.wrapped.is_empty());
    }

    #[test]
    fn test_config_deny_rule() {
        let registry = TypeRegistry::new().into_shared();
        registry.define(widget()).unwrap();

        let config = MinstrelConfig::from_toml_str(
            r#"
            instrument = "Widget"

            [[deny]]
            type = "Widget"
            methods = ["reset"]
            "#,
        )
        .unwrap();
        let runtime = Minstrel::builder()
            .with_registry(Arc::clone(&registry))
            .with_config(config)
            .build()
            .unwrap();

        let collector = Arc::new(CollectingObserver::default());
        let spec = runtime.startup_spec(None).unwrap().unwrap();
        runtime.instrument(&spec, collector.clone());

        let widget = registry.resolve("Widget").unwrap().instantiate();
        widget.call("reset", &Arguments::new()).unwrap();
        assert!(collector.is_empty());
        widget.call("build", &Arguments::new()).unwrap();
        assert_eq!(collector.len(), 2);
    }

    #[test]
    fn test_unknown_deny_type_fails() {
        let result = Minstrel::builder()
            .with_deny_rule(DenyRule::new("Missing", ["run"]))
            .build();
        assert!(matches!(result, Err(MinstrelError::Engine(_))));
    }

    #[test]
    fn test_startup_spec_prefers_environment() {
        let config = MinstrelConfig {
            instrument: Some("Widget".to_string()),
            ..MinstrelConfig::default()
        };
        let runtime = Minstrel::builder().with_config(config).build().unwrap();

        assert_eq!(
            runtime.startup_spec(Some(":all:".to_string())).unwrap(),
            Some(InstrumentSpec::All)
        );
        assert_eq!(
            runtime.startup_spec(None).unwrap(),
            Some(InstrumentSpec::Names(vec!["Widget".to_string()]))
        );
        assert!(runtime.startup_spec(Some(",".to_string())).is_err());
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _runtime = Minstrel::builder().build().unwrap();
        let _format = TraceFormat::default();
    }
}
