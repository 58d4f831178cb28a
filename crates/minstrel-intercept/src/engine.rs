//! The interception engine.
//!
//! An [`Engine`] owns the mutable wrapping state of one
//! [`TypeRegistry`](minstrel_core::TypeRegistry): the wrap tracker, the
//! captured originals and the deferred requests. Every operation that reads
//! or changes that state runs under a single mutex, so concurrent requests
//! for the same type are serialised rather than racing.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use minstrel_core::{
    Arguments, CallError, LoadEvent, MethodName, RegistryError, Scope, SharedRegistry,
    StaticMethod, TypeId, TypeRef, TypeSpec, Value,
};
use minstrel_deny::{DenyList, DenyListBuilder, DenyRule};

use crate::config::EngineConfig;
use crate::deferred::{DeferredRegistry, Target};
use crate::error::{EngineError, EngineResult};
use crate::interceptor::{Interceptor, WrapOutcome};
use crate::observer::SharedObserver;
use crate::original::{OriginalHandle, OriginalKey, OriginalStore};
use crate::tracker::WrapTracker;

/// Static operations of the control surface type.
pub const CONTROL_OPERATIONS: &[&str] = &["drain", "pending", "wrapped_types"];

/// Mutable wrapping state, guarded by the engine mutex.
#[derive(Debug, Default)]
struct EngineState {
    tracker: WrapTracker,
    deferred: DeferredRegistry,
    originals: OriginalStore,
}

struct Shared {
    registry: SharedRegistry,
    deny: DenyList,
    config: EngineConfig,
    control: TypeRef,
    state: Mutex<EngineState>,
}

/// What a drain of the deferred requests did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Types wrapped by this drain, in the order they were wrapped.
    pub wrapped: Vec<String>,
    /// Requests still pending afterwards, the wrap-all request included.
    pub pending: usize,
}

/// The call-interception engine.
///
/// Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use minstrel_core::{Arguments, CallResult, IntoShared, TypeRegistry, TypeSpec, Value};
/// use minstrel_intercept::{CallEvent, Engine, SharedObserver};
///
/// let registry = TypeRegistry::new().into_shared();
/// let engine = Engine::new(Arc::clone(&registry)).unwrap();
///
/// let observer: SharedObserver = Arc::new(|event: &CallEvent<'_>| -> CallResult<()> {
///     println!("{} {}#{}({})", event.kind, event.type_name, event.method, event.args);
///     Ok(())
/// });
///
/// // Not defined yet: the request is parked.
/// assert!(!engine.wrap_name("Greeter", observer));
///
/// registry
///     .define(TypeSpec::class("Greeter").method("greet", |_, _| Ok(Value::from("hi"))))
///     .unwrap();
///
/// let greeter = registry.resolve("Greeter").unwrap();
/// assert!(engine.is_wrapped(greeter.id()));
/// assert_eq!(greeter.instantiate().call("greet", &Arguments::new()).unwrap(), "hi");
/// ```
#[derive(Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Create a builder for an engine over `registry`.
    pub fn builder(registry: SharedRegistry) -> EngineBuilder {
        EngineBuilder::new(registry)
    }

    /// Create an engine with the default configuration.
    ///
    /// # Errors
    ///
    /// See [`EngineBuilder::build`].
    pub fn new(registry: SharedRegistry) -> EngineResult<Self> {
        EngineBuilder::new(registry).build()
    }

    /// Wrap a resolved type.
    ///
    /// Returns [`WrapOutcome::AlreadyWrapped`] without touching anything if
    /// the type was wrapped before, whatever observer it was wrapped with.
    pub fn wrap(&self, ty: &TypeRef, observer: SharedObserver) -> WrapOutcome {
        let mut state = self.shared.state.lock();
        self.wrap_locked(&mut state, ty, &observer)
    }

    /// Wrap a type by name, or park the request until the type exists.
    ///
    /// Returns `true` if the type was resolvable and is now wrapped. Returns
    /// `false` if it is not defined yet; the request then replaces any earlier
    /// pending request for the same name and is retried after every load.
    pub fn wrap_name(&self, name: &str, observer: SharedObserver) -> bool {
        let mut state = self.shared.state.lock();
        match self.shared.registry.resolve(name) {
            Some(ty) => {
                state.deferred.remove_named(name);
                self.wrap_locked(&mut state, &ty, &observer);
                true
            }
            None => {
                state.deferred.insert(Target::named(name), observer);
                info!(type_name = name, "Type not defined yet, deferring wrap");
                false
            }
        }
    }

    /// Wrap every type defined now or later.
    ///
    /// The request is stored permanently and applied to the types known now.
    /// Returns the number of types wrapped by this call.
    pub fn wrap_all(&self, observer: SharedObserver) -> usize {
        let mut state = self.shared.state.lock();
        state.deferred.insert(Target::All, SharedObserver::clone(&observer));
        let wrapped = self.wrap_all_locked(&mut state, &observer);
        info!(wrapped = wrapped.len(), "Wrap-all requested");
        wrapped.len()
    }

    /// Submit a request for a target.
    ///
    /// Returns `true` when nothing is left pending for the target. The
    /// wrap-all request always stays pending, so it returns `false`.
    pub fn request(&self, target: Target, observer: SharedObserver) -> bool {
        match target {
            Target::Named(name) => self.wrap_name(&name, observer),
            Target::All => {
                self.wrap_all(observer);
                false
            }
        }
    }

    /// Retry the deferred requests.
    ///
    /// With a wrap-all request present, every unwrapped type is wrapped with
    /// its observer and the request is kept. Otherwise each named request
    /// whose type now resolves is fulfilled and removed. Runs automatically
    /// after every load.
    pub fn drain(&self) -> DrainReport {
        let mut state = self.shared.state.lock();

        let all = state.deferred.all().cloned();
        let wrapped = match all {
            Some(observer) => self.wrap_all_locked(&mut state, &observer),
            None => {
                let mut wrapped = Vec::new();
                for (name, observer) in state.deferred.named() {
                    let Some(ty) = self.shared.registry.resolve(&name) else {
                        continue;
                    };
                    if !self.wrap_locked(&mut state, &ty, &observer).is_already_wrapped() {
                        wrapped.push(ty);
                    }
                    state.deferred.remove_named(&name);
                    info!(type_name = %name, "Fulfilled deferred wrap");
                }
                wrapped
            }
        };

        let report = DrainReport {
            wrapped: wrapped.iter().map(|ty| ty.name().to_string()).collect(),
            pending: state.deferred.len(),
        };
        debug!(
            wrapped = report.wrapped.len(),
            pending = report.pending,
            "Drained deferred requests"
        );
        report
    }

    /// Check whether a type has been wrapped.
    pub fn is_wrapped(&self, id: TypeId) -> bool {
        self.shared.state.lock().tracker.contains(id)
    }

    /// Every wrapped type, in identity order.
    pub fn wrapped_types(&self) -> Vec<TypeRef> {
        let ids: Vec<TypeId> = self.shared.state.lock().tracker.iter().collect();
        ids.into_iter()
            .filter_map(|id| self.shared.registry.get(id))
            .collect()
    }

    /// Every pending request.
    pub fn pending(&self) -> Vec<Target> {
        self.shared.state.lock().deferred.targets()
    }

    /// The implementation a wrapper replaced, callable without observers.
    pub fn original(&self, ty: &TypeRef, method: &str, scope: Scope) -> Option<OriginalHandle> {
        let key = OriginalKey::new(ty.id(), MethodName::new(method.to_string()), scope);
        self.shared.state.lock().originals.get(&key).cloned()
    }

    /// The registry this engine instruments.
    pub fn registry(&self) -> &SharedRegistry {
        &self.shared.registry
    }

    /// The deny list in effect.
    pub fn deny_list(&self) -> &DenyList {
        &self.shared.deny
    }

    /// The control surface type.
    pub fn control_type(&self) -> &TypeRef {
        &self.shared.control
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    fn wrap_locked(
        &self,
        state: &mut EngineState,
        ty: &TypeRef,
        observer: &SharedObserver,
    ) -> WrapOutcome {
        let EngineState {
            tracker, originals, ..
        } = state;
        Interceptor {
            deny: &self.shared.deny,
            tracker,
            originals,
            log_skips: self.shared.config.log_skips,
        }
        .wrap(ty, observer)
    }

    /// Wrap every known type that is not wrapped yet, returning those wrapped.
    fn wrap_all_locked(&self, state: &mut EngineState, observer: &SharedObserver) -> Vec<TypeRef> {
        let mut wrapped = Vec::new();
        for ty in self.shared.registry.types() {
            if state.tracker.contains(ty.id()) {
                continue;
            }
            if !self.wrap_locked(state, &ty, observer).is_already_wrapped() {
                wrapped.push(ty);
            }
        }
        wrapped
    }

    fn on_load(&self, event: &LoadEvent) {
        debug!(
            module = event.module.as_deref().unwrap_or("-"),
            defined = event.defined.len(),
            already_loaded = event.already_loaded,
            "Load completed"
        );
        self.drain();
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Engine")
            .field("control", &self.shared.control.name())
            .field("wrapped", &state.tracker.len())
            .field("pending", &state.deferred)
            .field("originals", &state.originals.len())
            .finish()
    }
}

/// Builder for engines.
pub struct EngineBuilder {
    registry: SharedRegistry,
    config: EngineConfig,
    deny: DenyListBuilder,
}

impl EngineBuilder {
    /// Create a builder over `registry`.
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            deny: DenyListBuilder::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a name-based deny rule.
    pub fn with_deny_rule(mut self, rule: DenyRule) -> Self {
        self.config.deny.push(rule);
        self
    }

    /// Deny methods on a resolved type and its descendants.
    pub fn deny<I, M>(mut self, ty: &TypeRef, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MethodName>,
    {
        self.deny = self.deny.deny(ty, methods);
        self
    }

    /// Build the engine.
    ///
    /// Checks the configured deny rules, then registers the control surface
    /// type, builds the deny list and installs the load hook. A failed build
    /// leaves the registry untouched.
    ///
    /// # Errors
    ///
    /// Fails if the registry already has a load hook (one engine per
    /// registry), if the control type name is taken, or if a deny rule names
    /// an unknown type.
    pub fn build(self) -> EngineResult<Engine> {
        let Self {
            registry,
            config,
            deny,
        } = self;

        if registry.has_load_hook() {
            return Err(EngineError::Registry(RegistryError::HookAlreadyInstalled));
        }

        let deny = deny.rules(config.deny.iter().cloned());
        deny.check_rules(&registry)?;

        let control = registry.define(TypeSpec::class(config.control_type.clone()))?;
        let deny = deny
            .deny(&control, CONTROL_OPERATIONS.iter().copied())
            .deny_all_of(&control)
            .build(&registry)?;

        let shared = Arc::new(Shared {
            registry: Arc::clone(&registry),
            deny,
            config,
            control: Arc::clone(&control),
            state: Mutex::new(EngineState::default()),
        });

        install_control_surface(&control, Arc::downgrade(&shared));

        let weak = Arc::downgrade(&shared);
        registry.install_load_hook(move |event: &LoadEvent| {
            if let Some(shared) = weak.upgrade() {
                Engine { shared }.on_load(event);
            }
        })?;

        info!(
            control = control.name(),
            deny_entries = shared.deny.len(),
            "Interception engine ready"
        );
        Ok(Engine { shared })
    }
}

/// Install the control operations as static methods of `control`.
///
/// They hold a weak reference so that the registry does not keep the engine
/// alive.
fn install_control_surface(control: &TypeRef, shared: Weak<Shared>) {
    let op = |name: &'static str, run: fn(&Engine) -> Value| {
        let shared = Weak::clone(&shared);
        StaticMethod::new(move |_: &TypeRef, args: &Arguments| {
            args.expect_arity(0, name)?;
            let shared = shared
                .upgrade()
                .ok_or_else(|| CallError::raised("EngineError", "engine has been dropped"))?;
            Ok(run(&Engine { shared }))
        })
    };

    control.define_static_method(
        "wrapped_types",
        op("wrapped_types", |engine| {
            let names: BTreeSet<String> = engine
                .wrapped_types()
                .iter()
                .map(|ty| ty.name().to_string())
                .collect();
            Value::from(names.into_iter().collect::<Vec<_>>())
        }),
    );
    control.define_static_method(
        "pending",
        op("pending", |engine| {
            Value::from(
                engine
                    .pending()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
            )
        }),
    );
    control.define_static_method(
        "drain",
        op("drain", |engine| Value::from(engine.drain().wrapped)),
    );
}

/// An engine shared between threads.
pub type SharedEngine = Arc<Engine>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONTROL_TYPE;
    use crate::observer::{CallEvent, EventKind};
    use minstrel_core::{CallResult, IntoShared, ModuleDef, TypeRegistry};

    type Event = (EventKind, String, String, Arguments);

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl Recorder {
        fn observer(&self) -> SharedObserver {
            let events = Arc::clone(&self.events);
            Arc::new(move |event: &CallEvent<'_>| -> CallResult<()> {
                events.lock().push((
                    event.kind,
                    event.type_name.to_string(),
                    event.method.to_string(),
                    event.args.clone(),
                ));
                Ok(())
            })
        }

        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    fn event(kind: EventKind, ty: &str, method: &str, args: Arguments) -> Event {
        (kind, ty.to_string(), method.to_string(), args)
    }

    fn widget_spec() -> TypeSpec {
        TypeSpec::class("Widget").method("build", |_, args| {
            match args.get(0).and_then(Value::as_i64) {
                Some(0) => Err(CallError::raised("RuntimeError", "boom")),
                Some(n) => Ok(Value::from(n * 10)),
                None => Ok(Value::Null),
            }
        })
    }

    #[test]
    fn test_derived_greet_scenario() {
        let registry = TypeRegistry::new().into_shared();
        let base = registry.define(TypeSpec::class("Base")).unwrap();
        let derived = registry
            .define(
                TypeSpec::class("Derived")
                    .extends("Base")
                    .method("greet", |_, _| Ok(Value::from("hi"))),
            )
            .unwrap();
        let engine = Engine::builder(Arc::clone(&registry))
            .deny(&base, ["identity"])
            .build()
            .unwrap();
        let recorder = Recorder::default();

        engine.wrap(&derived, recorder.observer());
        let instance = derived.instantiate();

        let value = instance.call("greet", &Arguments::new()).unwrap();
        assert_eq!(value, "hi");
        assert_eq!(
            recorder.take(),
            vec![
                event(EventKind::Enter, "Derived", "greet", Arguments::new()),
                event(EventKind::Exit, "Derived", "greet", Arguments::new()),
            ]
        );

        instance.call("identity", &Arguments::new()).unwrap();
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_widget_boom_scenario() {
        let registry = TypeRegistry::new().into_shared();
        let widget = registry.define(widget_spec()).unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();

        engine.wrap(&widget, recorder.observer());

        let args = Arguments::new().with(0);
        let err = widget.instantiate().call("build", &args).unwrap_err();
        assert_eq!(err, CallError::raised("RuntimeError", "boom"));
        assert_eq!(
            recorder.take(),
            vec![
                event(EventKind::Enter, "Widget", "build", args.clone()),
                event(EventKind::ExitException, "Widget", "build", args),
            ]
        );
    }

    #[test]
    fn test_return_values_and_arguments_pass_through() {
        let registry = TypeRegistry::new().into_shared();
        let echo = registry
            .define(TypeSpec::class("Echo").method("echo", |_, args| {
                Ok(serde_json::to_value(args).unwrap_or(Value::Null))
            }))
            .unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let instance = echo.instantiate();
        let args = Arguments::positional([1, 2, 3]).with_named("scale", 2);

        let before = instance.call("echo", &args).unwrap();
        engine.wrap(&echo, Recorder::default().observer());
        let after = instance.call("echo", &args).unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_wrap_is_idempotent() {
        let registry = TypeRegistry::new().into_shared();
        let widget = registry.define(widget_spec()).unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let first = Recorder::default();
        let second = Recorder::default();

        assert!(!engine.wrap(&widget, first.observer()).is_already_wrapped());
        assert!(engine.wrap(&widget, second.observer()).is_already_wrapped());

        widget
            .instantiate()
            .call("build", &Arguments::new().with(1))
            .unwrap();
        assert_eq!(first.take().len(), 2);
        assert!(second.take().is_empty());
    }

    #[test]
    fn test_deferred_name_resolves_on_load() {
        let registry = TypeRegistry::new().into_shared();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();

        assert!(!engine.wrap_name("Widget", recorder.observer()));
        assert_eq!(engine.pending(), vec![Target::named("Widget")]);

        registry
            .load(ModuleDef::new("widgets").with_type(widget_spec()))
            .unwrap();

        let widget = registry.resolve("Widget").unwrap();
        assert!(engine.is_wrapped(widget.id()));
        assert!(engine.pending().is_empty());

        widget
            .instantiate()
            .call("build", &Arguments::new().with(2))
            .unwrap();
        assert_eq!(recorder.take().len(), 2);
    }

    #[test]
    fn test_unrelated_load_keeps_request_pending() {
        let registry = TypeRegistry::new().into_shared();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();

        assert!(!engine.wrap_name("Widget", Recorder::default().observer()));
        registry.define(TypeSpec::class("Gadget")).unwrap();

        assert_eq!(engine.pending(), vec![Target::named("Widget")]);
        assert!(!engine.is_wrapped(registry.resolve("Gadget").unwrap().id()));
    }

    #[test]
    fn test_repeated_load_still_drains() {
        let registry = TypeRegistry::new().into_shared();
        // Defined before the engine exists, so no drain has seen it.
        registry
            .load(ModuleDef::new("widgets").with_type(widget_spec()))
            .unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();

        engine
            .shared
            .state
            .lock()
            .deferred
            .insert(Target::named("Widget"), Recorder::default().observer());

        let outcome = registry
            .load(ModuleDef::new("widgets").with_type(widget_spec()))
            .unwrap();
        assert!(outcome.is_already_loaded());

        let widget = registry.resolve("Widget").unwrap();
        assert!(engine.is_wrapped(widget.id()));
        assert!(engine.pending().is_empty());
    }

    #[test]
    fn test_wrap_all_covers_future_types() {
        let registry = TypeRegistry::new().into_shared();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();

        // Object and the control type.
        assert_eq!(engine.wrap_all(recorder.observer()), 2);
        assert!(!engine.request(Target::All, recorder.observer()));

        registry.define(widget_spec()).unwrap();
        let widget = registry.resolve("Widget").unwrap();
        assert!(engine.is_wrapped(widget.id()));
        assert_eq!(engine.pending(), vec![Target::All]);

        widget
            .instantiate()
            .call("build", &Arguments::new().with(3))
            .unwrap();
        let methods: Vec<_> = recorder
            .take()
            .into_iter()
            .map(|(kind, ty, method, _)| (kind, ty, method))
            .collect();
        assert_eq!(
            methods,
            vec![
                (EventKind::Enter, "Widget".to_string(), "build".to_string()),
                (EventKind::Exit, "Widget".to_string(), "build".to_string()),
            ]
        );
    }

    #[test]
    fn test_wrap_all_leaves_named_requests_pending() {
        let registry = TypeRegistry::new().into_shared();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();

        engine.wrap_name("Later", Recorder::default().observer());
        engine.wrap_all(Recorder::default().observer());
        registry.define(TypeSpec::class("Later")).unwrap();

        let later = registry.resolve("Later").unwrap();
        assert!(engine.is_wrapped(later.id()));
        assert_eq!(engine.pending(), vec![Target::named("Later"), Target::All]);
    }

    #[test]
    fn test_static_operations_report_class_events() {
        let registry = TypeRegistry::new().into_shared();
        let widget = registry
            .define(widget_spec().static_method("create", |ty, _| Ok(Value::from(ty.name()))))
            .unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();
        engine.wrap(&widget, recorder.observer());

        assert_eq!(widget.call_static("create", &Arguments::new()).unwrap(), "Widget");
        assert_eq!(
            widget
                .call_static("instance_methods", &Arguments::new().with(1))
                .unwrap_err(),
            CallError::Arity {
                method: "instance_methods".to_string(),
                given: 1,
                expected: 0,
            }
        );

        let kinds: Vec<_> = recorder.take().into_iter().map(|e| e.0).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ClassEnter,
                EventKind::ClassExit,
                EventKind::ClassEnter,
                EventKind::ClassExitException,
            ]
        );

        let original = engine.original(&widget, "instance_methods", Scope::Static).unwrap();
        assert!(original.is_dynamic());
    }

    #[test]
    fn test_nested_calls_are_lifo() {
        let registry = TypeRegistry::new().into_shared();
        let outer = registry
            .define(
                TypeSpec::class("Outer")
                    .method("run", |this, _| this.call("step", &Arguments::new()))
                    .method("step", |_, _| Ok(Value::from(1))),
            )
            .unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();
        engine.wrap(&outer, recorder.observer());

        outer.instantiate().call("run", &Arguments::new()).unwrap();

        let sequence: Vec<_> = recorder
            .take()
            .into_iter()
            .map(|(kind, _, method, _)| format!("{kind} {method}"))
            .collect();
        assert_eq!(sequence, ["enter run", "enter step", "exit step", "exit run"]);
    }

    #[test]
    fn test_observer_error_at_exit_replaces_result() {
        let registry = TypeRegistry::new().into_shared();
        let widget = registry.define(widget_spec()).unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();

        engine.wrap(
            &widget,
            Arc::new(|event: &CallEvent<'_>| -> CallResult<()> {
                if event.kind == EventKind::Exit {
                    return Err(CallError::Observer("exit rejected".to_string()));
                }
                Ok(())
            }),
        );

        let result = widget.instantiate().call("build", &Arguments::new().with(1));
        assert_eq!(result, Err(CallError::Observer("exit rejected".to_string())));
    }

    #[test]
    fn test_original_bypasses_observer() {
        let registry = TypeRegistry::new().into_shared();
        let widget = registry.define(widget_spec()).unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();
        engine.wrap(&widget, recorder.observer());

        let instance = widget.instantiate();
        let original = engine.original(&widget, "build", Scope::Instance).unwrap();
        let value = original
            .invoke(
                crate::original::Receiver::Instance(&instance),
                &Arguments::new().with(4),
            )
            .unwrap();

        assert_eq!(value, 40);
        assert!(recorder.take().is_empty());
        assert!(engine.original(&widget, "identity", Scope::Instance).is_none());
    }

    #[test]
    fn test_control_surface_is_never_wrapped() {
        let registry = TypeRegistry::new().into_shared();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();

        engine.wrap_name("Pending", recorder.observer());
        let control = Arc::clone(engine.control_type());
        let outcome = engine.wrap(&control, recorder.observer());

        assert!(outcome.report().unwrap().wrapped.is_empty());
        assert_eq!(
            control.call_static("pending", &Arguments::new()).unwrap(),
            serde_json::json!(["Pending"])
        );
        assert_eq!(
            control.call_static("wrapped_types", &Arguments::new()).unwrap(),
            serde_json::json!([engine.config().control_type])
        );
        assert_eq!(
            control.call_static("drain", &Arguments::new()).unwrap(),
            serde_json::json!([])
        );
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_one_engine_per_registry() {
        let registry = TypeRegistry::new().into_shared();
        let _engine = Engine::new(Arc::clone(&registry)).unwrap();

        assert!(matches!(
            Engine::new(Arc::clone(&registry)),
            Err(EngineError::Registry(RegistryError::HookAlreadyInstalled))
        ));
    }

    #[test]
    fn test_unknown_deny_rule_fails_build() {
        let registry = TypeRegistry::new().into_shared();
        let result = Engine::builder(registry)
            .with_deny_rule(DenyRule::new("Ghost", ["x"]))
            .build();

        assert!(matches!(result, Err(EngineError::Deny(_))));
    }

    #[test]
    fn test_build_can_be_retried_after_bad_rule() {
        let registry = TypeRegistry::new().into_shared();
        for rule in [
            DenyRule::new("Ghost", ["x"]),
            DenyRule::new("Object", Vec::<String>::new()),
        ] {
            let result = Engine::builder(Arc::clone(&registry))
                .with_deny_rule(rule)
                .build();
            assert!(matches!(result, Err(EngineError::Deny(_))));
            assert!(registry.resolve(DEFAULT_CONTROL_TYPE).is_none());
            assert!(!registry.has_load_hook());
        }

        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        assert_eq!(engine.control_type().name(), DEFAULT_CONTROL_TYPE);
    }

    #[test]
    fn test_concurrent_wraps_wrap_once() {
        let registry = TypeRegistry::new().into_shared();
        let widget = registry.define(widget_spec()).unwrap();
        let engine = Engine::new(Arc::clone(&registry)).unwrap();
        let recorder = Recorder::default();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                let widget = Arc::clone(&widget);
                let observer = recorder.observer();
                std::thread::spawn(move || !engine.wrap(&widget, observer).is_already_wrapped())
            })
            .collect();
        let wrapped = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|wrapped| *wrapped)
            .count();
        assert_eq!(wrapped, 1);

        widget
            .instantiate()
            .call("build", &Arguments::new().with(1))
            .unwrap();
        assert_eq!(recorder.take().len(), 2);
    }
}
