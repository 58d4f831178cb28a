//! The type registry.
//!
//! Every type that can be instrumented is defined through a [`TypeRegistry`].
//! Definitions arrive one at a time ([`TypeRegistry::define`]) or grouped into
//! named modules ([`TypeRegistry::load`]). After each of them completes the
//! registry runs its load hook, which is how deferred instrumentation requests
//! learn that new types may have become available.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{CallError, RegistryError, RegistryResult};
use crate::types::{TypeDef, TypeId, TypeKind, TypeRef, TypeSpec};
use crate::value::Value;

/// Name of the universal base type.
pub const OBJECT: &str = "Object";

/// Callback run after every definition or module load.
pub type LoadHook = Box<dyn Fn(&LoadEvent) + Send + Sync>;

/// Notification passed to the load hook.
#[derive(Debug, Clone)]
pub struct LoadEvent {
    /// Module name, or `None` for a standalone definition.
    pub module: Option<String>,
    /// Types defined by this load (empty if the module was already loaded).
    pub defined: Vec<TypeId>,
    /// Whether the module had been loaded before.
    pub already_loaded: bool,
}

/// Result of loading a module.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The module was loaded and defined these types.
    Loaded {
        /// The newly defined types, in definition order.
        types: Vec<TypeRef>,
    },
    /// The module had already been loaded; nothing was defined.
    AlreadyLoaded,
}

impl LoadOutcome {
    /// Check whether the module had already been loaded.
    pub fn is_already_loaded(&self) -> bool {
        matches!(self, LoadOutcome::AlreadyLoaded)
    }

    /// Types defined by this load.
    pub fn types(&self) -> &[TypeRef] {
        match self {
            LoadOutcome::Loaded { types } => types,
            LoadOutcome::AlreadyLoaded => &[],
        }
    }
}

/// A named group of type definitions loaded together.
#[derive(Debug)]
pub struct ModuleDef {
    name: String,
    types: Vec<TypeSpec>,
}

impl ModuleDef {
    /// Create an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// Add a type definition. Later types may refer to earlier ones.
    pub fn with_type(mut self, spec: TypeSpec) -> Self {
        self.types.push(spec);
        self
    }

    /// Get the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the types this module defines, in definition order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(TypeSpec::name)
    }
}

/// Information about a loaded module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    /// Module name.
    pub name: String,
    /// Names of the types it defined.
    pub types: Vec<String>,
}

/// Registry of every type known to the running program.
pub struct TypeRegistry {
    /// Types in definition order.
    types: RwLock<Vec<TypeRef>>,
    /// Name index.
    by_name: DashMap<String, TypeRef>,
    /// Loaded modules.
    modules: DashMap<String, ModuleInfo>,
    /// The universal base type.
    object: TypeRef,
    next_id: AtomicU64,
    load_hook: OnceLock<LoadHook>,
}

impl TypeRegistry {
    /// Create a registry containing only `Object`.
    pub fn new() -> Self {
        let object = Arc::new(TypeDef::from_spec(
            TypeId::OBJECT,
            object_spec(),
            None,
            None,
            Vec::new(),
        ));

        let by_name = DashMap::new();
        by_name.insert(OBJECT.to_string(), Arc::clone(&object));

        Self {
            types: RwLock::new(vec![Arc::clone(&object)]),
            by_name,
            modules: DashMap::new(),
            object,
            next_id: AtomicU64::new(TypeId::OBJECT.as_u64() + 1),
            load_hook: OnceLock::new(),
        }
    }

    /// Define a single type and run the load hook.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or a parent or interface is
    /// missing. Nothing is defined in that case.
    pub fn define(&self, spec: TypeSpec) -> RegistryResult<TypeRef> {
        let ty = {
            let mut types = self.types.write();
            let staged = self.stage(vec![spec], None)?;
            self.commit(&mut types, &staged);
            Arc::clone(&staged[0])
        };

        debug!(type_name = ty.name(), id = %ty.id(), "Defined type");

        self.fire(&LoadEvent {
            module: None,
            defined: vec![ty.id()],
            already_loaded: false,
        });
        Ok(ty)
    }

    /// Load a module and run the load hook.
    ///
    /// Loading a module that is already loaded defines nothing but still runs
    /// the hook.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the module's definitions is invalid. The
    /// module is then not loaded at all and the hook does not run.
    pub fn load(&self, module: ModuleDef) -> RegistryResult<LoadOutcome> {
        let ModuleDef { name, types: specs } = module;

        let outcome = {
            let mut types = self.types.write();
            if self.modules.contains_key(&name) {
                LoadOutcome::AlreadyLoaded
            } else {
                let staged = self.stage(specs, Some(&name))?;
                self.commit(&mut types, &staged);
                self.modules.insert(
                    name.clone(),
                    ModuleInfo {
                        name: name.clone(),
                        types: staged.iter().map(|ty| ty.name().to_string()).collect(),
                    },
                );
                LoadOutcome::Loaded { types: staged }
            }
        };

        match &outcome {
            LoadOutcome::Loaded { types } => {
                info!(module = %name, types = types.len(), "Loaded module");
            }
            LoadOutcome::AlreadyLoaded => {
                debug!(module = %name, "Module already loaded");
            }
        }

        self.fire(&LoadEvent {
            module: Some(name),
            defined: outcome.types().iter().map(|ty| ty.id()).collect(),
            already_loaded: outcome.is_already_loaded(),
        });
        Ok(outcome)
    }

    /// Install the load hook.
    ///
    /// # Errors
    ///
    /// A registry accepts exactly one hook; a second call fails with
    /// [`RegistryError::HookAlreadyInstalled`].
    pub fn install_load_hook<F>(&self, hook: F) -> RegistryResult<()>
    where
        F: Fn(&LoadEvent) + Send + Sync + 'static,
    {
        self.load_hook
            .set(Box::new(hook))
            .map_err(|_| RegistryError::HookAlreadyInstalled)?;
        debug!("Installed load hook");
        Ok(())
    }

    /// Check whether a load hook is installed.
    pub fn has_load_hook(&self) -> bool {
        self.load_hook.get().is_some()
    }

    /// Look up a type by name.
    pub fn resolve(&self, name: &str) -> Option<TypeRef> {
        self.by_name.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a type by identity.
    pub fn get(&self, id: TypeId) -> Option<TypeRef> {
        self.types.read().iter().find(|ty| ty.id() == id).cloned()
    }

    /// The universal base type.
    pub fn object(&self) -> &TypeRef {
        &self.object
    }

    /// Snapshot of every type currently known, in definition order.
    pub fn types(&self) -> Vec<TypeRef> {
        self.types.read().clone()
    }

    /// Number of known types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    /// Check if the registry holds no types. Never true, `Object` is always present.
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Check whether a module has been loaded.
    pub fn is_loaded(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Information about every loaded module.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        self.modules.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Validate specs and build their definitions without publishing them.
    ///
    /// Must be called with the `types` write lock held.
    fn stage(&self, specs: Vec<TypeSpec>, module: Option<&str>) -> RegistryResult<Vec<TypeRef>> {
        let mut staged: Vec<TypeRef> = Vec::with_capacity(specs.len());

        for spec in specs {
            if self.lookup(&staged, &spec.name).is_some() {
                return Err(RegistryError::DuplicateType(spec.name));
            }

            let parent = match (spec.kind, spec.parent.as_deref()) {
                (TypeKind::Interface, None) => None,
                (TypeKind::Class, None) => Some(Arc::clone(&self.object)),
                (TypeKind::Interface, Some(parent)) => {
                    return Err(RegistryError::InvalidParent {
                        type_name: spec.name.clone(),
                        parent: parent.to_string(),
                    });
                }
                (TypeKind::Class, Some(parent)) => {
                    let resolved = self.lookup(&staged, parent).ok_or_else(|| {
                        RegistryError::UnknownParent {
                            type_name: spec.name.clone(),
                            parent: parent.to_string(),
                        }
                    })?;
                    if resolved.kind() == TypeKind::Interface {
                        return Err(RegistryError::InvalidParent {
                            type_name: spec.name.clone(),
                            parent: parent.to_string(),
                        });
                    }
                    Some(resolved)
                }
            };

            let mut includes = Vec::with_capacity(spec.includes.len());
            for interface in &spec.includes {
                let resolved = self.lookup(&staged, interface).ok_or_else(|| {
                    RegistryError::UnknownInterface {
                        type_name: spec.name.clone(),
                        interface: interface.clone(),
                    }
                })?;
                if resolved.kind() != TypeKind::Interface {
                    return Err(RegistryError::NotAnInterface {
                        type_name: spec.name.clone(),
                        interface: interface.clone(),
                    });
                }
                includes.push(resolved);
            }

            let id = TypeId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
            staged.push(Arc::new(TypeDef::from_spec(
                id,
                spec,
                module.map(str::to_string),
                parent,
                includes,
            )));
        }

        Ok(staged)
    }

    fn commit(&self, types: &mut Vec<TypeRef>, staged: &[TypeRef]) {
        for ty in staged {
            self.by_name.insert(ty.name().to_string(), Arc::clone(ty));
            types.push(Arc::clone(ty));
        }
    }

    fn lookup(&self, staged: &[TypeRef], name: &str) -> Option<TypeRef> {
        staged
            .iter()
            .find(|ty| ty.name() == name)
            .cloned()
            .or_else(|| self.resolve(name))
    }

    fn fire(&self, event: &LoadEvent) {
        if let Some(hook) = self.load_hook.get() {
            hook(event);
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.len())
            .field("modules", &self.modules.len())
            .field("load_hook", &self.has_load_hook())
            .finish()
    }
}

/// A shared reference to a type registry.
pub type SharedRegistry = Arc<TypeRegistry>;

/// Extension trait for creating shared registries.
pub trait IntoShared {
    /// Convert into a shared registry reference.
    fn into_shared(self) -> SharedRegistry;
}

impl IntoShared for TypeRegistry {
    fn into_shared(self) -> SharedRegistry {
        Arc::new(self)
    }
}

/// Reflective and identity operations every instance inherits.
fn object_spec() -> TypeSpec {
    TypeSpec::class(OBJECT)
        .method("identity", |this, args| {
            args.expect_arity(0, "identity")?;
            Ok(Value::String(this.id().to_string()))
        })
        .method("type_name", |this, args| {
            args.expect_arity(0, "type_name")?;
            Ok(Value::String(this.type_name().to_string()))
        })
        .method("respond_to", |this, args| {
            let method = args.require_str(0, "respond_to")?;
            Ok(Value::Bool(this.respond_to(method)))
        })
        .method("send", |this, args| {
            let (method, rest) = args.shift().ok_or_else(|| CallError::Arity {
                method: "send".to_string(),
                given: 0,
                expected: 1,
            })?;
            let method = method.as_str().ok_or_else(|| CallError::InvalidArgument {
                method: "send".to_string(),
                message: format!("method name must be a string, got {method}"),
            })?;
            this.call(method, &rest)
        })
        .method("inspect", |this, _| {
            Ok(json!(format!(
                "#<{} {}>",
                this.type_name(),
                Value::Object(this.fields())
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Arguments;
    use parking_lot::Mutex;

    #[test]
    fn test_new_registry_has_object() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.object().id(), TypeId::OBJECT);
        assert!(registry.resolve(OBJECT).is_some());
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_define_assigns_ids() {
        let registry = TypeRegistry::new();
        let a = registry.define(TypeSpec::class("A")).unwrap();
        let b = registry.define(TypeSpec::class("B").extends("A")).unwrap();

        assert_ne!(a.id(), b.id());
        assert_eq!(registry.get(b.id()).unwrap().name(), "B");
        assert_eq!(b.parent().unwrap().name(), "A");
        assert_eq!(a.parent().unwrap().name(), OBJECT);
    }

    #[test]
    fn test_define_rejects_invalid() {
        let registry = TypeRegistry::new();
        registry.define(TypeSpec::class("A")).unwrap();
        registry.define(TypeSpec::interface("I")).unwrap();

        assert!(matches!(
            registry.define(TypeSpec::class("A")),
            Err(RegistryError::DuplicateType(_))
        ));
        assert!(matches!(
            registry.define(TypeSpec::class("B").extends("Missing")),
            Err(RegistryError::UnknownParent { .. })
        ));
        assert!(matches!(
            registry.define(TypeSpec::class("C").include("A")),
            Err(RegistryError::NotAnInterface { .. })
        ));
        assert!(matches!(
            registry.define(TypeSpec::class("D").extends("I")),
            Err(RegistryError::InvalidParent { .. })
        ));
        assert!(matches!(
            registry.define(TypeSpec::class("E").include("J")),
            Err(RegistryError::UnknownInterface { .. })
        ));
    }

    #[test]
    fn test_failed_load_defines_nothing() {
        let registry = TypeRegistry::new();
        let module = ModuleDef::new("broken")
            .with_type(TypeSpec::class("Good"))
            .with_type(TypeSpec::class("Bad").extends("Nowhere"));

        assert!(registry.load(module).is_err());
        assert!(registry.resolve("Good").is_none());
        assert!(!registry.is_loaded("broken"));
    }

    #[test]
    fn test_module_types_can_refer_to_each_other() {
        let registry = TypeRegistry::new();
        let module = ModuleDef::new("shapes")
            .with_type(TypeSpec::class("Shape"))
            .with_type(TypeSpec::class("Circle").extends("Shape"));
        assert_eq!(module.type_names().collect::<Vec<_>>(), vec!["Shape", "Circle"]);

        let outcome = registry.load(module).unwrap();
        assert_eq!(outcome.types().len(), 2);
        assert_eq!(registry.resolve("Circle").unwrap().module(), Some("shapes"));
        assert_eq!(registry.modules()[0].types, vec!["Shape", "Circle"]);
    }

    #[test]
    fn test_load_hook_fires_on_every_load() {
        let registry = TypeRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry
            .install_load_hook(move |event| {
                sink.lock()
                    .push((event.module.clone(), event.defined.len(), event.already_loaded));
            })
            .unwrap();

        registry
            .load(ModuleDef::new("m").with_type(TypeSpec::class("T")))
            .unwrap();
        let again = registry.load(ModuleDef::new("m")).unwrap();
        registry.define(TypeSpec::class("U")).unwrap();

        assert!(again.is_already_loaded());
        assert_eq!(
            *seen.lock(),
            vec![
                (Some("m".to_string()), 1, false),
                (Some("m".to_string()), 0, true),
                (None, 1, false),
            ]
        );
    }

    #[test]
    fn test_load_hook_installs_once() {
        let registry = TypeRegistry::new();
        registry.install_load_hook(|_| {}).unwrap();
        assert!(matches!(
            registry.install_load_hook(|_| {}),
            Err(RegistryError::HookAlreadyInstalled)
        ));
    }

    #[test]
    fn test_hook_may_define_types() {
        let registry = Arc::new(TypeRegistry::new());
        let weak = Arc::downgrade(&registry);
        registry
            .install_load_hook(move |event| {
                if event.module.as_deref() == Some("trigger") {
                    if let Some(registry) = weak.upgrade() {
                        registry.define(TypeSpec::class("Late")).unwrap();
                    }
                }
            })
            .unwrap();

        registry.load(ModuleDef::new("trigger")).unwrap();
        assert!(registry.resolve("Late").is_some());
    }

    #[test]
    fn test_object_reflection() {
        let registry = TypeRegistry::new();
        let greeter = registry
            .define(TypeSpec::class("Greeter").method("greet", |_, args| {
                Ok(json!(format!("hi {}", args.get(0).cloned().unwrap_or(Value::Null))))
            }))
            .unwrap();
        let obj = greeter.instantiate();

        let sent = obj
            .call("send", &Arguments::new().with("greet").with("bob"))
            .unwrap();
        assert_eq!(sent, json!("hi \"bob\""));
        assert_eq!(
            obj.call("respond_to", &Arguments::new().with("greet")).unwrap(),
            json!(true)
        );
        assert_eq!(
            obj.call("type_name", &Arguments::new()).unwrap(),
            json!("Greeter")
        );
        assert_eq!(
            obj.call("identity", &Arguments::new()).unwrap(),
            json!(obj.id().to_string())
        );
    }
}
