//! Runtime type definitions.
//!
//! A [`TypeDef`] is a dynamically dispatched type: an identity, a place in the
//! inheritance graph, and two method tables (instance and static) that can be
//! replaced at runtime. Dispatch always goes through the live tables, which is
//! what lets the interception layer swap implementations after the fact.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{CallError, CallResult};
use crate::instance::Instance;
use crate::method::{Method, MethodName, StaticMethod};
use crate::value::{Arguments, Value};

/// Type-level operations answered by the runtime itself.
///
/// They are visible through [`TypeDef::static_method_names`] but have no table
/// entry, so there is no handle to capture for them.
pub const BUILTIN_STATICS: &[&str] = &["ancestors", "instance_methods", "name"];

/// Stable identity of a type, assigned by the registry at definition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(u64);

impl TypeId {
    /// Identity of the universal base type `Object`.
    pub const OBJECT: TypeId = TypeId(0);

    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// A class: has a parent (implicitly `Object`) and can be instantiated.
    Class,
    /// An interface (mixin): has no parent and is included by other types.
    Interface,
}

/// Shared reference to a type definition.
pub type TypeRef = Arc<TypeDef>;

/// A type known to the registry.
pub struct TypeDef {
    id: TypeId,
    name: String,
    kind: TypeKind,
    module: Option<String>,
    parent: Option<TypeRef>,
    includes: Vec<TypeRef>,
    instance_methods: RwLock<BTreeMap<MethodName, Method>>,
    static_methods: RwLock<BTreeMap<MethodName, StaticMethod>>,
}

impl TypeDef {
    pub(crate) fn from_spec(
        id: TypeId,
        spec: TypeSpec,
        module: Option<String>,
        parent: Option<TypeRef>,
        includes: Vec<TypeRef>,
    ) -> Self {
        Self {
            id,
            name: spec.name,
            kind: spec.kind,
            module,
            parent,
            includes,
            instance_methods: RwLock::new(spec.methods.into_iter().collect()),
            static_methods: RwLock::new(spec.statics.into_iter().collect()),
        }
    }

    /// Get the type identity.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Get the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the type kind.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Get the module that defined this type, if any.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Get the parent type.
    pub fn parent(&self) -> Option<&TypeRef> {
        self.parent.as_ref()
    }

    /// Get the directly included interfaces, in inclusion order.
    pub fn includes(&self) -> &[TypeRef] {
        &self.includes
    }

    /// The ancestor chain, most-derived first.
    ///
    /// Order: the type itself, its included interfaces (last included first,
    /// each followed by its own includes), then the parent's chain. Classes end
    /// at `Object`. A type appearing twice keeps its first position.
    pub fn ancestors(self: &Arc<Self>) -> Vec<TypeRef> {
        let mut chain = Vec::new();
        let mut current = Some(Arc::clone(self));

        while let Some(ty) = current {
            push_unique(&mut chain, &ty);
            for iface in ty.includes.iter().rev() {
                for ancestor in iface.ancestors() {
                    push_unique(&mut chain, &ancestor);
                }
            }
            current = ty.parent.clone();
        }

        chain
    }

    /// Names of the ancestor chain.
    pub fn ancestor_names(self: &Arc<Self>) -> Vec<String> {
        self.ancestors()
            .iter()
            .map(|ty| ty.name.clone())
            .collect()
    }

    /// Check whether `id` is this type or one of its ancestors.
    pub fn is_a(self: &Arc<Self>, id: TypeId) -> bool {
        self.ancestors().iter().any(|ty| ty.id == id)
    }

    /// Resolve an instance method through the ancestor chain.
    pub fn resolve_instance(self: &Arc<Self>, name: &str) -> Option<Method> {
        self.resolve_instance_owner(name).map(|(_, method)| method)
    }

    /// Resolve an instance method along with the ancestor whose table holds it.
    pub fn resolve_instance_owner(self: &Arc<Self>, name: &str) -> Option<(TypeRef, Method)> {
        self.ancestors().into_iter().find_map(|ty| {
            let method = ty.instance_methods.read().get(name).cloned()?;
            Some((ty, method))
        })
    }

    /// Resolve a static method through the static tables of the ancestor chain.
    ///
    /// Built-in type operations are not returned here.
    pub fn resolve_static(self: &Arc<Self>, name: &str) -> Option<StaticMethod> {
        self.resolve_static_owner(name).map(|(_, method)| method)
    }

    /// Resolve a static method along with the ancestor whose table holds it.
    pub fn resolve_static_owner(self: &Arc<Self>, name: &str) -> Option<(TypeRef, StaticMethod)> {
        self.ancestors().into_iter().find_map(|ty| {
            let method = ty.static_methods.read().get(name).cloned()?;
            Some((ty, method))
        })
    }

    /// Check whether `name` is a built-in type operation.
    pub fn is_builtin_static(name: &str) -> bool {
        BUILTIN_STATICS.contains(&name)
    }

    /// Every instance method name reachable from this type.
    pub fn instance_method_names(self: &Arc<Self>) -> BTreeSet<MethodName> {
        let mut names = BTreeSet::new();
        for ty in self.ancestors() {
            names.extend(ty.instance_methods.read().keys().cloned());
        }
        names
    }

    /// Every static operation name reachable from this type, built-ins included.
    pub fn static_method_names(self: &Arc<Self>) -> BTreeSet<MethodName> {
        let mut names: BTreeSet<MethodName> = BUILTIN_STATICS
            .iter()
            .map(|name| MethodName::new(*name))
            .collect();
        for ty in self.ancestors() {
            names.extend(ty.static_methods.read().keys().cloned());
        }
        names
    }

    /// Instance methods defined directly on this type.
    pub fn own_instance_method_names(&self) -> Vec<MethodName> {
        self.instance_methods.read().keys().cloned().collect()
    }

    /// Install an instance method on this type's own table, returning the
    /// previous entry if one existed.
    pub fn define_method(&self, name: impl Into<MethodName>, method: Method) -> Option<Method> {
        self.instance_methods.write().insert(name.into(), method)
    }

    /// Install a static method on this type's own table, returning the
    /// previous entry if one existed.
    pub fn define_static_method(
        &self,
        name: impl Into<MethodName>,
        method: StaticMethod,
    ) -> Option<StaticMethod> {
        self.static_methods.write().insert(name.into(), method)
    }

    /// Dispatch a static operation on this type.
    pub fn call_static(self: &Arc<Self>, name: &str, args: &Arguments) -> CallResult<Value> {
        if let Some(method) = self.resolve_static(name) {
            return method.invoke(self, args);
        }
        self.call_builtin(name, args)
            .unwrap_or_else(|| Err(self.no_method(name)))
    }

    /// Answer a built-in type operation by name, bypassing the method tables.
    ///
    /// Returns `None` if `name` is not a built-in.
    pub fn call_builtin(self: &Arc<Self>, name: &str, args: &Arguments) -> Option<CallResult<Value>> {
        let result = match name {
            "name" => args
                .expect_arity(0, name)
                .map(|()| Value::String(self.name.clone())),
            "ancestors" => args.expect_arity(0, name).map(|()| {
                Value::Array(self.ancestor_names().into_iter().map(Value::String).collect())
            }),
            "instance_methods" => args.expect_arity(0, name).map(|()| {
                Value::Array(
                    self.instance_method_names()
                        .into_iter()
                        .map(|m| Value::String(m.to_string()))
                        .collect(),
                )
            }),
            _ => return None,
        };
        Some(result)
    }

    /// Create a new instance of this type.
    pub fn instantiate(self: &Arc<Self>) -> Instance {
        Instance::new(Arc::clone(self))
    }

    pub(crate) fn no_method(&self, method: &str) -> CallError {
        CallError::NoMethod {
            type_name: self.name.clone(),
            method: method.to_string(),
        }
    }
}

fn push_unique(chain: &mut Vec<TypeRef>, ty: &TypeRef) {
    if !chain.iter().any(|existing| existing.id == ty.id) {
        chain.push(Arc::clone(ty));
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("instance_methods", &self.instance_methods.read().len())
            .field("static_methods", &self.static_methods.read().len())
            .finish()
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Declarative description of a type, consumed by the registry.
///
/// # Example
///
/// ```
/// use minstrel_core::{TypeSpec, Value};
///
/// let spec = TypeSpec::class("Derived")
///     .extends("Base")
///     .method("greet", |_, _| Ok(Value::from("hi")));
/// assert_eq!(spec.name(), "Derived");
/// ```
pub struct TypeSpec {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) parent: Option<String>,
    pub(crate) includes: Vec<String>,
    pub(crate) methods: Vec<(MethodName, Method)>,
    pub(crate) statics: Vec<(MethodName, StaticMethod)>,
}

impl TypeSpec {
    fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            includes: Vec::new(),
            methods: Vec::new(),
            statics: Vec::new(),
        }
    }

    /// Describe a class.
    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Class)
    }

    /// Describe an interface.
    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    /// Set the parent type. Classes without one extend `Object`.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Include an interface.
    pub fn include(mut self, interface: impl Into<String>) -> Self {
        self.includes.push(interface.into());
        self
    }

    /// Add an instance method.
    pub fn method<F>(mut self, name: impl Into<MethodName>, f: F) -> Self
    where
        F: Fn(&Instance, &Arguments) -> CallResult<Value> + Send + Sync + 'static,
    {
        self.methods.push((name.into(), Method::new(f)));
        self
    }

    /// Add a static method.
    pub fn static_method<F>(mut self, name: impl Into<MethodName>, f: F) -> Self
    where
        F: Fn(&TypeRef, &Arguments) -> CallResult<Value> + Send + Sync + 'static,
    {
        self.statics.push((name.into(), StaticMethod::new(f)));
        self
    }

    /// Get the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the type kind.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("includes", &self.includes)
            .field("methods", &self.methods.len())
            .field("statics", &self.statics.len())
            .finish()
    }
}
