//! Deny entries, rules and decisions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use minstrel_core::{MethodName, Scope, TypeId, TypeRef};

/// Methods that must never be wrapped on a type or any of its descendants.
///
/// Instance methods and static operations are tracked separately, so a type
/// may deny a static operation while a same-named instance method stays
/// wrappable.
#[derive(Debug, Clone)]
pub struct DenyEntry {
    type_id: TypeId,
    type_name: String,
    instance: BTreeSet<MethodName>,
    statics: BTreeSet<MethodName>,
}

impl DenyEntry {
    /// Create an entry denying `methods` in both scopes.
    pub fn new<I, M>(ty: &TypeRef, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MethodName>,
    {
        let methods: BTreeSet<MethodName> = methods.into_iter().map(Into::into).collect();
        Self {
            type_id: ty.id(),
            type_name: ty.name().to_string(),
            instance: methods.clone(),
            statics: methods,
        }
    }

    /// Create an entry denying `methods` in one scope only.
    pub fn scoped<I, M>(ty: &TypeRef, scope: Scope, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MethodName>,
    {
        let mut entry = Self {
            type_id: ty.id(),
            type_name: ty.name().to_string(),
            instance: BTreeSet::new(),
            statics: BTreeSet::new(),
        };
        entry
            .methods_mut(scope)
            .extend(methods.into_iter().map(Into::into));
        entry
    }

    /// The type this entry applies to.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Name of the type, for reporting.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The methods denied in `scope`.
    pub fn methods(&self, scope: Scope) -> &BTreeSet<MethodName> {
        match scope {
            Scope::Instance => &self.instance,
            Scope::Static => &self.statics,
        }
    }

    /// Check whether a method of the given scope is denied by this entry.
    pub fn denies(&self, scope: Scope, method: &str) -> bool {
        self.methods(scope).contains(method)
    }

    fn methods_mut(&mut self, scope: Scope) -> &mut BTreeSet<MethodName> {
        match scope {
            Scope::Instance => &mut self.instance,
            Scope::Static => &mut self.statics,
        }
    }

    pub(crate) fn merge(&mut self, other: DenyEntry) {
        self.instance.extend(other.instance);
        self.statics.extend(other.statics);
    }
}

/// A deny rule that names its type, as written in configuration.
///
/// Rules are resolved to type identities when the deny list is built.
///
/// # Example
///
/// ```
/// use minstrel_deny::DenyRule;
///
/// let rule = DenyRule::new("Base", ["identity"]);
/// assert_eq!(rule.type_name, "Base");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyRule {
    /// Name of the type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Method names to deny.
    pub methods: Vec<String>,
}

impl DenyRule {
    /// Create a rule.
    pub fn new<I, S>(type_name: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of evaluating a method against the deny list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyDecision {
    /// The method may be wrapped.
    Allowed,
    /// The method must not be wrapped.
    Denied(DenialReason),
}

impl DenyDecision {
    /// Check if the method may be wrapped.
    pub fn is_allowed(&self) -> bool {
        matches!(self, DenyDecision::Allowed)
    }

    /// Check if the method must be skipped.
    pub fn is_denied(&self) -> bool {
        matches!(self, DenyDecision::Denied(_))
    }
}

/// Why a method was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenialReason {
    /// The ancestor whose entry matched.
    pub denied_by: TypeId,
    /// Name of that ancestor.
    pub denied_by_name: String,
    /// The denied method.
    pub method: MethodName,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} denied by {}", self.method, self.denied_by_name)
    }
}
