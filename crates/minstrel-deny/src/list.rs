//! Deny list construction and evaluation.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, info};

use minstrel_core::{Scope, TypeId, TypeRef, TypeRegistry};

use crate::builtin::{REFLECTIVE_METHODS, REFLECTIVE_STATICS};
use crate::entry::{DenialReason, DenyDecision, DenyEntry, DenyRule};
use crate::error::{DenyError, DenyResult};

/// Table of methods that must never be wrapped.
///
/// A `DenyList` is immutable once built. It always contains the reflective
/// entries for `Object` in addition to whatever the builder added.
///
/// # Example
///
/// ```
/// use minstrel_core::{Scope, TypeRegistry, TypeSpec};
/// use minstrel_deny::DenyListBuilder;
///
/// let registry = TypeRegistry::new();
/// let base = registry.define(TypeSpec::class("Base")).unwrap();
/// let derived = registry.define(TypeSpec::class("Derived").extends("Base")).unwrap();
///
/// let deny = DenyListBuilder::new()
///     .deny(&base, ["identity"])
///     .build(&registry)
///     .unwrap();
///
/// assert!(deny.evaluate(&derived, Scope::Instance, "identity").is_denied());
/// assert!(deny.evaluate(&derived, Scope::Instance, "greet").is_allowed());
/// ```
#[derive(Debug, Clone)]
pub struct DenyList {
    entries: HashMap<TypeId, DenyEntry>,
}

impl DenyList {
    /// Evaluate a method of a type in the given scope.
    ///
    /// Walks the ancestor chain most-derived first; the first element whose
    /// entry denies `method` in `scope` wins.
    pub fn evaluate(&self, ty: &TypeRef, scope: Scope, method: &str) -> DenyDecision {
        for ancestor in ty.ancestors() {
            if let Some(entry) = self.entries.get(&ancestor.id()) {
                if entry.denies(scope, method) {
                    debug!(
                        type_name = ty.name(),
                        %scope,
                        method,
                        denied_by = entry.type_name(),
                        "Method denied"
                    );
                    return DenyDecision::Denied(DenialReason {
                        denied_by: entry.type_id(),
                        denied_by_name: entry.type_name().to_string(),
                        method: method.to_string().into(),
                    });
                }
            }
        }
        DenyDecision::Allowed
    }

    /// Get the entry for a type, if it has one.
    pub fn entry(&self, id: TypeId) -> Option<&DenyEntry> {
        self.entries.get(&id)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &DenyEntry> {
        self.entries.values()
    }
}

/// Builder for deny lists.
#[derive(Debug, Default)]
pub struct DenyListBuilder {
    entries: Vec<DenyEntry>,
    rules: Vec<DenyRule>,
}

impl DenyListBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny methods in both scopes on a type and its descendants.
    pub fn deny<I, M>(mut self, ty: &TypeRef, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<minstrel_core::MethodName>,
    {
        self.entries.push(DenyEntry::new(ty, methods));
        self
    }

    /// Deny methods of one scope on a type and its descendants.
    pub fn deny_scoped<I, M>(mut self, ty: &TypeRef, scope: Scope, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<minstrel_core::MethodName>,
    {
        self.entries.push(DenyEntry::scoped(ty, scope, methods));
        self
    }

    /// Deny every instance and static operation a type currently exposes.
    pub fn deny_all_of(self, ty: &TypeRef) -> Self {
        self.deny_scoped(ty, Scope::Instance, ty.instance_method_names())
            .deny_scoped(ty, Scope::Static, ty.static_method_names())
    }

    /// Add a name-based rule, resolved at build time.
    pub fn rule(mut self, rule: DenyRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add several name-based rules.
    pub fn rules(mut self, rules: impl IntoIterator<Item = DenyRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Check that every rule names a known type and lists methods.
    ///
    /// # Errors
    ///
    /// Returns the first error [`build`](Self::build) would report for the
    /// rules. Nothing is added to the registry either way.
    pub fn check_rules(&self, registry: &TypeRegistry) -> DenyResult<()> {
        resolve_rules(&self.rules, registry).map(|_| ())
    }

    /// Build the deny list.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule names an unknown type or lists no methods.
    pub fn build(self, registry: &TypeRegistry) -> DenyResult<DenyList> {
        let mut entries: HashMap<TypeId, DenyEntry> = HashMap::new();
        let mut add = |entry: DenyEntry| match entries.entry(entry.type_id()) {
            Entry::Occupied(mut existing) => existing.get_mut().merge(entry),
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        };

        let object = registry.object();
        add(DenyEntry::scoped(
            object,
            Scope::Instance,
            REFLECTIVE_METHODS.iter().copied(),
        ));
        add(DenyEntry::scoped(
            object,
            Scope::Static,
            REFLECTIVE_STATICS.iter().copied(),
        ));

        for entry in self.entries {
            add(entry);
        }

        for (ty, rule) in resolve_rules(&self.rules, registry)? {
            add(DenyEntry::new(&ty, rule.methods.iter().cloned()));
        }

        info!(entries = entries.len(), "Built deny list");
        Ok(DenyList { entries })
    }
}

fn resolve_rules<'a>(
    rules: &'a [DenyRule],
    registry: &TypeRegistry,
) -> DenyResult<Vec<(TypeRef, &'a DenyRule)>> {
    rules
        .iter()
        .map(|rule| {
            if rule.methods.is_empty() {
                return Err(DenyError::EmptyRule(rule.type_name.clone()));
            }
            let ty = registry
                .resolve(&rule.type_name)
                .ok_or_else(|| DenyError::UnknownType(rule.type_name.clone()))?;
            Ok((ty, rule))
        })
        .collect()
}
