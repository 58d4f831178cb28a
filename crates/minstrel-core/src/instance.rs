//! Instances of registered types.

use std::fmt;

use parking_lot::RwLock;
use serde_json::Map;
use uuid::Uuid;

use crate::error::CallResult;
use crate::types::TypeRef;
use crate::value::{Arguments, Value};

/// Unique identifier for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    /// Create a new random instance ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An object whose methods are dispatched through its type's live tables.
pub struct Instance {
    id: InstanceId,
    class: TypeRef,
    fields: RwLock<Map<String, Value>>,
}

impl Instance {
    pub(crate) fn new(class: TypeRef) -> Self {
        Self {
            id: InstanceId::new(),
            class,
            fields: RwLock::new(Map::new()),
        }
    }

    /// Get the instance ID.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Get the instance's type.
    pub fn class(&self) -> &TypeRef {
        &self.class
    }

    /// Get the name of the instance's type.
    pub fn type_name(&self) -> &str {
        self.class.name()
    }

    /// Read a field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.fields.read().get(field).cloned()
    }

    /// Write a field, returning the previous value.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.write().insert(field.into(), value.into())
    }

    /// Snapshot of all fields.
    pub fn fields(&self) -> Map<String, Value> {
        self.fields.read().clone()
    }

    /// Check whether a method is reachable from this instance.
    pub fn respond_to(&self, method: &str) -> bool {
        self.class.resolve_instance(method).is_some()
    }

    /// Dispatch a method call.
    ///
    /// The implementation is looked up at call time, so replacements installed
    /// after the instance was created take effect immediately.
    pub fn call(&self, method: &str, args: &Arguments) -> CallResult<Value> {
        let resolved = self
            .class
            .resolve_instance(method)
            .ok_or_else(|| self.class.no_method(method))?;
        resolved.invoke(self, args)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("type", &self.class.name())
            .field("fields", &*self.fields.read())
            .finish()
    }
}
