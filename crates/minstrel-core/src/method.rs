//! Method names and callable method implementations.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::CallResult;
use crate::instance::Instance;
use crate::types::TypeRef;
use crate::value::{Arguments, Value};

/// Name of a method, unique within a (type, scope) pair.
///
/// # Example
///
/// ```
/// use minstrel_core::MethodName;
///
/// let greet = MethodName::new("greet");
/// assert_eq!(greet.as_str(), "greet");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodName(Cow<'static, str>);

impl MethodName {
    /// Create a new method name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MethodName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for MethodName {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MethodName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Whether a method is dispatched on instances or on the type itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Instance-level method.
    Instance,
    /// Type-level (static) operation.
    Static,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Instance => f.write_str("instance"),
            Scope::Static => f.write_str("static"),
        }
    }
}

/// Signature of an instance method body.
pub type InstanceFn = dyn Fn(&Instance, &Arguments) -> CallResult<Value> + Send + Sync;

/// Signature of a static method body. The receiver is the type the call was
/// dispatched on, which may be a descendant of the defining type.
pub type StaticFn = dyn Fn(&TypeRef, &Arguments) -> CallResult<Value> + Send + Sync;

/// A callable instance method implementation.
///
/// Cloning is cheap; clones share the same underlying closure.
#[derive(Clone)]
pub struct Method {
    inner: Arc<InstanceFn>,
}

impl Method {
    /// Wrap a closure as a method.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Instance, &Arguments) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Invoke the method on a receiver.
    pub fn invoke(&self, receiver: &Instance, args: &Arguments) -> CallResult<Value> {
        (self.inner)(receiver, args)
    }

    /// Check whether two handles share the same implementation.
    pub fn ptr_eq(&self, other: &Method) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// A callable static (type-level) method implementation.
#[derive(Clone)]
pub struct StaticMethod {
    inner: Arc<StaticFn>,
}

impl StaticMethod {
    /// Wrap a closure as a static method.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&TypeRef, &Arguments) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Invoke the method with the given receiver type.
    pub fn invoke(&self, receiver: &TypeRef, args: &Arguments) -> CallResult<Value> {
        (self.inner)(receiver, args)
    }

    /// Check whether two handles share the same implementation.
    pub fn ptr_eq(&self, other: &StaticMethod) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for StaticMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMethod")
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_method_name_borrow_lookup() {
        let mut table = BTreeMap::new();
        table.insert(MethodName::new("greet"), 1);
        table.insert(MethodName::from(String::from("build")), 2);

        assert_eq!(table.get("greet"), Some(&1));
        assert_eq!(table.get("build"), Some(&2));
        assert_eq!(table.get("missing"), None);
    }

    #[test]
    fn test_method_clone_shares_impl() {
        let m = Method::new(|_, _| Ok(Value::Null));
        let copy = m.clone();
        let other = Method::new(|_, _| Ok(Value::Null));

        assert!(m.ptr_eq(&copy));
        assert!(!m.ptr_eq(&other));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(Scope::Instance.to_string(), "instance");
        assert_eq!(Scope::Static.to_string(), "static");
    }
}
