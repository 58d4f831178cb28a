//! Storage for pre-wrap method implementations.
//!
//! Every wrapped method keeps a handle to the implementation it replaced. The
//! handles are never released: wrapping is permanent for the life of the
//! engine, and each wrapper holds its own clone of the handle it forwards to.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use minstrel_core::{
    Arguments, CallError, CallResult, Instance, Method, MethodName, Scope, StaticMethod, TypeId,
    TypeRef, Value,
};

/// Key of an original implementation: which type, which method, which scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OriginalKey {
    /// Type the method was wrapped on.
    pub type_id: TypeId,
    /// The wrapped method.
    pub method: MethodName,
    /// Instance or static.
    pub scope: Scope,
}

impl OriginalKey {
    /// Create a key.
    pub fn new(type_id: TypeId, method: impl Into<MethodName>, scope: Scope) -> Self {
        Self {
            type_id,
            method: method.into(),
            scope,
        }
    }
}

impl fmt::Display for OriginalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = match self.scope {
            Scope::Instance => "#",
            Scope::Static => ".",
        };
        write!(f, "{}{}{}", self.type_id, sep, self.method)
    }
}

/// The receiver an original is invoked on.
#[derive(Debug, Clone, Copy)]
pub enum Receiver<'a> {
    /// An instance, for instance methods.
    Instance(&'a Instance),
    /// A type, for static operations.
    Type(&'a TypeRef),
}

/// A callable handle to a method's pre-wrap implementation.
#[derive(Debug, Clone)]
pub enum OriginalHandle {
    /// A captured instance method.
    Instance(Method),
    /// A captured static method.
    Static(StaticMethod),
    /// A built-in type operation with no table entry to capture, looked up by
    /// name on the receiver at call time.
    Dynamic(MethodName),
}

impl OriginalHandle {
    /// The scope this handle belongs to.
    pub fn scope(&self) -> Scope {
        match self {
            OriginalHandle::Instance(_) => Scope::Instance,
            OriginalHandle::Static(_) | OriginalHandle::Dynamic(_) => Scope::Static,
        }
    }

    /// Check whether this handle uses dynamic lookup instead of a bound
    /// implementation.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, OriginalHandle::Dynamic(_))
    }

    /// Invoke the original implementation, bypassing any observer.
    ///
    /// # Errors
    ///
    /// Returns whatever the original returns. A receiver of the wrong scope
    /// yields [`CallError::InvalidArgument`].
    pub fn invoke(&self, receiver: Receiver<'_>, args: &Arguments) -> CallResult<Value> {
        match (self, receiver) {
            (OriginalHandle::Instance(method), Receiver::Instance(instance)) => {
                method.invoke(instance, args)
            }
            (OriginalHandle::Static(method), Receiver::Type(ty)) => method.invoke(ty, args),
            (OriginalHandle::Dynamic(name), Receiver::Type(ty)) => ty
                .call_builtin(name.as_str(), args)
                .unwrap_or_else(|| {
                    Err(CallError::NoMethod {
                        type_name: ty.name().to_string(),
                        method: name.to_string(),
                    })
                }),
            (handle, _) => Err(CallError::InvalidArgument {
                method: "original".to_string(),
                message: format!("{} handle invoked on the wrong receiver", handle.scope()),
            }),
        }
    }

    pub(crate) fn ptr_eq(&self, other: &OriginalHandle) -> bool {
        match (self, other) {
            (OriginalHandle::Instance(a), OriginalHandle::Instance(b)) => a.ptr_eq(b),
            (OriginalHandle::Static(a), OriginalHandle::Static(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Every original captured by an engine, plus the wrappers installed over them.
#[derive(Debug, Default)]
pub struct OriginalStore {
    originals: HashMap<OriginalKey, OriginalHandle>,
    wrappers: HashMap<OriginalKey, OriginalHandle>,
}

impl OriginalStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an original and the wrapper installed in its place.
    ///
    /// The first original recorded for a key is kept.
    pub(crate) fn record(
        &mut self,
        key: OriginalKey,
        original: OriginalHandle,
        wrapper: OriginalHandle,
    ) {
        self.originals.entry(key.clone()).or_insert(original);
        self.wrappers.insert(key, wrapper);
    }

    /// Map a live implementation back to the original it wraps.
    ///
    /// `owner` is the key under which the live implementation was found. If
    /// it is a wrapper this store installed, the wrapped original is returned
    /// so that wrappers never stack; otherwise `live` is returned unchanged.
    pub(crate) fn underlying(&self, owner: &OriginalKey, live: OriginalHandle) -> OriginalHandle {
        match (self.wrappers.get(owner), self.originals.get(owner)) {
            (Some(wrapper), Some(original)) if wrapper.ptr_eq(&live) => original.clone(),
            _ => live,
        }
    }

    /// Get the original for a key.
    pub fn get(&self, key: &OriginalKey) -> Option<&OriginalHandle> {
        self.originals.get(key)
    }

    /// Number of recorded originals.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Iterate over recorded originals.
    pub fn iter(&self) -> impl Iterator<Item = (&OriginalKey, &OriginalHandle)> {
        self.originals.iter()
    }
}
