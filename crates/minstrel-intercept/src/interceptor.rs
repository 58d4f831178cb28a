//! Method replacement.
//!
//! The interceptor walks every method a type exposes, filters it through the
//! deny list, and installs on the type's own table a wrapper that reports the
//! call to an observer around an invocation of the captured original.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use minstrel_core::{
    Arguments, CallResult, Method, MethodName, Scope, StaticMethod, TypeDef, TypeId, TypeRef,
    Value,
};
use minstrel_deny::{DenialReason, DenyDecision, DenyList};

use crate::observer::{CallEvent, EventKind, Observer, SharedObserver};
use crate::original::{OriginalHandle, OriginalKey, OriginalStore, Receiver};
use crate::tracker::WrapTracker;

/// A method that received a wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrappedMethod {
    /// Instance or static.
    pub scope: Scope,
    /// The method.
    pub method: MethodName,
    /// The wrapper looks the original up by name at call time.
    pub fallback: bool,
}

/// A method left alone because the deny list matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMethod {
    /// Instance or static.
    pub scope: Scope,
    /// Why it was skipped.
    pub reason: DenialReason,
}

/// What a single wrap did to a type.
#[derive(Debug, Clone, Serialize)]
pub struct WrapReport {
    /// The wrapped type.
    pub type_id: TypeId,
    /// Its name.
    pub type_name: String,
    /// Methods that now report to the observer.
    pub wrapped: Vec<WrappedMethod>,
    /// Deny-listed methods.
    pub skipped: Vec<SkippedMethod>,
}

impl WrapReport {
    fn new(ty: &TypeRef) -> Self {
        Self {
            type_id: ty.id(),
            type_name: ty.name().to_string(),
            wrapped: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Check whether a method received a wrapper.
    pub fn is_wrapped(&self, scope: Scope, method: &str) -> bool {
        self.wrapped
            .iter()
            .any(|m| m.scope == scope && m.method.as_str() == method)
    }

    /// Check whether a method was skipped.
    pub fn is_skipped(&self, scope: Scope, method: &str) -> bool {
        self.skipped
            .iter()
            .any(|m| m.scope == scope && m.reason.method.as_str() == method)
    }

    /// Methods whose wrapper uses dynamic lookup.
    pub fn fallbacks(&self) -> impl Iterator<Item = &WrappedMethod> {
        self.wrapped.iter().filter(|m| m.fallback)
    }
}

/// Result of asking to wrap a type.
#[derive(Debug, Clone)]
pub enum WrapOutcome {
    /// The type was wrapped by this call.
    Wrapped(WrapReport),
    /// The type had been wrapped before; nothing changed.
    AlreadyWrapped,
}

impl WrapOutcome {
    /// Check whether the type had already been wrapped.
    pub fn is_already_wrapped(&self) -> bool {
        matches!(self, WrapOutcome::AlreadyWrapped)
    }

    /// The report, if this call did the wrapping.
    pub fn report(&self) -> Option<&WrapReport> {
        match self {
            WrapOutcome::Wrapped(report) => Some(report),
            WrapOutcome::AlreadyWrapped => None,
        }
    }
}

/// Wraps types. Borrows the engine state for the duration of one operation.
pub(crate) struct Interceptor<'a> {
    pub(crate) deny: &'a DenyList,
    pub(crate) tracker: &'a mut WrapTracker,
    pub(crate) originals: &'a mut OriginalStore,
    pub(crate) log_skips: bool,
}

impl Interceptor<'_> {
    /// Wrap every non-denied method of `ty` with `observer`.
    ///
    /// The type is marked as wrapped before any method is touched.
    pub(crate) fn wrap(&mut self, ty: &TypeRef, observer: &SharedObserver) -> WrapOutcome {
        if !self.tracker.insert(ty.id()) {
            debug!(type_name = ty.name(), "Type already wrapped");
            return WrapOutcome::AlreadyWrapped;
        }

        let type_name: Arc<str> = Arc::from(ty.name());
        let mut report = WrapReport::new(ty);

        for method in ty.instance_method_names() {
            if let Some(reason) = self.denied(ty, Scope::Instance, &method) {
                report.skipped.push(SkippedMethod {
                    scope: Scope::Instance,
                    reason,
                });
                continue;
            }
            let Some((owner, live)) = ty.resolve_instance_owner(method.as_str()) else {
                continue;
            };

            let owner_key = OriginalKey::new(owner.id(), method.clone(), Scope::Instance);
            let original = self
                .originals
                .underlying(&owner_key, OriginalHandle::Instance(live));
            let site = CallSite::new(ty.id(), &type_name, method.clone(), Scope::Instance);
            let wrapper = instance_wrapper(site, original.clone(), Arc::clone(observer));

            ty.define_method(method.clone(), wrapper.clone());
            self.originals.record(
                OriginalKey::new(ty.id(), method.clone(), Scope::Instance),
                original,
                OriginalHandle::Instance(wrapper),
            );
            debug!(type_name = ty.name(), %method, "Wrapped instance method");
            report.wrapped.push(WrappedMethod {
                scope: Scope::Instance,
                method,
                fallback: false,
            });
        }

        for method in ty.static_method_names() {
            if let Some(reason) = self.denied(ty, Scope::Static, &method) {
                report.skipped.push(SkippedMethod {
                    scope: Scope::Static,
                    reason,
                });
                continue;
            }

            let original = match ty.resolve_static_owner(method.as_str()) {
                Some((owner, live)) => {
                    let owner_key = OriginalKey::new(owner.id(), method.clone(), Scope::Static);
                    self.originals
                        .underlying(&owner_key, OriginalHandle::Static(live))
                }
                None if TypeDef::is_builtin_static(method.as_str()) => {
                    OriginalHandle::Dynamic(method.clone())
                }
                None => continue,
            };
            let fallback = original.is_dynamic();
            if fallback {
                debug!(
                    type_name = ty.name(),
                    %method,
                    "No bindable handle, falling back to lookup by name"
                );
            }

            let site = CallSite::new(ty.id(), &type_name, method.clone(), Scope::Static);
            let wrapper = static_wrapper(site, original.clone(), Arc::clone(observer));

            ty.define_static_method(method.clone(), wrapper.clone());
            self.originals.record(
                OriginalKey::new(ty.id(), method.clone(), Scope::Static),
                original,
                OriginalHandle::Static(wrapper),
            );
            debug!(type_name = ty.name(), %method, fallback, "Wrapped static method");
            report.wrapped.push(WrappedMethod {
                scope: Scope::Static,
                method,
                fallback,
            });
        }

        info!(
            type_name = ty.name(),
            wrapped = report.wrapped.len(),
            skipped = report.skipped.len(),
            "Wrapped type"
        );
        WrapOutcome::Wrapped(report)
    }

    fn denied(&self, ty: &TypeRef, scope: Scope, method: &MethodName) -> Option<DenialReason> {
        match self.deny.evaluate(ty, scope, method.as_str()) {
            DenyDecision::Allowed => None,
            DenyDecision::Denied(reason) => {
                if self.log_skips {
                    info!(type_name = ty.name(), %scope, %reason, "Skipping method");
                } else {
                    debug!(type_name = ty.name(), %scope, %reason, "Skipping method");
                }
                Some(reason)
            }
        }
    }
}

fn instance_wrapper(site: CallSite, original: OriginalHandle, observer: SharedObserver) -> Method {
    Method::new(move |receiver, args| {
        site.observe(&*observer, args, || {
            original.invoke(Receiver::Instance(receiver), args)
        })
    })
}

fn static_wrapper(
    site: CallSite,
    original: OriginalHandle,
    observer: SharedObserver,
) -> StaticMethod {
    StaticMethod::new(move |receiver, args| {
        site.observe(&*observer, args, || {
            original.invoke(Receiver::Type(receiver), args)
        })
    })
}

/// What a wrapper reports about itself.
struct CallSite {
    type_id: TypeId,
    type_name: Arc<str>,
    method: MethodName,
    scope: Scope,
}

impl CallSite {
    fn new(type_id: TypeId, type_name: &Arc<str>, method: MethodName, scope: Scope) -> Self {
        Self {
            type_id,
            type_name: Arc::clone(type_name),
            method,
            scope,
        }
    }

    /// Run `call` between an enter and an exit event.
    ///
    /// The call's result is returned unchanged unless the observer fails.
    fn observe<F>(&self, observer: &dyn Observer, args: &Arguments, call: F) -> CallResult<Value>
    where
        F: FnOnce() -> CallResult<Value>,
    {
        observer.observe(&self.event(EventKind::enter(self.scope), args))?;
        let outcome = call();
        observer.observe(&self.event(EventKind::exit(self.scope, outcome.is_err()), args))?;
        outcome
    }

    fn event<'a>(&'a self, kind: EventKind, args: &'a Arguments) -> CallEvent<'a> {
        CallEvent {
            kind,
            type_id: self.type_id,
            type_name: &self.type_name,
            method: &self.method,
            args,
        }
    }
}
