//! The observer contract.
//!
//! An [`Observer`] is the only thing a consumer writes against: it receives a
//! [`CallEvent`] immediately before and immediately after every call to a
//! wrapped method.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use minstrel_core::{Arguments, CallResult, MethodName, Scope, TypeId};

/// Point in a call at which an observer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Before an instance method runs.
    Enter,
    /// After an instance method returned.
    Exit,
    /// After an instance method raised.
    ExitException,
    /// Before a static operation runs.
    ClassEnter,
    /// After a static operation returned.
    ClassExit,
    /// After a static operation raised.
    ClassExitException,
}

impl EventKind {
    /// The enter kind for a scope.
    pub fn enter(scope: Scope) -> Self {
        match scope {
            Scope::Instance => EventKind::Enter,
            Scope::Static => EventKind::ClassEnter,
        }
    }

    /// The exit kind for a scope, depending on whether the call raised.
    pub fn exit(scope: Scope, raised: bool) -> Self {
        match (scope, raised) {
            (Scope::Instance, false) => EventKind::Exit,
            (Scope::Instance, true) => EventKind::ExitException,
            (Scope::Static, false) => EventKind::ClassExit,
            (Scope::Static, true) => EventKind::ClassExitException,
        }
    }

    /// Get the event kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Enter => "enter",
            EventKind::Exit => "exit",
            EventKind::ExitException => "exit_exception",
            EventKind::ClassEnter => "class_enter",
            EventKind::ClassExit => "class_exit",
            EventKind::ClassExitException => "class_exit_exception",
        }
    }

    /// The scope of the call this event belongs to.
    pub fn scope(&self) -> Scope {
        match self {
            EventKind::Enter | EventKind::Exit | EventKind::ExitException => Scope::Instance,
            _ => Scope::Static,
        }
    }

    /// Check whether this is an enter event.
    pub fn is_enter(&self) -> bool {
        matches!(self, EventKind::Enter | EventKind::ClassEnter)
    }

    /// Check whether this is an exit after a raised error.
    pub fn is_exception(&self) -> bool {
        matches!(self, EventKind::ExitException | EventKind::ClassExitException)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single enter or exit notification.
#[derive(Debug, Clone, Copy)]
pub struct CallEvent<'a> {
    /// Where in the call this event occurs.
    pub kind: EventKind,
    /// The wrapped type.
    pub type_id: TypeId,
    /// Name of the wrapped type.
    pub type_name: &'a str,
    /// The wrapped method.
    pub method: &'a MethodName,
    /// The arguments of the call, identical at enter and exit.
    pub args: &'a Arguments,
}

/// Receives call events from wrapped methods.
///
/// Observers run inline on the calling thread. An error returned from
/// `observe` propagates to the caller of the instrumented method: at `enter`
/// the original is not invoked, at exit the observer's error replaces the
/// call's outcome.
///
/// Closures with the right signature are observers:
///
/// ```
/// use minstrel_core::CallResult;
/// use minstrel_intercept::{CallEvent, Observer};
///
/// let printer = |event: &CallEvent<'_>| -> CallResult<()> {
///     println!("{} {}#{}", event.kind, event.type_name, event.method);
///     Ok(())
/// };
/// fn assert_observer<O: Observer>(_: &O) {}
/// assert_observer(&printer);
/// ```
pub trait Observer: Send + Sync {
    /// Handle one event.
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()>;
}

impl<F> Observer for F
where
    F: Fn(&CallEvent<'_>) -> CallResult<()> + Send + Sync,
{
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()> {
        self(event)
    }
}

/// A shared observer reference.
pub type SharedObserver = Arc<dyn Observer>;
