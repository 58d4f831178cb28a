//! Entries every deny list carries.

/// Reflective and identity instance methods on `Object` that are never
/// wrapped.
///
/// The engine relies on these while it works (dispatch by name, receiver
/// identity, type naming), so rebinding them would make instrumentation
/// observe itself.
pub const REFLECTIVE_METHODS: &[&str] = &["identity", "respond_to", "send", "type_name"];

/// Static operations on `Object` that are never wrapped.
///
/// Only the type's own `name` query is reserved; an instance method called
/// `name` is an ordinary user method.
pub const REFLECTIVE_STATICS: &[&str] = &["name"];
