//! The set of types that have already been wrapped.

use std::collections::BTreeSet;

use minstrel_core::TypeId;

/// Records every wrapped type so that wrapping stays idempotent.
///
/// The set only grows: wrapping is permanent for the life of the engine.
#[derive(Debug, Default)]
pub struct WrapTracker {
    wrapped: BTreeSet<TypeId>,
}

impl WrapTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a type as wrapped. Returns `false` if it already was.
    pub fn insert(&mut self, id: TypeId) -> bool {
        self.wrapped.insert(id)
    }

    /// Check whether a type has been wrapped.
    pub fn contains(&self, id: TypeId) -> bool {
        self.wrapped.contains(&id)
    }

    /// Number of wrapped types.
    pub fn len(&self) -> usize {
        self.wrapped.len()
    }

    /// Check if nothing has been wrapped.
    pub fn is_empty(&self) -> bool {
        self.wrapped.is_empty()
    }

    /// Iterate over wrapped types in identity order.
    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.wrapped.iter().copied()
    }
}
