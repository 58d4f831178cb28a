//! Wrap requests waiting for their type to appear.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::observer::SharedObserver;

/// The sentinel that stands for every type, present and future.
pub const ALL_SENTINEL: &str = ":all:";

/// What a wrap request targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// A single type, by name.
    Named(String),
    /// Every type.
    All,
}

impl Target {
    /// Create a named target.
    pub fn named(name: impl Into<String>) -> Self {
        Target::Named(name.into())
    }

    /// Check whether this is the wrap-all target.
    pub fn is_all(&self) -> bool {
        matches!(self, Target::All)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Named(name) => f.write_str(name),
            Target::All => f.write_str(ALL_SENTINEL),
        }
    }
}

impl FromStr for Target {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            ALL_SENTINEL => Target::All,
            name => Target::Named(name.to_string()),
        })
    }
}

/// Pending wrap requests, at most one per target.
///
/// Named entries are removed once their type is wrapped. The [`Target::All`]
/// entry is never removed.
#[derive(Default)]
pub struct DeferredRegistry {
    entries: BTreeMap<Target, SharedObserver>,
}

impl DeferredRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a request, replacing any earlier one for the same target.
    pub fn insert(&mut self, target: Target, observer: SharedObserver) -> Option<SharedObserver> {
        self.entries.insert(target, observer)
    }

    /// Remove a named request. The wrap-all request cannot be removed.
    pub fn remove_named(&mut self, name: &str) -> Option<SharedObserver> {
        self.entries.remove(&Target::named(name))
    }

    /// The wrap-all observer, if one was requested.
    pub fn all(&self) -> Option<&SharedObserver> {
        self.entries.get(&Target::All)
    }

    /// Snapshot of the named requests.
    pub fn named(&self) -> Vec<(String, SharedObserver)> {
        self.entries
            .iter()
            .filter_map(|(target, observer)| match target {
                Target::Named(name) => Some((name.clone(), SharedObserver::clone(observer))),
                Target::All => None,
            })
            .collect()
    }

    /// Every pending target.
    pub fn targets(&self) -> Vec<Target> {
        self.entries.keys().cloned().collect()
    }

    /// Check whether a target is pending.
    pub fn contains(&self, target: &Target) -> bool {
        self.entries.contains_key(target)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DeferredRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredRegistry")
            .field("targets", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::CallEvent;
    use minstrel_core::CallResult;
    use std::sync::Arc;

    fn noop() -> SharedObserver {
        Arc::new(|_: &CallEvent<'_>| -> CallResult<()> { Ok(()) })
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(":all:".parse::<Target>().unwrap(), Target::All);
        assert_eq!(" Widget ".parse::<Target>().unwrap(), Target::named("Widget"));
        assert_eq!(Target::All.to_string(), ALL_SENTINEL);
    }

    #[test]
    fn test_one_entry_per_target() {
        let mut deferred = DeferredRegistry::new();
        assert!(deferred.insert(Target::named("Widget"), noop()).is_none());
        assert!(deferred.insert(Target::named("Widget"), noop()).is_some());
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn test_all_is_not_removed_by_name() {
        let mut deferred = DeferredRegistry::new();
        deferred.insert(Target::All, noop());
        deferred.insert(Target::named("Widget"), noop());

        assert!(deferred.remove_named(ALL_SENTINEL).is_none());
        assert!(deferred.remove_named("Widget").is_some());
        assert!(deferred.all().is_some());
        assert!(deferred.named().is_empty());
        assert_eq!(deferred.targets(), vec![Target::All]);
    }
}
