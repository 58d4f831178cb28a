//! Call counting.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use minstrel_core::CallResult;
use minstrel_intercept::{CallEvent, Observer};

/// Counts per `Type#method`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStats {
    /// Calls entered.
    pub calls: u64,
    /// Calls that returned normally.
    pub returns: u64,
    /// Calls that raised.
    pub exceptions: u64,
}

impl MethodStats {
    /// Calls entered but not yet exited.
    pub fn in_flight(&self) -> u64 {
        self.calls.saturating_sub(self.returns + self.exceptions)
    }
}

#[derive(Debug, Default)]
struct CounterState {
    methods: BTreeMap<String, MethodStats>,
    depth: u64,
    max_depth: u64,
}

/// An observer that counts calls and tracks nesting depth.
///
/// Depth is counted across all threads.
#[derive(Debug, Default)]
pub struct CallCounter {
    state: RwLock<CounterState>,
}

impl CallCounter {
    /// Create an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stats for one method, keyed as `Type#method`.
    pub fn stats(&self, key: &str) -> Option<MethodStats> {
        self.state.read().methods.get(key).copied()
    }

    /// Total calls entered.
    pub fn total_calls(&self) -> u64 {
        self.state.read().methods.values().map(|s| s.calls).sum()
    }

    /// Get a snapshot of all counts.
    pub fn snapshot(&self) -> CallSnapshot {
        let state = self.state.read();
        CallSnapshot {
            methods: state.methods.clone(),
            depth: state.depth,
            max_depth: state.max_depth,
        }
    }

    /// Reset all counts.
    pub fn reset(&self) {
        *self.state.write() = CounterState::default();
    }
}

impl Observer for CallCounter {
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()> {
        let key = format!("{}#{}", event.type_name, event.method);
        let mut state = self.state.write();

        if event.kind.is_enter() {
            state.methods.entry(key).or_default().calls += 1;
            state.depth += 1;
            state.max_depth = state.max_depth.max(state.depth);
        } else {
            let stats = state.methods.entry(key).or_default();
            if event.kind.is_exception() {
                stats.exceptions += 1;
            } else {
                stats.returns += 1;
            }
            state.depth = state.depth.saturating_sub(1);
        }
        Ok(())
    }
}

/// Snapshot of a [`CallCounter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSnapshot {
    /// Counts per `Type#method`, sorted by key.
    pub methods: BTreeMap<String, MethodStats>,
    /// Calls currently in flight.
    pub depth: u64,
    /// Deepest nesting seen.
    pub max_depth: u64,
}

impl CallSnapshot {
    /// Total calls entered.
    pub fn total_calls(&self) -> u64 {
        self.methods.values().map(|s| s.calls).sum()
    }

    /// Total calls that raised.
    pub fn total_exceptions(&self) -> u64 {
        self.methods.values().map(|s| s.exceptions).sum()
    }

    /// Render as an aligned text table.
    pub fn to_text(&self) -> String {
        let width = self
            .methods
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("method".len());

        let mut out = format!("{:<width$}  calls  raised\n", "method");
        for (key, stats) in &self.methods {
            out.push_str(&format!(
                "{:<width$}  {:>5}  {:>6}\n",
                key, stats.calls, stats.exceptions
            ));
        }
        out.push_str(&format!(
            "{} calls, {} raised, max depth {}\n",
            self.total_calls(),
            self.total_exceptions(),
            self.max_depth
        ));
        out
    }
}
