//! Call values and argument lists.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Map;

pub use serde_json::Value;

use crate::error::{CallError, CallResult};

/// Arguments passed to a dispatched method.
///
/// Holds ordered positional values plus named (keyword) values. Interception
/// forwards an `Arguments` untouched, so variadic and keyword calls reach the
/// underlying method exactly as the caller made them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    positional: Vec<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    named: Map<String, Value>,
}

impl Arguments {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an argument list from positional values.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            named: Map::new(),
        }
    }

    /// Append a positional value.
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a named value.
    pub fn with_named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    /// Get a positional value.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Get a named value.
    pub fn named(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    /// All positional values in order.
    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    /// All named values.
    pub fn named_values(&self) -> &Map<String, Value> {
        &self.named
    }

    /// Total number of values, positional and named.
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Check if there are no arguments at all.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Split off the first positional value, keeping the rest (and all named
    /// values) as a new argument list.
    pub fn shift(&self) -> Option<(&Value, Arguments)> {
        let (first, rest) = self.positional.split_first()?;
        Some((
            first,
            Arguments {
                positional: rest.to_vec(),
                named: self.named.clone(),
            },
        ))
    }

    /// Require a string at a positional index.
    pub fn require_str(&self, index: usize, method: &str) -> CallResult<&str> {
        match self.positional.get(index) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(CallError::InvalidArgument {
                method: method.to_string(),
                message: format!("expected string at position {index}, got {other}"),
            }),
            None => Err(CallError::Arity {
                method: method.to_string(),
                given: self.positional.len(),
                expected: index + 1,
            }),
        }
    }

    /// Require an exact positional arity.
    pub fn expect_arity(&self, expected: usize, method: &str) -> CallResult<()> {
        if self.positional.len() != expected {
            return Err(CallError::Arity {
                method: method.to_string(),
                given: self.positional.len(),
                expected,
            });
        }
        Ok(())
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Map::new(),
        }
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for value in &self.positional {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        for (key, value) in &self.named {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
            first = false;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        let args = Arguments::positional([json!(0), json!("x")]).with_named("scale", 2);
        assert_eq!(args.to_string(), r#"[0, "x", scale: 2]"#);
        assert_eq!(Arguments::new().to_string(), "[]");
    }

    #[test]
    fn test_shift_keeps_named() {
        let args = Arguments::new()
            .with("greet")
            .with(1)
            .with_named("loud", true);

        let (first, rest) = args.shift().unwrap();
        assert_eq!(first, &json!("greet"));
        assert_eq!(rest.positional_values(), &[json!(1)]);
        assert_eq!(rest.named("loud"), Some(&json!(true)));
        assert!(Arguments::new().shift().is_none());
    }

    #[test]
    fn test_require_str() {
        let args = Arguments::positional([json!(3)]);
        assert!(matches!(
            args.require_str(0, "send"),
            Err(CallError::InvalidArgument { .. })
        ));
        assert!(matches!(
            args.require_str(1, "send"),
            Err(CallError::Arity { given: 1, expected: 2, .. })
        ));
    }
}
