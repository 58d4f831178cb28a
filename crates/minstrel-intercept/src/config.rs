//! Engine configuration.

use serde::{Deserialize, Serialize};

use minstrel_deny::DenyRule;

/// Name of the type that carries the engine's control surface.
pub const DEFAULT_CONTROL_TYPE: &str = "Minstrel::Instrument";

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Report deny-listed methods at `info` instead of `debug`.
    pub log_skips: bool,

    /// Name under which the control surface type is registered.
    ///
    /// Every operation of this type is deny-listed.
    pub control_type: String,

    /// Extra deny rules, resolved against the registry when the engine is
    /// built.
    pub deny: Vec<DenyRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_skips: false,
            control_type: DEFAULT_CONTROL_TYPE.to_string(),
            deny: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report skipped methods at `info`.
    pub fn with_log_skips(mut self, enabled: bool) -> Self {
        self.log_skips = enabled;
        self
    }

    /// Register the control surface under another name.
    pub fn with_control_type(mut self, name: impl Into<String>) -> Self {
        self.control_type = name.into();
        self
    }

    /// Add a deny rule.
    pub fn with_deny_rule(mut self, rule: DenyRule) -> Self {
        self.deny.push(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.log_skips);
        assert_eq!(config.control_type, DEFAULT_CONTROL_TYPE);
        assert!(config.deny.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_log_skips(true)
            .with_control_type("Tracing::Control")
            .with_deny_rule(DenyRule::new("Base", ["identity"]));

        assert!(config.log_skips);
        assert_eq!(config.control_type, "Tracing::Control");
        assert_eq!(config.deny.len(), 1);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            log_skips = true

            [[deny]]
            type = "Widget"
            methods = ["reset"]
            "#,
        )
        .unwrap();

        assert!(config.log_skips);
        assert_eq!(config.control_type, DEFAULT_CONTROL_TYPE);
        assert_eq!(config.deny, vec![DenyRule::new("Widget", ["reset"])]);
    }
}
