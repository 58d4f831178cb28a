//! File configuration.
//!
//! ```toml
//! instrument = "Widget,Shapes::Circle"
//!
//! [trace]
//! format = "json"
//!
//! [engine]
//! log_skips = true
//!
//! [[deny]]
//! type = "Widget"
//! methods = ["reset"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use minstrel_deny::DenyRule;
use minstrel_intercept::EngineConfig;
use minstrel_observe::TraceFormat;

use crate::error::{ConfigError, SpecError};
use crate::frontend::InstrumentSpec;

/// Trace output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Line format of the trace.
    pub format: TraceFormat,
}

/// Configuration of a Minstrel runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinstrelConfig {
    /// Instrument spec applied at startup. The environment takes precedence.
    pub instrument: Option<String>,
    /// Trace output.
    pub trace: TraceConfig,
    /// Engine settings.
    pub engine: EngineConfig,
    /// Deny rules, added to those under `[engine]`.
    pub deny: Vec<DenyRule>,
}

impl MinstrelConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check values that TOML alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.control_type.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "engine.control_type".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let rules = self.engine.deny.iter().enumerate().map(|(i, r)| ("engine.deny", i, r));
        let rules = rules.chain(self.deny.iter().enumerate().map(|(i, r)| ("deny", i, r)));
        for (section, index, rule) in rules {
            if rule.type_name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("{section}[{index}].type"),
                    message: "must name a type".to_string(),
                });
            }
            if rule.methods.is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("{section}[{index}].methods"),
                    message: "must list at least one method".to_string(),
                });
            }
        }

        if let Some(spec) = &self.instrument {
            InstrumentSpec::parse(spec).map_err(|e| ConfigError::Invalid {
                field: "instrument".to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    /// The parsed instrument spec, if one is set.
    pub fn instrument_spec(&self) -> Result<Option<InstrumentSpec>, SpecError> {
        InstrumentSpec::from_env_value(self.instrument.clone())
    }

    /// The engine configuration with every deny rule merged in.
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = self.engine.clone();
        engine.deny.extend(self.deny.iter().cloned());
        engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minstrel_intercept::DEFAULT_CONTROL_TYPE;

    #[test]
    fn test_full_config() {
        let config = MinstrelConfig::from_toml_str(
            r#"
            instrument = "Widget, Shapes::Circle"

            [trace]
            format = "json"

            [engine]
            log_skips = true

            [[engine.deny]]
            type = "Shapes::Shape"
            methods = ["area"]

            [[deny]]
            type = "Widget"
            methods = ["reset"]
            "#,
        )
        .unwrap();

        assert_eq!(config.trace.format, TraceFormat::Json);
        assert!(config.engine.log_skips);
        assert_eq!(
            config.instrument_spec().unwrap(),
            Some(InstrumentSpec::Names(vec![
                "Widget".to_string(),
                "Shapes::Circle".to_string()
            ]))
        );

        let engine = config.engine_config();
        assert_eq!(engine.control_type, DEFAULT_CONTROL_TYPE);
        assert_eq!(
            engine.deny,
            vec![
                DenyRule::new("Shapes::Shape", ["area"]),
                DenyRule::new("Widget", ["reset"]),
            ]
        );
    }

    #[test]
    fn test_empty_config() {
        let config = MinstrelConfig::from_toml_str("").unwrap();
        assert_eq!(config, MinstrelConfig::default());
        assert_eq!(config.instrument_spec().unwrap(), None);
    }

    #[test]
    fn test_invalid_values() {
        let err = MinstrelConfig::from_toml_str(
            r#"
            [[deny]]
            type = "Widget"
            methods = []
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "deny[0].methods"));

        let err = MinstrelConfig::from_toml_str(r#"instrument = ",""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "instrument"));

        let err = MinstrelConfig::from_toml_str("[trace]\nformat = \"yaml\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = MinstrelConfig::from_file("/nonexistent/minstrel.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
