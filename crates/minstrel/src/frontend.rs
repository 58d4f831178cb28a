//! Instrument specs, as given on the command line or in the environment.
//!
//! A spec is either the sentinel `:all:` or a comma-separated list of type
//! names, for example `Widget,Shapes::Circle`.

use std::fmt;
use std::str::FromStr;

use minstrel_intercept::{ALL_SENTINEL, Target};

use crate::error::SpecError;

/// Environment variable holding the instrument spec.
pub const INSTRUMENT_ENV: &str = "MINSTREL_INSTRUMENT";

/// Which types to instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentSpec {
    /// Every type, including types loaded later.
    All,
    /// The named types, in the order given.
    Names(Vec<String>),
}

impl InstrumentSpec {
    /// Parse a spec.
    ///
    /// Names are trimmed and empty items are ignored. If any item is the
    /// `:all:` sentinel the whole spec means every type.
    ///
    /// # Errors
    ///
    /// Fails if no type name remains.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let mut names: Vec<String> = Vec::new();
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if item == ALL_SENTINEL {
                return Ok(InstrumentSpec::All);
            }
            if !names.iter().any(|n| n == item) {
                names.push(item.to_string());
            }
        }

        if names.is_empty() {
            return Err(SpecError::Empty(spec.to_string()));
        }
        Ok(InstrumentSpec::Names(names))
    }

    /// Parse an optional value, typically read from [`INSTRUMENT_ENV`].
    ///
    /// A missing or blank value yields `None`.
    pub fn from_env_value(value: Option<String>) -> Result<Option<Self>, SpecError> {
        match value {
            Some(value) if !value.trim().is_empty() => Self::parse(&value).map(Some),
            _ => Ok(None),
        }
    }

    /// Read [`INSTRUMENT_ENV`] from the process environment.
    pub fn from_env() -> Result<Option<Self>, SpecError> {
        Self::from_env_value(std::env::var(INSTRUMENT_ENV).ok())
    }

    /// Check whether this spec covers every type.
    pub fn is_all(&self) -> bool {
        matches!(self, InstrumentSpec::All)
    }

    /// The wrap requests this spec stands for.
    pub fn targets(&self) -> Vec<Target> {
        match self {
            InstrumentSpec::All => vec![Target::All],
            InstrumentSpec::Names(names) => names.iter().cloned().map(Target::Named).collect(),
        }
    }
}

impl FromStr for InstrumentSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for InstrumentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentSpec::All => f.write_str(ALL_SENTINEL),
            InstrumentSpec::Names(names) => f.write_str(&names.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        let spec = InstrumentSpec::parse(" Widget, Shapes::Circle ,,Widget").unwrap();
        assert_eq!(
            spec,
            InstrumentSpec::Names(vec!["Widget".to_string(), "Shapes::Circle".to_string()])
        );
        assert_eq!(spec.to_string(), "Widget,Shapes::Circle");
        assert_eq!(
            spec.targets(),
            vec![Target::named("Widget"), Target::named("Shapes::Circle")]
        );
    }

    #[test]
    fn test_sentinel_anywhere_means_all() {
        let spec: InstrumentSpec = "Widget,:all:".parse().unwrap();
        assert!(spec.is_all());
        assert_eq!(spec.targets(), vec![Target::All]);
        assert_eq!(spec.to_string(), ":all:");
    }

    #[test]
    fn test_empty_spec() {
        assert!(matches!(
            InstrumentSpec::parse(" , "),
            Err(SpecError::Empty(_))
        ));
    }

    #[test]
    fn test_env_value() {
        assert_eq!(InstrumentSpec::from_env_value(None).unwrap(), None);
        assert_eq!(InstrumentSpec::from_env_value(Some("  ".into())).unwrap(), None);
        assert_eq!(
            InstrumentSpec::from_env_value(Some(":all:".into())).unwrap(),
            Some(InstrumentSpec::All)
        );
    }
}
