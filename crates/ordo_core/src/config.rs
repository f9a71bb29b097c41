//! Engine configuration.
//!
//! # Responsibility
//! - Hold tunables for drag targeting and optimistic placement.
//! - Load them from JSON with defaults for every missing field.
//!
//! # Invariants
//! - A validated config has a non-zero switch delay and a positive margin.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const DEFAULT_CONTAINER_SWITCH_DELAY_MS: u64 = 300;
const DEFAULT_FIRST_SLOT_MARGIN: i64 = 1000;

/// Errors from config parsing and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// Input is not valid JSON for the config shape.
    Parse(serde_json::Error),
    /// `container_switch_delay_ms` must be greater than zero.
    ZeroSwitchDelay,
    /// `first_slot_margin` must be at least 1.
    NonPositiveMargin(i64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid engine config: {err}"),
            Self::ZeroSwitchDelay => write!(f, "container_switch_delay_ms must be > 0"),
            Self::NonPositiveMargin(value) => {
                write!(f, "first_slot_margin must be >= 1, got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::ZeroSwitchDelay | Self::NonPositiveMargin(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Tunables for the reordering engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Dwell time over another container's selector before the item moves.
    pub container_switch_delay_ms: u64,
    /// Distance below the target container's minimum order used for the
    /// optimistic first-slot placement after a switch.
    pub first_slot_margin: i64,
    /// Content stored on separators synthesized after relocated groups.
    pub gap_content: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container_switch_delay_ms: DEFAULT_CONTAINER_SWITCH_DELAY_MS,
            first_slot_margin: DEFAULT_FIRST_SLOT_MARGIN,
            gap_content: String::new(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    ///
    /// # Errors
    /// - `ConfigError::Parse` for malformed JSON or wrong field types.
    /// - Validation errors from [`EngineConfig::validate`].
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container_switch_delay_ms == 0 {
            return Err(ConfigError::ZeroSwitchDelay);
        }
        if self.first_slot_margin < 1 {
            return Err(ConfigError::NonPositiveMargin(self.first_slot_margin));
        }
        Ok(())
    }

    pub fn container_switch_delay(&self) -> Duration {
        Duration::from_millis(self.container_switch_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig};
    use std::time::Duration;

    #[test]
    fn empty_object_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.container_switch_delay(), Duration::from_millis(300));
    }

    #[test]
    fn partial_object_overrides_fields() {
        let config = EngineConfig::from_json_str(
            r#"{ "container_switch_delay_ms": 120, "gap_content": "---" }"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.container_switch_delay_ms, 120);
        assert_eq!(config.first_slot_margin, 1000);
        assert_eq!(config.gap_content, "---");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero = EngineConfig::from_json_str(r#"{ "container_switch_delay_ms": 0 }"#)
            .expect_err("zero delay must fail");
        assert!(matches!(zero, ConfigError::ZeroSwitchDelay));

        let margin = EngineConfig::from_json_str(r#"{ "first_slot_margin": -4 }"#)
            .expect_err("negative margin must fail");
        assert!(matches!(margin, ConfigError::NonPositiveMargin(-4)));

        let malformed = EngineConfig::from_json_str("{ nope").expect_err("bad json must fail");
        assert!(matches!(malformed, ConfigError::Parse(_)));
    }
}
