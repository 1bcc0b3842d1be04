//! Configuration loading from TOML files

mod constants;

pub use constants::{
    ArmorConstants, CombatConstants, CombatTimerConstants, DiminishingConstants,
    DurabilityConstants, OutcomeConstants, PushbackConstants, RageConstants, ResistConstants,
};

use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration loading error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Load a TOML file and deserialize it
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load a TOML string and deserialize it
pub fn parse_toml<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ConfigError> {
    let config: T = toml::from_str(content)?;
    Ok(config)
}

/// Load combat constants from a file and validate them
pub fn load_constants(path: &Path) -> Result<CombatConstants, ConfigError> {
    let constants: CombatConstants = load_toml(path)?;
    constants.validate()?;
    Ok(constants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_constants() {
        let toml = r#"
            [armor]
            max_mitigation = 0.75

            [outcome]
            base_miss = 8.0
        "#;

        let constants: CombatConstants = parse_toml(toml).unwrap();
        assert!((constants.armor.max_mitigation - 0.75).abs() < f32::EPSILON);
        assert!((constants.outcome.base_miss - 8.0).abs() < f32::EPSILON);
        // Untouched sections keep their defaults
        assert_eq!(constants.resist.boss_level, 83);
        assert_eq!(constants.combat.pvp_timer_ms, 5500);
    }

    #[test]
    fn test_parse_error() {
        let result: Result<CombatConstants, _> = parse_toml("[armor\nmax_mitigation = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_constants(Path::new("/nonexistent/combat.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_validation_rejects_bad_mitigation_cap() {
        let constants: CombatConstants = parse_toml("[armor]\nmax_mitigation = 1.5").unwrap();
        assert!(matches!(
            constants.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
