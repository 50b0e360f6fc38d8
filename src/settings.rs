//! Simulation settings
//!
//! Loaded from JSON by the host; every field has a default so a settings file
//! only needs to list what it changes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::PLAYSPACE_RADIUS;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Could not read a configuration file
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed JSON
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Level 0 must specify every field
    #[error("level {level} {class}: missing field `{field}`")]
    MissingField {
        level: usize,
        class: &'static str,
        field: &'static str,
    },

    /// A resolved value is out of range
    #[error("level {level} {class}: {reason}")]
    Invalid {
        level: usize,
        class: &'static str,
        reason: String,
    },

    /// The table has no playable level
    #[error("level table needs a defaults row and at least one playable level")]
    NoLevels,
}

/// Runtime settings for one simulation instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// RNG seed; identical seeds and inputs replay identically
    pub seed: u64,
    /// Radius of the spherical playspace (metres)
    pub playspace_radius: f32,
    /// First level of a new game (level 0 only holds defaults)
    pub start_level: u32,
    /// Ship lives at the start of a game
    pub lives: u8,
    /// Run the built-in sphere-overlap contact pass each tick.
    /// Hosts with their own physics turn this off and forward contacts.
    pub detect_contacts: bool,
    /// Optional level table; the built-in table is used when absent
    pub levels_path: Option<PathBuf>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            playspace_radius: PLAYSPACE_RADIUS,
            start_level: 1,
            lives: 3,
            detect_contacts: true,
            levels_path: None,
        }
    }
}

impl SimSettings {
    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.playspace_radius > 0.0) {
            return Err(ConfigError::Invalid {
                level: 0,
                class: "settings",
                reason: format!("playspace_radius must be positive, got {}", self.playspace_radius),
            });
        }
        if self.start_level == 0 {
            return Err(ConfigError::Invalid {
                level: 0,
                class: "settings",
                reason: "start_level 0 is the defaults row and cannot be played".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = SimSettings::from_json(r#"{ "seed": 42, "lives": 5 }"#).unwrap();
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.lives, 5);
        assert_eq!(settings.start_level, 1);
        assert!(settings.detect_contacts);
        assert_eq!(settings.playspace_radius, PLAYSPACE_RADIUS);
    }

    #[test]
    fn test_rejects_bad_radius() {
        let err = SimSettings::from_json(r#"{ "playspace_radius": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_rejects_defaults_row_as_start() {
        let err = SimSettings::from_json(r#"{ "start_level": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SimSettings::load("/definitely/not/here.json").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert!(path.ends_with("here.json")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
