//! Data-driven difficulty table
//!
//! Level 0 holds the defaults and is never played. Every later level lists only
//! the fields it changes; anything it leaves out is copied from the level before
//! it, per class and per field. Resolution happens once when the table is built,
//! so the resolved table owns plain values and never looks back at the raw rows.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::settings::ConfigError;
use crate::sim::{AsteroidSize, UfoSize};

/// The built-in level table
pub const DEFAULT_LEVELS_JSON: &str = include_str!("../assets/levels.json");

/// Fully resolved asteroid class settings for one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidClassConfig {
    /// Large: asteroids spawned at level start. Small/tiny: children per split.
    pub count: u32,
    /// Speed at level start (m/s)
    pub speed: f32,
    /// Speed reached at the end of the ramp (m/s)
    pub max_speed: f32,
    /// Length of the speed ramp, measured from level start (s)
    pub ramp_secs: f32,
    /// Spin rate (degrees/s)
    pub rotation: f32,
    pub hits: u32,
    /// Probability that a wrapped asteroid leads the player
    pub accuracy: f32,
}

/// Fully resolved enemy craft class settings for one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UfoClassConfig {
    pub count: u32,
    pub speed: f32,
    /// Launch interval upper bound; each launch waits `uniform(timing/2, timing)`
    pub timing: f32,
    /// Gunnery accuracy in (0, 1]
    pub accuracy: f32,
    pub hits: u32,
    /// Shots per `timing` window
    pub shots: u32,
    /// Shot speed on top of the craft's own speed
    pub shot_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsteroidWave {
    pub large: AsteroidClassConfig,
    pub small: AsteroidClassConfig,
    pub tiny: AsteroidClassConfig,
}

impl AsteroidWave {
    pub fn class(&self, size: AsteroidSize) -> &AsteroidClassConfig {
        match size {
            AsteroidSize::Large => &self.large,
            AsteroidSize::Small => &self.small,
            AsteroidSize::Tiny => &self.tiny,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UfoWave {
    pub large: UfoClassConfig,
    pub small: UfoClassConfig,
}

impl UfoWave {
    pub fn class(&self, size: UfoSize) -> &UfoClassConfig {
        match size {
            UfoSize::Large => &self.large,
            UfoSize::Small => &self.small,
        }
    }
}

/// One resolved level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub asteroids: AsteroidWave,
    pub ufos: UfoWave,
}

// --- Raw rows, as written in JSON ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AsteroidClassOverrides {
    pub count: Option<u32>,
    pub speed: Option<f32>,
    pub max_speed: Option<f32>,
    pub ramp_secs: Option<f32>,
    pub rotation: Option<f32>,
    pub hits: Option<u32>,
    pub accuracy: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UfoClassOverrides {
    pub count: Option<u32>,
    pub speed: Option<f32>,
    pub timing: Option<f32>,
    pub accuracy: Option<f32>,
    pub hits: Option<u32>,
    pub shots: Option<u32>,
    pub shot_speed: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawAsteroidWave {
    pub large: AsteroidClassOverrides,
    pub small: AsteroidClassOverrides,
    pub tiny: AsteroidClassOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawUfoWave {
    pub large: UfoClassOverrides,
    pub small: UfoClassOverrides,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawLevel {
    pub asteroids: RawAsteroidWave,
    pub ufos: RawUfoWave,
}

/// The table as written: index is the level number
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLevelTable {
    pub levels: Vec<RawLevel>,
}

fn require<T>(
    value: Option<T>,
    level: usize,
    class: &'static str,
    field: &'static str,
) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingField { level, class, field })
}

impl AsteroidClassOverrides {
    fn complete(&self, class: &'static str) -> Result<AsteroidClassConfig, ConfigError> {
        Ok(AsteroidClassConfig {
            count: require(self.count, 0, class, "count")?,
            speed: require(self.speed, 0, class, "speed")?,
            max_speed: require(self.max_speed, 0, class, "max_speed")?,
            ramp_secs: require(self.ramp_secs, 0, class, "ramp_secs")?,
            rotation: require(self.rotation, 0, class, "rotation")?,
            hits: require(self.hits, 0, class, "hits")?,
            accuracy: require(self.accuracy, 0, class, "accuracy")?,
        })
    }

    fn inherit(&self, prev: &AsteroidClassConfig) -> AsteroidClassConfig {
        AsteroidClassConfig {
            count: self.count.unwrap_or(prev.count),
            speed: self.speed.unwrap_or(prev.speed),
            max_speed: self.max_speed.unwrap_or(prev.max_speed),
            ramp_secs: self.ramp_secs.unwrap_or(prev.ramp_secs),
            rotation: self.rotation.unwrap_or(prev.rotation),
            hits: self.hits.unwrap_or(prev.hits),
            accuracy: self.accuracy.unwrap_or(prev.accuracy),
        }
    }
}

impl UfoClassOverrides {
    fn complete(&self, class: &'static str) -> Result<UfoClassConfig, ConfigError> {
        Ok(UfoClassConfig {
            count: require(self.count, 0, class, "count")?,
            speed: require(self.speed, 0, class, "speed")?,
            timing: require(self.timing, 0, class, "timing")?,
            accuracy: require(self.accuracy, 0, class, "accuracy")?,
            hits: require(self.hits, 0, class, "hits")?,
            shots: require(self.shots, 0, class, "shots")?,
            shot_speed: require(self.shot_speed, 0, class, "shot_speed")?,
        })
    }

    fn inherit(&self, prev: &UfoClassConfig) -> UfoClassConfig {
        UfoClassConfig {
            count: self.count.unwrap_or(prev.count),
            speed: self.speed.unwrap_or(prev.speed),
            timing: self.timing.unwrap_or(prev.timing),
            accuracy: self.accuracy.unwrap_or(prev.accuracy),
            hits: self.hits.unwrap_or(prev.hits),
            shots: self.shots.unwrap_or(prev.shots),
            shot_speed: self.shot_speed.unwrap_or(prev.shot_speed),
        }
    }
}

impl RawLevel {
    fn complete(&self) -> Result<LevelConfig, ConfigError> {
        Ok(LevelConfig {
            asteroids: AsteroidWave {
                large: self.asteroids.large.complete("asteroids.large")?,
                small: self.asteroids.small.complete("asteroids.small")?,
                tiny: self.asteroids.tiny.complete("asteroids.tiny")?,
            },
            ufos: UfoWave {
                large: self.ufos.large.complete("ufos.large")?,
                small: self.ufos.small.complete("ufos.small")?,
            },
        })
    }

    fn inherit(&self, prev: &LevelConfig) -> LevelConfig {
        LevelConfig {
            asteroids: AsteroidWave {
                large: self.asteroids.large.inherit(&prev.asteroids.large),
                small: self.asteroids.small.inherit(&prev.asteroids.small),
                tiny: self.asteroids.tiny.inherit(&prev.asteroids.tiny),
            },
            ufos: UfoWave {
                large: self.ufos.large.inherit(&prev.ufos.large),
                small: self.ufos.small.inherit(&prev.ufos.small),
            },
        }
    }
}

fn invalid(level: usize, class: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        level,
        class,
        reason,
    }
}

fn validate_asteroids(level: usize, class: &'static str, c: &AsteroidClassConfig) -> Result<(), ConfigError> {
    if c.speed < 0.0 || c.max_speed < c.speed {
        return Err(invalid(level, class, format!("speed band {}..{} is inverted", c.speed, c.max_speed)));
    }
    if c.ramp_secs < 0.0 {
        return Err(invalid(level, class, format!("ramp_secs {} is negative", c.ramp_secs)));
    }
    if c.hits == 0 {
        return Err(invalid(level, class, "hits must be at least 1".to_string()));
    }
    if !(0.0..=1.0).contains(&c.accuracy) {
        return Err(invalid(level, class, format!("accuracy {} outside [0, 1]", c.accuracy)));
    }
    Ok(())
}

fn validate_ufos(level: usize, class: &'static str, c: &UfoClassConfig) -> Result<(), ConfigError> {
    if c.speed <= 0.0 || c.shot_speed <= 0.0 {
        return Err(invalid(level, class, "speed and shot_speed must be positive".to_string()));
    }
    if c.timing <= 0.0 {
        return Err(invalid(level, class, format!("timing {} must be positive", c.timing)));
    }
    if c.hits == 0 || c.shots == 0 {
        return Err(invalid(level, class, "hits and shots must be at least 1".to_string()));
    }
    if !(c.accuracy > 0.0 && c.accuracy <= 1.0) {
        return Err(invalid(level, class, format!("accuracy {} outside (0, 1]", c.accuracy)));
    }
    Ok(())
}

impl LevelConfig {
    fn validate(&self, level: usize) -> Result<(), ConfigError> {
        validate_asteroids(level, "asteroids.large", &self.asteroids.large)?;
        validate_asteroids(level, "asteroids.small", &self.asteroids.small)?;
        validate_asteroids(level, "asteroids.tiny", &self.asteroids.tiny)?;
        validate_ufos(level, "ufos.large", &self.ufos.large)?;
        validate_ufos(level, "ufos.small", &self.ufos.small)
    }
}

/// Resolved difficulty table
#[derive(Debug, Clone, PartialEq)]
pub struct LevelTable {
    levels: Vec<LevelConfig>,
}

impl LevelTable {
    /// Resolve a raw table by walking levels in order and inheriting unset fields
    pub fn from_raw(raw: &RawLevelTable) -> Result<Self, ConfigError> {
        let Some((defaults, rest)) = raw.levels.split_first() else {
            return Err(ConfigError::NoLevels);
        };
        if rest.is_empty() {
            return Err(ConfigError::NoLevels);
        }

        let mut levels = Vec::with_capacity(raw.levels.len());
        let base = defaults.complete()?;
        base.validate(0)?;
        levels.push(base);

        for (offset, row) in rest.iter().enumerate() {
            let resolved = row.inherit(&levels[offset]);
            resolved.validate(offset + 1)?;
            levels.push(resolved);
        }

        log::debug!("Resolved level table with {} playable levels", levels.len() - 1);
        Ok(Self { levels })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawLevelTable = serde_json::from_str(json)?;
        Self::from_raw(&raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        log::info!("Loaded level table from {}", path.display());
        Ok(table)
    }

    /// The table embedded in the crate
    pub fn standard() -> Self {
        match Self::from_json(DEFAULT_LEVELS_JSON) {
            Ok(table) => table,
            Err(e) => panic!("built-in level table is invalid: {e}"),
        }
    }

    /// Settings for a playable level (1-based). Level 0 only holds defaults.
    pub fn level(&self, level: u32) -> Option<&LevelConfig> {
        if level == 0 {
            return None;
        }
        self.levels.get(level as usize)
    }

    /// The defaults row
    pub fn defaults(&self) -> &LevelConfig {
        &self.levels[0]
    }

    /// Number of playable levels
    pub fn playable_levels(&self) -> u32 {
        (self.levels.len() - 1) as u32
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self::standard()
    }
}
