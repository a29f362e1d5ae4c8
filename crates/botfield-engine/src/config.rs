//! World configuration.
//!
//! [`WorldConfig`] carries everything that parameterizes a simulation run:
//! the RNG seed, the tic duration, the playable bounds and the behavior
//! tuning constants used by the urge and collision systems. Every field has a
//! default, so a JSON file only needs to name what it overrides:
//!
//! ```
//! use botfield_engine::config::WorldConfig;
//!
//! let config = WorldConfig::from_json_str(r#"{ "seed": 7, "tic_duration_ms": 100 }"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.behavior.wander_speed_max, 2.0);
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A configuration value outside its valid range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tic duration must be positive")]
    ZeroTicDuration,

    #[error("world bounds are empty: x [{min_x}, {max_x}], y [{min_y}, {max_y}]")]
    EmptyBounds {
        min_x: f32,
        min_y: f32,
        max_x: f32,
        max_y: f32,
    },

    /// A `[min, max]` pair with `min > max`, or a negative lower bound.
    #[error("invalid range for {name}: [{min}, {max}]")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    /// A value that must be finite and non-negative.
    #[error("{name} must be finite and non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("malformed config: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// WorldBounds
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle of legal spawn and tile coordinates (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl WorldBounds {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min_x: -512.0,
            min_y: -512.0,
            max_x: 512.0,
            max_y: 512.0,
        }
    }
}

// ---------------------------------------------------------------------------
// BehaviorTuning
// ---------------------------------------------------------------------------

/// Constants for the urge and collision systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorTuning {
    /// Shortest wander persistence window, in tics.
    pub wander_persistence_min: u16,
    /// Wander persistence is drawn from `[min, max)`.
    pub wander_persistence_max: u16,
    /// Largest heading change at a wander re-roll, in radians.
    pub wander_max_turn: f32,
    pub wander_speed_min: f32,
    pub wander_speed_max: f32,
    /// At or below this distance a follower stops.
    pub follow_close_enough: f32,
    /// Up to this distance a follower cruises at `follow_min_speed`.
    pub follow_speed_up_distance: f32,
    pub follow_min_speed: f32,
    /// Extra speed per tile of distance beyond `follow_speed_up_distance`.
    pub follow_speed_per_tile: f32,
    pub follow_max_speed: f32,
    /// How many tics the `Collided` render hint lasts after a contact.
    pub collided_flash_tics: u8,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            wander_persistence_min: 10,
            wander_persistence_max: 40,
            wander_max_turn: std::f32::consts::FRAC_PI_4,
            wander_speed_min: 0.5,
            wander_speed_max: 2.0,
            follow_close_enough: 1.0,
            follow_speed_up_distance: 3.0,
            follow_min_speed: 1.0,
            follow_speed_per_tile: 1.0,
            follow_max_speed: 4.0,
            collided_flash_tics: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SimWorld`](crate::world::SimWorld).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u32,
    /// Simulated milliseconds per tic. Rates given per second are scaled by
    /// `tic_duration_ms / 1000`.
    pub tic_duration_ms: u32,
    pub bounds: WorldBounds,
    pub behavior: BehaviorTuning,
}

impl Default for WorldConfig {
    /// Seed 0, 50 ms tics (20 Hz), default bounds and tuning.
    fn default() -> Self {
        Self {
            seed: 0,
            tic_duration_ms: 50,
            bounds: WorldBounds::default(),
            behavior: BehaviorTuning::default(),
        }
    }
}

impl WorldConfig {
    /// Default configuration with the given seed and tic duration.
    pub fn new(seed: u32, tic_duration_ms: u32) -> Self {
        Self {
            seed,
            tic_duration_ms,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading world config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("loading world config {}", path.display()))
    }

    /// Seconds of simulated time per tic.
    pub fn tic_seconds(&self) -> f32 {
        self.tic_duration_ms as f32 / 1000.0
    }

    /// Check every value is within range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tic_duration_ms == 0 {
            return Err(ConfigError::ZeroTicDuration);
        }
        let b = &self.bounds;
        if !(b.min_x <= b.max_x && b.min_y <= b.max_y) {
            return Err(ConfigError::EmptyBounds {
                min_x: b.min_x,
                min_y: b.min_y,
                max_x: b.max_x,
                max_y: b.max_y,
            });
        }

        let t = &self.behavior;
        if t.wander_persistence_min == 0 || t.wander_persistence_min >= t.wander_persistence_max {
            return Err(ConfigError::InvalidRange {
                name: "wander_persistence",
                min: t.wander_persistence_min as f64,
                max: t.wander_persistence_max as f64,
            });
        }
        for (name, value) in [
            ("wander_max_turn", t.wander_max_turn),
            ("wander_speed_min", t.wander_speed_min),
            ("follow_close_enough", t.follow_close_enough),
            ("follow_min_speed", t.follow_min_speed),
            ("follow_speed_per_tile", t.follow_speed_per_tile),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Negative {
                    name,
                    value: value as f64,
                });
            }
        }
        for (name, min, max) in [
            ("wander_speed", t.wander_speed_min, t.wander_speed_max),
            ("follow_distance", t.follow_close_enough, t.follow_speed_up_distance),
            ("follow_speed", t.follow_min_speed, t.follow_max_speed),
        ] {
            if !(min <= max && max.is_finite()) {
                return Err(ConfigError::InvalidRange {
                    name,
                    min: min as f64,
                    max: max as f64,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        WorldConfig::default().validate().unwrap();
        assert_eq!(WorldConfig::new(42, 1000).tic_seconds(), 1.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = WorldConfig::from_json_str(
            r#"{ "seed": 9, "behavior": { "wander_speed_max": 3.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.tic_duration_ms, 50);
        assert_eq!(config.behavior.wander_speed_max, 3.5);
        assert_eq!(config.behavior.wander_persistence_min, 10);
    }

    #[test]
    fn json_roundtrip() {
        let config = WorldConfig::new(3, 20);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(WorldConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            WorldConfig::new(0, 0).validate(),
            Err(ConfigError::ZeroTicDuration)
        );

        let mut config = WorldConfig::default();
        config.bounds.min_x = 10.0;
        config.bounds.max_x = -10.0;
        assert!(matches!(config.validate(), Err(ConfigError::EmptyBounds { .. })));

        let mut config = WorldConfig::default();
        config.behavior.wander_persistence_max = config.behavior.wander_persistence_min;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));

        let mut config = WorldConfig::default();
        config.behavior.follow_min_speed = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));

        assert!(matches!(
            WorldConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_has_context() {
        let err = WorldConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("reading world config"));
    }
}
