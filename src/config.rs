// src/config.rs
//! Simulation configuration, loadable from JSON. Every field has a default so a
//! partial document (or `{}`) is valid.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default horizontal speed of a path follower (units per second).
pub const DEFAULT_MOVE_SPEED: f32 = 1.0;
/// Horizontal distance under which a waypoint counts as reached.
pub const DEFAULT_ARRIVAL_RADIUS: f32 = 0.1;

/// Configuration options for the physics world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World gravity (m/s²).
    pub gravity: [f32; 3],
    /// Fixed simulation tick.
    pub fixed_dt: f32,
    /// Max ticks run by a single `advance` call before dropping accumulated time.
    pub max_substeps: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, -9.81, 0.0],
            fixed_dt: 1.0 / 60.0,
            max_substeps: 5,
        }
    }
}

/// Defaults applied to every path follower created by a `Simulation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    pub move_speed: f32,
    pub arrival_radius: f32,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            move_speed: DEFAULT_MOVE_SPEED,
            arrival_radius: DEFAULT_ARRIVAL_RADIUS,
        }
    }
}

impl FollowerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.move_speed.is_finite() && self.move_speed >= 0.0) {
            return Err(Error::Config(format!(
                "follower.move_speed must be >= 0, got {}",
                self.move_speed
            )));
        }
        if !(self.arrival_radius.is_finite() && self.arrival_radius > 0.0) {
            return Err(Error::Config(format!(
                "follower.arrival_radius must be > 0, got {}",
                self.arrival_radius
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub physics: PhysicsConfig,
    pub follower: FollowerConfig,
}

impl SimulationConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).context(format!("reading {}", path.display())))?;
        Self::from_json(&text).map_err(|e| e.context(format!("parsing {}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        let physics = &self.physics;
        if !(physics.fixed_dt.is_finite() && physics.fixed_dt > 0.0) {
            return Err(Error::Config(format!(
                "physics.fixed_dt must be > 0, got {}",
                physics.fixed_dt
            )));
        }
        if physics.max_substeps == 0 {
            return Err(Error::Config("physics.max_substeps must be >= 1".into()));
        }
        if physics.gravity.iter().any(|g| !g.is_finite()) {
            return Err(Error::Config("physics.gravity must be finite".into()));
        }

        self.follower.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = SimulationConfig::from_json("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.follower.move_speed, 1.0);
        assert_eq!(config.follower.arrival_radius, 0.1);
    }

    #[test]
    fn test_partial_document() {
        let config = SimulationConfig::from_json(
            r#"{ "physics": { "gravity": [0.0, 0.0, 0.0] }, "follower": { "move_speed": 3.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.physics.gravity, [0.0, 0.0, 0.0]);
        assert_eq!(config.physics.fixed_dt, 1.0 / 60.0);
        assert_eq!(config.follower.move_speed, 3.5);
        assert_eq!(config.follower.arrival_radius, DEFAULT_ARRIVAL_RADIUS);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = SimulationConfig::from_json(r#"{ "physics": { "fixed_dt": 0.0 } }"#).unwrap_err();
        assert!(err.is_config());

        let err =
            SimulationConfig::from_json(r#"{ "follower": { "arrival_radius": -1.0 } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = SimulationConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimulationConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(err.is_config() || matches!(err, Error::WithContext { .. }));
        assert!(err.to_string().contains("reading"));
    }
}
