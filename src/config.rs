// Global configuration and constants

use std::path::Path;

use glam::{UVec2, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Rgba;

const DEFAULT_CONFIG_PATHS: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

/// Upper bound on spatial index buckets (`partition.x * partition.y`).
pub const MAX_BUCKETS: u64 = 1 << 22;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

// Configuration struct for simulation parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Domain / spatial index
    pub domain_width: f32,
    pub domain_height: f32,
    pub partition_cell_size: f32,

    // Time
    pub time_scale: f32,
    pub headless_frame_dt: f32,

    // Growth & branching
    pub length_per_age: f32,
    pub branch_window_period: f32,
    pub branch_probability: f32,
    pub branch_threshold: f32,
    pub min_age: f32,
    pub growth_momentum: f32,
    pub random_growth: f32,

    // Fields
    pub neighbour_radius: f32,
    pub repulsion_scale_1: f32,
    pub repulsion_scale_2: f32,
    pub resource_pull_scale: f32,
    pub boundary_margin: f32,

    // Rendering
    pub thickness_scale: f32,
    pub gradient_overlay_length: f32,
    pub palette: Vec<Rgba>,

    // Initialization
    pub initial_tip_count: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            domain_width: 1920.0,
            domain_height: 1080.0,
            partition_cell_size: 24.0,
            time_scale: 3.0,
            headless_frame_dt: 1.0 / 60.0,
            length_per_age: 10.0,
            branch_window_period: 2.0,
            branch_probability: 0.75,
            branch_threshold: 2.5,
            min_age: 0.5,
            growth_momentum: 0.6,
            random_growth: 0.1,
            neighbour_radius: 100.0,
            repulsion_scale_1: 1.0,
            repulsion_scale_2: 4.0,
            resource_pull_scale: 1024.0,
            boundary_margin: 16.0,
            thickness_scale: 1.5,
            gradient_overlay_length: 50.0,
            palette: vec![
                Rgba::new(0.0, 1.0, 0.0, 0.5),
                Rgba::new(1.0, 0.0, 0.0, 0.5),
                Rgba::new(0.0, 0.0, 1.0, 0.5),
            ],
            initial_tip_count: 1,
        }
    }
}

impl SimulationConfig {
    /// Loads a YAML or JSON config, chosen by file extension. Anything that is
    /// not `.json` is parsed as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: Self = if is_json {
            serde_json::from_str(&text)?
        } else {
            serde_yaml::from_str(&text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// First loadable config among the default paths, or defaults.
    pub fn from_default_paths() -> Self {
        for candidate in DEFAULT_CONFIG_PATHS {
            if !Path::new(candidate).exists() {
                continue;
            }
            match Self::from_file(candidate) {
                Ok(config) => {
                    log::info!("Loaded config from {}", candidate);
                    return config;
                }
                Err(e) => {
                    log::warn!("Ignoring {}: {}", candidate, e);
                }
            }
        }
        log::info!("Using default config");
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(ok: bool, msg: &str) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Invalid(msg.to_owned()))
            }
        }

        check(
            self.domain().is_finite() && self.domain_width > 0.0 && self.domain_height > 0.0,
            "domain size must be positive and finite",
        )?;
        check(
            self.partition_cell_size.is_finite() && self.partition_cell_size > 0.0,
            "partition_cell_size must be positive and finite",
        )?;
        let columns = (f64::from(self.domain_width) / f64::from(self.partition_cell_size)).ceil();
        let rows = (f64::from(self.domain_height) / f64::from(self.partition_cell_size)).ceil();
        check(
            columns * rows <= MAX_BUCKETS as f64,
            "partition_cell_size too small for the domain",
        )?;
        check(self.time_scale > 0.0, "time_scale must be positive")?;
        check(
            self.headless_frame_dt > 0.0,
            "headless_frame_dt must be positive",
        )?;
        check(
            self.branch_window_period > 1.0,
            "branch_window_period must exceed the 1s armed window",
        )?;
        check(
            (0.0..=1.0).contains(&self.branch_probability),
            "branch_probability must be in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&self.growth_momentum),
            "growth_momentum must be in [0, 1]",
        )?;
        check(
            (0.0..1.0).contains(&self.random_growth),
            "random_growth must be in [0, 1)",
        )?;
        check(self.neighbour_radius >= 0.0, "neighbour_radius must be >= 0")?;
        check(self.boundary_margin >= 0.0, "boundary_margin must be >= 0")?;
        check(self.length_per_age >= 0.0, "length_per_age must be >= 0")?;
        check(!self.palette.is_empty(), "palette must not be empty")?;
        Ok(())
    }

    pub fn domain(&self) -> Vec2 {
        Vec2::new(self.domain_width, self.domain_height)
    }

    /// Bucket counts per axis for the spatial index.
    pub fn partition(&self) -> UVec2 {
        (self.domain() / self.partition_cell_size)
            .ceil()
            .max(Vec2::ONE)
            .as_uvec2()
    }

    pub fn domain_center(&self) -> Vec2 {
        self.domain() * 0.5
    }

    pub fn contains(&self, position: Vec2) -> bool {
        position.is_finite()
            && position.x >= 0.0
            && position.y >= 0.0
            && position.x < self.domain_width
            && position.y < self.domain_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_partition_is_80_by_45() {
        let config = SimulationConfig::default();
        assert_eq!(config.partition(), UVec2::new(80, 45));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_takes_defaults() {
        let config: SimulationConfig =
            serde_yaml::from_str("branch_threshold: 3.0\ninitial_tip_count: 4\n").unwrap();
        assert_eq!(config.branch_threshold, 3.0);
        assert_eq!(config.initial_tip_count, 4);
        assert_eq!(config.domain_width, 1920.0);
        assert_eq!(config.palette.len(), 3);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("mycofield-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "domain_width": 800.0, "domain_height": 600.0 }"#).unwrap();

        let config = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(config.domain(), Vec2::new(800.0, 600.0));
        assert_eq!(config.partition(), UVec2::new(34, 25));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = SimulationConfig {
            branch_probability: 1.5,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = SimulationConfig {
            palette: Vec::new(),
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_partition_is_rejected() {
        let config: SimulationConfig = serde_yaml::from_str("partition_cell_size: 1.0e-4\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = SimulationConfig {
            domain_width: f32::INFINITY,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());

        // 1920x1080 single-unit cells stay under the cap
        let config = SimulationConfig {
            partition_cell_size: 1.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.partition(), UVec2::new(1920, 1080));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::from_file("definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
