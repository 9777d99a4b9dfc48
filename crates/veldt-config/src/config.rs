//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use veldt_terrain::{FbmParams, TerrainConfig};

use crate::error::ConfigError;

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree and level-of-detail settings.
    pub terrain: TerrainSection,
    /// Height source settings.
    pub noise: NoiseConfig,
    /// Collision settings.
    pub physics: PhysicsConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Quadtree and level-of-detail settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainSection {
    /// Log2 side length of root blocks.
    pub largest_block_shift: u32,
    /// Log2 side length below which blocks never subdivide.
    pub smallest_block_shift: u32,
    /// Log2 of grid cells per block edge.
    pub block_vertex_shift: u32,
    /// Clip-space block width above which a block subdivides.
    pub screen_width_threshold: f32,
    /// Forward-dot threshold of the close-distance visibility override.
    pub close_dot_threshold: f32,
    /// Ticks a block may go unseen before its resources are released.
    pub expiration_ticks: u64,
    /// Horizontal distance within which root blocks are visited.
    pub view_distance: f32,
    /// Build geometry on worker threads.
    pub async_build: bool,
    /// Worker threads for async builds (0 = derive from CPU count).
    pub build_threads: usize,
}

/// Height source settings, mapped onto the fBm sampler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseConfig {
    /// Noise seed.
    pub seed: u64,
    /// fBm octave count.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Frequency of the first octave.
    pub base_frequency: f64,
    /// Height amplitude of the first octave in world units.
    pub amplitude: f64,
}

/// Collision settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World-space height of the water plane.
    pub water_level: f32,
    /// Vertical scale applied when positioning physics bodies.
    pub height_scale: f32,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Print per-tick traversal statistics.
    pub tick_stats: bool,
    /// Log level override (e.g. "debug", "info", "warn").
    pub log_level: String,
}

impl Default for TerrainSection {
    fn default() -> Self {
        let d = TerrainConfig::default();
        Self {
            largest_block_shift: d.largest_block_shift,
            smallest_block_shift: d.smallest_block_shift,
            block_vertex_shift: d.block_vertex_shift,
            screen_width_threshold: d.block_screen_width_threshold,
            close_dot_threshold: d.close_dot_threshold,
            expiration_ticks: d.expiration_ticks,
            view_distance: d.view_distance,
            async_build: d.async_build,
            build_threads: d.build_threads,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        let d = FbmParams::default();
        Self {
            seed: d.seed,
            octaves: d.octaves,
            lacunarity: d.lacunarity,
            persistence: d.persistence,
            base_frequency: d.base_frequency,
            amplitude: d.amplitude,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let d = TerrainConfig::default();
        Self {
            water_level: d.water_level,
            height_scale: d.physics_height_scale,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            tick_stats: false,
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            tracing::info!("loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            tracing::info!("created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None`
    /// otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            tracing::info!("config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Build the validated terrain configuration these settings describe.
    pub fn terrain_config(&self) -> Result<TerrainConfig, ConfigError> {
        let config = TerrainConfig {
            largest_block_shift: self.terrain.largest_block_shift,
            smallest_block_shift: self.terrain.smallest_block_shift,
            block_vertex_shift: self.terrain.block_vertex_shift,
            block_screen_width_threshold: self.terrain.screen_width_threshold,
            water_level: self.physics.water_level,
            close_dot_threshold: self.terrain.close_dot_threshold,
            expiration_ticks: self.terrain.expiration_ticks,
            view_distance: self.terrain.view_distance,
            physics_height_scale: self.physics.height_scale,
            async_build: self.terrain.async_build,
            build_threads: self.terrain.build_threads,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// The fBm parameters these settings describe.
    pub fn fbm_params(&self) -> FbmParams {
        FbmParams {
            seed: self.noise.seed,
            octaves: self.noise.octaves,
            lacunarity: self.noise.lacunarity,
            persistence: self.noise.persistence,
            base_frequency: self.noise.base_frequency,
            amplitude: self.noise.amplitude,
        }
    }
}
