//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments for the terrain runtime.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "veldt", about = "Adaptive quadtree terrain runtime")]
pub struct CliArgs {
    /// Horizontal view distance in world units.
    #[arg(long)]
    pub view_distance: Option<f32>,

    /// Clip-space block width above which a block subdivides.
    #[arg(long)]
    pub screen_width_threshold: Option<f32>,

    /// Noise seed for the height source.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Build geometry on worker threads.
    #[arg(long)]
    pub async_build: Option<bool>,

    /// Water plane height.
    #[arg(long)]
    pub water_level: Option<f32>,

    /// Print per-tick traversal statistics.
    #[arg(long)]
    pub tick_stats: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(distance) = args.view_distance {
            self.terrain.view_distance = distance;
        }
        if let Some(threshold) = args.screen_width_threshold {
            self.terrain.screen_width_threshold = threshold;
        }
        if let Some(seed) = args.seed {
            self.noise.seed = seed;
        }
        if let Some(async_build) = args.async_build {
            self.terrain.async_build = async_build;
        }
        if let Some(level) = args.water_level {
            self.physics.water_level = level;
        }
        if args.tick_stats {
            self.debug.tick_stats = true;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
