//! Configuration for the veldt terrain runtime.
//!
//! Settings persist to disk as RON files, support CLI overrides via clap,
//! and stay forward/backward compatible through serde defaults.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, NoiseConfig, PhysicsConfig, TerrainSection};
pub use error::ConfigError;
