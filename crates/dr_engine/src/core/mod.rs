//! Core engine configuration
//!
//! Settings structures shared by the coordinate, wire and dead reckoning
//! subsystems.

pub mod config;

pub use config::{
    Config, ConfigError, CoordinateConfig, DeadReckoningConfig, EngineSettings, WireConfig,
};
