//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types, heading/pitch/roll matrices and quaternions
//! - Generation-checked handles
//! - Simulation time and countdown timers
//! - Logging utilities and the injectable log sink

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
