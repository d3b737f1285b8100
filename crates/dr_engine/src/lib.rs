//! # DR Engine
//!
//! Remote entity plumbing for distributed simulation.
//!
//! ## Features
//!
//! - **Coordinate Conversion**: Geocentric, geodetic, UTM and MGRS frames mapped
//!   onto a local Cartesian frame, including orientation conversion
//! - **Wire Codec**: Environmental process records in either byte order
//! - **Dead Reckoning**: Smoothed extrapolation of remote actors between updates,
//!   with ground clamp requests and articulation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dr_engine::prelude::*;
//!
//! let mut world = World::new();
//! let tank = world.spawn(Actor::remote("tank"));
//!
//! let mut component = DeadReckoningComponent::new();
//! let mut helper = component.create_helper();
//! helper.set_algorithm(DeadReckoningAlgorithm::VelocityOnly);
//! helper.set_last_known_translation(Vec3::new(0.0, 0.0, 0.0));
//! helper.set_last_known_velocity(Vec3::new(5.0, 0.0, 0.0));
//! component.register_actor(&mut world, tank, helper).unwrap();
//!
//! let mut clock = SimClock::new();
//! for _ in 0..60 {
//!     let tick = clock.step(1.0 / 60.0);
//!     let report = component.tick_remote(&mut world, &tick);
//!     for request in &report.clamp_requests {
//!         // Hand off to the terrain system
//!         let _ = request;
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Settings
pub mod config;
pub mod core;

// Shared building blocks
pub mod foundation;
pub mod ecs;

// Subsystems
pub mod coordinates;
pub mod dead_reckoning;
pub mod wire;

/// Common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::coordinates::{Coordinates, IncomingCoordinateType, LocalCoordinateType};
    pub use crate::core::{CoordinateConfig, DeadReckoningConfig, EngineSettings, WireConfig};
    pub use crate::dead_reckoning::{
        DeadReckoningAlgorithm, DeadReckoningComponent, DeadReckoningError, DeadReckoningHelper,
        GroundClampRequest, GroundClampType, TickReport, UpdateMode,
    };
    pub use crate::ecs::{Actor, World};
    pub use crate::foundation::collections::ActorId;
    pub use crate::foundation::math::{Quat, Transform, Vec3, Vec3d};
    pub use crate::foundation::time::{SimClock, TickInfo};
    pub use crate::wire::{
        EnvironmentProcessRecord, EnvironmentProcessRecordList, EnvironmentRecordType,
        RecordParameter, WireError,
    };
}

#[cfg(test)]
mod tests;
