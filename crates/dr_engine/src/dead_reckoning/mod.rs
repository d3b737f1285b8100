//! Dead reckoning of remote actors
//!
//! Remote actors are only reported every few seconds. Between reports each
//! registered actor gets a [`DeadReckoningHelper`] that extrapolates its pose
//! from the last known translation, rotation and rates. The
//! [`DeadReckoningComponent`] drives every helper once per tick, writes the
//! resulting poses back into the [`World`](crate::ecs::World) and reports
//! which actors need ground clamping.

pub mod algorithm;
pub mod articulation;
pub mod component;
pub mod helper;

use thiserror::Error;

use crate::foundation::collections::ActorId;

pub use algorithm::{DeadReckoningAlgorithm, GroundClampType, UpdateMode};
pub use articulation::{Articulation, DeadReckoningDof, ARTICULATION_SMOOTH_TIME};
pub use component::{
    advance_force_clamp, DeadReckonedPose, DeadReckoningComponent, GroundClampRequest, TickReport,
};
pub use helper::{
    DeadReckoningHelper, DrOutcome, DEFAULT_MAX_SMOOTHING_TIME_POS, DEFAULT_MAX_SMOOTHING_TIME_ROT,
};

/// Registry errors of the dead reckoning component
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeadReckoningError {
    /// The actor already has a helper
    #[error("actor {0:?} is already registered for dead reckoning")]
    AlreadyRegistered(ActorId),

    /// The actor has no helper
    #[error("actor {0:?} is not registered for dead reckoning")]
    NotRegistered(ActorId),

    /// The actor does not exist in the world
    #[error("actor {0:?} does not exist")]
    UnknownActor(ActorId),
}
