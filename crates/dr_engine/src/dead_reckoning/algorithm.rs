//! Dead reckoning selectors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extrapolation model applied to a remote actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeadReckoningAlgorithm {
    /// Leave the actor where it is
    #[default]
    None,
    /// Snap to the last known translation and rotation
    Static,
    /// Move along the last known velocity
    VelocityOnly,
    /// Move with velocity and acceleration, turn with angular velocity
    VelocityAndAcceleration,
}

impl DeadReckoningAlgorithm {
    /// Every algorithm
    pub const ALL: [Self; 4] = [
        Self::None,
        Self::Static,
        Self::VelocityOnly,
        Self::VelocityAndAcceleration,
    ];

    /// Upper case name
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Static => "STATIC",
            Self::VelocityOnly => "VELOCITY_ONLY",
            Self::VelocityAndAcceleration => "VELOCITY_AND_ACCELERATION",
        }
    }

    /// Look up an algorithm by its upper case name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    /// Whether acceleration and angular velocity are used
    pub const fn uses_acceleration(self) -> bool {
        matches!(self, Self::VelocityAndAcceleration)
    }
}

impl fmt::Display for DeadReckoningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Who applies the computed transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateMode {
    /// Move remote actors, only calculate for local ones
    #[default]
    Auto,
    /// Compute the pose but leave the actor alone
    CalculateOnly,
    /// Compute the pose and write it to the actor
    CalculateAndMoveActor,
}

impl UpdateMode {
    /// Upper case name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::CalculateOnly => "CALCULATE_ONLY",
            Self::CalculateAndMoveActor => "CALCULATE_AND_MOVE_ACTOR",
        }
    }

    /// Resolve [`UpdateMode::Auto`] for an actor
    pub const fn effective(self, is_remote: bool) -> Self {
        match self {
            Self::Auto if is_remote => Self::CalculateAndMoveActor,
            Self::Auto => Self::CalculateOnly,
            other => other,
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of ground clamp an external terrain system should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroundClampType {
    /// No clamping
    #[default]
    None,
    /// Clamp and align the rotation to the ground within a range
    Ranged,
    /// Clamp now and then, keeping the last ground offset in between
    IntermittentSaveOffset,
}

impl GroundClampType {
    /// Upper case name
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Ranged => "RANGED",
            Self::IntermittentSaveOffset => "INTERMITTENT_SAVE_OFFSET",
        }
    }
}

impl fmt::Display for GroundClampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
