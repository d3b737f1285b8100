//! Per-actor dead reckoning state
//!
//! A [`DeadReckoningHelper`] receives the last known kinematic state of a
//! remote actor and, once per tick, extrapolates where the actor should be
//! drawn. New updates are not snapped to: the drawn pose is blended from where
//! the actor was drawn before the update toward the freshly extrapolated pose
//! over a smoothing window sized from the average time between updates.

use log::Level;

use super::algorithm::{DeadReckoningAlgorithm, GroundClampType, UpdateMode};
use super::articulation::Articulation;
use crate::core::DeadReckoningConfig;
use crate::ecs::Actor;
use crate::foundation::logging::LogSink;
use crate::foundation::math::{hpr_to_quat, matrix_to_quat, Mat3d, Quat, Transform, Vec3, Vec3d};
use crate::foundation::time::CountdownTimer;

/// Default upper bound of the rotation smoothing window, in seconds
pub const DEFAULT_MAX_SMOOTHING_TIME_ROT: f32 = 2.0;

/// Default upper bound of the translation smoothing window, in seconds
pub const DEFAULT_MAX_SMOOTHING_TIME_POS: f32 = 8.0;

const MIN_ANGULAR_VELOCITY_SQUARED: f32 = 1e-6;

macro_rules! sink_debug {
    ($sink:expr, $function:expr, $($arg:tt)+) => {
        if $sink.is_level_enabled(Level::Debug) {
            $sink.log_message(Level::Debug, $function, line!(), format_args!($($arg)+));
        }
    };
}

/// Result of one [`DeadReckoningHelper::do_dr`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrOutcome {
    /// The transform was recomputed
    pub transformed: bool,
    /// The new pose should be clamped to the ground
    pub should_ground_clamp: bool,
    /// Kind of clamp the actor wants
    pub clamp_type: GroundClampType,
}

/// Dead reckoning state of one actor
#[derive(Debug, Clone)]
pub struct DeadReckoningHelper {
    algorithm: DeadReckoningAlgorithm,
    update_mode: UpdateMode,

    flying: bool,
    adjust_rotation_to_ground: bool,
    ground_offset: f32,
    model_dimensions: Vec3,
    use_model_dimensions: bool,

    updated: bool,
    translation_updated: bool,
    rotation_updated: bool,
    translation_initiated: bool,
    rotation_initiated: bool,
    rotation_resolved: bool,

    last_translation: Vec3,
    last_rotation: Vec3,
    last_quat: Quat,
    velocity: Vec3,
    acceleration: Vec3,
    angular_velocity: Vec3,

    velocity_before_last_update: Vec3,
    translation_before_last_update: Vec3,
    rotation_before_last_update: Quat,

    current_translation: Vec3,
    current_rotation: Quat,

    last_translation_updated_time: f64,
    last_rotation_updated_time: f64,
    average_time_between_translation_updates: f32,
    average_time_between_rotation_updates: f32,

    translation_elapsed_time: f32,
    rotation_elapsed_time: f32,
    translation_end_smoothing_time: f32,
    rotation_end_smoothing_time: f32,
    max_translation_smoothing_time: f32,
    max_rotation_smoothing_time: f32,

    force_clamp_timer: CountdownTimer,
    articulation: Articulation,
}

impl Default for DeadReckoningHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadReckoningHelper {
    /// Helper with no algorithm, automatic update mode and zeroed state
    pub fn new() -> Self {
        Self {
            algorithm: DeadReckoningAlgorithm::None,
            update_mode: UpdateMode::Auto,
            flying: false,
            adjust_rotation_to_ground: false,
            ground_offset: 0.0,
            model_dimensions: Vec3::zeros(),
            use_model_dimensions: false,
            updated: false,
            translation_updated: false,
            rotation_updated: false,
            translation_initiated: false,
            rotation_initiated: false,
            rotation_resolved: true,
            last_translation: Vec3::zeros(),
            last_rotation: Vec3::zeros(),
            last_quat: Quat::identity(),
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            velocity_before_last_update: Vec3::zeros(),
            translation_before_last_update: Vec3::zeros(),
            rotation_before_last_update: Quat::identity(),
            current_translation: Vec3::zeros(),
            current_rotation: Quat::identity(),
            last_translation_updated_time: 0.0,
            last_rotation_updated_time: 0.0,
            average_time_between_translation_updates: 0.0,
            average_time_between_rotation_updates: 0.0,
            translation_elapsed_time: 0.0,
            rotation_elapsed_time: 0.0,
            translation_end_smoothing_time: 0.0,
            rotation_end_smoothing_time: 0.0,
            max_translation_smoothing_time: DEFAULT_MAX_SMOOTHING_TIME_POS,
            max_rotation_smoothing_time: DEFAULT_MAX_SMOOTHING_TIME_ROT,
            force_clamp_timer: CountdownTimer::new(0.0),
            articulation: Articulation::new(),
        }
    }

    /// Helper using the configured smoothing limits
    pub fn from_config(config: &DeadReckoningConfig) -> Self {
        let mut helper = Self::new();
        helper.max_translation_smoothing_time = config.max_translation_smoothing_time;
        helper.max_rotation_smoothing_time = config.max_rotation_smoothing_time;
        helper
    }

    // ---- selectors ----

    /// Extrapolation model
    pub const fn algorithm(&self) -> DeadReckoningAlgorithm {
        self.algorithm
    }

    /// Change the extrapolation model. Marks the helper updated on change.
    pub fn set_algorithm(&mut self, algorithm: DeadReckoningAlgorithm) {
        if self.algorithm != algorithm {
            self.algorithm = algorithm;
            self.updated = true;
        }
    }

    /// Stored update mode
    pub const fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// Change the update mode
    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
    }

    /// Update mode with [`UpdateMode::Auto`] resolved for the actor's ownership
    pub const fn effective_update_mode(&self, is_remote: bool) -> UpdateMode {
        self.update_mode.effective(is_remote)
    }

    /// Whether the actor ignores the ground
    pub const fn is_flying(&self) -> bool {
        self.flying
    }

    /// Set the flying flag. Marks the helper updated on change.
    pub fn set_flying(&mut self, flying: bool) {
        if self.flying != flying {
            self.flying = flying;
            self.updated = true;
        }
    }

    /// Whether ground clamping should also align the rotation to the ground
    pub const fn adjust_rotation_to_ground(&self) -> bool {
        self.adjust_rotation_to_ground
    }

    /// Set the rotation alignment flag. Marks the helper updated on change.
    pub fn set_adjust_rotation_to_ground(&mut self, adjust: bool) {
        if self.adjust_rotation_to_ground != adjust {
            self.adjust_rotation_to_ground = adjust;
            self.updated = true;
        }
    }

    /// Height kept between the ground and the actor origin
    pub const fn ground_offset(&self) -> f32 {
        self.ground_offset
    }

    /// Set the ground offset
    pub fn set_ground_offset(&mut self, offset: f32) {
        self.ground_offset = offset;
        self.updated = true;
    }

    /// Model extents used for multi-point clamping
    pub const fn model_dimensions(&self) -> &Vec3 {
        &self.model_dimensions
    }

    /// Set the model extents; this also turns on their use
    pub fn set_model_dimensions(&mut self, dimensions: Vec3) {
        self.model_dimensions = dimensions;
        self.use_model_dimensions = true;
    }

    /// Whether the model extents are used
    pub const fn use_model_dimensions(&self) -> bool {
        self.use_model_dimensions
    }

    /// Turn use of the model extents on or off
    pub fn set_use_model_dimensions(&mut self, enabled: bool) {
        self.use_model_dimensions = enabled;
    }

    // ---- update flags ----

    /// Whether anything changed since the last tick
    pub const fn is_updated(&self) -> bool {
        self.updated
    }

    /// Whether translation or velocity changed since the last tick
    pub const fn is_translation_updated(&self) -> bool {
        self.translation_updated
    }

    /// Whether rotation changed since the last tick
    pub const fn is_rotation_updated(&self) -> bool {
        self.rotation_updated
    }

    /// Reset all update flags
    pub fn clear_updated(&mut self) {
        self.updated = false;
        self.translation_updated = false;
        self.rotation_updated = false;
    }

    /// Whether the drawn rotation has reached the target rotation
    pub const fn is_rotation_resolved(&self) -> bool {
        self.rotation_resolved
    }

    /// Mark the rotation resolved or not
    pub fn set_rotation_resolved(&mut self, resolved: bool) {
        self.rotation_resolved = resolved;
    }

    // ---- last known state ----

    /// Last reported translation
    pub const fn last_known_translation(&self) -> &Vec3 {
        &self.last_translation
    }

    /// Record a reported translation.
    ///
    /// The first report of a tick captures the currently drawn translation as
    /// the smoothing start; later reports in the same tick keep it.
    pub fn set_last_known_translation(&mut self, translation: Vec3) {
        if !self.translation_updated {
            self.translation_before_last_update = if self.translation_initiated {
                self.current_translation
            } else {
                translation
            };
        }
        self.translation_initiated = true;
        self.last_translation = translation;
        self.translation_elapsed_time = 0.0;
        self.translation_updated = true;
        self.updated = true;
    }

    /// Last reported heading, pitch, roll in degrees
    pub const fn last_known_rotation(&self) -> &Vec3 {
        &self.last_rotation
    }

    /// Last reported rotation as a quaternion
    pub const fn last_known_rotation_quat(&self) -> &Quat {
        &self.last_quat
    }

    /// Record a reported heading, pitch, roll in degrees
    pub fn set_last_known_rotation(&mut self, hpr: Vec3) {
        let quat = hpr_to_quat(&hpr);
        if !self.rotation_updated {
            self.rotation_before_last_update = if self.rotation_initiated {
                self.current_rotation
            } else {
                quat
            };
        }
        self.last_rotation = hpr;
        self.last_quat = quat;
        self.rotation_elapsed_time = 0.0;
        self.rotation_initiated = true;
        self.rotation_updated = true;
        self.updated = true;
    }

    /// Last reported velocity
    pub const fn velocity(&self) -> &Vec3 {
        &self.velocity
    }

    /// Record a reported velocity. Counts as a translation update.
    pub fn set_last_known_velocity(&mut self, velocity: Vec3) {
        self.velocity_before_last_update = self.velocity;
        self.velocity = velocity;
        self.translation_elapsed_time = 0.0;
        self.translation_updated = true;
        self.updated = true;
    }

    /// Velocity in effect before the last velocity report
    pub const fn velocity_before_last_update(&self) -> &Vec3 {
        &self.velocity_before_last_update
    }

    /// Last reported acceleration
    pub const fn acceleration(&self) -> &Vec3 {
        &self.acceleration
    }

    /// Record a reported acceleration
    pub fn set_last_known_acceleration(&mut self, acceleration: Vec3) {
        self.acceleration = acceleration;
        self.updated = true;
    }

    /// Last reported angular velocity, radians per second about each axis
    pub const fn angular_velocity(&self) -> &Vec3 {
        &self.angular_velocity
    }

    /// Record a reported angular velocity
    pub fn set_last_known_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.angular_velocity = angular_velocity;
        self.updated = true;
    }

    // ---- smoothing state ----

    /// Smoothing start translation
    pub const fn translation_before_last_update(&self) -> &Vec3 {
        &self.translation_before_last_update
    }

    /// Override the smoothing start translation
    pub fn set_translation_before_last_update(&mut self, translation: Vec3) {
        self.translation_before_last_update = translation;
    }

    /// Smoothing start rotation
    pub const fn rotation_before_last_update(&self) -> &Quat {
        &self.rotation_before_last_update
    }

    /// Override the smoothing start rotation
    pub fn set_rotation_before_last_update(&mut self, rotation: Quat) {
        self.rotation_before_last_update = rotation;
    }

    /// Translation produced by the last dead reckoning pass
    pub const fn current_dead_reckoned_translation(&self) -> &Vec3 {
        &self.current_translation
    }

    /// Rotation produced by the last dead reckoning pass
    pub const fn current_dead_reckoned_rotation_quat(&self) -> &Quat {
        &self.current_rotation
    }

    /// Heading, pitch, roll in degrees produced by the last dead reckoning pass
    pub fn current_dead_reckoned_rotation(&self) -> Vec3 {
        crate::foundation::math::quat_to_hpr(&self.current_rotation)
    }

    /// Simulation time of the last translation update
    pub const fn last_translation_updated_time(&self) -> f64 {
        self.last_translation_updated_time
    }

    /// Record the simulation time of a translation update and fold the gap
    /// since the previous one into the running average
    pub fn set_last_translation_updated_time(&mut self, time: f64) {
        let gap = (time - self.last_translation_updated_time) as f32;
        self.average_time_between_translation_updates =
            0.5 * (gap + self.average_time_between_translation_updates);
        self.last_translation_updated_time = time;
    }

    /// Simulation time of the last rotation update
    pub const fn last_rotation_updated_time(&self) -> f64 {
        self.last_rotation_updated_time
    }

    /// Rotation counterpart of [`Self::set_last_translation_updated_time`]
    pub fn set_last_rotation_updated_time(&mut self, time: f64) {
        let gap = (time - self.last_rotation_updated_time) as f32;
        self.average_time_between_rotation_updates =
            0.5 * (gap + self.average_time_between_rotation_updates);
        self.last_rotation_updated_time = time;
    }

    /// Running average of seconds between translation updates
    pub const fn average_time_between_translation_updates(&self) -> f32 {
        self.average_time_between_translation_updates
    }

    /// Running average of seconds between rotation updates
    pub const fn average_time_between_rotation_updates(&self) -> f32 {
        self.average_time_between_rotation_updates
    }

    /// Seconds since the last translation update
    pub const fn translation_elapsed_time(&self) -> f32 {
        self.translation_elapsed_time
    }

    /// Set the seconds since the last translation update
    pub fn set_translation_elapsed_time(&mut self, seconds: f32) {
        self.translation_elapsed_time = seconds;
    }

    /// Seconds since the last rotation update
    pub const fn rotation_elapsed_time(&self) -> f32 {
        self.rotation_elapsed_time
    }

    /// Set the seconds since the last rotation update
    pub fn set_rotation_elapsed_time(&mut self, seconds: f32) {
        self.rotation_elapsed_time = seconds;
    }

    /// Length of the current translation smoothing window
    pub const fn translation_end_smoothing_time(&self) -> f32 {
        self.translation_end_smoothing_time
    }

    /// Length of the current rotation smoothing window
    pub const fn rotation_end_smoothing_time(&self) -> f32 {
        self.rotation_end_smoothing_time
    }

    /// Upper bound of the translation smoothing window
    pub const fn max_translation_smoothing_time(&self) -> f32 {
        self.max_translation_smoothing_time
    }

    /// Set the upper bound of the translation smoothing window
    pub fn set_max_translation_smoothing_time(&mut self, seconds: f32) {
        self.max_translation_smoothing_time = seconds;
    }

    /// Upper bound of the rotation smoothing window
    pub const fn max_rotation_smoothing_time(&self) -> f32 {
        self.max_rotation_smoothing_time
    }

    /// Set the upper bound of the rotation smoothing window
    pub fn set_max_rotation_smoothing_time(&mut self, seconds: f32) {
        self.max_rotation_smoothing_time = seconds;
    }

    /// Seconds left before a forced ground clamp
    pub const fn time_until_force_clamp(&self) -> f32 {
        self.force_clamp_timer.remaining()
    }

    /// Set the seconds left before a forced ground clamp
    pub fn set_time_until_force_clamp(&mut self, seconds: f32) {
        self.force_clamp_timer.set_remaining(seconds);
    }

    pub(crate) fn force_clamp_timer_mut(&mut self) -> &mut CountdownTimer {
        &mut self.force_clamp_timer
    }

    /// Queued articulation updates
    pub const fn articulation(&self) -> &Articulation {
        &self.articulation
    }

    /// Queued articulation updates, mutably
    pub fn articulation_mut(&mut self) -> &mut Articulation {
        &mut self.articulation
    }

    // ---- dead reckoning ----

    /// Rotation accumulated over `delta_time` seconds at the current angular
    /// velocity, as a row-convention matrix. Identity when the angular
    /// velocity is negligible.
    pub fn compute_rotation_change_with_angular_velocity(&self, delta_time: f32) -> Mat3d {
        if self.angular_velocity.norm_squared() < MIN_ANGULAR_VELOCITY_SQUARED {
            return Mat3d::identity();
        }

        let w_vec: Vec3d = self.angular_velocity.cast::<f64>();
        let w = w_vec.norm();
        let angle = w * f64::from(delta_time);
        let c1 = (1.0 - angle.cos()) / (w * w);
        let c2 = angle.cos();
        let c3 = -angle.sin() / w;

        let omega = Mat3d::new(
            0.0, -w_vec.z, w_vec.y, //
            w_vec.z, 0.0, -w_vec.x, //
            -w_vec.y, w_vec.x, 0.0,
        );

        w_vec * w_vec.transpose() * c1 + Mat3d::identity() * c2 + omega * c3
    }

    /// Size the smoothing windows after an update.
    ///
    /// Each window starts as the average update interval capped by its
    /// maximum. It collapses to at most one second when the actor could not
    /// plausibly cover the correction at its reported speed, so a teleport
    /// snaps instead of floating.
    pub fn calculate_smoothing_times(&mut self, xform: &Transform) {
        self.rotation_end_smoothing_time = self
            .max_rotation_smoothing_time
            .min(self.average_time_between_rotation_updates);

        if self.algorithm.uses_acceleration() {
            let turn = self.angular_velocity.norm_squared()
                * self.rotation_end_smoothing_time
                * self.rotation_end_smoothing_time;
            let correction = (self.last_quat.coords - self.current_rotation.coords).norm_squared();
            if turn < 0.1 * correction {
                self.rotation_end_smoothing_time = self.rotation_end_smoothing_time.min(1.0);
            }
        }

        self.translation_end_smoothing_time = self
            .max_translation_smoothing_time
            .min(self.average_time_between_translation_updates);

        let reach = self.velocity.norm_squared()
            * self.translation_end_smoothing_time
            * self.translation_end_smoothing_time;
        if reach < (self.last_translation - xform.translation).norm_squared() {
            self.translation_end_smoothing_time = self.translation_end_smoothing_time.min(1.0);
        }
    }

    /// Ground clamp kind for the current flags
    pub const fn ground_clamp_type(&self) -> GroundClampType {
        if self.flying {
            GroundClampType::None
        } else if self.adjust_rotation_to_ground {
            GroundClampType::Ranged
        } else {
            GroundClampType::IntermittentSaveOffset
        }
    }

    /// Extrapolate the actor's pose into `xform`.
    ///
    /// `xform` should hold the actor's current transform on entry. With
    /// [`DeadReckoningAlgorithm::None`] it is overwritten with the actor's
    /// transform and nothing is reported as transformed. An actor that is at
    /// rest at its last known pose is left untouched as well.
    pub fn do_dr(&mut self, actor: &Actor, xform: &mut Transform, logger: &dyn LogSink) -> DrOutcome {
        let clamp_type = self.ground_clamp_type();

        let transformed = match self.algorithm {
            DeadReckoningAlgorithm::None => {
                sink_debug!(
                    logger,
                    "do_dr",
                    "Dead reckoning algorithm for \"{}\" is NONE, keeping the actor's transform",
                    actor.name()
                );
                *xform = *actor.transform();
                false
            }
            DeadReckoningAlgorithm::Static => {
                if self.updated {
                    self.dr_static(actor, xform, logger);
                    true
                } else {
                    false
                }
            }
            DeadReckoningAlgorithm::VelocityOnly | DeadReckoningAlgorithm::VelocityAndAcceleration => {
                self.dr_velocity_acceleration(actor, xform, logger)
            }
        };

        DrOutcome {
            transformed,
            should_ground_clamp: transformed && !self.flying,
            clamp_type,
        }
    }

    fn dr_static(&mut self, actor: &Actor, xform: &mut Transform, logger: &dyn LogSink) {
        sink_debug!(
            logger,
            "dr_static",
            "Dead reckoning \"{}\" as STATIC. New position is {:?}, new rotation is {:?}",
            actor.name(),
            self.last_translation,
            self.last_rotation
        );

        xform.translation = self.last_translation;
        xform.rotation = self.last_rotation;

        self.translation_before_last_update = self.last_translation;
        self.rotation_before_last_update = self.last_quat;
        self.rotation_resolved = true;

        self.current_translation = self.last_translation;
        self.current_rotation = self.last_quat;
    }

    fn needs_dead_reckoning(&self, xform: &Transform) -> bool {
        let accelerating = self.algorithm.uses_acceleration();
        self.updated
            || self.last_translation != xform.translation
            || !self.rotation_resolved
            || self.velocity.norm_squared() > 1e-2
            || (accelerating && self.acceleration.norm_squared() > 1e-2)
            || (accelerating && self.angular_velocity.norm_squared() > 1e-5)
    }

    fn dr_velocity_acceleration(
        &mut self,
        actor: &Actor,
        xform: &mut Transform,
        logger: &dyn LogSink,
    ) -> bool {
        if !self.needs_dead_reckoning(xform) {
            sink_debug!(logger, "dr_velocity_acceleration", "\"{}\" does not need to be dead reckoned", actor.name());
            return false;
        }

        sink_debug!(
            logger,
            "dr_velocity_acceleration",
            "Dead reckoning \"{}\": flying {}, last translation {:?}, drawn translation {:?}, |v|^2 {}, |a|^2 {}",
            actor.name(),
            self.flying,
            self.last_translation,
            xform.translation,
            self.velocity.norm_squared(),
            self.acceleration.norm_squared()
        );

        if self.updated {
            self.calculate_smoothing_times(xform);
            sink_debug!(
                logger,
                "dr_velocity_acceleration",
                "\"{}\" got an update: rotation {:?}, position {:?}, smoothing {} / {}",
                actor.name(),
                self.last_rotation,
                self.last_translation,
                self.translation_end_smoothing_time,
                self.rotation_end_smoothing_time
            );
        }

        self.dead_reckon_rotation(xform);
        xform.translation = self.dead_reckon_position(actor, logger);
        true
    }

    fn dead_reckon_rotation(&mut self, xform: &mut Transform) {
        if self.rotation_resolved {
            return;
        }

        let mut target = self.last_quat;
        let mut start = self.rotation_before_last_update;
        let mut changed_by_angular_velocity = false;

        if self.algorithm.uses_acceleration()
            && self.angular_velocity.norm_squared() >= MIN_ANGULAR_VELOCITY_SQUARED
        {
            changed_by_angular_velocity = true;
            let change = matrix_to_quat(&self.compute_rotation_change_with_angular_velocity(
                self.rotation_elapsed_time,
            ));
            target = self.last_quat * change;
            start = self.rotation_before_last_update * change;
        }

        let rotation = if self.rotation_end_smoothing_time > 0.0
            && self.rotation_elapsed_time < self.rotation_end_smoothing_time
        {
            let factor = (self.rotation_elapsed_time / self.rotation_end_smoothing_time).clamp(0.0, 1.0);
            start.try_slerp(&target, factor, 1.0e-6).unwrap_or(target)
        } else {
            self.rotation_resolved = !changed_by_angular_velocity;
            target
        };

        xform.set_rotation_quat(&rotation);
        self.current_rotation = rotation;
    }

    fn dead_reckon_position(&mut self, actor: &Actor, logger: &dyn LogSink) -> Vec3 {
        let t = self.translation_elapsed_time;

        let acceleration_effect = if self.algorithm.uses_acceleration() {
            self.acceleration * (0.5 * t * t)
        } else {
            Vec3::zeros()
        };

        // Ease into the new velocity over the first third of the window
        let blend_time = self.translation_end_smoothing_time / 3.0;
        let blended_velocity = if blend_time > 0.0 && t < blend_time {
            let factor = t / blend_time;
            self.velocity_before_last_update * (1.0 - factor) + self.velocity * factor
        } else {
            self.velocity
        };

        let dr_position = self.last_translation + self.velocity * t + acceleration_effect;

        let position = if self.translation_end_smoothing_time > 0.0 && t < self.translation_end_smoothing_time {
            let blended = self.translation_before_last_update + blended_velocity * t + acceleration_effect;
            let factor = t / self.translation_end_smoothing_time;
            blended + (dr_position - blended) * factor
        } else {
            dr_position
        };

        sink_debug!(
            logger,
            "dead_reckon_position",
            "\"{}\" target position {:?}, drawn position {:?} at time {}",
            actor.name(),
            dr_position,
            position,
            self.last_translation_updated_time + f64::from(t)
        );

        self.current_translation = position;
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::logging::RecordingLogSink;
    use approx::assert_relative_eq;

    fn smoothing_helper() -> (DeadReckoningHelper, Transform) {
        let xform = Transform::new(Vec3::new(300.0, 200.0, 100.0), Vec3::new(30.0, 32.2, 93.0));
        let mut helper = DeadReckoningHelper::new();
        helper.set_last_known_translation(Vec3::new(-0.4, -0.3, -2.7));
        helper.set_last_known_rotation(Vec3::new(-0.4, -0.3, -2.7));
        helper.set_last_known_velocity(Vec3::zeros());
        (helper, xform)
    }

    #[test]
    fn test_defaults() {
        let helper = DeadReckoningHelper::default();
        assert_eq!(helper.algorithm(), DeadReckoningAlgorithm::None);
        assert_eq!(helper.update_mode(), UpdateMode::Auto);
        assert_eq!(helper.effective_update_mode(false), UpdateMode::CalculateOnly);
        assert_eq!(helper.effective_update_mode(true), UpdateMode::CalculateAndMoveActor);
        assert!(!helper.is_flying());
        assert!(!helper.is_updated());
        assert_eq!(*helper.last_known_translation(), Vec3::zeros());
        assert_eq!(*helper.last_known_rotation(), Vec3::zeros());
        assert_eq!(*helper.velocity(), Vec3::zeros());
        assert_eq!(*helper.acceleration(), Vec3::zeros());
        assert_eq!(*helper.angular_velocity(), Vec3::zeros());
        assert_eq!(helper.ground_offset(), 0.0);
        assert_eq!(helper.max_rotation_smoothing_time(), 2.0);
        assert_eq!(helper.max_translation_smoothing_time(), 8.0);
        assert_eq!(helper.time_until_force_clamp(), 0.0);
        assert!(helper.articulation().is_empty());
    }

    #[test]
    fn test_setters_mark_updated() {
        let mut helper = DeadReckoningHelper::new();
        helper.set_flying(true);
        assert!(helper.is_updated());
        assert!(helper.is_flying());
        helper.clear_updated();
        assert!(!helper.is_updated());

        // Setting the same value again is not a change
        helper.set_flying(true);
        assert!(!helper.is_updated());

        helper.set_algorithm(DeadReckoningAlgorithm::Static);
        assert!(helper.is_updated());
        helper.clear_updated();

        let v = Vec3::new(3.1, 9900.032, 493.738);
        helper.set_last_known_translation(v);
        assert_eq!(*helper.last_known_translation(), v);
        assert!(helper.is_updated() && helper.is_translation_updated());
        helper.clear_updated();

        helper.set_last_known_rotation(v);
        assert_eq!(*helper.last_known_rotation(), v);
        assert!(helper.is_updated() && helper.is_rotation_updated());
        helper.clear_updated();

        helper.set_last_known_velocity(v);
        assert_eq!(*helper.velocity(), v);
        assert!(helper.is_translation_updated());
        helper.clear_updated();

        helper.set_last_known_acceleration(v);
        assert!(helper.is_updated());
        helper.clear_updated();

        helper.set_last_known_angular_velocity(v);
        assert!(helper.is_updated());
        helper.clear_updated();

        helper.set_ground_offset(43.4);
        assert_eq!(helper.ground_offset(), 43.4);
        assert!(helper.is_updated());
        helper.clear_updated();

        helper.set_max_rotation_smoothing_time(5.3);
        helper.set_max_translation_smoothing_time(4.8);
        assert!(!helper.is_updated());
        assert_eq!(helper.max_rotation_smoothing_time(), 5.3);
        assert_eq!(helper.max_translation_smoothing_time(), 4.8);

        helper.set_time_until_force_clamp(6.7);
        assert_eq!(helper.time_until_force_clamp(), 6.7);
    }

    #[test]
    fn test_model_dimensions() {
        let mut helper = DeadReckoningHelper::new();
        assert!(!helper.use_model_dimensions());
        helper.set_model_dimensions(Vec3::new(2.0, 4.0, 1.5));
        assert!(helper.use_model_dimensions());
        assert_eq!(*helper.model_dimensions(), Vec3::new(2.0, 4.0, 1.5));
        helper.set_use_model_dimensions(false);
        assert!(!helper.use_model_dimensions());
    }

    #[test]
    fn test_update_time_average() {
        let mut helper = DeadReckoningHelper::new();
        helper.set_last_translation_updated_time(20.0);
        helper.set_last_translation_updated_time(40.0);
        assert_relative_eq!(helper.average_time_between_translation_updates(), 15.0);
        assert_relative_eq!(helper.last_translation_updated_time(), 40.0);
    }

    #[test]
    fn test_first_update_in_tick_keeps_smoothing_start() {
        let mut helper = DeadReckoningHelper::new();
        helper.set_last_known_translation(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(*helper.translation_before_last_update(), Vec3::new(1.0, 0.0, 0.0));

        // Second report before the tick consumed the first
        helper.set_last_known_translation(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(*helper.translation_before_last_update(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(*helper.last_known_translation(), Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_smoothing_times() {
        let (mut helper, xform) = smoothing_helper();
        helper.set_last_translation_updated_time(20.0);
        helper.set_last_translation_updated_time(40.0);
        helper.set_last_rotation_updated_time(20.0);
        helper.set_last_rotation_updated_time(40.0);
        assert!(helper.average_time_between_translation_updates() > 10.0);
        assert!(helper.average_time_between_rotation_updates() > 10.0);

        // Too far for a stationary actor: snap within a second
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityAndAcceleration);
        helper.calculate_smoothing_times(&xform);
        assert_eq!(helper.translation_end_smoothing_time(), 1.0);
        assert_eq!(helper.rotation_end_smoothing_time(), 1.0);

        // Fast enough to get there: use the full window
        helper.set_last_known_velocity(Vec3::new(100.0, 100.0, 100.0));
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityOnly);
        helper.calculate_smoothing_times(&xform);
        assert_eq!(
            helper.translation_end_smoothing_time(),
            helper.max_translation_smoothing_time()
        );
        assert_eq!(
            helper.rotation_end_smoothing_time(),
            helper.max_rotation_smoothing_time()
        );
    }

    #[test]
    fn test_smoothing_times_fast_updates() {
        let (mut helper, xform) = smoothing_helper();
        helper.set_last_translation_updated_time(0.01);
        helper.set_last_translation_updated_time(0.01);
        helper.set_last_rotation_updated_time(0.01);
        helper.set_last_rotation_updated_time(0.01);
        assert!(helper.average_time_between_translation_updates() < 1.0);

        helper.set_algorithm(DeadReckoningAlgorithm::VelocityAndAcceleration);
        helper.calculate_smoothing_times(&xform);
        assert_eq!(
            helper.translation_end_smoothing_time(),
            helper.average_time_between_translation_updates()
        );
        assert_eq!(
            helper.rotation_end_smoothing_time(),
            helper.average_time_between_rotation_updates()
        );
    }

    #[test]
    fn test_rotation_snap_respects_max_smoothing() {
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityAndAcceleration);
        helper.set_max_rotation_smoothing_time(0.5);
        helper.set_last_known_rotation(Vec3::new(90.0, 0.0, 0.0));
        helper.set_last_rotation_updated_time(6.0);
        assert_relative_eq!(helper.average_time_between_rotation_updates(), 3.0);

        // No angular velocity to turn through the correction, so it snaps,
        // but never over the configured window
        helper.calculate_smoothing_times(&Transform::default());
        assert_relative_eq!(helper.rotation_end_smoothing_time(), 0.5);
    }

    #[test]
    fn test_none_never_transforms() {
        let sink = RecordingLogSink::default();
        let actor = Actor::remote("a")
            .with_transform(Transform::from_translation(Vec3::new(7.0, 8.0, 9.0)));
        let mut helper = DeadReckoningHelper::new();
        helper.set_last_known_translation(Vec3::new(1.0, 1.2, 1.3));
        helper.set_last_known_velocity(Vec3::new(10.0, 0.0, 0.0));

        let mut xform = Transform::default();
        let outcome = helper.do_dr(&actor, &mut xform, &sink);
        assert!(!outcome.transformed);
        assert!(!outcome.should_ground_clamp);
        assert_eq!(xform, *actor.transform());
        assert_eq!(*helper.current_dead_reckoned_translation(), Vec3::zeros());
        assert_eq!(sink.count(Level::Debug), 1);
    }

    #[test]
    fn test_static_snaps_to_last_known() {
        for flying in [false, true] {
            let actor = Actor::remote("a");
            let mut helper = DeadReckoningHelper::new();
            helper.set_last_known_translation(Vec3::new(1.0, 1.2, 1.3));
            helper.set_last_known_rotation(Vec3::new(10.0, 5.0, -3.0));
            helper.set_algorithm(DeadReckoningAlgorithm::Static);
            helper.set_flying(flying);

            let mut xform = *actor.transform();
            let outcome = helper.do_dr(&actor, &mut xform, &RecordingLogSink::default());
            assert!(outcome.transformed);
            assert_eq!(outcome.should_ground_clamp, !flying);
            assert_eq!(outcome.clamp_type == GroundClampType::None, flying);
            assert_eq!(xform.translation, *helper.last_known_translation());
            assert_eq!(xform.rotation, *helper.last_known_rotation());
            assert!(helper.is_rotation_resolved());

            // Nothing new: static does not run again
            helper.clear_updated();
            let outcome = helper.do_dr(&actor, &mut xform, &RecordingLogSink::default());
            assert!(!outcome.transformed);
        }
    }

    #[test]
    fn test_clamp_type_selection() {
        let mut helper = DeadReckoningHelper::new();
        assert_eq!(helper.ground_clamp_type(), GroundClampType::IntermittentSaveOffset);
        helper.set_adjust_rotation_to_ground(true);
        assert_eq!(helper.ground_clamp_type(), GroundClampType::Ranged);
        helper.set_flying(true);
        assert_eq!(helper.ground_clamp_type(), GroundClampType::None);
    }

    #[test]
    fn test_velocity_extrapolation_after_smoothing() {
        let actor = Actor::remote("a");
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityOnly);
        helper.set_last_known_translation(Vec3::new(10.0, 0.0, 0.0));
        helper.set_last_known_velocity(Vec3::new(2.0, 0.0, 0.0));
        helper.set_translation_elapsed_time(3.0);

        // No smoothing window yet, so this is pure extrapolation
        let mut xform = *actor.transform();
        let outcome = helper.do_dr(&actor, &mut xform, &RecordingLogSink::new(Level::Info));
        assert!(outcome.transformed);
        assert_relative_eq!(xform.translation, Vec3::new(16.0, 0.0, 0.0), epsilon = 1e-5);
        assert_eq!(*helper.current_dead_reckoned_translation(), xform.translation);
    }

    #[test]
    fn test_acceleration_term() {
        let actor = Actor::remote("a");
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityAndAcceleration);
        helper.set_last_known_translation(Vec3::zeros());
        helper.set_last_known_velocity(Vec3::new(1.0, 0.0, 0.0));
        helper.set_last_known_acceleration(Vec3::new(0.0, 2.0, 0.0));
        helper.set_translation_elapsed_time(2.0);

        let mut xform = *actor.transform();
        helper.do_dr(&actor, &mut xform, &RecordingLogSink::new(Level::Info));
        assert_relative_eq!(xform.translation, Vec3::new(2.0, 4.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_smoothing_blends_from_previous_pose() {
        let actor = Actor::remote("a");
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityOnly);
        helper.set_last_known_translation(Vec3::zeros());
        helper.clear_updated();
        let mut xform = *actor.transform();
        helper.do_dr(&actor, &mut xform, &RecordingLogSink::new(Level::Info));

        // Jump of 1 unit, a 3 second average update gap and enough speed to
        // cover it: blend over 3 seconds
        helper.set_last_translation_updated_time(4.0);
        helper.set_last_translation_updated_time(8.0);
        helper.set_last_known_translation(Vec3::new(1.0, 0.0, 0.0));
        helper.set_last_known_velocity(Vec3::new(0.0, 1.0, 0.0));
        helper.calculate_smoothing_times(&xform);
        assert_relative_eq!(helper.translation_end_smoothing_time(), 3.0);

        helper.set_translation_elapsed_time(1.5);
        helper.clear_updated();
        let outcome = helper.do_dr(&actor, &mut xform, &RecordingLogSink::new(Level::Info));
        assert!(outcome.transformed);
        // Halfway between the old pose and the dead reckoned one in x
        assert_relative_eq!(xform.translation.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(xform.translation.y, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_rest_at_last_known_is_skipped() {
        let actor = Actor::remote("a");
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityOnly);
        helper.set_last_known_translation(Vec3::new(4.0, 4.0, 0.0));
        helper.clear_updated();

        let mut xform = Transform::from_translation(Vec3::new(4.0, 4.0, 0.0));
        let outcome = helper.do_dr(&actor, &mut xform, &RecordingLogSink::new(Level::Info));
        assert!(!outcome.transformed);
        assert!(!outcome.should_ground_clamp);
    }

    #[test]
    fn test_angular_velocity_matrix() {
        let mut helper = DeadReckoningHelper::new();
        assert_eq!(helper.compute_rotation_change_with_angular_velocity(1.0), Mat3d::identity());

        helper.set_last_known_angular_velocity(Vec3::new(0.0, 0.0, 0.5));
        let m = helper.compute_rotation_change_with_angular_velocity(1.0);
        let expected = crate::foundation::math::hpr_to_matrix(&Vec3d::new(0.5f64.to_degrees(), 0.0, 0.0));
        assert_relative_eq!(m, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_angular_velocity_turns_heading() {
        let actor = Actor::remote("a");
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::VelocityAndAcceleration);
        helper.set_last_known_rotation(Vec3::zeros());
        helper.set_last_known_angular_velocity(Vec3::new(0.0, 0.0, 0.5));
        helper.set_rotation_resolved(false);
        helper.set_rotation_elapsed_time(1.0);

        let mut xform = *actor.transform();
        let outcome = helper.do_dr(&actor, &mut xform, &RecordingLogSink::new(Level::Info));
        assert!(outcome.transformed);
        assert_relative_eq!(xform.rotation.x, 0.5f32.to_degrees(), epsilon = 1e-2);
        // Keeps turning, so the rotation never settles
        assert!(!helper.is_rotation_resolved());
    }
}
