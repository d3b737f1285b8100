//! Per-tick driver of every registered dead reckoning helper

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};

use super::algorithm::{GroundClampType, UpdateMode};
use super::helper::DeadReckoningHelper;
use super::DeadReckoningError;
use crate::core::DeadReckoningConfig;
use crate::ecs::World;
use crate::foundation::collections::{ActorId, SecondaryMap, WeakHandle};
use crate::foundation::logging::{DefaultLogSink, LogSink};
use crate::foundation::math::{Transform, Vec3};
use crate::foundation::time::TickInfo;

/// Log target used for helper diagnostics
pub const LOG_TARGET: &str = "dr_engine::dead_reckoning";

/// Pose computed for one actor during a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadReckonedPose {
    /// Actor the pose belongs to
    pub actor: ActorId,
    /// Dead reckoned transform
    pub transform: Transform,
    /// Whether the transform was written to the actor
    pub applied: bool,
}

/// Request for the ground clamping system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundClampRequest {
    /// Actor to clamp
    pub actor: ActorId,
    /// Transform to clamp
    pub transform: Transform,
    /// The actor did not move but its clamp interval ran out
    pub forced: bool,
    /// The actor is close enough to the eye point for high resolution terrain
    pub high_resolution: bool,
    /// Kind of clamp wanted
    pub clamp_type: GroundClampType,
    /// Height to keep above the ground
    pub ground_offset: f32,
    /// Model extents, when the helper uses them
    pub model_dimensions: Option<Vec3>,
}

/// Everything one tick produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Poses of actors whose transform was recomputed
    pub poses: Vec<DeadReckonedPose>,
    /// Actors that need ground clamping
    pub clamp_requests: Vec<GroundClampRequest>,
    /// Registrations dropped because their actor no longer exists
    pub removed: Vec<ActorId>,
}

impl TickReport {
    /// Pose computed for `actor`, if any
    pub fn pose(&self, actor: ActorId) -> Option<&DeadReckonedPose> {
        self.poses.iter().find(|pose| pose.actor == actor)
    }

    /// Clamp request for `actor`, if any
    pub fn clamp_request(&self, actor: ActorId) -> Option<&GroundClampRequest> {
        self.clamp_requests.iter().find(|request| request.actor == actor)
    }
}

/// Count down the helper's forced clamp timer.
///
/// A changed transform restarts the countdown at `interval`. An unchanged one
/// fires once the countdown runs out and then restarts it.
pub fn advance_force_clamp(
    helper: &mut DeadReckoningHelper,
    delta_real_time: f32,
    transform_changed: bool,
    interval: f32,
) -> bool {
    helper
        .force_clamp_timer_mut()
        .advance(delta_real_time, transform_changed, interval)
}

/// Registry of dead reckoned actors.
///
/// Holds one [`DeadReckoningHelper`] per registered actor plus weak handles to
/// the terrain and eye point actors. None of these keep their actor alive;
/// stale entries are dropped at the start of the next tick.
pub struct DeadReckoningComponent {
    config: DeadReckoningConfig,
    registry: SecondaryMap<ActorId, DeadReckoningHelper>,
    terrain: WeakHandle<ActorId>,
    eye_point: WeakHandle<ActorId>,
    last_eye_point: Option<Vec3>,
    logger: Arc<dyn LogSink + Send + Sync>,
}

impl fmt::Debug for DeadReckoningComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeadReckoningComponent")
            .field("config", &self.config)
            .field("registered", &self.registry.len())
            .field("terrain", &self.terrain)
            .field("eye_point", &self.eye_point)
            .field("last_eye_point", &self.last_eye_point)
            .finish_non_exhaustive()
    }
}

impl Default for DeadReckoningComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadReckoningComponent {
    /// Component with default settings
    pub fn new() -> Self {
        Self::from_config(&DeadReckoningConfig::default())
    }

    /// Component with the given settings
    pub fn from_config(config: &DeadReckoningConfig) -> Self {
        Self {
            config: config.clone(),
            registry: SecondaryMap::new(),
            terrain: WeakHandle::none(),
            eye_point: WeakHandle::none(),
            last_eye_point: None,
            logger: Arc::new(DefaultLogSink::new(LOG_TARGET)),
        }
    }

    /// Route helper diagnostics to `logger`
    #[must_use]
    pub fn with_log_sink(mut self, logger: Arc<dyn LogSink + Send + Sync>) -> Self {
        self.logger = logger;
        self
    }

    /// Component name
    pub fn name(&self) -> &str {
        &self.config.component_name
    }

    /// Active settings
    pub const fn config(&self) -> &DeadReckoningConfig {
        &self.config
    }

    /// A helper carrying this component's smoothing limits
    pub fn create_helper(&self) -> DeadReckoningHelper {
        DeadReckoningHelper::from_config(&self.config)
    }

    /// Seconds between forced clamps of an actor that is not moving
    pub const fn force_clamp_interval(&self) -> f32 {
        self.config.force_clamp_interval
    }

    /// Set the forced clamp interval
    pub fn set_force_clamp_interval(&mut self, seconds: f32) {
        self.config.force_clamp_interval = seconds;
    }

    /// Eye point distance within which clamping uses high resolution terrain.
    /// Zero turns high resolution clamping off.
    pub const fn high_res_ground_clamping_range(&self) -> f32 {
        self.config.high_res_ground_clamping_range
    }

    /// Set the high resolution clamping range
    pub fn set_high_res_ground_clamping_range(&mut self, range: f32) {
        self.config.high_res_ground_clamping_range = range;
    }

    // ---- terrain and eye point ----

    /// Terrain actor, if it is still alive
    pub fn terrain_actor(&self, world: &World) -> Option<ActorId> {
        self.terrain.upgrade(world.actors())
    }

    /// Set or clear the terrain actor
    pub fn set_terrain_actor(&mut self, terrain: Option<ActorId>) {
        self.terrain.set(terrain);
    }

    /// Eye point actor, if it is still alive
    pub fn eye_point_actor(&self, world: &World) -> Option<ActorId> {
        self.eye_point.upgrade(world.actors())
    }

    /// Set or clear the eye point actor
    pub fn set_eye_point_actor(&mut self, eye_point: Option<ActorId>) {
        self.eye_point.set(eye_point);
    }

    /// Eye point translation sampled at the start of the last tick
    pub const fn last_eye_point(&self) -> Option<Vec3> {
        self.last_eye_point
    }

    // ---- registry ----

    /// Start dead reckoning `id` with `helper`.
    ///
    /// A remote actor whose helper already carries an update is moved to the
    /// last known pose right away. A local actor seeds the helper from its
    /// current transform.
    pub fn register_actor(
        &mut self,
        world: &mut World,
        id: ActorId,
        mut helper: DeadReckoningHelper,
    ) -> Result<(), DeadReckoningError> {
        let Some(actor) = world.get_mut(id) else {
            warn!("Cannot register {id:?} with \"{}\": no such actor", self.config.component_name);
            return Err(DeadReckoningError::UnknownActor(id));
        };

        if self.registry.contains_key(id) {
            warn!(
                "Actor \"{}\" is already registered with \"{}\"",
                actor.name(),
                self.config.component_name
            );
            return Err(DeadReckoningError::AlreadyRegistered(id));
        }

        match helper.effective_update_mode(actor.is_remote()) {
            UpdateMode::CalculateAndMoveActor => {
                if helper.is_updated() {
                    let translation = *helper.last_known_translation();
                    let rotation = *helper.last_known_rotation();
                    let quat = *helper.last_known_rotation_quat();
                    actor.set_transform(Transform::new(translation, rotation));
                    helper.set_translation_before_last_update(translation);
                    helper.set_rotation_before_last_update(quat);
                }
            }
            UpdateMode::CalculateOnly => {
                let xform = *actor.transform();
                helper.set_last_known_translation(xform.translation);
                helper.set_last_known_rotation(xform.rotation);
                let quat = *helper.last_known_rotation_quat();
                helper.set_translation_before_last_update(xform.translation);
                helper.set_rotation_before_last_update(quat);
            }
            UpdateMode::Auto => {}
        }

        debug!("Registered \"{}\" for dead reckoning", actor.name());
        self.registry.insert(id, helper);
        Ok(())
    }

    /// Stop dead reckoning `id`, returning its helper
    pub fn unregister_actor(&mut self, id: ActorId) -> Result<DeadReckoningHelper, DeadReckoningError> {
        self.registry
            .remove(id)
            .ok_or(DeadReckoningError::NotRegistered(id))
    }

    /// Whether `id` has a helper
    pub fn is_registered(&self, id: ActorId) -> bool {
        self.registry.contains_key(id)
    }

    /// Number of registered actors
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Helper of `id`
    pub fn helper(&self, id: ActorId) -> Option<&DeadReckoningHelper> {
        self.registry.get(id)
    }

    /// Helper of `id`, mutably. This is where network updates are written.
    pub fn helper_mut(&mut self, id: ActorId) -> Option<&mut DeadReckoningHelper> {
        self.registry.get_mut(id)
    }

    /// Forget everything that refers to a deleted actor
    pub fn on_actor_deleted(&mut self, id: ActorId) {
        if self.registry.remove(id).is_some() {
            debug!("Unregistered deleted actor {id:?}");
        }
        if self.terrain.is(id) {
            self.terrain.clear();
        }
        if self.eye_point.is(id) {
            self.eye_point.clear();
        }
    }

    /// [`advance_force_clamp`] with this component's interval
    pub fn should_force_clamp(
        &self,
        helper: &mut DeadReckoningHelper,
        delta_real_time: f32,
        transform_changed: bool,
    ) -> bool {
        advance_force_clamp(
            helper,
            delta_real_time,
            transform_changed,
            self.config.force_clamp_interval,
        )
    }

    // ---- tick ----

    fn prune(&mut self, world: &World, report: &mut TickReport) {
        if self.terrain.prune(world.actors()) {
            info!("Terrain actor of \"{}\" was deleted", self.config.component_name);
        }
        if self.eye_point.prune(world.actors()) {
            info!("Eye point actor of \"{}\" was deleted", self.config.component_name);
        }

        let removed = &mut report.removed;
        self.registry.retain(|id, _| {
            let alive = world.contains(id);
            if !alive {
                removed.push(id);
            }
            alive
        });
        if !removed.is_empty() {
            info!(
                "\"{}\" dropped {} registrations of deleted actors",
                self.config.component_name,
                removed.len()
            );
        }
    }

    /// Dead reckon every registered actor for one tick.
    ///
    /// Poses of actors in [`UpdateMode::CalculateAndMoveActor`] are written to
    /// the world. Actors that moved, or whose forced clamp interval ran out,
    /// come back as clamp requests unless they are flying.
    pub fn tick_remote(&mut self, world: &mut World, tick: &TickInfo) -> TickReport {
        let mut report = TickReport::default();
        self.prune(world, &mut report);

        self.last_eye_point = self
            .eye_point
            .key()
            .and_then(|id| world.transform(id))
            .map(|xform| xform.translation);

        let delta = tick.delta_sim_time as f32;
        let delta_real = tick.delta_real_time as f32;
        let interval = self.config.force_clamp_interval;
        let range = self.config.high_res_ground_clamping_range;
        let eye_point = self.last_eye_point;
        let logger = self.logger.as_ref();

        for (id, helper) in &mut self.registry {
            let Some(actor) = world.get(id) else {
                continue;
            };

            if helper.is_updated() {
                if helper.is_translation_updated() {
                    helper.set_last_translation_updated_time(tick.start_time());
                    helper.set_translation_elapsed_time(0.0);
                }
                if helper.is_rotation_updated() {
                    helper.set_last_rotation_updated_time(tick.start_time());
                    helper.set_rotation_elapsed_time(0.0);
                    helper.set_rotation_resolved(false);
                }
            }

            helper.set_translation_elapsed_time((helper.translation_elapsed_time() + delta).max(0.0));
            helper.set_rotation_elapsed_time((helper.rotation_elapsed_time() + delta).max(0.0));

            let mode = helper.effective_update_mode(actor.is_remote());
            let mut xform = *actor.transform();
            let outcome = helper.do_dr(actor, &mut xform, logger);

            let move_actor = mode == UpdateMode::CalculateAndMoveActor;
            if outcome.transformed {
                let applied = move_actor && world.set_transform(id, xform);
                report.poses.push(DeadReckonedPose {
                    actor: id,
                    transform: xform,
                    applied,
                });
            }

            let forced = advance_force_clamp(helper, delta_real, outcome.transformed, interval);
            if !helper.is_flying() && (outcome.should_ground_clamp || forced) {
                let high_resolution = range > 0.0
                    && eye_point.is_some_and(|eye| {
                        (xform.translation - eye).norm_squared() <= range * range
                    });
                report.clamp_requests.push(GroundClampRequest {
                    actor: id,
                    transform: xform,
                    forced: forced && !outcome.should_ground_clamp,
                    high_resolution,
                    clamp_type: outcome.clamp_type,
                    ground_offset: helper.ground_offset(),
                    model_dimensions: helper
                        .use_model_dimensions()
                        .then(|| *helper.model_dimensions()),
                });
            }

            if move_actor {
                if let Some(actor) = world.get_mut(id) {
                    if actor.has_dofs() {
                        helper.articulation_mut().articulate(actor, delta);
                    }
                }
            }

            helper.clear_updated();
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dead_reckoning::{DeadReckoningAlgorithm, DeadReckoningDof};
    use crate::ecs::Actor;
    use crate::foundation::logging::RecordingLogSink;
    use approx::assert_relative_eq;
    use log::Level;

    fn static_helper(translation: Vec3) -> DeadReckoningHelper {
        let mut helper = DeadReckoningHelper::new();
        helper.set_algorithm(DeadReckoningAlgorithm::Static);
        helper.set_last_known_translation(translation);
        helper.set_last_known_rotation(Vec3::new(10.0, 0.0, 0.0));
        helper
    }

    #[test]
    fn test_should_force_clamp() {
        let component =
            DeadReckoningComponent::from_config(&DeadReckoningConfig::new().with_force_clamp_interval(8.0));
        let mut helper = DeadReckoningHelper::new();
        helper.set_time_until_force_clamp(3.0);

        assert!(!component.should_force_clamp(&mut helper, 1.0, false));
        assert_relative_eq!(helper.time_until_force_clamp(), 2.0);

        assert!(!component.should_force_clamp(&mut helper, 3.0, true));
        assert_relative_eq!(helper.time_until_force_clamp(), 8.0);

        assert!(component.should_force_clamp(&mut helper, 8.1, false));
        assert_relative_eq!(helper.time_until_force_clamp(), 8.0);
    }

    #[test]
    fn test_register_and_unregister() {
        let mut world = World::new();
        let id = world.spawn(Actor::remote("tank"));
        let mut component = DeadReckoningComponent::new();
        assert_eq!(component.name(), DeadReckoningConfig::DEFAULT_NAME);

        component
            .register_actor(&mut world, id, DeadReckoningHelper::new())
            .unwrap();
        assert!(component.is_registered(id));
        assert_eq!(component.len(), 1);

        // The first registration stays in place
        component.helper_mut(id).unwrap().set_ground_offset(2.5);
        assert_eq!(
            component.register_actor(&mut world, id, DeadReckoningHelper::new()),
            Err(DeadReckoningError::AlreadyRegistered(id))
        );
        assert_eq!(component.helper(id).unwrap().ground_offset(), 2.5);

        let helper = component.unregister_actor(id).unwrap();
        assert_eq!(helper.ground_offset(), 2.5);
        assert!(component.is_empty());
        assert_eq!(
            component.unregister_actor(id).unwrap_err(),
            DeadReckoningError::NotRegistered(id)
        );
    }

    #[test]
    fn test_register_unknown_actor() {
        let mut world = World::new();
        let id = world.spawn(Actor::remote("gone"));
        world.remove(id);
        let mut component = DeadReckoningComponent::new();
        assert_eq!(
            component.register_actor(&mut world, id, DeadReckoningHelper::new()),
            Err(DeadReckoningError::UnknownActor(id))
        );
    }

    #[test]
    fn test_register_remote_snaps_to_last_known() {
        let mut world = World::new();
        let id = world.spawn(Actor::remote("jeep"));
        let mut component = DeadReckoningComponent::new();

        let translation = Vec3::new(4.0, 5.0, 6.0);
        component
            .register_actor(&mut world, id, static_helper(translation))
            .unwrap();

        let xform = world.transform(id).unwrap();
        assert_eq!(xform.translation, translation);
        assert_eq!(xform.rotation, Vec3::new(10.0, 0.0, 0.0));
        let helper = component.helper(id).unwrap();
        assert_eq!(*helper.translation_before_last_update(), translation);
    }

    #[test]
    fn test_register_local_seeds_from_actor() {
        let mut world = World::new();
        let start = Transform::new(Vec3::new(1.0, 1.0, 0.0), Vec3::new(90.0, 0.0, 0.0));
        let id = world.spawn(Actor::new("me").with_transform(start));
        let mut component = DeadReckoningComponent::new();
        component
            .register_actor(&mut world, id, DeadReckoningHelper::new())
            .unwrap();

        let helper = component.helper(id).unwrap();
        assert_eq!(*helper.last_known_translation(), start.translation);
        assert_eq!(*helper.last_known_rotation(), start.rotation);
        assert_eq!(*helper.translation_before_last_update(), start.translation);
        assert_eq!(*world.transform(id).unwrap(), start);
    }

    #[test]
    fn test_tick_moves_remote_only() {
        let mut world = World::new();
        let remote = world.spawn(Actor::remote("remote"));
        let local = world.spawn(Actor::new("local"));
        let mut component = DeadReckoningComponent::new();

        component
            .register_actor(&mut world, remote, DeadReckoningHelper::new())
            .unwrap();
        component
            .register_actor(&mut world, local, DeadReckoningHelper::new())
            .unwrap();

        for id in [remote, local] {
            let helper = component.helper_mut(id).unwrap();
            helper.set_algorithm(DeadReckoningAlgorithm::Static);
            helper.set_last_known_translation(Vec3::new(5.0, 5.0, 5.0));
        }

        let report = component.tick_remote(&mut world, &TickInfo::new(1.0, 0.1));

        assert_eq!(world.transform(remote).unwrap().translation, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(world.transform(local).unwrap().translation, Vec3::zeros());

        let remote_pose = report.pose(remote).unwrap();
        assert!(remote_pose.applied);
        let local_pose = report.pose(local).unwrap();
        assert!(!local_pose.applied);
        assert_eq!(local_pose.transform.translation, Vec3::new(5.0, 5.0, 5.0));

        let request = report.clamp_request(remote).unwrap();
        assert!(!request.forced);
        assert!(!request.high_resolution);
        assert_eq!(request.clamp_type, GroundClampType::IntermittentSaveOffset);

        // Updates are consumed by the tick
        assert!(!component.helper(remote).unwrap().is_updated());
        assert_relative_eq!(component.helper(remote).unwrap().last_translation_updated_time(), 0.9);
    }

    #[test]
    fn test_flying_actor_is_never_clamped() {
        let mut world = World::new();
        let id = world.spawn(Actor::remote("plane"));
        let mut component = DeadReckoningComponent::new();
        let mut helper = static_helper(Vec3::new(0.0, 0.0, 500.0));
        helper.set_flying(true);
        component.register_actor(&mut world, id, helper).unwrap();

        for step in 1..=50 {
            let report = component.tick_remote(&mut world, &TickInfo::new(f64::from(step) * 0.1, 0.1));
            assert!(report.clamp_requests.is_empty());
        }
    }

    #[test]
    fn test_stationary_actor_forced_clamp() {
        let mut world = World::new();
        let id = world.spawn(Actor::remote("bunker"));
        let mut component =
            DeadReckoningComponent::from_config(&DeadReckoningConfig::new().with_force_clamp_interval(1.0));
        component
            .register_actor(&mut world, id, static_helper(Vec3::new(3.0, 0.0, 0.0)))
            .unwrap();

        // First tick moves it
        let report = component.tick_remote(&mut world, &TickInfo::new(0.5, 0.5));
        assert!(!report.clamp_request(id).unwrap().forced);

        let report = component.tick_remote(&mut world, &TickInfo::new(1.0, 0.5));
        assert!(report.clamp_requests.is_empty());
        assert!(report.poses.is_empty());

        let report = component.tick_remote(&mut world, &TickInfo::new(1.5, 0.5));
        assert!(report.clamp_request(id).unwrap().forced);
    }

    #[test]
    fn test_high_resolution_range() {
        let mut world = World::new();
        let eye = world.spawn(Actor::new("eye"));
        let near = world.spawn(Actor::remote("near"));
        let far = world.spawn(Actor::remote("far"));

        let mut component = DeadReckoningComponent::from_config(
            &DeadReckoningConfig::new().with_high_res_ground_clamping_range(100.0),
        );
        component.set_eye_point_actor(Some(eye));
        component
            .register_actor(&mut world, near, static_helper(Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        component
            .register_actor(&mut world, far, static_helper(Vec3::new(500.0, 0.0, 0.0)))
            .unwrap();

        let report = component.tick_remote(&mut world, &TickInfo::new(1.0, 0.1));
        assert_eq!(component.last_eye_point(), Some(Vec3::zeros()));
        assert!(report.clamp_request(near).unwrap().high_resolution);
        assert!(!report.clamp_request(far).unwrap().high_resolution);
    }

    #[test]
    fn test_deleted_actors_are_forgotten() {
        let mut world = World::new();
        let terrain = world.spawn(Actor::new("terrain"));
        let eye = world.spawn(Actor::new("eye"));
        let tank = world.spawn(Actor::remote("tank"));

        let mut component = DeadReckoningComponent::new();
        component.set_terrain_actor(Some(terrain));
        component.set_eye_point_actor(Some(eye));
        component
            .register_actor(&mut world, tank, DeadReckoningHelper::new())
            .unwrap();

        // Deleted behind the component's back
        world.remove(terrain);
        world.remove(tank);
        assert_eq!(component.terrain_actor(&world), None);

        let report = component.tick_remote(&mut world, &TickInfo::new(1.0, 0.1));
        assert_eq!(report.removed, vec![tank]);
        assert!(!component.is_registered(tank));
        assert_eq!(component.eye_point_actor(&world), Some(eye));

        // Deletion notification
        component.on_actor_deleted(eye);
        assert_eq!(component.eye_point_actor(&world), None);
        let report = component.tick_remote(&mut world, &TickInfo::new(1.1, 0.1));
        assert_eq!(component.last_eye_point(), None);
        assert!(report.poses.is_empty());
    }

    #[test]
    fn test_articulation_runs_for_remote_actors() {
        let mut world = World::new();
        let id = world.spawn(Actor::remote("tank").with_dof("turret", Vec3::zeros()));
        let mut component = DeadReckoningComponent::new();
        let mut helper = DeadReckoningHelper::new();
        helper.articulation_mut().add(
            DeadReckoningDof::new("turret", Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)),
            None,
        );
        component.register_actor(&mut world, id, helper).unwrap();

        component.tick_remote(&mut world, &TickInfo::new(0.5, 0.5));
        let turret = world.get(id).unwrap().dof("turret").unwrap();
        assert_relative_eq!(turret, Vec3::new(0.5, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_helper_diagnostics_use_sink() {
        let sink = Arc::new(RecordingLogSink::new(Level::Debug));
        let mut world = World::new();
        let id = world.spawn(Actor::remote("r"));
        let mut component = DeadReckoningComponent::new().with_log_sink(sink.clone());
        component
            .register_actor(&mut world, id, static_helper(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();

        component.tick_remote(&mut world, &TickInfo::new(1.0, 0.1));
        assert_eq!(sink.count(Level::Debug), 1);
    }
}
