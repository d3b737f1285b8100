//! Dead reckoning replay demo
//!
//! Pushes a small environmental record list through the wire codec and then
//! dead reckons a remote truck from one network update per second.
//!
//! ```text
//! dr_replay [settings.toml | settings.ron]
//! ```

use std::path::PathBuf;

use dr_engine::core::ConfigError;
use dr_engine::foundation::logging;
use dr_engine::prelude::*;
use log::{debug, error, info};
use thiserror::Error;

const TICK_RATE: f64 = 30.0;
const REPLAY_SECONDS: u64 = 6;
const SPEED: f32 = 8.0;
/// Radians per second
const TURN_RATE: f32 = 0.2;

#[derive(Debug, Error)]
enum ReplayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("dead reckoning error: {0}")]
    DeadReckoning(#[from] DeadReckoningError),
}

fn load_settings() -> Result<EngineSettings, ConfigError> {
    match std::env::args_os().nth(1) {
        Some(path) => EngineSettings::load_validated(PathBuf::from(path)),
        None => Ok(EngineSettings::default()),
    }
}

fn replay_records(settings: &EngineSettings, coords: &mut Coordinates) -> Result<(), ReplayError> {
    let mut outgoing = EnvironmentProcessRecordList::from_config(&settings.wire);

    let sphere = outgoing.add_record();
    sphere.set_record_type(EnvironmentRecordType::BoundingSphere);
    sphere.set(RecordParameter::Location, Vec3d::new(250.0, -120.0, 4.0));
    sphere.set(RecordParameter::Radius, 40.0f32);

    let puff = outgoing.add_record();
    puff.set_record_type(EnvironmentRecordType::GaussianPuff);
    puff.set(RecordParameter::Location, Vec3d::new(260.0, -110.0, 6.0));
    puff.set(RecordParameter::OriginationLocation, Vec3d::new(240.0, -130.0, 0.0));
    puff.set(RecordParameter::Dimension, Vec3::new(12.0, 12.0, 5.0));
    puff.set(RecordParameter::Velocity, Vec3::new(1.5, 0.5, 0.0));
    puff.set(RecordParameter::CentroidHeight, 3.0f32);

    let bytes = outgoing.encode_to_vec(coords)?;
    info!(
        "Encoded {} records into {} bytes ({})",
        outgoing.num_records(),
        bytes.len(),
        if outgoing.is_little_endian() { "little endian" } else { "big endian" }
    );

    let mut incoming = EnvironmentProcessRecordList::from_config(&settings.wire);
    incoming.decode(&bytes, coords)?;
    for record in incoming.records() {
        info!(
            "Record {} [{}] at {:?}",
            record.name(),
            record.record_type(),
            record.vec3d(RecordParameter::Location, Vec3d::zeros())
        );
    }
    Ok(())
}

fn replay_actor(settings: &EngineSettings) -> Result<(), ReplayError> {
    let mut world = World::new();
    let truck = world.spawn(Actor::remote("truck"));

    let mut component = DeadReckoningComponent::from_config(&settings.dead_reckoning);
    let mut helper = component.create_helper();
    helper.set_algorithm(DeadReckoningAlgorithm::VelocityAndAcceleration);
    helper.set_last_known_translation(Vec3::zeros());
    helper.set_last_known_rotation(Vec3::new(90.0, 0.0, 0.0));
    helper.set_last_known_velocity(Vec3::new(SPEED, 0.0, 0.0));
    helper.set_last_known_angular_velocity(Vec3::new(0.0, 0.0, TURN_RATE));
    component.register_actor(&mut world, truck, helper)?;
    info!("\"{}\" is dead reckoning {} actor(s)", component.name(), component.len());

    let mut clock = SimClock::new();
    let ticks_per_second = TICK_RATE as u64;
    let mut clamp_requests = 0;

    for _ in 0..REPLAY_SECONDS * ticks_per_second {
        let tick = clock.step(1.0 / TICK_RATE);
        let report = component.tick_remote(&mut world, &tick);
        clamp_requests += report.clamp_requests.len();

        for pose in &report.poses {
            debug!(
                "t={:.3} {:?} at {:?}",
                tick.simulation_time, pose.actor, pose.transform.translation
            );
        }

        if clock.tick_count() % ticks_per_second == 0 {
            // The truck is really driving a circle of radius SPEED / TURN_RATE
            let t = tick.simulation_time as f32;
            let angle = TURN_RATE * t;
            let radius = SPEED / TURN_RATE;
            if let Some(helper) = component.helper_mut(truck) {
                helper.set_last_known_translation(Vec3::new(
                    radius * angle.sin(),
                    radius * (1.0 - angle.cos()),
                    0.0,
                ));
                helper.set_last_known_rotation(Vec3::new(90.0 + angle.to_degrees(), 0.0, 0.0));
                helper.set_last_known_velocity(Vec3::new(SPEED * angle.cos(), SPEED * angle.sin(), 0.0));
                helper.set_last_known_angular_velocity(Vec3::new(0.0, 0.0, TURN_RATE));
            }

            if let Some(xform) = world.transform(truck) {
                info!(
                    "t={:.1}s truck at {:?} heading {:.1}",
                    tick.simulation_time, xform.translation, xform.rotation.x
                );
            }
        }
    }

    info!("Replay issued {clamp_requests} ground clamp requests");
    Ok(())
}

fn run(settings: &EngineSettings) -> Result<(), ReplayError> {
    let mut coords = settings.coordinates.to_coordinates();
    replay_records(settings, &mut coords)?;
    replay_actor(settings)
}

fn main() {
    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init_with_level("info");
            error!("Failed to load settings: {}", ReplayError::from(e));
            std::process::exit(1);
        }
    };

    logging::init_with_level(&settings.log_level);
    info!("Starting dr_replay");

    if let Err(e) = run(&settings) {
        error!("dr_replay failed: {e}");
        std::process::exit(1);
    }
}
