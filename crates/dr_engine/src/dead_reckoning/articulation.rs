//! Articulated parts (degrees of freedom) of a dead reckoned actor
//!
//! Each named degree of freedom holds a chain of updates. A lone update is
//! extrapolated with its rate; when a newer update arrives the part is
//! smoothed from the older start toward the newer one over one second, after
//! which the older entry is dropped.

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use crate::ecs::Actor;
use crate::foundation::math::Vec3;

/// Seconds spent smoothing from one update to the next
pub const ARTICULATION_SMOOTH_TIME: f32 = 1.0;

/// One update of a degree of freedom
#[derive(Debug, Clone, PartialEq)]
pub struct DeadReckoningDof {
    /// Degree of freedom name on the actor
    pub name: String,
    /// Name of the metric this update came from ("Azimuth", "ElevationRate", ...)
    pub metric_name: String,
    /// Heading, pitch, roll in radians at the start of this entry
    pub start_location: Vec3,
    /// Radians per second
    pub rate_over_time: Vec3,
    /// Seconds since this entry became the head of its chain
    pub current_time: f32,
}

impl DeadReckoningDof {
    /// Create an update with no metric name
    pub fn new(name: impl Into<String>, start_location: Vec3, rate_over_time: Vec3) -> Self {
        Self {
            name: name.into(),
            metric_name: String::new(),
            start_location,
            rate_over_time,
            current_time: 0.0,
        }
    }

    /// Set the metric name
    #[must_use]
    pub fn with_metric(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = metric_name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DofChain {
    name: String,
    entries: VecDeque<DeadReckoningDof>,
}

/// All degree of freedom chains of one actor, in the order they were first seen
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Articulation {
    chains: Vec<DofChain>,
}

impl Articulation {
    /// No chains
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Number of queued entries across all chains
    pub fn len(&self) -> usize {
        self.chains.iter().map(|c| c.entries.len()).sum()
    }

    /// Queued entries for one degree of freedom, head first
    pub fn entries(&self, name: &str) -> Vec<&DeadReckoningDof> {
        self.chains
            .iter()
            .filter(|c| c.name == name)
            .flat_map(|c| c.entries.iter())
            .collect()
    }

    /// Queue an update.
    ///
    /// If the degree of freedom already has entries, the current tail restarts
    /// from `current_value` (the part's pose right now) so smoothing begins
    /// where the part is drawn.
    pub fn add(&mut self, dof: DeadReckoningDof, current_value: Option<Vec3>) {
        if let Some(chain) = self.chains.iter_mut().find(|c| c.name == dof.name) {
            if let Some(tail) = chain.entries.back_mut() {
                tail.current_time = 0.0;
                if let Some(value) = current_value {
                    tail.start_location = value;
                }
            }
            chain.entries.push_back(dof);
        } else {
            self.chains.push(DofChain {
                name: dof.name.clone(),
                entries: VecDeque::from([dof]),
            });
        }
    }

    /// Drop every entry for `name`
    pub fn remove_all(&mut self, name: &str) {
        self.chains.retain(|c| c.name != name);
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.chains.clear();
    }

    /// Advance every chain by `delta` seconds and write the results to `actor`
    pub fn articulate(&mut self, actor: &mut Actor, delta: f32) {
        for chain in &mut self.chains {
            step_chain(chain, actor, delta);
        }
    }
}

fn step_chain(chain: &mut DofChain, actor: &mut Actor, delta: f32) {
    loop {
        let Some(head) = chain.entries.front_mut() else {
            return;
        };
        head.current_time += delta;
        let (start, rate, time) = (head.start_location, head.rate_over_time, head.current_time);

        let value = match chain.entries.get(1) {
            Some(next) => smooth(&start, &next.start_location, time),
            None => predict(&start, &rate, time),
        };
        actor.set_dof(&chain.name, value);

        // Only the head and the newest entry matter
        let len = chain.entries.len();
        if len > 2 {
            chain.entries.drain(1..len - 1);
            return;
        }

        if len == 2 && time >= ARTICULATION_SMOOTH_TIME {
            if let Some(next) = chain.entries.get_mut(1) {
                if let Some(current) = actor.dof(&chain.name) {
                    next.start_location = current;
                }
                next.current_time = 0.0;
            }
            chain.entries.pop_front();
            continue;
        }
        return;
    }
}

/// Move from `current` toward `next` by the fraction `time`, the short way round.
///
/// Each axis of the result is wrapped into [0, 2pi].
pub fn smooth(current: &Vec3, next: &Vec3, time: f32) -> Vec3 {
    let diff = (next - current).map(wrap_pi);
    (current + diff * time).map(wrap_two_pi)
}

/// Extrapolate `current` with `rate` for `time` seconds
pub fn predict(current: &Vec3, rate: &Vec3, time: f32) -> Vec3 {
    current + rate * time
}

fn wrap_pi(mut angle: f32) -> f32 {
    while angle > PI {
        angle -= TAU;
    }
    while angle < -PI {
        angle += TAU;
    }
    angle
}

fn wrap_two_pi(mut angle: f32) -> f32 {
    while angle > TAU {
        angle -= TAU;
    }
    while angle < 0.0 {
        angle += TAU;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_predict() {
        let value = predict(&Vec3::new(0.1, 0.0, 0.0), &Vec3::new(0.5, 1.0, 0.0), 2.0);
        assert_relative_eq!(value, Vec3::new(1.1, 2.0, 0.0));
    }

    #[test]
    fn test_smooth_takes_short_way() {
        // 350 degrees to 10 degrees crosses zero instead of going back round
        let from = Vec3::new(350f32.to_radians(), 0.0, 0.0);
        let to = Vec3::new(10f32.to_radians(), 0.0, 0.0);
        let past_zero = smooth(&from, &to, 0.75);
        assert_relative_eq!(past_zero.x, 5f32.to_radians(), epsilon = 1e-4);

        let quarter = smooth(&from, &to, 0.25);
        assert_relative_eq!(quarter.x, 355f32.to_radians(), epsilon = 1e-4);
    }

    #[test]
    fn test_single_entry_predicts() {
        let mut actor = Actor::remote("tank").with_dof("turret", Vec3::zeros());
        let mut articulation = Articulation::new();
        articulation.add(
            DeadReckoningDof::new("turret", Vec3::zeros(), Vec3::new(0.2, 0.0, 0.0))
                .with_metric("AzimuthRate"),
            actor.dof("turret"),
        );

        articulation.articulate(&mut actor, 0.5);
        articulation.articulate(&mut actor, 0.5);
        assert_relative_eq!(actor.dof("turret").unwrap().x, 0.2, epsilon = 1e-6);
        assert_eq!(articulation.len(), 1);
    }

    #[test]
    fn test_chain_smooths_then_advances() {
        let mut actor = Actor::remote("tank").with_dof("turret", Vec3::zeros());
        let mut articulation = Articulation::new();
        articulation.add(DeadReckoningDof::new("turret", Vec3::zeros(), Vec3::zeros()), None);
        articulation.add(
            DeadReckoningDof::new("turret", Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.1, 0.0, 0.0)),
            actor.dof("turret"),
        );
        assert_eq!(articulation.entries("turret").len(), 2);

        articulation.articulate(&mut actor, 0.5);
        assert_relative_eq!(actor.dof("turret").unwrap().x, 0.5, epsilon = 1e-6);
        assert_eq!(articulation.len(), 2);

        // Reaching one second drops the head; the next entry restarts from the
        // drawn pose and is advanced in the same step
        articulation.articulate(&mut actor, 0.5);
        let entries = articulation.entries("turret");
        assert_eq!(entries.len(), 1);
        assert_relative_eq!(entries[0].start_location.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(entries[0].current_time, 0.5);
        assert_relative_eq!(actor.dof("turret").unwrap().x, 1.05, epsilon = 1e-6);
    }

    #[test]
    fn test_intermediate_entries_dropped() {
        let mut actor = Actor::remote("tank").with_dof("gun", Vec3::zeros());
        let mut articulation = Articulation::new();
        for x in [0.0, 0.5, 1.0, 1.5] {
            articulation.add(
                DeadReckoningDof::new("gun", Vec3::new(x, 0.0, 0.0), Vec3::zeros()),
                actor.dof("gun"),
            );
        }
        assert_eq!(articulation.len(), 4);

        articulation.articulate(&mut actor, 0.1);
        let starts: Vec<f32> = articulation
            .entries("gun")
            .iter()
            .map(|d| d.start_location.x)
            .collect();
        assert_eq!(starts.len(), 2);
        assert_relative_eq!(starts[1], 1.5);
    }

    #[test]
    fn test_remove_all() {
        let mut articulation = Articulation::new();
        articulation.add(DeadReckoningDof::new("a", Vec3::zeros(), Vec3::zeros()), None);
        articulation.add(DeadReckoningDof::new("b", Vec3::zeros(), Vec3::zeros()), None);
        articulation.remove_all("a");
        assert!(articulation.entries("a").is_empty());
        assert_eq!(articulation.len(), 1);
        articulation.clear();
        assert!(articulation.is_empty());
    }
}
