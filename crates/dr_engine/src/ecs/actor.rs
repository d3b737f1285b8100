//! Actor implementation

use std::collections::HashMap;

use crate::foundation::math::{Transform, Vec3};

/// A simulated entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Actor {
    name: String,
    transform: Transform,
    remote: bool,
    dofs: HashMap<String, Vec3>,
}

impl Actor {
    /// Create a local actor at the origin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create an actor owned by another simulation
    pub fn remote(name: impl Into<String>) -> Self {
        Self::new(name).with_remote(true)
    }

    /// Set the ownership flag
    #[must_use]
    pub fn with_remote(mut self, remote: bool) -> Self {
        self.remote = remote;
        self
    }

    /// Set the initial transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Add a named degree of freedom with its initial heading/pitch/roll in radians
    #[must_use]
    pub fn with_dof(mut self, name: impl Into<String>, value: Vec3) -> Self {
        self.dofs.insert(name.into(), value);
        self
    }

    /// Actor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the actor is owned by another simulation
    pub const fn is_remote(&self) -> bool {
        self.remote
    }

    /// Current transform
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Replace the transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Whether the actor exposes any degrees of freedom
    pub fn has_dofs(&self) -> bool {
        !self.dofs.is_empty()
    }

    /// Current value of a degree of freedom
    pub fn dof(&self, name: &str) -> Option<Vec3> {
        self.dofs.get(name).copied()
    }

    /// Update a degree of freedom the actor exposes.
    ///
    /// Returns false if the actor has no such degree of freedom.
    pub fn set_dof(&mut self, name: &str, value: Vec3) -> bool {
        match self.dofs.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Names of all degrees of freedom
    pub fn dof_names(&self) -> impl Iterator<Item = &str> {
        self.dofs.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_builders() {
        let actor = Actor::remote("tank")
            .with_transform(Transform::from_translation(Vec3::new(1.0, 2.0, 3.0)))
            .with_dof("turret", Vec3::zeros());
        assert_eq!(actor.name(), "tank");
        assert!(actor.is_remote());
        assert!(actor.has_dofs());
        assert_eq!(actor.transform().translation, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_set_dof_requires_existing_name() {
        let mut actor = Actor::new("truck").with_dof("door", Vec3::zeros());
        assert!(actor.set_dof("door", Vec3::new(0.5, 0.0, 0.0)));
        assert!(!actor.set_dof("hood", Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(actor.dof("door"), Some(Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(actor.dof("hood"), None);
        assert_eq!(actor.dof_names().count(), 1);
    }
}
