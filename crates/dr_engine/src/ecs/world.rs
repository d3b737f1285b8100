//! World implementation

use log::debug;

use super::Actor;
use crate::foundation::collections::{ActorId, HandleMap};
use crate::foundation::math::Transform;

/// Owns every actor. Removed ids never resolve again.
#[derive(Debug, Clone, Default)]
pub struct World {
    actors: HandleMap<ActorId, Actor>,
}

impl World {
    /// Create an empty world
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor and return its id
    pub fn spawn(&mut self, actor: Actor) -> ActorId {
        let name = actor.name().to_owned();
        let id = self.actors.insert(actor);
        debug!("Spawned actor {name} as {id:?}");
        id
    }

    /// Remove an actor, returning it if it existed
    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        let removed = self.actors.remove(id);
        if let Some(actor) = &removed {
            debug!("Removed actor {} ({id:?})", actor.name());
        }
        removed
    }

    /// Whether `id` still refers to a live actor
    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(id)
    }

    /// Look up an actor
    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    /// Look up an actor mutably
    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    /// Transform of an actor
    pub fn transform(&self, id: ActorId) -> Option<&Transform> {
        self.actors.get(id).map(Actor::transform)
    }

    /// Replace the transform of an actor. Returns false if it no longer exists.
    pub fn set_transform(&mut self, id: ActorId, transform: Transform) -> bool {
        match self.actors.get_mut(id) {
            Some(actor) => {
                actor.set_transform(transform);
                true
            }
            None => false,
        }
    }

    /// Iterate over all actors
    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &Actor)> {
        self.actors.iter()
    }

    /// Number of live actors
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Whether the world has no actors
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Underlying map, for resolving weak handles
    pub const fn actors(&self) -> &HandleMap<ActorId, Actor> {
        &self.actors
    }
}
