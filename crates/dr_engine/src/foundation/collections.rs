//! Handle-based collections
//!
//! Actors are stored in a slot map, so a key stays unique after its actor is
//! removed. A stale key simply stops resolving, which is what the weak
//! references held by the dead reckoning component rely on.

pub use slotmap::{Key, SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Generation-checked identifier of an actor in a [`crate::ecs::World`]
    pub struct ActorId;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;

/// Non-owning reference to an entry of a [`HandleMap`].
///
/// Holding one never keeps the target alive. [`WeakHandle::upgrade`] checks
/// the generation each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakHandle<K: Key> {
    key: Option<K>,
}

impl<K: Key> WeakHandle<K> {
    /// A handle that points at nothing
    pub const fn none() -> Self {
        Self { key: None }
    }

    /// A handle to `key`
    pub const fn new(key: K) -> Self {
        Self { key: Some(key) }
    }

    /// The raw key, alive or not
    pub const fn key(&self) -> Option<K> {
        self.key
    }

    /// Point at `key`, or at nothing
    pub fn set(&mut self, key: Option<K>) {
        self.key = key;
    }

    /// Forget the target
    pub fn clear(&mut self) {
        self.key = None;
    }

    /// Whether the handle refers to `key`
    pub fn is(&self, key: K) -> bool {
        self.key == Some(key)
    }

    /// Resolve against `map`, returning the key only if it is still live
    pub fn upgrade<T>(&self, map: &HandleMap<K, T>) -> Option<K> {
        self.key.filter(|k| map.contains_key(*k))
    }

    /// Clear the handle if its target has been removed from `map`.
    ///
    /// Returns true when the handle was cleared.
    pub fn prune<T>(&mut self, map: &HandleMap<K, T>) -> bool {
        match self.key {
            Some(k) if !map.contains_key(k) => {
                self.key = None;
                true
            }
            _ => false,
        }
    }
}

impl<K: Key> Default for WeakHandle<K> {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_handle_goes_stale() {
        let mut map: HandleMap<ActorId, &str> = HandleMap::with_key();
        let id = map.insert("terrain");
        let mut handle = WeakHandle::new(id);

        assert_eq!(handle.upgrade(&map), Some(id));
        map.remove(id);
        assert_eq!(handle.upgrade(&map), None);

        // A new actor in the same slot does not revive the old handle
        let replacement = map.insert("other");
        assert_ne!(replacement, id);
        assert_eq!(handle.upgrade(&map), None);

        assert!(handle.prune(&map));
        assert_eq!(handle.key(), None);
        assert!(!handle.prune(&map));
    }

    #[test]
    fn test_weak_handle_default_is_none() {
        let handle: WeakHandle<ActorId> = WeakHandle::default();
        assert_eq!(handle.key(), None);
    }
}
