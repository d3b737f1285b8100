//! Actor store
//!
//! A minimal stand-in for the caller's actor management: actors with a
//! transform, an ownership flag and optional named degrees of freedom, keyed
//! by generation-checked [`ActorId`](crate::foundation::collections::ActorId)s.

pub mod actor;
pub mod world;

pub use actor::Actor;
pub use world::World;
