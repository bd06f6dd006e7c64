//! Raycast-based kinematic character control.
//!
//! Actors are axis-aligned boxes moved by explicit displacements. Every step the requested
//! displacement is swept through the world with rows of parallel rays and shortened wherever it
//! would enter geometry. Slopes, one-way platforms and moving platforms are handled on top of the
//! same sweeps.
//!
//! Nothing here depends on a particular physics backend. World geometry is reached through the
//! [`RayQuery`](query::RayQuery) trait.

pub mod body;
pub mod collision_state;
pub mod passengers;
pub mod platform;
pub mod query;
pub mod raycast;
pub mod resolver;

#[cfg(test)]
mod test_world;

/// Re-exports common types related to character controller functionality.
pub mod prelude {
    pub use super::body::KinematicBody;
    pub use super::collision_state::CollisionState;
    pub use super::passengers::PassengerRegistry;
    pub use super::platform::{
        MovingPlatform, PassengerMovement, Phase, PlatformConfig, PlatformStep, ease,
        find_passengers,
    };
    pub use super::query::{RayHit, RayQuery, slope_angle};
    pub use super::raycast::{Axis, RayOrigins, RaycastConfig, RaycastEmitter};
    pub use super::resolver::{CollisionConfig, CollisionResolver};
}
