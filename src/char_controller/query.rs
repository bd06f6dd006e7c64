//! The narrow world-geometry capability the controller is written against.
//!
//! The resolver never talks to a physics engine directly. It asks a [`RayQuery`] for single ray
//! intersections, which keeps it testable against synthetic geometry and lets the app back it with
//! avian's [`SpatialQuery`](avian2d::prelude::SpatialQuery).
use avian2d::prelude::SpatialQueryFilter;
use bevy::prelude::*;

/// A single ray intersection reported by a [`RayQuery`].
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct RayHit {
    /// The world object that was hit.
    pub target: Entity,
    /// Distance from the ray origin to the hit point. Zero when the ray started inside the target.
    pub distance: f32,
    /// The outward surface normal at the hit point.
    pub normal: Vec2,
}

/// Read-only ray intersection against static world geometry.
pub trait RayQuery {
    /// Casts a ray and returns the closest hit within `max_distance` that passes `filter`.
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Dir2,
        max_distance: f32,
        filter: &SpatialQueryFilter,
    ) -> Option<RayHit>;

    /// Whether `target` carries the surface tag `tag`.
    fn has_tag(&self, target: Entity, tag: &str) -> bool;
}

impl<Q: RayQuery + ?Sized> RayQuery for &Q {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Dir2,
        max_distance: f32,
        filter: &SpatialQueryFilter,
    ) -> Option<RayHit> {
        (**self).cast_ray(origin, direction, max_distance, filter)
    }

    fn has_tag(&self, target: Entity, tag: &str) -> bool {
        (**self).has_tag(target, tag)
    }
}

/// Angle in radians between world-up and `normal`.
pub fn slope_angle(normal: Vec2) -> f32 {
    normal
        .normalize_or_zero()
        .dot(Vec2::Y)
        .clamp(-1.0, 1.0)
        .acos()
}

/// Sign of an axis component, treating zero as positive.
#[inline]
pub(crate) fn direction(value: f32) -> f32 {
    if value < 0.0 { -1.0 } else { 1.0 }
}
