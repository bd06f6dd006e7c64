//! Discrete raycast motion resolution for a box-shaped kinematic actor.
//!
//! See the documentation of [`CollisionResolver`] for the algorithm.
use super::collision_state::CollisionState;
use super::query::{RayHit, RayQuery, direction, slope_angle};
use super::raycast::{Axis, RayOrigins, RaycastEmitter};
use crate::config::ConfigError;
use avian2d::prelude::SpatialQueryFilter;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Two slope angles closer than this are treated as the same slope.
const ANGLE_EPSILON: f32 = 1e-4;

/// Slack on the slope descent contact ray so a resting actor still registers ground contact.
const CONTACT_EPSILON: f32 = 1e-4;

/// Tunables for a [`CollisionResolver`].
#[derive(Clone, Debug, PartialEq, Reflect, Deserialize, Serialize)]
#[reflect(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// The steepest walkable slope, in degrees. Must be below 90.
    pub max_slope_angle: f32,
    /// The [`SurfaceTag`](crate::physics::SurfaceTag) marking platforms that can be jumped and
    /// dropped through.
    pub one_way_tag: String,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            max_slope_angle: 80.0,
            one_way_tag: "JumpThrough".to_string(),
        }
    }
}

impl CollisionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..90.0).contains(&self.max_slope_angle) {
            return Err(ConfigError::MaxSlopeAngle(self.max_slope_angle));
        }
        Ok(())
    }
}

/// Whether the vertical input intent asks to drop through a one-way platform.
pub fn requests_drop(input: Vec2) -> bool {
    input.y <= -1.0
}

/// Resolves a desired displacement against world geometry using parallel raycasts.
///
/// # Algorithm
///
/// Each call to [`resolve`](CollisionResolver::resolve) runs these steps in order:
///
/// 1. Refresh the ray origins and reset the [`CollisionState`].
/// 2. When moving down, try to slide down an over-steep slope, or else descend a walkable one.
/// 3. When moving horizontally, sweep the leading vertical edge. The lowest ray may start a slope
///    climb; every other hit clamps the horizontal displacement.
/// 4. When moving vertically, sweep the leading horizontal edge from the post-horizontal position.
///    One-way platforms are skipped when appropriate. While climbing, a final look-ahead ray
///    catches a change in slope angle ahead.
///
/// The returned displacement is meant to be applied as a translation verbatim.
#[derive(Clone, Debug, Reflect)]
pub struct CollisionResolver {
    /// Radians.
    max_slope_angle: f32,
    one_way_tag: String,
    state: CollisionState,
}

impl CollisionResolver {
    pub fn new(config: &CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            max_slope_angle: config.max_slope_angle.to_radians(),
            one_way_tag: config.one_way_tag.clone(),
            state: CollisionState::default(),
        })
    }

    pub fn state(&self) -> &CollisionState {
        &self.state
    }

    pub fn max_slope_angle(&self) -> f32 {
        self.max_slope_angle
    }

    pub fn is_grounded(&self) -> bool {
        self.state.below
    }

    /// Returns the part of `displacement` the actor centered on `center` can actually move.
    ///
    /// `input` is the caller's movement intent. Only its vertical axis is read, to detect
    /// drop-through requests.
    pub fn resolve(
        &mut self,
        emitter: &mut RaycastEmitter,
        center: Vec2,
        query: &impl RayQuery,
        filter: &SpatialQueryFilter,
        mut displacement: Vec2,
        input: Vec2,
    ) -> Vec2 {
        emitter.refresh_origins(center);
        self.state.reset();

        let mut sweep = Sweep {
            query,
            filter,
            origins: emitter.origins(),
            skin_width: emitter.skin_width(),
            max_slope_angle: self.max_slope_angle,
            state: &mut self.state,
        };

        if displacement.y < 0.0 {
            sweep.descend_slope(&mut displacement);
        }
        if displacement.x != 0.0 {
            sweep.horizontal(
                &mut displacement,
                emitter.horizontal_ray_count(),
                emitter.ray_spacing(Axis::Horizontal),
            );
        }
        if displacement.y != 0.0 {
            sweep.vertical(
                &mut displacement,
                input,
                emitter.vertical_ray_count(),
                emitter.ray_spacing(Axis::Vertical),
                &self.one_way_tag,
            );
        }

        displacement
    }
}

/// Borrowed context for the sweeps of a single resolution.
struct Sweep<'a, Q: RayQuery + ?Sized> {
    query: &'a Q,
    filter: &'a SpatialQueryFilter,
    origins: RayOrigins,
    skin_width: f32,
    max_slope_angle: f32,
    state: &'a mut CollisionState,
}

impl<Q: RayQuery + ?Sized> Sweep<'_, Q> {
    fn cast(&self, origin: Vec2, direction: Dir2, max_distance: f32) -> Option<RayHit> {
        self.query.cast_ray(origin, direction, max_distance, self.filter)
    }

    fn walkable(&self, angle: f32) -> bool {
        angle <= self.max_slope_angle
    }

    fn horizontal(&mut self, displacement: &mut Vec2, ray_count: usize, spacing: f32) {
        let direction_x = direction(displacement.x);
        let ray_direction = if direction_x < 0.0 { Dir2::NEG_X } else { Dir2::X };
        let base = if direction_x < 0.0 {
            self.origins.bottom_left
        } else {
            self.origins.bottom_right
        };
        let mut ray_length = displacement.x.abs() + self.skin_width;

        for i in 0..ray_count {
            let origin = base + Vec2::Y * (spacing * i as f32);
            let Some(hit) = self.cast(origin, ray_direction, ray_length) else {
                continue;
            };
            // Already overlapping this geometry. Let the actor move out of it.
            if hit.distance <= 0.0 {
                continue;
            }

            let angle = slope_angle(hit.normal);
            if i == 0 && self.walkable(angle) {
                let mut distance_to_slope_start = 0.0;
                if (angle - self.state.previous_slope_angle).abs() > ANGLE_EPSILON {
                    distance_to_slope_start = hit.distance - self.skin_width;
                    displacement.x -= distance_to_slope_start * direction_x;
                }
                self.climb_slope(displacement, angle, hit.normal);
                displacement.x += distance_to_slope_start * direction_x;
            } else if !self.state.climbing_slope || !self.walkable(angle) {
                displacement.x = (hit.distance - self.skin_width) * direction_x;

                // Blocked beside us mid-climb: keep the vertical motion on the slope.
                if self.state.climbing_slope {
                    displacement.y =
                        self.state.current_slope_angle.tan() * displacement.x.abs();
                }

                ray_length = hit.distance;
                self.state.set_x(direction_x);
            }
        }
    }

    fn vertical(
        &mut self,
        displacement: &mut Vec2,
        input: Vec2,
        ray_count: usize,
        spacing: f32,
        one_way_tag: &str,
    ) {
        let direction_y = direction(displacement.y);
        let ray_direction = if direction_y < 0.0 { Dir2::NEG_Y } else { Dir2::Y };
        let base = if direction_y < 0.0 {
            self.origins.bottom_left
        } else {
            self.origins.top_left
        };
        let mut ray_length = displacement.y.abs() + self.skin_width;
        let mut any_hit = false;

        for i in 0..ray_count {
            let origin = base + Vec2::X * (spacing * i as f32 + displacement.x);
            let Some(hit) = self.cast(origin, ray_direction, ray_length) else {
                continue;
            };
            any_hit = true;

            if self.query.has_tag(hit.target, one_way_tag) {
                if direction_y > 0.0 || hit.distance <= 0.0 {
                    continue;
                }
                if self.state.falling_through_platform == Some(hit.target) {
                    continue;
                }
                if requests_drop(input) {
                    debug!(platform = ?hit.target, "dropping through one-way platform");
                    self.state.falling_through_platform = Some(hit.target);
                    continue;
                }
            }

            if self.state.sliding_down_slope {
                displacement.y *= self.state.slope_normal.y;
            } else {
                displacement.y = (hit.distance - self.skin_width) * direction_y;
            }

            // Blocked vertically mid-climb: keep the horizontal motion on the slope.
            if self.state.climbing_slope {
                displacement.x = displacement.y / self.state.current_slope_angle.tan()
                    * direction(displacement.x);
            }

            self.state.set_y(direction_y);
            ray_length = hit.distance;
        }

        if !any_hit && self.state.falling_through_platform.is_some() {
            debug!("cleared one-way platform");
            self.state.clear_falling_through_platform();
        }

        if self.state.climbing_slope {
            self.preempt_slope_change(displacement);
        }
    }

    /// Looks ahead along the climb for a slope of a different angle, so the actor does not clip
    /// into the seam between two slopes.
    fn preempt_slope_change(&mut self, displacement: &mut Vec2) {
        let direction_x = direction(displacement.x);
        let ray_direction = if direction_x < 0.0 { Dir2::NEG_X } else { Dir2::X };
        let corner = if direction_x < 0.0 {
            self.origins.bottom_left
        } else {
            self.origins.bottom_right
        };
        let origin = corner + Vec2::Y * displacement.y;
        let ray_length = displacement.x.abs() + self.skin_width;

        if let Some(hit) = self.cast(origin, ray_direction, ray_length) {
            let angle = slope_angle(hit.normal);
            if (angle - self.state.current_slope_angle).abs() > ANGLE_EPSILON
                && self.walkable(angle)
            {
                displacement.x = (hit.distance - self.skin_width) * direction_x;
            }
            self.state.current_slope_angle = angle;
            self.state.slope_normal = hit.normal;
        }
    }

    /// Converts horizontal motion into motion up a slope of `angle`.
    ///
    /// The horizontal displacement stays the same and the vertical displacement becomes
    /// `tan(angle) * |dx|`:
    ///
    /// - `hypotenuse = |dx| / cos(angle)`
    /// - `dy = sin(angle) * hypotenuse`
    ///
    /// Nothing changes if the actor is already moving up faster than that, such as mid-jump.
    fn climb_slope(&mut self, displacement: &mut Vec2, angle: f32, normal: Vec2) {
        let hypotenuse = displacement.x.abs() / angle.cos();
        let climb_y = angle.sin() * hypotenuse;

        if displacement.y <= climb_y {
            displacement.y = climb_y;
            displacement.x = angle.cos() * hypotenuse * direction(displacement.x);

            // Still grounded while climbing so the actor can jump.
            self.state.below = true;
            self.state.climbing_slope = true;
            self.state.current_slope_angle = angle;
            self.state.slope_normal = normal;
        }
    }

    fn descend_slope(&mut self, displacement: &mut Vec2) {
        self.slide_down_max_slope(displacement);
        if self.state.sliding_down_slope {
            return;
        }

        let direction_x = direction(displacement.x);
        // The trailing corner is the one that stays on a downslope.
        let origin = if direction_x < 0.0 {
            self.origins.bottom_right
        } else {
            self.origins.bottom_left
        };
        let Some(hit) = self.cast(origin, Dir2::NEG_Y, self.skin_width + CONTACT_EPSILON) else {
            return;
        };
        if direction(hit.normal.x) != direction_x {
            return;
        }

        let angle = slope_angle(hit.normal);
        if angle > ANGLE_EPSILON && self.walkable(angle) {
            let hypotenuse = displacement.x.abs() / angle.cos();
            let descend_y = angle.sin() * hypotenuse;
            displacement.x = angle.cos() * hypotenuse * direction_x;
            displacement.y -= descend_y;

            self.state.descending_slope = true;
            self.state.below = true;
            self.state.current_slope_angle = angle;
            self.state.slope_normal = hit.normal;
        }
    }

    // Casting from both bottom corners can pull an actor standing on a ledge toward a steep slope
    // that is only nearby, not underneath, when it turns around.
    fn slide_down_max_slope(&mut self, displacement: &mut Vec2) {
        let ray_length = displacement.y.abs() + self.skin_width;
        let left = self.cast(self.origins.bottom_left, Dir2::NEG_Y, ray_length);
        let right = self.cast(self.origins.bottom_right, Dir2::NEG_Y, ray_length);

        if left.is_some() != right.is_some() {
            for hit in [left, right].into_iter().flatten() {
                self.slide_on(hit, displacement);
                if self.state.sliding_down_slope {
                    break;
                }
            }
        }
    }

    fn slide_on(&mut self, hit: RayHit, displacement: &mut Vec2) {
        let angle = slope_angle(hit.normal);
        if self.walkable(angle) {
            return;
        }
        displacement.x =
            hit.normal.x * ((displacement.y.abs() + self.skin_width) / angle.tan());

        self.state.current_slope_angle = angle;
        self.state.sliding_down_slope = true;
        self.state.slope_normal = hit.normal;
    }
}
