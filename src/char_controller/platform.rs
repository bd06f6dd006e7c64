//! Waypoint-following platforms that carry and push kinematic bodies.
use super::query::{RayQuery, direction};
use super::raycast::{Axis, RaycastEmitter};
use crate::config::ConfigError;
use avian2d::prelude::SpatialQueryFilter;
use bevy::ecs::entity::EntityHashSet;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Reflect, Deserialize, Serialize)]
#[reflect(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Offsets from the platform's start position.
    pub waypoints: Vec<Vec2>,
    /// World units per second.
    pub speed: f32,
    /// Seconds to rest at each waypoint.
    pub wait_time: f32,
    /// Loop back to the first waypoint instead of reversing.
    pub cyclic: bool,
    /// `0` is linear. Higher values ease in and out harder, up to `2`.
    pub easing: f32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            waypoints: vec![Vec2::ZERO, Vec2::new(6.0, 0.0)],
            speed: 1.0,
            wait_time: 0.5,
            cyclic: false,
            easing: 1.0,
        }
    }
}

impl PlatformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.waypoints.len() < 2 {
            return Err(ConfigError::TooFewWaypoints(self.waypoints.len()));
        }
        let invalid = |field, value: f32| ConfigError::InvalidPlatform { field, value };
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(invalid("speed", self.speed));
        }
        if !self.wait_time.is_finite() || self.wait_time < 0.0 {
            return Err(invalid("wait_time", self.wait_time));
        }
        if !(0.0..=2.0).contains(&self.easing) {
            return Err(invalid("easing", self.easing));
        }
        Ok(())
    }
}

/// Eases `x` in `[0, 1]` with the curve `x^a / (x^a + (1 - x)^a)`, where `a = easing + 1`.
pub fn ease(x: f32, easing: f32) -> f32 {
    let a = easing + 1.0;
    let rising = x.powf(a);
    rising / (rising + (1.0 - x).powf(a))
}

/// When a rider's displacement is applied relative to the platform's own translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum Phase {
    Before,
    After,
}

/// A displacement a platform injects into one rider this tick.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct PassengerMovement {
    /// The hit collider of the rider.
    pub rider: Entity,
    pub displacement: Vec2,
    pub standing_on_platform: bool,
    pub phase: Phase,
}

/// Everything a platform does in one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlatformStep {
    pub displacement: Vec2,
    pub passengers: Vec<PassengerMovement>,
}

impl PlatformStep {
    /// Injects [`Phase::Before`] riders, translates the platform, then injects [`Phase::After`]
    /// riders.
    pub fn apply(&self, position: &mut Vec2, mut inject: impl FnMut(&PassengerMovement)) {
        self.inject_phase(Phase::Before, &mut inject);
        *position += self.displacement;
        self.inject_phase(Phase::After, &mut inject);
    }

    fn inject_phase(&self, phase: Phase, inject: &mut impl FnMut(&PassengerMovement)) {
        self.passengers
            .iter()
            .filter(|passenger| passenger.phase == phase)
            .for_each(inject);
    }
}

/// Follows a list of waypoints and reports the riders it carries or pushes.
#[derive(Component, Clone, Debug, Reflect)]
pub struct MovingPlatform {
    global_waypoints: Vec<Vec2>,
    speed: f32,
    wait_time: f32,
    cyclic: bool,
    easing: f32,

    from_waypoint: usize,
    percent_between_waypoints: f32,
    next_move_time: f32,
    clock: f32,
}

impl MovingPlatform {
    pub fn new(config: &PlatformConfig, start: Vec2) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            global_waypoints: config.waypoints.iter().map(|offset| start + *offset).collect(),
            speed: config.speed,
            wait_time: config.wait_time,
            cyclic: config.cyclic,
            easing: config.easing,
            from_waypoint: 0,
            percent_between_waypoints: 0.0,
            next_move_time: 0.0,
            clock: 0.0,
        })
    }

    /// The waypoints in world space, in their current traversal order.
    pub fn global_waypoints(&self) -> &[Vec2] {
        &self.global_waypoints
    }

    /// Advances the platform clock by `dt` and returns the displacement for this tick.
    pub fn tick(&mut self, position: Vec2, dt: f32) -> Vec2 {
        let now = self.clock;
        self.clock += dt;
        if now < self.next_move_time {
            return Vec2::ZERO;
        }

        let count = self.global_waypoints.len();
        self.from_waypoint %= count;
        let to_waypoint = (self.from_waypoint + 1) % count;
        let from = self.global_waypoints[self.from_waypoint];
        let to = self.global_waypoints[to_waypoint];

        let distance = from.distance(to);
        self.percent_between_waypoints += if distance > 0.0 {
            (dt * self.speed / distance).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = ease(self.percent_between_waypoints.clamp(0.0, 1.0), self.easing);
        let new_position = from.lerp(to, eased);

        if self.percent_between_waypoints >= 1.0 {
            self.percent_between_waypoints = 0.0;
            self.from_waypoint += 1;

            if !self.cyclic && self.from_waypoint >= count - 1 {
                self.from_waypoint = 0;
                self.global_waypoints.reverse();
            }
            self.next_move_time = now + self.wait_time;
            trace!(waypoint = ?to, "platform reached waypoint");
        }

        new_position - position
    }

    /// Ticks the platform and collects its passengers for the resulting displacement.
    pub fn step(
        &mut self,
        emitter: &mut RaycastEmitter,
        position: Vec2,
        dt: f32,
        query: &impl RayQuery,
        filter: &SpatialQueryFilter,
    ) -> PlatformStep {
        let displacement = self.tick(position, dt);
        let passengers = if displacement == Vec2::ZERO {
            Vec::new()
        } else {
            find_passengers(emitter, position, query, filter, displacement)
        };
        PlatformStep {
            displacement,
            passengers,
        }
    }
}

/// Sweeps the platform's edges for riders it will carry or push by `displacement`.
///
/// Each rider appears at most once. The first sweep to reach it decides its directive.
pub fn find_passengers(
    emitter: &mut RaycastEmitter,
    position: Vec2,
    query: &impl RayQuery,
    filter: &SpatialQueryFilter,
    displacement: Vec2,
) -> Vec<PassengerMovement> {
    emitter.refresh_origins(position);
    let origins = emitter.origins();
    let skin_width = emitter.skin_width();
    let direction_x = direction(displacement.x);
    let direction_y = direction(displacement.y);

    let mut seen = EntityHashSet::default();
    let mut passengers = Vec::new();
    let mut push = |passenger: PassengerMovement| {
        if seen.insert(passenger.rider) {
            passengers.push(passenger);
        }
    };

    // Moving vertically: riders on top get lifted, riders underneath get pushed down.
    if displacement.y != 0.0 {
        let ray_direction = if direction_y < 0.0 { Dir2::NEG_Y } else { Dir2::Y };
        let base = if direction_y < 0.0 {
            origins.bottom_left
        } else {
            origins.top_left
        };
        let ray_length = displacement.y.abs() + skin_width;
        let spacing = emitter.ray_spacing(Axis::Vertical);

        for i in 0..emitter.ray_count(Axis::Vertical) {
            let origin = base + Vec2::X * (spacing * i as f32);
            let Some(hit) = query.cast_ray(origin, ray_direction, ray_length, filter) else {
                continue;
            };
            if hit.distance == 0.0 {
                continue;
            }
            let lifting = direction_y > 0.0;
            push(PassengerMovement {
                rider: hit.target,
                displacement: Vec2::new(
                    if lifting { displacement.x } else { 0.0 },
                    displacement.y - (hit.distance - skin_width) * direction_y,
                ),
                standing_on_platform: lifting,
                phase: Phase::Before,
            });
        }
    }

    // Moving horizontally: riders beside the leading edge get shoved.
    if displacement.x != 0.0 {
        let ray_direction = if direction_x < 0.0 { Dir2::NEG_X } else { Dir2::X };
        let base = if direction_x < 0.0 {
            origins.bottom_left
        } else {
            origins.bottom_right
        };
        let ray_length = displacement.x.abs() + skin_width;
        let spacing = emitter.ray_spacing(Axis::Horizontal);

        for i in 0..emitter.ray_count(Axis::Horizontal) {
            let origin = base + Vec2::Y * (spacing * i as f32);
            let Some(hit) = query.cast_ray(origin, ray_direction, ray_length, filter) else {
                continue;
            };
            if hit.distance == 0.0 {
                continue;
            }
            push(PassengerMovement {
                rider: hit.target,
                displacement: Vec2::new(
                    displacement.x - (hit.distance - skin_width) * direction_x,
                    0.0,
                ),
                standing_on_platform: false,
                phase: Phase::After,
            });
        }
    }

    // Moving down or only sideways: the sweeps above miss riders resting on top. Those riders
    // move before the platform so they never lose their footing.
    if direction_y < 0.0 || (displacement.y == 0.0 && displacement.x != 0.0) {
        let ray_length = skin_width * 2.0;
        let spacing = emitter.ray_spacing(Axis::Vertical);

        for i in 0..emitter.ray_count(Axis::Vertical) {
            let origin = origins.top_left + Vec2::X * (spacing * i as f32);
            let Some(hit) = query.cast_ray(origin, Dir2::Y, ray_length, filter) else {
                continue;
            };
            if hit.distance == 0.0 {
                continue;
            }
            push(PassengerMovement {
                rider: hit.target,
                displacement,
                standing_on_platform: true,
                phase: Phase::Before,
            });
        }
    }

    passengers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::char_controller::raycast::RaycastConfig;
    use crate::char_controller::test_world::SegmentWorld;
    use approx::assert_abs_diff_eq;

    fn platform(waypoints: Vec<Vec2>, wait_time: f32, cyclic: bool) -> MovingPlatform {
        let config = PlatformConfig {
            waypoints,
            speed: 1.0,
            wait_time,
            cyclic,
            easing: 0.0,
        };
        MovingPlatform::new(&config, Vec2::ZERO).unwrap()
    }

    /// Ticks `platform` from `position`, returning every displacement.
    fn run(platform: &mut MovingPlatform, position: &mut Vec2, dt: f32, ticks: usize) -> Vec<Vec2> {
        (0..ticks)
            .map(|_| {
                let displacement = platform.tick(*position, dt);
                *position += displacement;
                displacement
            })
            .collect()
    }

    #[test]
    fn easing_curve_properties() {
        for easing in [0.0, 1.0, 2.0] {
            assert_abs_diff_eq!(ease(0.0, easing), 0.0);
            assert_abs_diff_eq!(ease(1.0, easing), 1.0);
            assert_abs_diff_eq!(ease(0.5, easing), 0.5, epsilon = 1e-6);
        }
        for x in [0.1, 0.25, 0.6, 0.9] {
            assert_abs_diff_eq!(ease(x, 0.0), x, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(ease(0.25, 1.0), 0.1, epsilon = 1e-6);
        assert!(ease(0.25, 2.0) < ease(0.25, 1.0));
    }

    #[test]
    fn waypoints_are_offset_by_start() {
        let config = PlatformConfig {
            waypoints: vec![Vec2::ZERO, Vec2::new(2.0, 1.0)],
            ..default()
        };
        let platform = MovingPlatform::new(&config, Vec2::new(5.0, 5.0)).unwrap();
        assert_eq!(
            platform.global_waypoints(),
            &[Vec2::new(5.0, 5.0), Vec2::new(7.0, 6.0)]
        );
    }

    #[test]
    fn non_cyclic_platform_reverses_at_the_end() {
        let mut platform = platform(vec![Vec2::ZERO, Vec2::new(2.0, 0.0)], 0.0, false);
        let mut position = Vec2::ZERO;

        let steps = run(&mut platform, &mut position, 0.5, 4);
        for step in steps {
            assert_abs_diff_eq!(step.x, 0.5, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(position.x, 2.0, epsilon = 1e-6);
        assert_eq!(platform.global_waypoints()[0], Vec2::new(2.0, 0.0));

        let back = platform.tick(position, 0.5);
        assert_abs_diff_eq!(back.x, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn platform_waits_at_each_waypoint() {
        let mut platform = platform(vec![Vec2::ZERO, Vec2::new(2.0, 0.0)], 1.0, false);
        let mut position = Vec2::ZERO;
        run(&mut platform, &mut position, 0.5, 4);

        // Arrived when the clock read 1.5, so it rests until 2.5.
        assert_eq!(platform.tick(position, 0.5), Vec2::ZERO);
        let resumed = platform.tick(position, 0.5);
        assert_abs_diff_eq!(resumed.x, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn cyclic_platform_wraps_to_the_first_waypoint() {
        let waypoints = vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];
        let mut platform = platform(waypoints, 0.0, true);
        let mut position = Vec2::ZERO;

        // Each tick covers a whole segment.
        run(&mut platform, &mut position, 2.0, 3);
        assert_abs_diff_eq!(position.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(position.y, 0.0, epsilon = 1e-6);
        assert_eq!(platform.global_waypoints()[0], Vec2::ZERO);

        run(&mut platform, &mut position, 2.0, 1);
        assert_abs_diff_eq!(position.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn invalid_platforms_are_rejected() {
        let too_few = PlatformConfig {
            waypoints: vec![Vec2::ZERO],
            ..default()
        };
        assert!(matches!(
            MovingPlatform::new(&too_few, Vec2::ZERO),
            Err(ConfigError::TooFewWaypoints(1))
        ));

        let steep = PlatformConfig {
            easing: 3.0,
            ..default()
        };
        assert!(matches!(
            MovingPlatform::new(&steep, Vec2::ZERO),
            Err(ConfigError::InvalidPlatform { field: "easing", .. })
        ));

        let backwards = PlatformConfig {
            speed: -1.0,
            ..default()
        };
        assert!(matches!(
            MovingPlatform::new(&backwards, Vec2::ZERO),
            Err(ConfigError::InvalidPlatform { field: "speed", .. })
        ));
    }

    /// A 2 x 0.5 platform centered on the origin. Its top edge is at y = 0.25.
    fn platform_emitter() -> RaycastEmitter {
        let config = RaycastConfig {
            skin_width: 0.1,
            ray_spacing: 0.25,
        };
        RaycastEmitter::new(&config, Vec2::new(2.0, 0.5)).unwrap()
    }

    fn riders(displacement: Vec2, world: &SegmentWorld) -> Vec<PassengerMovement> {
        find_passengers(
            &mut platform_emitter(),
            Vec2::ZERO,
            world,
            &SpatialQueryFilter::default(),
            displacement,
        )
    }

    #[test]
    fn rider_on_a_sideways_platform_moves_first() {
        let mut world = SegmentWorld::new();
        let rider = world.rect(Vec2::new(-0.25, 0.25), Vec2::new(0.25, 0.75));

        let passengers = riders(Vec2::new(0.3, 0.0), &world);

        assert_eq!(
            passengers,
            vec![PassengerMovement {
                rider,
                displacement: Vec2::new(0.3, 0.0),
                standing_on_platform: true,
                phase: Phase::Before,
            }]
        );
    }

    #[test]
    fn rising_platform_lifts_riders_and_shoves_bystanders() {
        let mut world = SegmentWorld::new();
        let on_top = world.rect(Vec2::new(-0.25, 0.25), Vec2::new(0.25, 0.75));
        let beside = world.rect(Vec2::new(1.1, -0.5), Vec2::new(1.6, 0.5));
        let displacement = Vec2::new(0.3, 0.2);

        let passengers = riders(displacement, &world);
        assert_eq!(passengers.len(), 2);

        let top = passengers.iter().find(|p| p.rider == on_top).unwrap();
        assert_eq!(top.phase, Phase::Before);
        assert!(top.standing_on_platform);
        assert_abs_diff_eq!(top.displacement.x, 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(top.displacement.y, 0.2, epsilon = 1e-5);

        let side = passengers.iter().find(|p| p.rider == beside).unwrap();
        assert_eq!(side.phase, Phase::After);
        assert!(!side.standing_on_platform);
        // The bystander sits 0.2 from the platform edge, so only the rest of the move pushes it.
        assert_abs_diff_eq!(side.displacement.x, 0.2, epsilon = 1e-5);
        assert_eq!(side.displacement.y, 0.0);

        let step = PlatformStep {
            displacement,
            passengers,
        };
        let mut position = Vec2::ZERO;
        let mut order = Vec::new();
        step.apply(&mut position, |passenger| order.push(passenger.rider));

        assert_eq!(order, vec![on_top, beside]);
        assert_eq!(position, displacement);
    }

    #[test]
    fn sinking_platform_carries_riders_first() {
        let mut world = SegmentWorld::new();
        let rider = world.rect(Vec2::new(-0.25, 0.25), Vec2::new(0.25, 0.75));

        let passengers = riders(Vec2::new(0.1, -0.2), &world);

        assert_eq!(
            passengers,
            vec![PassengerMovement {
                rider,
                displacement: Vec2::new(0.1, -0.2),
                standing_on_platform: true,
                phase: Phase::Before,
            }]
        );
    }

    #[test]
    fn platform_moving_left_shoves_bystanders_left() {
        let mut world = SegmentWorld::new();
        let beside = world.rect(Vec2::new(-1.6, -0.5), Vec2::new(-1.1, 0.5));

        let passengers = riders(Vec2::new(-0.3, 0.0), &world);

        assert_eq!(passengers.len(), 1);
        let side = &passengers[0];
        assert_eq!(side.rider, beside);
        assert_eq!(side.phase, Phase::After);
        assert!(!side.standing_on_platform);
        assert_abs_diff_eq!(side.displacement.x, -0.2, epsilon = 1e-5);
        assert_eq!(side.displacement.y, 0.0);
    }

    #[test]
    fn wide_rider_appears_once() {
        let mut world = SegmentWorld::new();
        let rider = world.rect(Vec2::new(-0.8, 0.25), Vec2::new(0.8, 0.5));

        let passengers = riders(Vec2::new(0.0, 0.2), &world);

        assert_eq!(passengers.len(), 1);
        assert_eq!(passengers[0].rider, rider);
    }

    #[test]
    fn overlapping_riders_are_ignored() {
        let mut emitter = platform_emitter();
        emitter.refresh_origins(Vec2::ZERO);
        let mut world = SegmentWorld::new();
        // The rider's bottom edge lies on the top ray origins.
        let origin_y = emitter.origins().top_left.y;
        world.rect(Vec2::new(-0.25, origin_y), Vec2::new(0.25, 0.75));

        assert!(riders(Vec2::new(0.0, 0.2), &world).is_empty());
    }
}
