//! Synthetic line-segment geometry for exercising the controller without a physics engine.
use super::query::{RayHit, RayQuery};
use avian2d::prelude::{CollisionLayers, SpatialQueryFilter};
use bevy::prelude::*;

struct Segment {
    start: Vec2,
    end: Vec2,
    target: Entity,
    layers: CollisionLayers,
}

pub(crate) struct SegmentWorld {
    entities: World,
    segments: Vec<Segment>,
    tags: Vec<(Entity, &'static str)>,
}

impl SegmentWorld {
    pub(crate) fn new() -> Self {
        Self {
            entities: World::new(),
            segments: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub(crate) fn spawn(&mut self) -> Entity {
        self.entities.spawn_empty().id()
    }

    pub(crate) fn segment(&mut self, start: Vec2, end: Vec2) -> Entity {
        let target = self.spawn();
        self.segment_for(target, start, end);
        target
    }

    pub(crate) fn tagged_segment(&mut self, start: Vec2, end: Vec2, tag: &'static str) -> Entity {
        let target = self.segment(start, end);
        self.tags.push((target, tag));
        target
    }

    pub(crate) fn segment_for(&mut self, target: Entity, start: Vec2, end: Vec2) {
        self.segments.push(Segment {
            start,
            end,
            target,
            layers: CollisionLayers::default(),
        });
    }

    /// Adds the outline of an axis-aligned box owned by a single target.
    pub(crate) fn rect(&mut self, min: Vec2, max: Vec2) -> Entity {
        let target = self.spawn();
        let top_left = Vec2::new(min.x, max.y);
        let bottom_right = Vec2::new(max.x, min.y);
        self.segment_for(target, min, bottom_right);
        self.segment_for(target, bottom_right, max);
        self.segment_for(target, max, top_left);
        self.segment_for(target, top_left, min);
        target
    }
}

fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

impl RayQuery for SegmentWorld {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Dir2,
        max_distance: f32,
        filter: &SpatialQueryFilter,
    ) -> Option<RayHit> {
        let ray = direction.as_vec2();
        let mut closest: Option<RayHit> = None;
        for segment in &self.segments {
            if !filter.test(segment.target, segment.layers) {
                continue;
            }
            let edge = segment.end - segment.start;
            let denominator = cross(ray, edge);
            if denominator.abs() < 1e-9 {
                continue;
            }
            let to_start = segment.start - origin;
            let distance = cross(to_start, edge) / denominator;
            let along = cross(to_start, ray) / denominator;
            if distance < 0.0 || distance > max_distance || !(0.0..=1.0).contains(&along) {
                continue;
            }
            if closest.is_some_and(|hit| hit.distance <= distance) {
                continue;
            }
            let mut normal = Vec2::new(-edge.y, edge.x).normalize();
            if normal.dot(ray) > 0.0 {
                normal = -normal;
            }
            closest = Some(RayHit {
                target: segment.target,
                distance,
                normal,
            });
        }
        closest
    }

    fn has_tag(&self, target: Entity, tag: &str) -> bool {
        self.tags.iter().any(|&(entity, name)| entity == target && name == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ray_reports_closest_segment_with_facing_normal() {
        let mut world = SegmentWorld::new();
        let near = world.segment(Vec2::new(-1.0, 1.0), Vec2::new(1.0, 1.0));
        world.segment(Vec2::new(-1.0, 2.0), Vec2::new(1.0, 2.0));

        let hit = world
            .cast_ray(Vec2::ZERO, Dir2::Y, 5.0, &SpatialQueryFilter::default())
            .unwrap();

        assert_eq!(hit.target, near);
        assert_abs_diff_eq!(hit.distance, 1.0);
        assert_eq!(hit.normal, Vec2::NEG_Y);
    }

    #[test]
    fn ray_respects_length_and_exclusions() {
        let mut world = SegmentWorld::new();
        let wall = world.segment(Vec2::new(1.0, -1.0), Vec2::new(1.0, 1.0));
        let filter = SpatialQueryFilter::default();

        assert!(world.cast_ray(Vec2::ZERO, Dir2::X, 0.5, &filter).is_none());
        assert!(world.cast_ray(Vec2::ZERO, Dir2::NEG_X, 5.0, &filter).is_none());
        assert!(
            world
                .cast_ray(Vec2::ZERO, Dir2::X, 5.0, &filter.with_excluded_entities([wall]))
                .is_none()
        );
    }
}
