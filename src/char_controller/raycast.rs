//! Ray origin bookkeeping shared by actors and moving platforms.
use crate::config::ConfigError;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Tunables for a [`RaycastEmitter`].
#[derive(Clone, Copy, Debug, PartialEq, Reflect, Deserialize, Serialize)]
#[reflect(Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaycastConfig {
    /// How far inside the collider rays start. Keeps rays from hitting the surface they rest on.
    ///
    /// Increase the value if the character tunnels into geometry at high speed.
    pub skin_width: f32,
    /// The desired distance between parallel rays along an edge.
    pub ray_spacing: f32,
}

impl Default for RaycastConfig {
    fn default() -> Self {
        Self {
            skin_width: 0.015,
            ray_spacing: 0.2,
        }
    }
}

impl RaycastConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.skin_width > 0.0) || !self.skin_width.is_finite() {
            return Err(ConfigError::NonPositiveSkinWidth(self.skin_width));
        }
        if !(self.ray_spacing > 0.0) || !self.ray_spacing.is_finite() {
            return Err(ConfigError::NonPositiveRaySpacing(self.ray_spacing));
        }
        Ok(())
    }
}

/// The corners of the skin-inset bounds, recomputed every step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct RayOrigins {
    pub top_left: Vec2,
    pub top_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
}

impl RayOrigins {
    pub fn from_bounds(bounds: Rect) -> Self {
        Self {
            top_left: Vec2::new(bounds.min.x, bounds.max.y),
            top_right: bounds.max,
            bottom_left: bounds.min,
            bottom_right: Vec2::new(bounds.max.x, bounds.min.y),
        }
    }
}

/// A sweep axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum Axis {
    /// Rays cast along x, stacked up the vertical edge.
    Horizontal,
    /// Rays cast along y, spread across the horizontal edge.
    Vertical,
}

/// Owns an axis-aligned box and derives the ray layout used to sweep it through the world.
///
/// Ray counts and spacing are derived once, when the emitter is built. If the collider changes
/// size afterwards the layout is stale until [`RaycastEmitter::resize`] is called.
#[derive(Component, Clone, Debug, Reflect)]
pub struct RaycastEmitter {
    skin_width: f32,
    ray_spacing: f32,
    half_size: Vec2,
    horizontal_ray_count: usize,
    vertical_ray_count: usize,
    horizontal_ray_spacing: f32,
    vertical_ray_spacing: f32,
    origins: RayOrigins,
}

impl RaycastEmitter {
    /// Builds an emitter for a box collider of `collider_size`.
    pub fn new(config: &RaycastConfig, collider_size: Vec2) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut emitter = Self {
            skin_width: config.skin_width,
            ray_spacing: config.ray_spacing,
            half_size: Vec2::ZERO,
            horizontal_ray_count: 2,
            vertical_ray_count: 2,
            horizontal_ray_spacing: 0.0,
            vertical_ray_spacing: 0.0,
            origins: RayOrigins::default(),
        };
        emitter.resize(collider_size)?;
        Ok(emitter)
    }

    /// Re-derives ray counts and spacing for a new collider size.
    pub fn resize(&mut self, collider_size: Vec2) -> Result<(), ConfigError> {
        let inset = collider_size - Vec2::splat(2.0 * self.skin_width);
        if !(inset.x > 0.0 && inset.y > 0.0) {
            return Err(ConfigError::ColliderTooSmall {
                size: collider_size,
                skin_width: self.skin_width,
            });
        }

        self.half_size = collider_size / 2.0;
        self.horizontal_ray_count = ray_count(inset.y, self.ray_spacing);
        self.vertical_ray_count = ray_count(inset.x, self.ray_spacing);
        self.horizontal_ray_spacing = inset.y / (self.horizontal_ray_count - 1) as f32;
        self.vertical_ray_spacing = inset.x / (self.vertical_ray_count - 1) as f32;
        Ok(())
    }

    /// The physical bounds of the collider centered on `center`.
    pub fn bounds(&self, center: Vec2) -> Rect {
        Rect::from_center_half_size(center, self.half_size)
    }

    /// The physical bounds shrunk by the skin width on every side.
    pub fn inset_bounds(&self, center: Vec2) -> Rect {
        self.bounds(center).inflate(-self.skin_width)
    }

    /// Recomputes the four ray origins for a collider centered on `center`.
    pub fn refresh_origins(&mut self, center: Vec2) {
        self.origins = RayOrigins::from_bounds(self.inset_bounds(center));
    }

    pub fn origins(&self) -> RayOrigins {
        self.origins
    }

    pub fn skin_width(&self) -> f32 {
        self.skin_width
    }

    pub fn size(&self) -> Vec2 {
        self.half_size * 2.0
    }

    /// Number of rays cast along x, stacked up each vertical edge.
    pub fn horizontal_ray_count(&self) -> usize {
        self.horizontal_ray_count
    }

    /// Number of rays cast along y, spread across each horizontal edge.
    pub fn vertical_ray_count(&self) -> usize {
        self.vertical_ray_count
    }

    pub fn ray_count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Horizontal => self.horizontal_ray_count,
            Axis::Vertical => self.vertical_ray_count,
        }
    }

    /// Distance between adjacent parallel rays of a sweep along `axis`.
    pub fn ray_spacing(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.horizontal_ray_spacing,
            Axis::Vertical => self.vertical_ray_spacing,
        }
    }
}

fn ray_count(edge_length: f32, spacing: f32) -> usize {
    ((edge_length / spacing).round() as usize).max(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config(skin_width: f32, ray_spacing: f32) -> RaycastConfig {
        RaycastConfig {
            skin_width,
            ray_spacing,
        }
    }

    #[test]
    fn origins_are_inset_by_skin() {
        let mut emitter = RaycastEmitter::new(&config(0.1, 0.25), Vec2::ONE).unwrap();
        emitter.refresh_origins(Vec2::new(2.0, 3.0));
        let origins = emitter.origins();

        assert_abs_diff_eq!(origins.bottom_left.x, 1.6, epsilon = 1e-6);
        assert_abs_diff_eq!(origins.bottom_left.y, 2.6, epsilon = 1e-6);
        assert_abs_diff_eq!(origins.top_right.x, 2.4, epsilon = 1e-6);
        assert_abs_diff_eq!(origins.top_right.y, 3.4, epsilon = 1e-6);
        assert_eq!(origins.top_left, Vec2::new(origins.bottom_left.x, origins.top_right.y));
        assert_eq!(origins.bottom_right, Vec2::new(origins.top_right.x, origins.bottom_left.y));
    }

    #[test]
    fn spacing_spans_the_inset_edge() {
        let emitter = RaycastEmitter::new(&config(0.1, 0.25), Vec2::new(1.0, 2.0)).unwrap();

        // Inset edges are 0.8 wide and 1.8 tall.
        assert_eq!(emitter.vertical_ray_count(), 3);
        assert_eq!(emitter.horizontal_ray_count(), 7);
        assert_abs_diff_eq!(emitter.ray_spacing(Axis::Vertical), 0.4, epsilon = 1e-6);
        assert_abs_diff_eq!(emitter.ray_spacing(Axis::Horizontal), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn ray_count_never_drops_below_two() {
        let emitter = RaycastEmitter::new(&config(0.01, 10.0), Vec2::splat(0.5)).unwrap();

        assert_eq!(emitter.ray_count(Axis::Horizontal), 2);
        assert_eq!(emitter.ray_count(Axis::Vertical), 2);
        assert_abs_diff_eq!(emitter.ray_spacing(Axis::Vertical), 0.48, epsilon = 1e-6);
    }

    #[test]
    fn resize_rederives_layout() {
        let mut emitter = RaycastEmitter::new(&config(0.1, 0.25), Vec2::ONE).unwrap();
        emitter.resize(Vec2::new(1.0, 3.0)).unwrap();

        assert_eq!(emitter.horizontal_ray_count(), 11);
        assert_eq!(emitter.size(), Vec2::new(1.0, 3.0));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            RaycastEmitter::new(&config(0.0, 0.2), Vec2::ONE),
            Err(ConfigError::NonPositiveSkinWidth(_))
        ));
        assert!(matches!(
            RaycastEmitter::new(&config(0.1, -1.0), Vec2::ONE),
            Err(ConfigError::NonPositiveRaySpacing(_))
        ));
        assert!(matches!(
            RaycastEmitter::new(&config(0.5, 0.2), Vec2::ONE),
            Err(ConfigError::ColliderTooSmall { .. })
        ));
    }
}
