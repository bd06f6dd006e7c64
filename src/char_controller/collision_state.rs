use bevy::prelude::*;

/// What the most recent motion resolution touched.
///
/// Contact and slope flags are recomputed from scratch on every resolution. The previous slope
/// angle and the platform being dropped through carry across frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub struct CollisionState {
    pub above: bool,
    pub below: bool,
    pub left: bool,
    pub right: bool,

    pub climbing_slope: bool,
    pub descending_slope: bool,
    pub sliding_down_slope: bool,

    /// Radians.
    pub current_slope_angle: f32,
    /// The slope angle of the prior resolution, carried over by [`CollisionState::reset`].
    pub previous_slope_angle: f32,
    pub slope_normal: Vec2,

    /// The one-way platform currently being dropped through.
    pub falling_through_platform: Option<Entity>,
}

impl CollisionState {
    pub fn reset(&mut self) {
        self.above = false;
        self.below = false;
        self.left = false;
        self.right = false;
        self.climbing_slope = false;
        self.descending_slope = false;
        self.sliding_down_slope = false;

        self.previous_slope_angle = self.current_slope_angle;
        self.current_slope_angle = 0.0;
        self.slope_normal = Vec2::ZERO;
    }

    /// Records a vertical contact. Exactly one of `above`/`below` is set.
    pub fn set_y(&mut self, direction: f32) {
        self.below = direction < 0.0;
        self.above = !self.below;
    }

    /// Records a horizontal contact. Exactly one of `left`/`right` is set.
    pub fn set_x(&mut self, direction: f32) {
        self.left = direction < 0.0;
        self.right = !self.left;
    }

    pub fn clear_falling_through_platform(&mut self) {
        self.falling_through_platform = None;
    }

    pub fn is_grounded(&self) -> bool {
        self.below
    }
}
