//! Velocity integration for the player. Collision handling lives in [`KinematicBody`].
use crate::char_controller::prelude::*;
use crate::config::PlayerConfig;
use crate::physics::{PhysicsStep, PhysicsWorld, actor_filter};
use avian2d::prelude::*;
use bevy::prelude::*;
use tracing::debug;

#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// The latest input for an actor. Written by input observers, read every fixed step.
#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct MoveIntent {
    /// `x` in `[-1, 1]`. `y` is `-1` while down is held.
    pub axis: Vec2,
    /// Set on press, consumed by the next fixed step.
    pub jump: bool,
    /// Set on release, consumed by the next fixed step.
    pub jump_released: bool,
}

#[derive(Component, Clone, Copy, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct PlayerMotion {
    pub config: PlayerConfig,
    pub velocity: Vec2,
    /// Time left on a buffered jump press.
    jump_timer: f32,
    /// Time left to jump since ground contact was last seen.
    grounded_timer: f32,
    /// Rate of change of the smoothed horizontal velocity.
    x_smoothing: f32,
}

impl PlayerMotion {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            ..default()
        }
    }

    /// Integrates input and gravity into this step's desired displacement.
    pub fn integrate(&mut self, intent: &mut MoveIntent, grounded: bool, dt: f32) -> Vec2 {
        let config = self.config;
        self.jump_timer = (self.jump_timer - dt).max(0.0);
        self.grounded_timer = (self.grounded_timer - dt).max(0.0);

        let pressed = std::mem::take(&mut intent.jump);
        if pressed {
            self.jump_timer = config.jump_buffer;
        }
        if grounded {
            self.grounded_timer = config.coyote_time;
        }
        if (pressed || self.jump_timer > 0.0) && (grounded || self.grounded_timer > 0.0) {
            self.velocity.y = config.jump_velocity;
            self.jump_timer = 0.0;
            self.grounded_timer = 0.0;
            debug!(grounded, "jump");
        }
        if std::mem::take(&mut intent.jump_released) && self.velocity.y > config.min_jump_velocity {
            self.velocity.y = config.min_jump_velocity;
        }

        let smooth_time = if grounded {
            config.smooth_time_grounded
        } else {
            config.smooth_time_airborne
        };
        self.velocity.x = smooth_damp(
            self.velocity.x,
            intent.axis.x * config.move_speed,
            &mut self.x_smoothing,
            smooth_time,
            dt,
        );

        let falling = self.velocity.y < 0.0 && !grounded;
        let scale = if falling { config.fall_multiplier } else { 1.0 };
        self.velocity.y += config.gravity * scale * dt;
        self.velocity * dt
    }

    /// Adopts the displacement that was actually applied, so blocked motion stops.
    pub fn reconcile(&mut self, applied: Vec2, dt: f32) {
        self.velocity = applied / dt;
    }
}

/// Critically damped approach of `current` towards `target`, reaching it in roughly `smooth_time`.
///
/// `rate` carries the rate of change between calls. The result never overshoots `target`.
fn smooth_damp(current: f32, target: f32, rate: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*rate + omega * change) * dt;
    *rate = (*rate - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        *rate = 0.0;
        return target;
    }
    output
}

fn move_players(
    time: Res<Time>,
    world: PhysicsWorld,
    mut players: Query<(
        Entity,
        &mut KinematicBody,
        &mut PlayerMotion,
        &mut MoveIntent,
        &mut Transform,
        &CollisionLayers,
    )>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (entity, mut body, mut motion, mut intent, mut transform, layers) in &mut players {
        let displacement = motion.integrate(&mut intent, body.is_grounded(), dt);
        let filter = actor_filter(entity, layers);

        let mut position = transform.translation.xy();
        let applied = body.move_and_collide(&world, &filter, &mut position, displacement, intent.axis);
        transform.translation = position.extend(transform.translation.z);
        motion.reconcile(applied, dt);
    }
}

pub(crate) fn plugin(app: &mut App) {
    app.add_systems(FixedUpdate, move_players.in_set(PhysicsStep::Actors));
}
