use crate::player::{MoveIntent, Player};
use bevy::prelude::*;
use bevy_enhanced_input::prelude::*;

/// Horizontal movement axis.
#[derive(InputAction)]
#[action_output(f32)]
pub struct Move;

/// Held to drop through one-way platforms.
#[derive(InputAction)]
#[action_output(bool)]
pub struct Down;

#[derive(InputAction)]
#[action_output(bool)]
pub struct Jump;

/// Keyboard and gamepad bindings for the [`Player`] context.
pub(crate) fn player_actions() -> impl Bundle {
    actions!(Player[
        (
            Action::<Move>::new(),
            bindings![
                KeyCode::KeyD,
                KeyCode::ArrowRight,
                (KeyCode::KeyA, Negate::all()),
                (KeyCode::ArrowLeft, Negate::all()),
                GamepadAxis::LeftStickX,
            ],
        ),
        (
            Action::<Down>::new(),
            bindings![KeyCode::KeyS, KeyCode::ArrowDown, GamepadButton::DPadDown],
        ),
        (
            Action::<Jump>::new(),
            bindings![KeyCode::Space, GamepadButton::South],
        ),
    ])
}

fn record_move(trigger: On<Fire<Move>>, mut intents: Query<&mut MoveIntent>) {
    if let Ok(mut intent) = intents.get_mut(trigger.context) {
        intent.axis.x = trigger.value.clamp(-1.0, 1.0);
    }
}

fn stop_move(trigger: On<Complete<Move>>, mut intents: Query<&mut MoveIntent>) {
    if let Ok(mut intent) = intents.get_mut(trigger.context) {
        intent.axis.x = 0.0;
    }
}

fn hold_down(trigger: On<Fire<Down>>, mut intents: Query<&mut MoveIntent>) {
    if let Ok(mut intent) = intents.get_mut(trigger.context) {
        intent.axis.y = -1.0;
    }
}

fn release_down(trigger: On<Complete<Down>>, mut intents: Query<&mut MoveIntent>) {
    if let Ok(mut intent) = intents.get_mut(trigger.context) {
        intent.axis.y = 0.0;
    }
}

fn request_jump(trigger: On<Start<Jump>>, mut intents: Query<&mut MoveIntent>) {
    if let Ok(mut intent) = intents.get_mut(trigger.context) {
        intent.jump = true;
    }
}

/// Releasing jump early cuts the rise short.
fn release_jump(trigger: On<Complete<Jump>>, mut intents: Query<&mut MoveIntent>) {
    if let Ok(mut intent) = intents.get_mut(trigger.context) {
        intent.jump_released = true;
    }
}

pub(crate) fn plugin(app: &mut App) {
    app.add_plugins(EnhancedInputPlugin)
        .add_input_context::<Player>()
        .add_observer(record_move)
        .add_observer(stop_move)
        .add_observer(hold_down)
        .add_observer(release_down)
        .add_observer(request_jump)
        .add_observer(release_jump);
}
