// Support configuring Bevy lints within code.
#![cfg_attr(bevy_lint, feature(register_tool), register_tool(bevy))]
// Disable console on Windows for non-dev builds.
#![cfg_attr(not(feature = "dev"), windows_subsystem = "windows")]

mod char_controller;
mod config;
#[cfg(feature = "dev")]
mod dev_tools;
mod input;
mod level;
mod physics;
mod player;

use crate::physics::PhysicsStep;
use bevy::{asset::AssetMetaCheck, prelude::*};

fn main() -> AppExit {
    App::new().add_plugins(AppPlugin).run()
}

pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        // Add Bevy plugins.
        app.add_plugins(
            DefaultPlugins
                .set(AssetPlugin {
                    // Wasm builds will check for meta files (that don't exist) if this isn't set.
                    // This causes errors and even panics on web build on itch.
                    // See https://github.com/bevyengine/bevy_github_ci_template/issues/48.
                    meta_check: AssetMetaCheck::Never,
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Window {
                        title: "Raycast Platformer".to_string(),
                        fit_canvas_to_parent: true,
                        ..default()
                    }
                    .into(),
                    ..default()
                })
                .set(ImagePlugin::default_nearest()),
        );

        // Add other plugins.
        app.add_plugins((
            config::plugin,
            input::plugin,
            physics::plugin,
            player::plugin,
            level::plugin,
            #[cfg(feature = "dev")]
            dev_tools::plugin,
        ));

        // Platforms carry their riders before anyone moves on their own.
        app.configure_sets(
            FixedUpdate,
            (PhysicsStep::Platforms, PhysicsStep::Actors).chain(),
        );
    }
}
