//! Development tools for the demo. This plugin is only enabled in dev builds.

use crate::char_controller::prelude::*;
use crate::physics::PhysicsStep;
use avian2d::prelude::PhysicsDebugPlugin;
use bevy::{input::common_conditions::input_just_pressed, prelude::*};
use bevy_inspector_egui::bevy_egui::EguiPlugin;

pub(super) fn plugin(app: &mut App) {
    // Toggle the ray overlay.
    app.init_resource::<ShowRays>().add_systems(
        Update,
        toggle_rays.run_if(input_just_pressed(TOGGLE_KEY)),
    );
    app.add_systems(
        FixedUpdate,
        draw_rays
            .after(PhysicsStep::Actors)
            .run_if(|show: Res<ShowRays>| show.0),
    );
    //inspect stuff and things
    app.add_plugins((
        EguiPlugin::default(),
        bevy_inspector_egui::quick::WorldInspectorPlugin::new(),
        PhysicsDebugPlugin::default(),
    ));
}

const TOGGLE_KEY: KeyCode = KeyCode::Backquote;

#[derive(Resource, Default)]
struct ShowRays(bool);

fn toggle_rays(mut show: ResMut<ShowRays>) {
    show.0 = !show.0;
}

/// Draws each body's inset bounds and colors it by ground contact.
fn draw_rays(mut gizmos: Gizmos, bodies: Query<(&KinematicBody, &Transform)>) {
    for (body, transform) in &bodies {
        let center = transform.translation.xy();
        let inset = body.emitter().inset_bounds(center);
        let color = if body.is_grounded() {
            Color::srgb(0.2, 0.9, 0.3)
        } else {
            Color::srgb(0.9, 0.2, 0.2)
        };
        gizmos.rect_2d(Isometry2d::from_translation(inset.center()), inset.size(), color);

        let state = body.state();
        if state.slope_normal != Vec2::ZERO {
            let origins = body.emitter().origins();
            let foot = (origins.bottom_left + origins.bottom_right) / 2.0;
            gizmos.line_2d(foot, foot + state.slope_normal, Color::WHITE);
        }
    }
}
