//! Demo scene: flat ground, a pair of slopes, a one-way ledge and a moving platform.
use crate::char_controller::prelude::*;
use crate::config::ControllerSettings;
use crate::input::player_actions;
use crate::physics::{GameLayer, SurfaceTag};
use crate::player::{MoveIntent, Player, PlayerMotion};
use avian2d::prelude::*;
use bevy::prelude::*;

const GROUND_COLOR: Color = Color::srgb(0.35, 0.3, 0.3);
const LEDGE_COLOR: Color = Color::srgb(0.55, 0.45, 0.3);
const PLATFORM_COLOR: Color = Color::srgb(0.3, 0.45, 0.6);
const PLAYER_COLOR: Color = Color::srgb(0.9, 0.6, 0.3);

fn ground_layers() -> CollisionLayers {
    CollisionLayers::new(GameLayer::Ground, [GameLayer::Actor])
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        Projection::Orthographic(OrthographicProjection {
            scale: 1.0 / 40.0,
            ..OrthographicProjection::default_2d()
        }),
        Transform::from_xyz(4.0, 4.0, 0.0),
    ));
}

fn spawn_level(
    mut commands: Commands,
    settings: Res<ControllerSettings>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) -> Result {
    let ground = Vec2::new(40.0, 1.0);
    commands.spawn((
        Name::new("Ground"),
        RigidBody::Static,
        Collider::rectangle(ground.x, ground.y),
        ground_layers(),
        Sprite::from_color(GROUND_COLOR, ground),
        Transform::from_xyz(4.0, -0.5, 0.0),
    ));

    // A walkable ramp up to a plateau, then a slope too steep to climb.
    let slopes = [
        ("Ramp", [Vec2::new(6.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 2.0)]),
        ("Cliff", [Vec2::new(12.0, 0.0), Vec2::new(13.0, 0.0), Vec2::new(12.0, 6.0)]),
    ];
    for (name, [a, b, c]) in slopes {
        commands.spawn((
            Name::new(name),
            RigidBody::Static,
            Collider::triangle(a, b, c),
            ground_layers(),
            Mesh2d(meshes.add(Triangle2d::new(a, b, c))),
            MeshMaterial2d(materials.add(GROUND_COLOR)),
            Transform::default(),
        ));
    }
    commands.spawn((
        Name::new("Plateau"),
        RigidBody::Static,
        Collider::rectangle(2.0, 2.0),
        ground_layers(),
        Sprite::from_color(GROUND_COLOR, Vec2::splat(2.0)),
        Transform::from_xyz(11.0, 1.0, 0.0),
    ));

    let ledge = Vec2::new(3.0, 0.25);
    commands.spawn((
        Name::new("One-way ledge"),
        RigidBody::Static,
        Collider::rectangle(ledge.x, ledge.y),
        ground_layers(),
        SurfaceTag::new(settings.collision.one_way_tag.clone()),
        Sprite::from_color(LEDGE_COLOR, ledge),
        Transform::from_xyz(2.0, 2.5, 0.0),
    ));

    let platform_size = Vec2::new(3.0, 0.5);
    let platform_start = Vec2::new(-8.0, 1.5);
    commands.spawn((
        Name::new("Moving platform"),
        RigidBody::Kinematic,
        Collider::rectangle(platform_size.x, platform_size.y),
        ground_layers(),
        MovingPlatform::new(&settings.platform, platform_start)?,
        RaycastEmitter::new(&settings.raycast, platform_size)?,
        TransformInterpolation,
        Sprite::from_color(PLATFORM_COLOR, platform_size),
        Transform::from_translation(platform_start.extend(0.0)),
    ));

    let player = settings.player;
    commands.spawn((
        Name::new("Player"),
        Player,
        RigidBody::Kinematic,
        Collider::rectangle(player.size.x, player.size.y),
        CollisionLayers::new(GameLayer::Actor, [GameLayer::Ground]),
        KinematicBody::new(&settings.raycast, &settings.collision, player.size)?,
        PlayerMotion::new(player),
        MoveIntent::default(),
        TransformInterpolation,
        Sprite::from_color(PLAYER_COLOR, player.size),
        Transform::from_xyz(0.0, 2.0, 1.0),
        player_actions(),
    ));

    info!("Spawned demo level");
    Ok(())
}

pub(crate) fn plugin(app: &mut App) {
    app.add_systems(Startup, (spawn_camera, spawn_level));
}
