//! The avian2d backend for the character controller.
use crate::char_controller::prelude::*;
use avian2d::prelude::*;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use tracing::debug;

/// Fixed-step ordering. Platforms move and carry their riders before actors move themselves.
#[derive(SystemSet, Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum PhysicsStep {
    Platforms,
    Actors,
}

#[derive(PhysicsLayer, Clone, Copy, Debug, Default)]
pub enum GameLayer {
    #[default]
    Default,
    /// Level geometry, including moving platforms.
    Ground,
    /// Kinematic bodies.
    Actor,
}

/// Names a kind of surface, such as a one-way platform.
#[derive(Component, Clone, Debug, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct SurfaceTag(pub String);

impl SurfaceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

/// [`RayQuery`] backed by avian's spatial query pipeline.
#[derive(SystemParam)]
pub struct PhysicsWorld<'w, 's> {
    spatial_query: SpatialQuery<'w, 's>,
    tags: Query<'w, 's, &'static SurfaceTag>,
}

impl RayQuery for PhysicsWorld<'_, '_> {
    fn cast_ray(
        &self,
        origin: Vec2,
        direction: Dir2,
        max_distance: f32,
        filter: &SpatialQueryFilter,
    ) -> Option<RayHit> {
        self.spatial_query
            .cast_ray(origin, direction, max_distance, true, filter)
            .map(|hit| RayHit {
                target: hit.entity,
                distance: hit.distance,
                normal: hit.normal,
            })
    }

    fn has_tag(&self, target: Entity, tag: &str) -> bool {
        self.tags.get(target).is_ok_and(|surface| surface.0 == tag)
    }
}

/// The geometry an actor's rays may hit. The actor never hits itself.
pub fn actor_filter(actor: Entity, layers: &CollisionLayers) -> SpatialQueryFilter {
    SpatialQueryFilter::from_mask(layers.filters).with_excluded_entities([actor])
}

fn tick_platforms(
    time: Res<Time>,
    world: PhysicsWorld,
    mut registry: ResMut<PassengerRegistry>,
    mut platforms: Query<
        (Entity, &mut MovingPlatform, &mut RaycastEmitter, &mut Transform),
        Without<KinematicBody>,
    >,
    mut riders: Query<
        (&mut KinematicBody, &mut Transform, &CollisionLayers),
        Without<MovingPlatform>,
    >,
    bodies: Query<&ColliderOf>,
) {
    let dt = time.delta_secs();
    let passenger_filter = SpatialQueryFilter::from_mask(GameLayer::Actor);

    for (platform_entity, mut platform, mut emitter, mut transform) in &mut platforms {
        let mut position = transform.translation.xy();
        let filter = passenger_filter
            .clone()
            .with_excluded_entities([platform_entity]);
        let step = platform.step(&mut emitter, position, dt, &world, &filter);

        step.apply(&mut position, |passenger| {
            let owner = registry.resolve(passenger.rider, |collider| {
                bodies
                    .get(collider)
                    .ok()
                    .map(|collider_of| collider_of.body)
                    .filter(|body| riders.contains(*body))
            });
            let Some(rider) = owner else {
                return;
            };
            let Ok((mut body, mut rider_transform, layers)) = riders.get_mut(rider) else {
                return;
            };

            body.set_platform_move_distance(passenger.displacement);
            // The pipeline still has the platform at its old position.
            let rider_filter = SpatialQueryFilter::from_mask(layers.filters)
                .with_excluded_entities([rider, platform_entity]);

            let mut rider_position = rider_transform.translation.xy();
            let applied = body.apply_platform_move(&world, &rider_filter, &mut rider_position);
            rider_transform.translation = rider_position.extend(rider_transform.translation.z);
            debug!(
                ?rider,
                phase = ?passenger.phase,
                standing = passenger.standing_on_platform,
                ?applied,
                "platform moved passenger"
            );
        });

        transform.translation = position.extend(transform.translation.z);
    }
}

fn forget_removed_riders(
    mut removed: RemovedComponents<KinematicBody>,
    mut registry: ResMut<PassengerRegistry>,
) {
    for rider in removed.read() {
        registry.forget(rider);
    }
}

pub(crate) fn plugin(app: &mut App) {
    app.add_plugins(PhysicsPlugins::default())
        .init_resource::<PassengerRegistry>()
        .add_systems(
            FixedUpdate,
            (forget_removed_riders, tick_platforms)
                .chain()
                .in_set(PhysicsStep::Platforms),
        );
}
