use bevy::ecs::entity::EntityHashMap;
use bevy::prelude::*;

/// Caches which rider body owns a collider hit by a platform sweep.
#[derive(Resource, Debug, Default)]
pub struct PassengerRegistry {
    riders: EntityHashMap<Entity>,
}

impl PassengerRegistry {
    /// Returns the rider owning `collider`, asking `lookup` on a cache miss.
    ///
    /// Misses are not cached, so a collider that later gains a body is picked up.
    pub fn resolve(
        &mut self,
        collider: Entity,
        lookup: impl FnOnce(Entity) -> Option<Entity>,
    ) -> Option<Entity> {
        if let Some(rider) = self.riders.get(&collider) {
            return Some(*rider);
        }
        let rider = lookup(collider)?;
        self.riders.insert(collider, rider);
        Some(rider)
    }

    /// Drops every cached collider that pointed at `rider`.
    pub fn forget(&mut self, rider: Entity) {
        self.riders.retain(|_, cached| *cached != rider);
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }
}
