use super::collision_state::CollisionState;
use super::query::RayQuery;
use super::raycast::{RaycastConfig, RaycastEmitter};
use super::resolver::{CollisionConfig, CollisionResolver};
use crate::config::ConfigError;
use avian2d::prelude::SpatialQueryFilter;
use bevy::prelude::*;
use tracing::{debug, trace};

/// A box-shaped actor moved by explicit displacements instead of a physics solver.
///
/// Moving platforms inject displacement through
/// [`set_platform_move_distance`](Self::set_platform_move_distance). That displacement is resolved
/// on its own, before the body's own motion.
///
/// Ground contact is taken from the body's own moves only. A platform move in between does not
/// unground a body that was standing.
#[derive(Component, Clone, Debug, Reflect)]
pub struct KinematicBody {
    emitter: RaycastEmitter,
    resolver: CollisionResolver,
    pending_platform_move: Option<Vec2>,
    grounded: bool,
}

impl KinematicBody {
    pub fn new(
        raycast: &RaycastConfig,
        collision: &CollisionConfig,
        collider_size: Vec2,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            emitter: RaycastEmitter::new(raycast, collider_size)?,
            resolver: CollisionResolver::new(collision)?,
            pending_platform_move: None,
            grounded: false,
        })
    }

    /// Queues a platform displacement. A later injection in the same tick replaces it.
    pub fn set_platform_move_distance(&mut self, displacement: Vec2) {
        self.pending_platform_move = Some(displacement);
    }

    pub fn pending_platform_move(&self) -> Option<Vec2> {
        self.pending_platform_move
    }

    /// Resolves and applies any pending platform displacement, consuming it.
    ///
    /// Returns the displacement actually applied, or `None` if nothing was pending.
    pub fn apply_platform_move(
        &mut self,
        query: &impl RayQuery,
        filter: &SpatialQueryFilter,
        position: &mut Vec2,
    ) -> Option<Vec2> {
        let pending = self.pending_platform_move.take()?;
        let applied = self.translate(query, filter, position, pending, Vec2::ZERO);
        trace!(?pending, ?applied, "applied platform displacement");
        Some(applied)
    }

    /// Moves the body by `displacement`, stopping at world geometry.
    ///
    /// `input` is the movement intent for this step; holding down drops through one-way
    /// platforms. Returns the displacement applied by the body's own move.
    pub fn move_and_collide(
        &mut self,
        query: &impl RayQuery,
        filter: &SpatialQueryFilter,
        position: &mut Vec2,
        displacement: Vec2,
        input: Vec2,
    ) -> Vec2 {
        self.apply_platform_move(query, filter, position);
        let resolved = self.translate(query, filter, position, displacement, input);

        let grounded = self.resolver.is_grounded();
        if grounded != self.grounded {
            debug!(grounded, "ground contact changed");
        }
        self.grounded = grounded;
        resolved
    }

    fn translate(
        &mut self,
        query: &impl RayQuery,
        filter: &SpatialQueryFilter,
        position: &mut Vec2,
        displacement: Vec2,
        input: Vec2,
    ) -> Vec2 {
        let resolved =
            self.resolver
                .resolve(&mut self.emitter, *position, query, filter, displacement, input);
        *position += resolved;
        resolved
    }

    /// Whether the body's latest own move ended on the ground.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Contacts of the most recent resolution, which may have been a platform move.
    pub fn state(&self) -> &CollisionState {
        self.resolver.state()
    }

    pub fn emitter(&self) -> &RaycastEmitter {
        &self.emitter
    }

    /// Re-derives the ray layout after the collider changed size.
    pub fn resize(&mut self, collider_size: Vec2) -> Result<(), ConfigError> {
        self.emitter.resize(collider_size)
    }
}
