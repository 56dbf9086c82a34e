//! World wrapper providing helper methods for anchored entities

use glam::{DMat4, DVec3};
use hecs::Entity;
use tracing::{debug, warn};

use super::components::{Name, RenderTransform, TrackedView};
use crate::core::coordinates::anchor::GlobeAnchor;
use crate::core::coordinates::georeference::Georeference;

/// Wrapper around `hecs::World` providing anchored-entity helpers.
pub struct World {
    inner: hecs::World,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn a new entity with the given components.
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Get a reference to a component on an entity.
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Insert a component into an entity.
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Query entities with specific components.
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<Q> {
        self.inner.query()
    }

    /// Query entities with specific components (mutable).
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<Q> {
        self.inner.query_mut()
    }

    /// Query a single entity for component references.
    pub fn query_one_mut<Q: hecs::Query>(
        &mut self,
        entity: Entity,
    ) -> Result<Q::Item<'_>, hecs::QueryOneError> {
        self.inner.query_one_mut::<Q>(entity)
    }

    /// Despawn an entity and all its components.
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Check if an entity exists.
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Spawn an entity anchored at the given ECEF transform, with its
    /// render transform already derived against `georeference`.
    pub fn spawn_anchored(
        &mut self,
        name: &str,
        anchor_to_ecef: DMat4,
        georeference: &Georeference,
    ) -> Entity {
        let mut anchor = GlobeAnchor::new(false);
        anchor.set_from_ecef(anchor_to_ecef, georeference);
        let render = RenderTransform {
            matrix: anchor.local_transform().as_mat4(),
        };

        let entity = self.spawn((Name(name.to_string()), anchor, render));
        debug!(?entity, name, "spawned anchored entity");
        entity
    }

    /// Make `entity` the tracked view, clearing the marker from any other
    /// entity.
    pub fn set_tracked_view(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        let previous: Vec<Entity> = self
            .query::<&TrackedView>()
            .iter()
            .map(|(e, _)| e)
            .collect();
        for e in previous {
            let _ = self.inner.remove_one::<TrackedView>(e);
        }
        self.insert_one(entity, TrackedView)
    }
}

/// Reconcile every anchor against the georeference's current revision and
/// refresh its render transform.
///
/// This is the only place anchor math is narrowed to `f32`; everything
/// upstream stays in doubles.
pub fn sync_anchors_system(world: &mut World, georeference: &Georeference) {
    for (_, (anchor, render)) in world.query_mut::<(&mut GlobeAnchor, &mut RenderTransform)>() {
        anchor.reconcile(georeference);
        if anchor.is_anchored() {
            render.matrix = anchor.local_transform().as_mat4();
        }
    }
}

/// ECEF position of the tracked view, if one exists and is anchored.
pub fn tracked_view_ecef(world: &World) -> Option<DVec3> {
    let mut query = world.query::<(&GlobeAnchor, &TrackedView)>();
    let mut iter = query.iter();
    let Some((_, (anchor, _))) = iter.next() else {
        warn!("no tracked view entity registered");
        return None;
    };

    let position = anchor.ecef_position();
    if position.is_none() {
        warn!("tracked view entity is not anchored yet");
    }
    position
}

/// Apply an externally driven local-transform change (the host moved the
/// object in its own world frame) to the entity's anchor.
pub fn update_transform_from_host(
    world: &mut World,
    entity: Entity,
    anchor_to_local: DMat4,
    georeference: &Georeference,
) {
    let Ok((anchor, render)) =
        world.query_one_mut::<(&mut GlobeAnchor, &mut RenderTransform)>(entity)
    else {
        warn!(?entity, "transform update for entity without anchor");
        return;
    };

    anchor.set_from_local_transform(anchor_to_local, georeference);
    render.matrix = anchor.local_transform().as_mat4();
}
