//! Georeference: origin placement policy and cached transform matrices
//!
//! One georeference exists per scene. It decides where the host world's
//! floating origin sits on the globe and keeps two cached frames consistent
//! with that decision: the *georeferenced* frame (right-handed East-North-Up
//! at the origin, meters) and the *world* frame (East-South-Up with the host
//! scale applied, matching a left-handed host engine). Every committed
//! mutation bumps a revision counter and broadcasts an event so dependents
//! can re-derive their local transforms.

use std::collections::HashMap;

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::coordinates::events::{
    GeoreferenceChange, GeoreferenceEvent, GeoreferenceEvents, SubscriptionId,
};
use crate::core::coordinates::local_frame::{FrameAxes, LocalHorizontalCoordinateSystem};
use crate::core::ellipsoid::{Cartographic, Ellipsoid};

/// Smallest permitted world scale. `set_scale` clamps here so the cached
/// transforms can never become singular or inverted.
pub const MIN_SCALE: f64 = 1e-6;

/// Where the scene origin is placed on the globe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginPlacement {
    /// Origin at the ellipsoid center, no geodetic alignment.
    TrueOrigin,
    /// Origin at an externally supplied bounding-volume center.
    BoundingVolumeOrigin,
    /// Origin at a cartographic point on the ellipsoid.
    CartographicOrigin,
}

/// Selects one of the four cached matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    GeoreferencedToEcef,
    EcefToGeoreferenced,
    WorldToEcef,
    EcefToWorld,
}

/// Per-scene origin policy and transform cache.
pub struct Georeference {
    placement: OriginPlacement,
    origin: Cartographic,
    bounding_volume_origin: Option<DVec3>,
    ellipsoid: Ellipsoid,
    scale: f64,
    georeferenced_frame: LocalHorizontalCoordinateSystem,
    world_frame: LocalHorizontalCoordinateSystem,
    revision: u64,
    events: GeoreferenceEvents,
}

impl Default for Georeference {
    fn default() -> Self {
        Self::new()
    }
}

impl Georeference {
    /// A WGS84 georeference with a cartographic origin at (0°, 0°, 0 m)
    /// and unit scale.
    pub fn new() -> Self {
        Self::with_origin(Cartographic::new(0.0, 0.0, 0.0))
    }

    /// A WGS84 georeference with the given cartographic origin.
    pub fn with_origin(origin: Cartographic) -> Self {
        let ellipsoid = Ellipsoid::WGS84;
        let mut georeference = Self {
            placement: OriginPlacement::CartographicOrigin,
            origin,
            bounding_volume_origin: None,
            ellipsoid,
            scale: 1.0,
            georeferenced_frame: LocalHorizontalCoordinateSystem::ecef_aligned(),
            world_frame: LocalHorizontalCoordinateSystem::ecef_aligned(),
            revision: 0,
            events: GeoreferenceEvents::new(),
        };
        georeference.recompute();
        georeference
    }

    /// Current placement mode.
    pub fn placement(&self) -> OriginPlacement {
        self.placement
    }

    /// Current cartographic origin (meaningful in `CartographicOrigin`
    /// mode; kept in sync by sub-level switching).
    pub fn origin(&self) -> Cartographic {
        self.origin
    }

    /// Effective world scale (meters per world unit), already clamped.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// The ellipsoid this georeference is anchored to.
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Monotonic counter, bumped by every committed mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The world frame (East-South-Up at the origin, host scale).
    pub fn coordinate_system(&self) -> &LocalHorizontalCoordinateSystem {
        &self.world_frame
    }

    /// One of the four cached matrices, consistent with the last committed
    /// origin/scale/ellipsoid.
    pub fn transform(&self, kind: TransformKind) -> DMat4 {
        match kind {
            TransformKind::GeoreferencedToEcef => self.georeferenced_frame.local_to_ecef_matrix(),
            TransformKind::EcefToGeoreferenced => self.georeferenced_frame.ecef_to_local_matrix(),
            TransformKind::WorldToEcef => self.world_frame.local_to_ecef_matrix(),
            TransformKind::EcefToWorld => self.world_frame.ecef_to_local_matrix(),
        }
    }

    /// Set the origin to a cartographic point. Switches placement to
    /// `CartographicOrigin`.
    pub fn set_origin_cartographic(&mut self, origin: Cartographic) {
        self.origin = origin.normalized();
        self.placement = OriginPlacement::CartographicOrigin;
        self.commit(GeoreferenceChange::Origin);
    }

    /// Set the origin to an ECEF point, converting through the ellipsoid.
    ///
    /// Points too close to the ellipsoid center cannot be decomposed; the
    /// call is logged and ignored.
    pub fn set_origin_ecef(&mut self, ecef: DVec3) {
        match self.ellipsoid.ecef_to_cartographic(ecef) {
            Some(carto) => self.set_origin_cartographic(carto),
            None => {
                warn!(?ecef, "origin too close to ellipsoid center, ignoring");
            }
        }
    }

    /// Supply the bounding-volume center used by `BoundingVolumeOrigin`.
    pub fn set_bounding_volume_origin(&mut self, ecef: DVec3) {
        self.bounding_volume_origin = Some(ecef);
        if self.placement == OriginPlacement::BoundingVolumeOrigin {
            self.commit(GeoreferenceChange::Origin);
        } else {
            debug!(?ecef, "stored bounding-volume origin for later use");
        }
    }

    /// Change the placement mode.
    pub fn set_placement(&mut self, placement: OriginPlacement) {
        if placement == OriginPlacement::BoundingVolumeOrigin
            && self.bounding_volume_origin.is_none()
        {
            warn!("no bounding-volume origin supplied yet, falling back to cartographic origin");
        }
        self.placement = placement;
        self.commit(GeoreferenceChange::Placement);
    }

    /// Set the world scale, clamped to [`MIN_SCALE`].
    pub fn set_scale(&mut self, scale: f64) {
        let clamped = if scale < MIN_SCALE {
            warn!(requested = scale, clamped = MIN_SCALE, "world scale clamped");
            MIN_SCALE
        } else {
            scale
        };
        self.scale = clamped;
        self.commit(GeoreferenceChange::Scale);
    }

    /// Replace the ellipsoid.
    pub fn set_ellipsoid(&mut self, ellipsoid: Ellipsoid) {
        self.ellipsoid = ellipsoid;
        self.commit(GeoreferenceChange::Ellipsoid);
    }

    /// Convert (longitude degrees, latitude degrees, height meters) to ECEF.
    pub fn transform_longitude_latitude_height_to_ecef(&self, llh: DVec3) -> DVec3 {
        self.ellipsoid
            .cartographic_to_ecef(Cartographic::from_degrees(llh.x, llh.y, llh.z))
    }

    /// Convert ECEF to (longitude degrees, latitude degrees, height meters).
    pub fn transform_ecef_to_longitude_latitude_height(&self, ecef: DVec3) -> Option<DVec3> {
        self.ellipsoid.ecef_to_cartographic(ecef).map(|carto| {
            DVec3::new(
                carto.longitude_degrees(),
                carto.latitude_degrees(),
                carto.height,
            )
        })
    }

    /// Transform an ECEF position into the world frame.
    pub fn ecef_to_world_position(&self, ecef: DVec3) -> DVec3 {
        self.world_frame.ecef_to_local_position(ecef)
    }

    /// Transform a world-frame position into ECEF.
    pub fn world_to_ecef_position(&self, world: DVec3) -> DVec3 {
        self.world_frame.local_to_ecef_position(world)
    }

    /// Subscribe to update events. See
    /// [`GeoreferenceEvents`](crate::core::coordinates::events::GeoreferenceEvents).
    pub fn subscribe(&mut self) -> SubscriptionId {
        self.events.subscribe()
    }

    /// Release a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.events.unsubscribe(id);
    }

    /// Drain events recorded since this subscriber's cursor.
    pub fn poll_events(&mut self, id: SubscriptionId) -> Vec<GeoreferenceEvent> {
        self.events.poll(id)
    }

    fn commit(&mut self, change: GeoreferenceChange) {
        self.recompute();
        self.revision += 1;
        self.events.push(GeoreferenceEvent {
            revision: self.revision,
            change,
        });
        debug!(revision = self.revision, ?change, "georeference updated");
    }

    fn recompute(&mut self) {
        match self.placement {
            OriginPlacement::TrueOrigin => {
                self.georeferenced_frame = LocalHorizontalCoordinateSystem::ecef_aligned();
                self.world_frame =
                    LocalHorizontalCoordinateSystem::unaligned_at_center(self.scale);
            }
            OriginPlacement::BoundingVolumeOrigin | OriginPlacement::CartographicOrigin => {
                let center = self.resolved_origin_ecef();
                self.georeferenced_frame = LocalHorizontalCoordinateSystem::from_ecef(
                    center,
                    FrameAxes::EastNorthUp,
                    1.0,
                    &self.ellipsoid,
                );
                self.world_frame = LocalHorizontalCoordinateSystem::from_ecef(
                    center,
                    FrameAxes::EastSouthUp,
                    self.scale,
                    &self.ellipsoid,
                );
            }
        }
    }

    /// ECEF point the frames are anchored at under the current placement.
    fn resolved_origin_ecef(&self) -> DVec3 {
        match self.placement {
            OriginPlacement::TrueOrigin => DVec3::ZERO,
            OriginPlacement::BoundingVolumeOrigin => match self.bounding_volume_origin {
                Some(center) => center,
                None => self.ellipsoid.cartographic_to_ecef(self.origin),
            },
            OriginPlacement::CartographicOrigin => {
                self.ellipsoid.cartographic_to_ecef(self.origin)
            }
        }
    }
}

/// Identifier of a scene; the key for georeference lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub String);

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Deterministic scene-keyed lookup for georeferences.
///
/// Exactly one georeference exists per scene id; `get_or_create` is the
/// single entry point for resolving one.
#[derive(Default)]
pub struct GeoreferenceRegistry {
    scenes: HashMap<SceneId, Georeference>,
}

impl GeoreferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the scene's georeference, creating a default one on first
    /// use.
    pub fn get_or_create(&mut self, id: &SceneId) -> &mut Georeference {
        self.scenes.entry(id.clone()).or_insert_with(|| {
            info!(scene = %id.0, "creating default georeference");
            Georeference::new()
        })
    }

    pub fn get(&self, id: &SceneId) -> Option<&Georeference> {
        self.scenes.get(id)
    }

    pub fn get_mut(&mut self, id: &SceneId) -> Option<&mut Georeference> {
        self.scenes.get_mut(id)
    }

    /// Drop a scene's georeference (scene teardown).
    pub fn remove(&mut self, id: &SceneId) -> Option<Georeference> {
        self.scenes.remove(id)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
