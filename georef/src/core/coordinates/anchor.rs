//! Globe anchor: per-object ECEF/local transform synchronization
//!
//! An anchor keeps an authoritative anchor-to-ECEF transform together with
//! a derived anchor-to-local transform valid against a specific georeference
//! revision. The fresh side is tracked explicitly: after every mutation
//! exactly one representation was written from outside and the other has
//! just been re-derived, so the two can never silently diverge.

use glam::{DMat4, DQuat, DVec3};
use tracing::warn;

use crate::core::coordinates::georeference::{Georeference, TransformKind};

/// Position deltas below this (squared meters) do not count as movement for
/// orientation adjustment.
const MOVEMENT_EPSILON_SQUARED: f64 = 1e-12;

/// Which representation was last written from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshSource {
    Ecef,
    Local,
}

#[derive(Debug, Clone, Copy)]
struct AnchorInner {
    fresh: FreshSource,
    anchor_to_ecef: DMat4,
    anchor_to_local: DMat4,
    /// Georeference revision `anchor_to_local` was derived against.
    seen_revision: u64,
}

/// Per-object anchor state machine: Unanchored until the first move, then
/// anchored with both representations kept consistent.
#[derive(Debug, Clone)]
pub struct GlobeAnchor {
    adjust_orientation_to_surface: bool,
    inner: Option<AnchorInner>,
}

impl Default for GlobeAnchor {
    fn default() -> Self {
        Self::new(false)
    }
}

impl GlobeAnchor {
    /// A new, unanchored anchor.
    pub fn new(adjust_orientation_to_surface: bool) -> Self {
        Self {
            adjust_orientation_to_surface,
            inner: None,
        }
    }

    /// Whether an authoritative transform has been established.
    pub fn is_anchored(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether moves re-align orientation to the surface normal.
    pub fn adjusts_orientation_to_surface(&self) -> bool {
        self.adjust_orientation_to_surface
    }

    pub fn set_adjust_orientation_to_surface(&mut self, adjust: bool) {
        self.adjust_orientation_to_surface = adjust;
    }

    /// Which side was last written, or `None` when unanchored.
    pub fn fresh_source(&self) -> Option<FreshSource> {
        self.inner.map(|inner| inner.fresh)
    }

    /// Whether the derived local transform matches the georeference's
    /// current revision.
    pub fn is_synchronized_with(&self, georeference: &Georeference) -> bool {
        self.inner
            .map(|inner| inner.seen_revision == georeference.revision())
            .unwrap_or(false)
    }

    /// Anchor (or re-anchor) from an ECEF transform. The local side is
    /// re-derived against the current georeference.
    pub fn set_from_ecef(&mut self, anchor_to_ecef: DMat4, georeference: &Georeference) {
        let adjusted = self.adjust_orientation(anchor_to_ecef, georeference);
        self.store_ecef(adjusted, FreshSource::Ecef, georeference);
    }

    /// Anchor (or re-anchor) from a local transform in the georeference's
    /// world frame. The ECEF side becomes authoritative via the current
    /// coordinate system.
    pub fn set_from_local_transform(&mut self, anchor_to_local: DMat4, georeference: &Georeference) {
        let anchor_to_ecef = georeference.transform(TransformKind::WorldToEcef) * anchor_to_local;
        let adjusted = self.adjust_orientation(anchor_to_ecef, georeference);
        self.store_ecef(adjusted, FreshSource::Local, georeference);
    }

    /// Re-derive the local transform from the existing ECEF transform after
    /// a georeference change.
    ///
    /// Never applies orientation adjustment: the anchor did not move, only
    /// the frame it is expressed in.
    pub fn reconcile(&mut self, georeference: &Georeference) {
        let Some(inner) = &mut self.inner else {
            return;
        };
        if inner.seen_revision == georeference.revision() {
            return;
        }
        inner.anchor_to_local =
            georeference.transform(TransformKind::EcefToWorld) * inner.anchor_to_ecef;
        inner.seen_revision = georeference.revision();
        inner.fresh = FreshSource::Ecef;
    }

    /// The authoritative anchor-to-ECEF transform.
    ///
    /// Identity sentinel (with a warning) while unanchored.
    pub fn ecef_transform(&self) -> DMat4 {
        match &self.inner {
            Some(inner) => inner.anchor_to_ecef,
            None => {
                warn!("ECEF transform requested from an unanchored globe anchor");
                DMat4::IDENTITY
            }
        }
    }

    /// The derived anchor-to-local transform, valid for the revision it was
    /// last reconciled against.
    ///
    /// Identity sentinel (with a warning) while unanchored.
    pub fn local_transform(&self) -> DMat4 {
        match &self.inner {
            Some(inner) => inner.anchor_to_local,
            None => {
                warn!("local transform requested from an unanchored globe anchor");
                DMat4::IDENTITY
            }
        }
    }

    /// ECEF position of the anchor, if anchored.
    pub fn ecef_position(&self) -> Option<DVec3> {
        self.inner.map(|inner| inner.anchor_to_ecef.w_axis.truncate())
    }

    fn store_ecef(&mut self, anchor_to_ecef: DMat4, fresh: FreshSource, georeference: &Georeference) {
        let anchor_to_local =
            georeference.transform(TransformKind::EcefToWorld) * anchor_to_ecef;
        self.inner = Some(AnchorInner {
            fresh,
            anchor_to_ecef,
            anchor_to_local,
            seen_revision: georeference.revision(),
        });
    }

    /// Rotate the transform by the delta between the old and new surface
    /// normals, translation held fixed. Applies only when the flag is set,
    /// a previous anchor existed, and the position actually moved.
    fn adjust_orientation(&self, new_ecef: DMat4, georeference: &Georeference) -> DMat4 {
        if !self.adjust_orientation_to_surface {
            return new_ecef;
        }
        let Some(inner) = &self.inner else {
            return new_ecef;
        };

        let old_position = inner.anchor_to_ecef.w_axis.truncate();
        let new_position = new_ecef.w_axis.truncate();
        if old_position.distance_squared(new_position) < MOVEMENT_EPSILON_SQUARED {
            return new_ecef;
        }

        let ellipsoid = georeference.ellipsoid();
        let old_normal = ellipsoid.geodetic_surface_normal(old_position);
        let new_normal = ellipsoid.geodetic_surface_normal(new_position);
        if !old_normal.is_finite() || !new_normal.is_finite() {
            warn!("surface normal undefined, skipping orientation adjustment");
            return new_ecef;
        }

        let delta = DQuat::from_rotation_arc(old_normal, new_normal);
        let (scale, rotation, translation) = new_ecef.to_scale_rotation_translation();
        DMat4::from_scale_rotation_translation(scale, delta * rotation, translation)
    }
}
