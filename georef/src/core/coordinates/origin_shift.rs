//! Origin-shift policy
//!
//! Evaluated once per tick for the tracked view's ECEF position. Either
//! hands arbitration to the sub-level switcher (discrete regions), or
//! additionally rebases the georeference origin continuously when the
//! tracked view strays too far from it and no region claims it.

use glam::DVec3;
use tracing::debug;

use crate::core::coordinates::georeference::Georeference;
use crate::sublevels::{LevelStreaming, SubLevelId, SubLevelSwitcher};

/// How the floating origin follows the tracked view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OriginShiftMode {
    /// Leave the origin alone.
    Disabled,
    /// Only switch between registered sub-levels.
    SwitchSubLevelsOnly,
    /// Switch sub-levels, and rebase the origin continuously when outside
    /// all of them.
    RebaseOrigin,
}

/// Per-tick origin policy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OriginShift {
    pub mode: OriginShiftMode,
    /// Distance (meters) from the current origin beyond which `RebaseOrigin`
    /// moves it. Zero means "rebase every evaluation".
    pub distance_threshold: f64,
}

impl Default for OriginShift {
    fn default() -> Self {
        Self {
            mode: OriginShiftMode::Disabled,
            distance_threshold: 50_000.0,
        }
    }
}

impl OriginShift {
    pub fn new(mode: OriginShiftMode, distance_threshold: f64) -> Self {
        Self {
            mode,
            distance_threshold,
        }
    }

    /// Evaluate the policy for the tracked view's ECEF position.
    ///
    /// Returns whether the georeference origin changed.
    pub fn evaluate(
        &self,
        tracked_ecef: DVec3,
        georeference: &mut Georeference,
        switcher: &mut SubLevelSwitcher,
        host: &mut dyn LevelStreaming,
    ) -> bool {
        if self.mode == OriginShiftMode::Disabled {
            return false;
        }

        let revision_before = georeference.revision();

        let closest = closest_level_containing(tracked_ecef, switcher, georeference);
        switcher.set_target_sub_level(closest, georeference, host);

        if self.mode == OriginShiftMode::RebaseOrigin && closest.is_none() {
            let origin = georeference.coordinate_system().origin();
            let distance = tracked_ecef.distance(origin);
            if self.distance_threshold <= 0.0 || distance > self.distance_threshold {
                debug!(distance, "rebasing origin to tracked view");
                georeference.set_origin_ecef(tracked_ecef);
            }
        }

        georeference.revision() != revision_before
    }
}

/// The closest enabled region whose origin lies within its own load radius
/// of `tracked_ecef`. Ties break to the smallest distance.
fn closest_level_containing(
    tracked_ecef: DVec3,
    switcher: &SubLevelSwitcher,
    georeference: &Georeference,
) -> Option<SubLevelId> {
    let ellipsoid = georeference.ellipsoid();
    switcher
        .levels()
        .iter()
        .filter(|level| level.enabled)
        .filter_map(|level| {
            let origin = ellipsoid.cartographic_to_ecef(level.origin);
            let distance = tracked_ecef.distance(origin);
            (distance <= level.load_radius).then_some((level.id, distance))
        })
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(id, _)| id)
}
