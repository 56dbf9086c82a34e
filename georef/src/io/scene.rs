//! Scene serialization and loading
//!
//! A scene file persists the georeference state, the registered sub-levels,
//! and every anchored entity's authoritative ECEF transform. On load the
//! georeference is reconstructed through its setters, which unconditionally
//! recompute the coordinate-system cache before any anchor is restored
//! against it.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use glam::DMat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core::coordinates::anchor::GlobeAnchor;
use crate::core::coordinates::georeference::{Georeference, OriginPlacement};
use crate::core::ellipsoid::{Cartographic, Ellipsoid};
use crate::core::entity::components::{Name, RenderTransform, TrackedView};
use crate::core::entity::World;
use crate::sublevels::{LevelStreaming, SubLevel, SubLevelSwitcher};

/// Errors that can occur during scene operations
#[derive(Debug, Error)]
pub enum SceneError {
    /// IO error when reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The document parsed but describes an invalid scene
    #[error("invalid scene: {0}")]
    Validation(String),
}

/// Persisted georeference state. Angles are radians, radii meters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoreferenceState {
    pub placement: OriginPlacement,
    pub origin: Cartographic,
    pub scale: f64,
    pub ellipsoid_radii: [f64; 3],
}

/// A single anchored entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedAnchor {
    pub name: String,
    /// Authoritative anchor-to-ECEF transform.
    pub anchor_to_ecef: DMat4,
    pub adjust_orientation_to_surface: bool,
    /// Whether this entity drives the origin-shift policy.
    pub tracked_view: bool,
}

/// Scene document: georeference, sub-levels, and anchored entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub georeference: GeoreferenceState,
    pub sub_levels: Vec<SubLevel>,
    pub anchors: Vec<SerializedAnchor>,
}

impl Scene {
    /// Capture the current state of a world and its scene-level policy
    /// objects.
    pub fn from_world(
        world: &World,
        georeference: &Georeference,
        switcher: &SubLevelSwitcher,
    ) -> Self {
        let mut anchors = Vec::new();

        for (entity, (name, anchor)) in world.query::<(&Name, &GlobeAnchor)>().iter() {
            if !anchor.is_anchored() {
                warn!(?entity, name = %name.0, "skipping unanchored entity");
                continue;
            }
            anchors.push(SerializedAnchor {
                name: name.0.clone(),
                anchor_to_ecef: anchor.ecef_transform(),
                adjust_orientation_to_surface: anchor.adjusts_orientation_to_surface(),
                tracked_view: world.get::<TrackedView>(entity).is_ok(),
            });
        }

        let radii = georeference.ellipsoid().radii();
        Self {
            georeference: GeoreferenceState {
                placement: georeference.placement(),
                origin: georeference.origin(),
                scale: georeference.scale(),
                ellipsoid_radii: [radii.x, radii.y, radii.z],
            },
            sub_levels: switcher.levels().to_vec(),
            anchors,
        }
    }

    /// Save to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SceneError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        info!(path = ?path.as_ref(), anchors = self.anchors.len(), "scene saved");
        Ok(())
    }

    /// Load and validate a JSON scene file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let json = fs::read_to_string(path.as_ref())?;
        let scene: Scene = serde_json::from_str(&json)?;
        scene.validate()?;
        info!(path = ?path.as_ref(), anchors = scene.anchors.len(), "scene loaded");
        Ok(scene)
    }

    /// Structural validation of a parsed document.
    pub fn validate(&self) -> Result<(), SceneError> {
        let [x, y, z] = self.georeference.ellipsoid_radii;
        if !(x > 0.0 && y > 0.0 && z > 0.0) {
            return Err(SceneError::Validation(format!(
                "ellipsoid radii must be positive, got ({x}, {y}, {z})"
            )));
        }

        let mut seen = HashSet::new();
        for level in &self.sub_levels {
            if !seen.insert(level.id) {
                return Err(SceneError::Validation(format!(
                    "duplicate sub-level id {:?}",
                    level.id
                )));
            }
            if level.load_radius < 0.0 {
                return Err(SceneError::Validation(format!(
                    "sub-level {:?} has negative load radius",
                    level.id
                )));
            }
        }

        Ok(())
    }

    /// Instantiate into a world.
    ///
    /// Reconstructs the georeference first; every setter recomputes the
    /// coordinate-system cache, so it is fully consistent before any anchor
    /// or sub-level reads it.
    pub fn instantiate(
        &self,
        world: &mut World,
        host: &dyn LevelStreaming,
    ) -> Result<(Georeference, SubLevelSwitcher), SceneError> {
        self.validate()?;

        let [x, y, z] = self.georeference.ellipsoid_radii;
        let mut georeference = Georeference::new();
        georeference.set_ellipsoid(Ellipsoid::new(x, y, z));
        georeference.set_origin_cartographic(self.georeference.origin);
        georeference.set_placement(self.georeference.placement);
        georeference.set_scale(self.georeference.scale);

        let mut switcher = SubLevelSwitcher::new();
        for level in &self.sub_levels {
            switcher.register_sub_level(level.clone(), host);
        }

        for serialized in &self.anchors {
            let mut anchor = GlobeAnchor::new(serialized.adjust_orientation_to_surface);
            anchor.set_from_ecef(serialized.anchor_to_ecef, &georeference);
            let render = RenderTransform {
                matrix: anchor.local_transform().as_mat4(),
            };

            let entity = world.spawn((Name(serialized.name.clone()), anchor, render));
            if serialized.tracked_view {
                // Last tracked entry wins; the marker is unique.
                let _ = world.set_tracked_view(entity);
            }
        }

        Ok((georeference, switcher))
    }
}
