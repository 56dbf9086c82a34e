//! Components for anchored entities

use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Display name of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

/// The transform handed to the host renderer.
///
/// This is the single point where double-precision anchor math is narrowed
/// to `f32`: the matrix is relative to the current floating origin, so the
/// values are small enough for single precision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderTransform {
    pub matrix: Mat4,
}

impl Default for RenderTransform {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }
}

/// Marker for the entity whose position drives the origin-shift policy
/// (the pawn or camera). At most one entity should carry it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackedView;
