//! Georeferencing core for streamed planet-scale rendering
//!
//! This crate keeps objects positioned correctly on an ellipsoid inside a
//! host engine that renders with single-precision, locally-originated world
//! coordinates. It provides the coordinate math (ECEF, cartographic, local
//! tangent frames), the per-scene georeference with its cached transforms,
//! per-object globe anchors, sub-level arbitration, and the origin-shift
//! policy.

pub mod config;
pub mod core;
pub mod io;
pub mod sublevels;

// Re-export commonly used types
pub mod prelude {
    // Coordinate math
    pub use crate::core::coordinates::{
        FrameAxes, FreshSource, Georeference, GeoreferenceRegistry, GlobeAnchor,
        LocalHorizontalCoordinateSystem, OriginPlacement, OriginShift, OriginShiftMode, SceneId,
        TransformKind, MIN_SCALE,
    };

    // Ellipsoid model
    pub use crate::core::ellipsoid::{Cartographic, Ellipsoid};

    // Entity system types
    pub use crate::core::entity::{
        sync_anchors_system, tracked_view_ecef, update_transform_from_host, Name,
        RenderTransform, TrackedView, World,
    };

    // Sub-level arbitration
    pub use crate::sublevels::{
        InstantLevelStreaming, LevelStreaming, SubLevel, SubLevelId, SubLevelState,
        SubLevelSwitcher, TransitionStep,
    };

    // IO types
    pub use crate::io::{Scene, SceneError};

    // Config types
    pub use crate::config::SceneConfig;

    // Math types
    pub use glam::{DMat3, DMat4, DQuat, DVec3, Mat4, Quat, Vec3};
}

/// Initialize logging for the library
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
