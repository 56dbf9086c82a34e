//! Globe coordinate system
//!
//! Keeps planet-scale positions in f64 while the host renders in f32 by
//! implementing a dual coordinate system:
//! - authoritative ECEF transforms for every anchored object
//! - a per-scene floating origin (the georeference) everything is derived
//!   against, moved by discrete sub-level switches or continuous rebasing
//!
//! All transform composition funnels through ECEF as the canonical frame,
//! and narrowing to f32 happens only when render transforms are produced.

pub mod anchor;
pub mod events;
pub mod georeference;
pub mod local_frame;
pub mod origin_shift;


pub use anchor::{FreshSource, GlobeAnchor};
pub use events::{GeoreferenceChange, GeoreferenceEvent, GeoreferenceEvents, SubscriptionId};
pub use georeference::{
    Georeference, GeoreferenceRegistry, OriginPlacement, SceneId, TransformKind, MIN_SCALE,
};
pub use local_frame::{east_north_up_to_ecef, FrameAxes, LocalHorizontalCoordinateSystem};
pub use origin_shift::{OriginShift, OriginShiftMode};
