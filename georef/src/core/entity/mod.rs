//! Entity storage for anchored objects

pub mod components;
pub mod world;

pub use components::{Name, RenderTransform, TrackedView};
pub use world::{
    sync_anchors_system, tracked_view_ecef, update_transform_from_host, World,
};
