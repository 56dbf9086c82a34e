//! Scene persistence

pub mod scene;

pub use scene::{GeoreferenceState, Scene, SceneError, SerializedAnchor};
