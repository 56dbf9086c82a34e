//! Configuration types for scene storage

use std::path::PathBuf;
use tracing::debug;

/// Configuration for scene file paths
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Root directory for persisted data
    pub scene_root: PathBuf,
    /// Directory name for scenes (relative to scene_root)
    pub scenes_dir: String,
}

impl SceneConfig {
    /// Create a new SceneConfig with custom paths
    pub fn new(scene_root: PathBuf, scenes_dir: String) -> Self {
        debug!(
            scene_root = ?scene_root,
            scenes_dir = scenes_dir,
            "Creating new SceneConfig"
        );
        Self {
            scene_root,
            scenes_dir,
        }
    }

    /// Get the full path to a scene file
    pub fn scene_path(&self, name: &str) -> PathBuf {
        // Validate name to prevent path traversal attacks
        if name.contains("..") || name.contains("/") || name.contains("\\") {
            panic!("Invalid scene name: {name}");
        }
        let path = self
            .scene_root
            .join(&self.scenes_dir)
            .join(format!("{name}.json"));
        debug!(name = name, path = ?path, "Generated scene path");
        path
    }

    /// Check if the scene directory exists
    pub fn validate(&self) -> Result<(), std::io::Error> {
        let scenes_path = self.scene_root.join(&self.scenes_dir);

        if !self.scene_root.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Scene root directory not found: {:?}", self.scene_root),
            ));
        }

        if !scenes_path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Scenes directory not found: {scenes_path:?}"),
            ));
        }

        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            scene_root: PathBuf::from("assets"),
            scenes_dir: "scenes".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_config_path() {
        let config = SceneConfig {
            scene_root: PathBuf::from("app/assets"),
            scenes_dir: "scenes".to_string(),
        };

        let path = config.scene_path("test_scene");
        assert_eq!(path, PathBuf::from("app/assets/scenes/test_scene.json"));
    }

    #[test]
    #[should_panic(expected = "Invalid scene name: ../evil")]
    fn test_scene_config_rejects_path_traversal_parent() {
        let config = SceneConfig::default();
        config.scene_path("../evil");
    }

    #[test]
    #[should_panic(expected = "Invalid scene name: some/path/evil")]
    fn test_scene_config_rejects_path_traversal_slash() {
        let config = SceneConfig::default();
        config.scene_path("some/path/evil");
    }

    #[test]
    fn test_default_config() {
        let config = SceneConfig::default();
        assert_eq!(config.scene_root, PathBuf::from("assets"));
        assert_eq!(config.scenes_dir, "scenes");
    }
}
