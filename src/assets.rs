//! Resource directory layout.
//!
//! Demos refer to assets by short names (`"lit.vert"`, `"wood/diffuse.jpg"`,
//! `"sponza/sponza.obj"`); [`ResourceDirs`] turns those into paths under a
//! single root laid out as `shaders/`, `textures/` and `models/`.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default resource root, relative to the working directory.
pub const DEFAULT_RESOURCE_ROOT: &str = "resources";

/// Resolves asset names to files under a resource root.
#[derive(Clone, Debug)]
pub struct ResourceDirs {
    root: PathBuf,
}

impl Default for ResourceDirs {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_ROOT)
    }
}

impl ResourceDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/shaders/<name>`
    pub fn shader(&self, name: &str) -> PathBuf {
        self.root.join("shaders").join(name)
    }

    /// `<root>/textures/<name>`
    pub fn texture(&self, name: &str) -> PathBuf {
        self.root.join("textures").join(name)
    }

    /// `<root>/models/<name>`
    pub fn model(&self, name: &str) -> PathBuf {
        self.root.join("models").join(name)
    }

    /// Six cubemap faces `<dir>/{right,left,top,bottom,front,back}.<ext>`
    /// under the texture directory, in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn cubemap_faces(&self, dir: &str, ext: &str) -> [PathBuf; 6] {
        ["right", "left", "top", "bottom", "front", "back"]
            .map(|face| self.texture(&format!("{dir}/{face}.{ext}")))
    }
}

/// Read a UTF-8 text asset (shader source) in full.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_grouped_by_kind() {
        let dirs = ResourceDirs::new("assets");
        assert_eq!(dirs.shader("lit.vert"), Path::new("assets/shaders/lit.vert"));
        assert_eq!(
            dirs.texture("wood/diffuse.jpg"),
            Path::new("assets/textures/wood/diffuse.jpg")
        );
        assert_eq!(
            dirs.model("rock/rock.obj"),
            Path::new("assets/models/rock/rock.obj")
        );
    }

    #[test]
    fn cubemap_faces_follow_layer_order() {
        let faces = ResourceDirs::default().cubemap_faces("skybox", "jpg");
        assert_eq!(faces[0], Path::new("resources/textures/skybox/right.jpg"));
        assert_eq!(faces[3], Path::new("resources/textures/skybox/bottom.jpg"));
        assert_eq!(faces[5], Path::new("resources/textures/skybox/back.jpg"));
    }

    #[test]
    fn missing_text_asset_is_an_io_error() {
        let err = read_text(Path::new("definitely/not/here.wgsl")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
