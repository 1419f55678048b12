//! Crate-wide error type.
//!
//! Loaders come in pairs: a `try_*` constructor that returns [`Result`] and a
//! plain constructor that logs the [`Error`] and hands back a degraded but
//! usable object, so a missing asset shows up as a black texture or a skipped
//! draw instead of taking the whole demo down.

use std::path::PathBuf;

/// Everything that can go wrong while bringing up the GPU or loading assets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse OBJ model: {0}")]
    Obj(#[from] tobj::LoadError),

    #[error("failed to import glTF model: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("unsupported model format: {0}")]
    UnsupportedModel(PathBuf),

    #[error("shader `{label}` failed to compile:\n{message}")]
    Shader { label: String, message: String },

    #[error("failed to create window surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Shorthand for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = Error::io(
            "resources/shaders/missing.vert",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        let text = err.to_string();
        assert!(text.contains("resources/shaders/missing.vert"));
        assert!(text.contains("not found"));
    }

    #[test]
    fn shader_error_keeps_compiler_log() {
        let err = Error::Shader {
            label: "lit".into(),
            message: "unknown identifier `colour`".into(),
        };
        assert!(err.to_string().contains("unknown identifier"));
    }
}
