//! # Caruti
//!
//! **A small forward renderer for working through real-time graphics techniques.**
//!
//! Caruti gives you a fly-through camera, lit and textured meshes, model
//! loading, directional and point lights, shadow mapping, instancing, a
//! skybox with reflective and refractive surfaces, alpha-blended glass and
//! offscreen render targets. Each demo is a [`Scene`]: build the
//! resources once, then update and render every frame.
//!
//! ## Quick Start
//!
//! ```no_run
//! use caruti::*;
//!
//! fn main() {
//!     logging::init();
//!     let result = run(AppConfig::default(), |gpu, dirs| {
//!         Box::new(WoodFloorScene::new(gpu, dirs))
//!     });
//!     if let Err(err) = result {
//!         log::error!("{err}");
//!     }
//! }
//! ```
//!
//! ## Layout
//!
//! - **Core** ([`Camera`], [`Transform`], [`Shader`], [`Texture`], [`Mesh`]) wraps the GPU
//!   objects a scene draws with.
//! - **Assets** ([`Model`], [`ResourceDirs`]) resolve and load files under the resource root.
//! - **Techniques** ([`ShadowMap`], [`InstanceBuffer`], [`Skybox`], [`RenderTarget`]) are the
//!   building blocks the demo scenes combine.

mod app;
mod assets;
mod camera;
mod entity;
mod error;
mod gpu;
mod input;
mod instance;
mod light;
pub mod logging;
mod mesh;
mod model;
mod primitives;
mod render_target;
mod scatter;
pub mod scene;
mod shader;
mod shadow;
mod skybox;
mod texture;
mod uniform;

pub use app::{AppConfig, SceneFactory, run};
pub use assets::ResourceDirs;
pub use camera::{Camera, CameraMovement};
pub use entity::{Entity, Renderable, Transform};
pub use error::{Error, Result};
pub use gpu::{DEPTH_FORMAT, GpuContext};
pub use input::Input;
pub use instance::{InstanceBuffer, InstanceRaw};
pub use light::{Attenuation, DirectionalLight, LightColor, PointLight};
pub use mesh::{Mesh, RawMesh, Vertex3d};
pub use model::{
    MaterialTexture, MaterialTextureKind, MeshData, Model, ModelData, ModelEntity, TextureCache,
    TextureSource, load_model_data,
};
pub use primitives::{LightCube, PrimitiveMeshes};
pub use render_target::{DepthDebugQuad, RenderTarget, ScreenEffect, ScreenQuad, SurfaceDepth};
pub use scatter::{AsteroidRing, XzRect, back_to_front, scatter_xz};
pub use scene::{
    AsteroidFieldScene, DenseGrassScene, EnvironmentMappingScene, FrameContext, Scene,
    SponzaScene, TransparentWindowsScene, WoodFloorScene,
};
pub use shader::{DepthOptions, PipelineOptions, Shader, VertexInput};
pub use shadow::{SHADOW_HEIGHT, SHADOW_WIDTH, ShadowMap, ShadowProjection};
pub use skybox::Skybox;
pub use texture::{Texture, TextureKind, TextureOptions};
pub use uniform::{ShaderLayout, UniformSlot, UniformType, UniformValue};

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
