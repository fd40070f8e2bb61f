//! Particle field rendering with a render-to-texture post-processing pass.
//!
//! The crate is split along one seam, [`host::HostRenderer`]:
//!
//! ```text
//!   ParticleFieldBuilder ──▶ ParticleField ──▶ ParticleMesh ─┐
//!                                                           ▼
//!   OffscreenCompositor::render ──▶ HostRenderer ──▶ offscreen target
//!                       │                  │
//!                       └─ CompositeQuad ──┴──▶ visible framebuffer
//! ```
//!
//! Everything above the seam is plain data and runs without a GPU; the
//! [`gpu::WgpuRenderer`] turns it into `wgpu` buffers, pipelines and passes.
//! Tunable values are shared [`params::Tunable`] handles, so a control surface
//! can change them between frames without going through the pipelines.

pub mod compositor;
pub mod error;
pub mod field;
pub mod gpu;
pub mod host;
pub mod normal_map;
pub mod params;
pub mod particles;
pub mod sampling;
pub mod scene;
pub mod shader;

pub use compositor::{CompositeQuad, FullScreenQuad, OffscreenCompositor};
pub use error::{FieldError, RenderError};
pub use field::{ParticleField, ParticleFieldBuilder};
pub use gpu::{GpuOptions, WgpuRenderer};
pub use host::{HostRenderer, RenderTarget, RenderTargetDescriptor, TextureId};
pub use params::{ControlSurface, ParamError, ParameterRegistry, Tunable};
pub use particles::{LightDirection, ParticleMesh, PARTICLE_SIZE};
pub use sampling::{PointSampler, SphereSurface};
pub use scene::{Camera, PerspectiveCamera, Scene, SceneObject};
pub use shader::ShaderSource;
pub use wgpu::SurfaceError;
