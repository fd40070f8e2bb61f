//! `wgpu` implementation of [`crate::host::HostRenderer`].

mod compile;
mod context;
mod pipeline;
mod renderer;
mod textures;

pub use context::GpuOptions;
pub use renderer::WgpuRenderer;
