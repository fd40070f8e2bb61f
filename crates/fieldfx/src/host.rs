//! The seam between the pipelines in this crate and whatever actually talks to
//! the GPU.
//!
//! Pipelines only ever hold [`TextureId`]s and plain [`RenderTarget`]
//! descriptions; the [`HostRenderer`] owns the real textures. The `wgpu`
//! implementation lives in [`crate::gpu`], tests use recording doubles.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::RenderError;
use crate::scene::{Camera, Scene};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a texture owned by a [`HostRenderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    /// Allocates a process-unique id. Renderers call this when they create a texture.
    pub fn allocate() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling policy attached to a render target's color texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetFilters {
    pub min: FilterMode,
    pub mag: FilterMode,
}

impl Default for TargetFilters {
    /// Linear minification, nearest magnification.
    fn default() -> Self {
        Self {
            min: FilterMode::Linear,
            mag: FilterMode::Nearest,
        }
    }
}

/// Parameters for [`HostRenderer::create_render_target`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTargetDescriptor {
    pub width: u32,
    pub height: u32,
    pub filters: TargetFilters,
    pub stencil: bool,
}

impl RenderTargetDescriptor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filters: TargetFilters::default(),
            stencil: false,
        }
    }
}

/// An offscreen color buffer that can be drawn into and sampled afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTarget {
    texture: TextureId,
    width: u32,
    height: u32,
    filters: TargetFilters,
}

impl RenderTarget {
    /// Describes a target whose color texture is `texture`. Only renderers
    /// should call this; everyone else goes through
    /// [`HostRenderer::create_render_target`].
    pub fn new(texture: TextureId, descriptor: &RenderTargetDescriptor) -> Self {
        Self {
            texture,
            width: descriptor.width,
            height: descriptor.height,
            filters: descriptor.filters,
        }
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn filters(&self) -> TargetFilters {
        self.filters
    }

    /// Records the new dimensions after the renderer reallocated the texture.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

/// What the pipelines need from the thing that owns the GPU.
///
/// Calls are strictly sequential: `render` draws into whatever target was last
/// selected with `set_render_target`, `None` meaning the visible framebuffer.
pub trait HostRenderer {
    /// Current device-to-logical pixel scale.
    fn pixel_ratio(&self) -> f32;

    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<RenderTarget, RenderError>;

    /// Reallocates `target` at `width`x`height` pixels, keeping its texture id.
    fn resize_render_target(
        &mut self,
        target: &mut RenderTarget,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError>;

    fn set_render_target(&mut self, target: Option<&RenderTarget>);

    fn render(&mut self, scene: &Scene<'_>, camera: &Camera) -> Result<(), RenderError>;
}

/// Scales logical dimensions to physical pixels, never returning zero.
pub fn physical_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |value: u32| ((value as f32 * pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filters_are_linear_min_nearest_mag() {
        let descriptor = RenderTargetDescriptor::new(4, 4);
        assert_eq!(descriptor.filters.min, FilterMode::Linear);
        assert_eq!(descriptor.filters.mag, FilterMode::Nearest);
        assert!(!descriptor.stencil);
    }

    #[test]
    fn physical_size_scales_and_rounds() {
        assert_eq!(physical_size(800, 600, 2.0), (1600, 1200));
        assert_eq!(physical_size(101, 33, 1.5), (152, 50));
        assert_eq!(physical_size(1, 1, 0.25), (1, 1));
    }

    #[test]
    fn texture_ids_are_unique() {
        let first = TextureId::allocate();
        let second = TextureId::allocate();
        assert_ne!(first, second);
    }
}
