//! Render-to-texture post-processing.
//!
//! Each frame the caller's scene is drawn into an offscreen target, then a
//! single oversized triangle samples that target through the composite shader
//! onto the visible framebuffer.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tracing::debug;

use crate::error::RenderError;
use crate::host::{physical_size, HostRenderer, RenderTarget, RenderTargetDescriptor, TextureId};
use crate::params::{ControlSurface, Tunable};
use crate::particles::MeshId;
use crate::scene::{Camera, Scene};
use crate::shader::ShaderSource;

pub const DEFAULT_NOISE_SPEED: f32 = 0.18;
pub const DEFAULT_NOISE_AMOUNT: f32 = 0.35;

const COMPOSITE_ATTRIBUTES: [&str; 1] = ["position"];
const COMPOSITE_UNIFORMS: [&str; 5] = [
    "textureMap",
    "resolution",
    "time",
    "noiseSpeed",
    "noiseAmount",
];

/// One triangle covering clip space `[-1, 1]²`, so no diagonal seam exists.
#[derive(Clone, Debug, PartialEq)]
pub struct FullScreenQuad {
    positions: [f32; 9],
    indices: [u16; 3],
    model: Mat4,
}

impl FullScreenQuad {
    pub const POSITIONS: [f32; 9] = [-1.0, -1.0, 0.0, -1.0, 3.0, 0.0, 3.0, -1.0, 0.0];
    pub const INDICES: [u16; 3] = [0, 2, 1];

    pub fn new() -> Self {
        Self {
            positions: Self::POSITIONS,
            indices: Self::INDICES,
            model: Mat4::IDENTITY,
        }
    }

    pub fn positions(&self) -> &[f32; 9] {
        &self.positions
    }

    pub fn indices(&self) -> &[u16; 3] {
        &self.indices
    }

    /// Static model matrix; the quad never moves.
    pub fn model(&self) -> Mat4 {
        self.model
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Index data padded to a four-byte multiple for buffer upload.
    pub fn index_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..6].copy_from_slice(bytemuck::cast_slice(&self.indices));
        bytes
    }
}

impl Default for FullScreenQuad {
    fn default() -> Self {
        Self::new()
    }
}

/// Values fed to the composite shaders.
#[derive(Clone, Debug)]
pub struct CompositeUniforms {
    pub texture_map: TextureId,
    pub resolution: [f32; 2],
    pub time: f32,
    pub noise_speed: Tunable,
    pub noise_amount: Tunable,
}

/// std140 mirror of `CompositeParams` in the composite shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CompositeBlock {
    pub projection: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub time: f32,
    pub noise_speed: f32,
    pub noise_amount: f32,
    pub padding: [f32; 3],
}

impl CompositeUniforms {
    pub fn block(&self, projection: Mat4) -> CompositeBlock {
        CompositeBlock {
            projection: projection.to_cols_array_2d(),
            resolution: self.resolution,
            time: self.time,
            noise_speed: self.noise_speed.get(),
            noise_amount: self.noise_amount.get(),
            padding: [0.0; 3],
        }
    }
}

/// The full-screen triangle together with its composite material.
pub struct CompositeQuad {
    id: MeshId,
    geometry: FullScreenQuad,
    uniforms: CompositeUniforms,
    shaders: ShaderSource,
}

impl CompositeQuad {
    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn geometry(&self) -> &FullScreenQuad {
        &self.geometry
    }

    pub fn uniforms(&self) -> &CompositeUniforms {
        &self.uniforms
    }

    pub fn shaders(&self) -> &ShaderSource {
        &self.shaders
    }
}

/// Owns the offscreen target and the composite pass.
///
/// Construction leaves the compositor ready; `resize` and `render` keep it
/// ready. `time` only grows until the compositor is rebuilt.
pub struct OffscreenCompositor {
    target: RenderTarget,
    quad: CompositeQuad,
    camera: Camera,
}

impl OffscreenCompositor {
    /// Allocates a `width`x`height` (logical pixels) target using the bundled
    /// composite shaders.
    pub fn new<R>(renderer: &mut R, width: u32, height: u32) -> Result<Self, RenderError>
    where
        R: HostRenderer + ?Sized,
    {
        Self::with_shaders(renderer, width, height, ShaderSource::composite())
    }

    pub fn with_shaders<R>(
        renderer: &mut R,
        width: u32,
        height: u32,
        shaders: ShaderSource,
    ) -> Result<Self, RenderError>
    where
        R: HostRenderer + ?Sized,
    {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        shaders.require(&COMPOSITE_ATTRIBUTES, &COMPOSITE_UNIFORMS)?;

        let pixel_ratio = renderer.pixel_ratio();
        let (pixel_width, pixel_height) = physical_size(width, height, pixel_ratio);
        let target =
            renderer.create_render_target(&RenderTargetDescriptor::new(pixel_width, pixel_height))?;
        debug!(
            width = target.width(),
            height = target.height(),
            pixel_ratio,
            "allocated post-processing target"
        );

        let uniforms = CompositeUniforms {
            texture_map: target.texture(),
            resolution: [target.width() as f32, target.height() as f32],
            time: 0.0,
            noise_speed: Tunable::new(DEFAULT_NOISE_SPEED, 0.0, 1.0),
            noise_amount: Tunable::new(DEFAULT_NOISE_AMOUNT, 0.0, 1.0),
        };

        Ok(Self {
            target,
            quad: CompositeQuad {
                id: MeshId::allocate(),
                geometry: FullScreenQuad::new(),
                uniforms,
                shaders,
            },
            camera: Camera::orthographic(-1.0, 1.0, 1.0, -1.0, 0.0, 1.0),
        })
    }

    /// Reallocates the target for a new logical size at the renderer's current
    /// pixel ratio. A zero dimension (minimised window) is ignored.
    pub fn resize<R>(&mut self, renderer: &mut R, width: u32, height: u32) -> Result<(), RenderError>
    where
        R: HostRenderer + ?Sized,
    {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let (pixel_width, pixel_height) = physical_size(width, height, renderer.pixel_ratio());
        if self.target.size() != (pixel_width, pixel_height) {
            renderer.resize_render_target(&mut self.target, pixel_width, pixel_height)?;
            debug!(
                width = pixel_width,
                height = pixel_height,
                "resized post-processing target"
            );
        }
        self.quad.uniforms.resolution = [pixel_width as f32, pixel_height as f32];
        Ok(())
    }

    /// Draws `scene` into the offscreen target, then composites it onto the
    /// visible framebuffer.
    pub fn render<R>(
        &mut self,
        renderer: &mut R,
        scene: &Scene<'_>,
        camera: &Camera,
        delta_seconds: f32,
    ) -> Result<(), RenderError>
    where
        R: HostRenderer + ?Sized,
    {
        renderer.set_render_target(Some(&self.target));
        let captured = renderer.render(scene, camera);
        renderer.set_render_target(None);
        captured?;

        // Frames that never reach the composite pass do not advance the clock.
        self.quad.uniforms.time += delta_seconds;

        let composite = Scene::new().with(&self.quad);
        renderer.render(&composite, &self.camera)
    }

    /// Exposes `noiseAmount` and `noiseSpeed`.
    pub fn publish(&self, surface: &mut dyn ControlSurface) {
        let uniforms = &self.quad.uniforms;
        surface.publish("noiseAmount", uniforms.noise_amount.clone());
        surface.publish("noiseSpeed", uniforms.noise_speed.clone());
    }

    /// The offscreen target; after `render` it holds the latest scene frame.
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn quad(&self) -> &CompositeQuad {
        &self.quad
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn time(&self) -> f32 {
        self.quad.uniforms.time
    }

    pub fn resolution(&self) -> [f32; 2] {
        self.quad.uniforms.resolution
    }

    pub fn noise_speed(&self) -> &Tunable {
        &self.quad.uniforms.noise_speed
    }

    pub fn noise_amount(&self) -> &Tunable {
        &self.quad.uniforms.noise_amount
    }
}
