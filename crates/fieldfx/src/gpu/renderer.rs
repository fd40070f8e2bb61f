use std::collections::HashMap;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use crate::compositor::{CompositeBlock, CompositeQuad};
use crate::error::{FieldError, RenderError};
use crate::host::{HostRenderer, RenderTarget, RenderTargetDescriptor, TextureId};
use crate::particles::{MeshId, ParticleBlock, ParticleMesh};
use crate::scene::{Camera, Scene, SceneObject};

use super::context::{GpuContext, GpuOptions};
use super::pipeline::{create_pipeline, material_bind_group, material_layout, PipelineKind};
use super::textures::{self, GpuTexture};

/// Uniform buffer plus the bind group pairing it with one sampled texture.
struct MaterialBinding {
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    texture: TextureId,
    generation: u64,
}

impl MaterialBinding {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        block_size: usize,
        texture_id: TextureId,
        texture: &GpuTexture,
    ) -> Self {
        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: block_size as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = material_bind_group(
            device,
            layout,
            label,
            &uniforms,
            &texture.view,
            &texture.sampler,
        );
        Self {
            uniforms,
            bind_group,
            texture: texture_id,
            generation: texture.generation,
        }
    }

    /// Rebuilds the bind group when the sampled texture changed or was reallocated.
    fn refresh(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture_id: TextureId,
        texture: &GpuTexture,
    ) {
        if self.texture == texture_id && self.generation == texture.generation {
            return;
        }
        self.bind_group = material_bind_group(
            device,
            layout,
            "material bind group",
            &self.uniforms,
            &texture.view,
            &texture.sampler,
        );
        self.texture = texture_id;
        self.generation = texture.generation;
    }
}

struct ParticleResources {
    positions: wgpu::Buffer,
    sizes: wgpu::Buffer,
    instance_count: u32,
    pipeline: wgpu::RenderPipeline,
    format: wgpu::TextureFormat,
    material: MaterialBinding,
}

struct CompositeResources {
    positions: wgpu::Buffer,
    indices: wgpu::Buffer,
    pipeline: wgpu::RenderPipeline,
    format: wgpu::TextureFormat,
    material: MaterialBinding,
}

/// [`HostRenderer`] backed by `wgpu`, presenting to a window surface.
///
/// Mesh buffers and pipelines are created the first time a drawable is seen and
/// cached by its id; only uniform blocks are rewritten per frame.
pub struct WgpuRenderer {
    context: GpuContext,
    pixel_ratio: f32,
    material_layout: wgpu::BindGroupLayout,
    textures: HashMap<TextureId, GpuTexture>,
    particles: HashMap<MeshId, ParticleResources>,
    composites: HashMap<MeshId, CompositeResources>,
    active_target: Option<TextureId>,
    clear_color: wgpu::Color,
}

impl WgpuRenderer {
    /// Creates a renderer presenting to `window`. `size` is in physical pixels.
    pub fn new<T>(
        window: &T,
        size: (u32, u32),
        pixel_ratio: f32,
        options: GpuOptions,
    ) -> Result<Self, RenderError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(FieldError::InvalidPixelRatio(pixel_ratio).into());
        }
        let context = GpuContext::new(window, size, options)?;
        let material_layout = material_layout(&context.device);
        Ok(Self {
            context,
            pixel_ratio,
            material_layout,
            textures: HashMap::new(),
            particles: HashMap::new(),
            composites: HashMap::new(),
            active_target: None,
            clear_color: wgpu::Color::BLACK,
        })
    }

    /// Tracks the window's scale factor. Non-positive values are ignored.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
    }

    pub fn set_clear_color(&mut self, color: [f64; 4]) {
        self.clear_color = wgpu::Color {
            r: color[0],
            g: color[1],
            b: color[2],
            a: color[3],
        };
    }

    /// Reconfigures the surface for a new physical size; zero sizes are ignored.
    pub fn resize_surface(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    /// Reconfigures the surface at its current size, e.g. after `SurfaceError::Lost`.
    pub fn reconfigure_surface(&self) {
        self.context.reconfigure();
    }

    pub fn max_texture_dimension(&self) -> u32 {
        self.context.max_texture_dimension
    }

    /// Uploads tightly packed RGBA8 pixels and returns a handle materials can sample.
    pub fn upload_rgba_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<TextureId, RenderError> {
        self.check_dimensions(width, height)?;
        let texture = textures::upload_rgba(
            &self.context.device,
            &self.context.queue,
            width,
            height,
            pixels,
        )?;
        let id = TextureId::allocate();
        self.textures.insert(id, texture);
        debug!(texture = id.raw(), width, height, "uploaded texture");
        Ok(id)
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let max = self.context.max_texture_dimension;
        if width > max || height > max {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("GPU max texture dimension is {max}"),
            });
        }
        Ok(())
    }

    fn prepare(
        &mut self,
        object: SceneObject<'_>,
        camera: &Camera,
        format: wgpu::TextureFormat,
        viewport: (u32, u32),
    ) -> Result<(), RenderError> {
        match object {
            SceneObject::Points(mesh) => self.prepare_particles(mesh, camera, format, viewport),
            SceneObject::FullScreen(quad) => self.prepare_composite(quad, camera, format),
        }
    }

    fn prepare_particles(
        &mut self,
        mesh: &ParticleMesh,
        camera: &Camera,
        format: wgpu::TextureFormat,
        viewport: (u32, u32),
    ) -> Result<(), RenderError> {
        let texture_id = mesh.uniforms().normal_map;
        let texture = self
            .textures
            .get(&texture_id)
            .ok_or(RenderError::UnknownTexture(texture_id))?;
        let device = &self.context.device;

        let stale = self
            .particles
            .get(&mesh.id())
            .map_or(true, |resources| resources.format != format);
        if stale {
            let pipeline = create_pipeline(
                device,
                &self.material_layout,
                PipelineKind::Particles,
                mesh.shaders(),
                format,
            )?;
            let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("particle positions"),
                contents: mesh.field().position_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let sizes = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("particle sizes"),
                contents: mesh.field().size_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let material = MaterialBinding::new(
                device,
                &self.material_layout,
                "particle material",
                std::mem::size_of::<ParticleBlock>(),
                texture_id,
                texture,
            );
            debug!(
                particles = mesh.instance_count(),
                ?format,
                "uploaded particle buffers"
            );
            self.particles.insert(
                mesh.id(),
                ParticleResources {
                    positions,
                    sizes,
                    instance_count: mesh.instance_count(),
                    pipeline,
                    format,
                    material,
                },
            );
        }

        if let Some(resources) = self.particles.get_mut(&mesh.id()) {
            resources
                .material
                .refresh(device, &self.material_layout, texture_id, texture);
            let block = mesh.uniforms().block(camera.view_projection(), viewport);
            self.context.queue.write_buffer(
                &resources.material.uniforms,
                0,
                bytemuck::bytes_of(&block),
            );
        }
        Ok(())
    }

    fn prepare_composite(
        &mut self,
        quad: &CompositeQuad,
        camera: &Camera,
        format: wgpu::TextureFormat,
    ) -> Result<(), RenderError> {
        let texture_id = quad.uniforms().texture_map;
        let texture = self
            .textures
            .get(&texture_id)
            .ok_or(RenderError::UnknownTexture(texture_id))?;
        let device = &self.context.device;

        let stale = self
            .composites
            .get(&quad.id())
            .map_or(true, |resources| resources.format != format);
        if stale {
            let pipeline = create_pipeline(
                device,
                &self.material_layout,
                PipelineKind::Composite,
                quad.shaders(),
                format,
            )?;
            let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("fullscreen positions"),
                contents: quad.geometry().position_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("fullscreen indices"),
                contents: &quad.geometry().index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });
            let material = MaterialBinding::new(
                device,
                &self.material_layout,
                "composite material",
                std::mem::size_of::<CompositeBlock>(),
                texture_id,
                texture,
            );
            self.composites.insert(
                quad.id(),
                CompositeResources {
                    positions,
                    indices,
                    pipeline,
                    format,
                    material,
                },
            );
        }

        if let Some(resources) = self.composites.get_mut(&quad.id()) {
            resources
                .material
                .refresh(device, &self.material_layout, texture_id, texture);
            let projection = camera.view_projection() * quad.geometry().model();
            let block = quad.uniforms().block(projection);
            self.context.queue.write_buffer(
                &resources.material.uniforms,
                0,
                bytemuck::bytes_of(&block),
            );
        }
        Ok(())
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, object: SceneObject<'_>) {
        match object {
            SceneObject::Points(mesh) => {
                if let Some(resources) = self.particles.get(&mesh.id()) {
                    pass.set_pipeline(&resources.pipeline);
                    pass.set_bind_group(0, &resources.material.bind_group, &[]);
                    pass.set_vertex_buffer(0, resources.positions.slice(..));
                    pass.set_vertex_buffer(1, resources.sizes.slice(..));
                    pass.draw(0..4, 0..resources.instance_count);
                }
            }
            SceneObject::FullScreen(quad) => {
                if let Some(resources) = self.composites.get(&quad.id()) {
                    pass.set_pipeline(&resources.pipeline);
                    pass.set_bind_group(0, &resources.material.bind_group, &[]);
                    pass.set_vertex_buffer(0, resources.positions.slice(..));
                    pass.set_index_buffer(resources.indices.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..3, 0, 0..1);
                }
            }
        }
    }
}

impl HostRenderer for WgpuRenderer {
    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<RenderTarget, RenderError> {
        self.check_dimensions(descriptor.width, descriptor.height)?;
        if descriptor.stencil {
            return Err(RenderError::TargetAllocation {
                width: descriptor.width,
                height: descriptor.height,
                reason: "stencil attachments are not supported".into(),
            });
        }
        let texture = textures::create_render_texture(
            &self.context.device,
            self.context.format(),
            descriptor.width,
            descriptor.height,
            descriptor.filters,
            0,
        )?;
        let id = TextureId::allocate();
        self.textures.insert(id, texture);
        Ok(RenderTarget::new(id, descriptor))
    }

    fn resize_render_target(
        &mut self,
        target: &mut RenderTarget,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.check_dimensions(width, height)?;
        let id = target.texture();
        let generation = self
            .textures
            .get(&id)
            .map(|texture| texture.generation + 1)
            .ok_or(RenderError::UnknownTexture(id))?;
        let texture = textures::create_render_texture(
            &self.context.device,
            self.context.format(),
            width,
            height,
            target.filters(),
            generation,
        )?;
        self.textures.insert(id, texture);
        target.set_size(width, height);
        Ok(())
    }

    fn set_render_target(&mut self, target: Option<&RenderTarget>) {
        self.active_target = target.map(RenderTarget::texture);
    }

    fn render(&mut self, scene: &Scene<'_>, camera: &Camera) -> Result<(), RenderError> {
        let (frame, view, viewport) = match self.active_target {
            Some(id) => {
                let texture = self
                    .textures
                    .get(&id)
                    .ok_or(RenderError::UnknownTexture(id))?;
                (None, texture.view.clone(), (texture.width, texture.height))
            }
            None => {
                let frame = self.context.surface.get_current_texture()?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                (Some(frame), view, self.context.size())
            }
        };
        let format = self.context.format();

        for &object in scene.objects() {
            self.prepare(object, camera, format, viewport)?;
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scene encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            for &object in scene.objects() {
                self.draw(&mut pass, object);
            }
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        trace!(
            objects = scene.len(),
            offscreen = self.active_target.is_some(),
            "rendered scene"
        );

        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }
}
