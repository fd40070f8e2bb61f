use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::RenderError;
use crate::host::{FilterMode, TargetFilters};

/// A texture owned by the renderer, addressed elsewhere by its `TextureId`.
///
/// `generation` is bumped whenever the texture is reallocated so bind groups
/// holding the old view can be rebuilt.
pub(crate) struct GpuTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
    pub generation: u64,
}

fn wgpu_filter(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn create_sampler(device: &wgpu::Device, filters: TargetFilters) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("texture sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu_filter(filters.mag),
        min_filter: wgpu_filter(filters.min),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Allocates a color texture that can be rendered into and sampled afterwards.
pub(crate) fn create_render_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    filters: TargetFilters,
    generation: u64,
) -> Result<GpuTexture, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::TargetAllocation {
            width,
            height,
            reason: err.to_string(),
        });
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok(GpuTexture {
        _texture: texture,
        view,
        sampler: create_sampler(device, filters),
        width,
        height,
        generation,
    })
}

/// Uploads tightly packed RGBA8 pixels as a linearly filtered texture.
pub(crate) fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<GpuTexture, RenderError> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(RenderError::InvalidTextureData {
            expected,
            actual: pixels.len(),
        });
    }

    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("uploaded texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        pixels,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let filters = TargetFilters {
        min: FilterMode::Linear,
        mag: FilterMode::Linear,
    };
    Ok(GpuTexture {
        _texture: texture,
        view,
        sampler: create_sampler(device, filters),
        width,
        height,
        generation: 0,
    })
}
