use wgpu::naga::ShaderStage;

use crate::error::RenderError;
use crate::shader::ShaderSource;

pub(crate) struct CompiledShaders {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

/// Compiles both stages of `source` through naga's GLSL frontend.
///
/// Validation errors are captured with an error scope so a bad shader surfaces
/// as [`RenderError::ShaderCompile`] instead of the device's uncaptured-error
/// panic.
pub(crate) fn compile_shaders(
    device: &wgpu::Device,
    source: &ShaderSource,
) -> Result<CompiledShaders, RenderError> {
    let vertex = compile_stage(device, source, ShaderStage::Vertex)?;
    let fragment = compile_stage(device, source, ShaderStage::Fragment)?;
    Ok(CompiledShaders { vertex, fragment })
}

fn compile_stage(
    device: &wgpu::Device,
    source: &ShaderSource,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule, RenderError> {
    let (code, suffix) = match stage {
        ShaderStage::Vertex => (source.vertex.clone(), "vertex"),
        _ => (source.fragment.clone(), "fragment"),
    };
    let label = format!("{} {suffix}", source.label);

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Glsl {
            shader: code,
            stage,
            defines: &[],
        },
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        tracing::warn!(shader = %label, "shader compilation failed");
        return Err(RenderError::ShaderCompile {
            label,
            reason: err.to_string(),
        });
    }
    Ok(module)
}
