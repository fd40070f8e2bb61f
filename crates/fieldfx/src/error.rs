use crate::host::TextureId;

/// Construction failures for [`crate::field::ParticleField`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("particle field must contain at least one particle")]
    EmptyField,
    #[error("pixel ratio must be finite and greater than zero (got {0})")]
    InvalidPixelRatio(f32),
    #[error("{name} range is empty or inverted ({min}..{max})")]
    InvalidRange {
        name: &'static str,
        min: f32,
        max: f32,
    },
}

/// Everything that can go wrong while building or driving a render pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("{stage} shader does not reference required symbol `{symbol}`")]
    MissingShaderSymbol {
        stage: &'static str,
        symbol: &'static str,
    },
    #[error("render target dimensions must be non-zero (got {width}x{height})")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("failed to allocate {width}x{height} render target: {reason}")]
    TargetAllocation {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("texture {0:?} is not known to the renderer")]
    UnknownTexture(TextureId),
    #[error("texture data is {actual} bytes, expected {expected}")]
    InvalidTextureData { expected: usize, actual: usize },
    #[error("failed to compile `{label}` shaders: {reason}")]
    ShaderCompile { label: String, reason: String },
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("GPU initialisation failed: {0}")]
    Device(String),
}

impl RenderError {
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            RenderError::Surface(err) => Some(err),
            _ => None,
        }
    }
}
