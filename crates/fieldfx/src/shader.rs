//! Shader pairs and the GLSL bundled with the crate.
//!
//! Shaders are Vulkan-flavoured GLSL 450 handed to naga's GLSL frontend. Each
//! pipeline checks at construction time that its pair mentions every attribute
//! and uniform the pipeline binds, so a typo fails loudly instead of rendering
//! black.

use std::borrow::Cow;

use crate::error::RenderError;

/// A vertex/fragment GLSL pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: Cow<'static, str>,
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSource {
    pub fn new(
        label: impl Into<Cow<'static, str>>,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Bundled point-sprite shading with a normal-mapped lambert term.
    pub fn particles() -> Self {
        Self::new("particles", PARTICLE_VERTEX_GLSL, PARTICLE_FRAGMENT_GLSL)
    }

    /// Bundled noise/distortion composite.
    pub fn composite() -> Self {
        Self::new("composite", COMPOSITE_VERTEX_GLSL, COMPOSITE_FRAGMENT_GLSL)
    }

    /// Fails unless every attribute is referenced by the vertex stage and every
    /// uniform by at least one stage.
    pub(crate) fn require(
        &self,
        attributes: &[&'static str],
        uniforms: &[&'static str],
    ) -> Result<(), RenderError> {
        for &symbol in attributes {
            if !mentions(&self.vertex, symbol) {
                return Err(RenderError::MissingShaderSymbol {
                    stage: "vertex",
                    symbol,
                });
            }
        }
        for &symbol in uniforms {
            if !mentions(&self.vertex, symbol) && !mentions(&self.fragment, symbol) {
                return Err(RenderError::MissingShaderSymbol {
                    stage: "vertex or fragment",
                    symbol,
                });
            }
        }
        Ok(())
    }
}

/// Whole-identifier search; `position` does not match `gl_Position` or `positions`.
fn mentions(source: &str, symbol: &str) -> bool {
    let is_ident = |ch: char| ch.is_ascii_alphanumeric() || ch == '_';
    source.match_indices(symbol).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + symbol.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Layout must match `ParticleBlock` in `particles.rs`.
pub const PARTICLE_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in float size;

layout(std140, set = 0, binding = 0) uniform ParticleParams {
    mat4 viewProjection;
    vec4 _lightDirection;
    vec2 viewport;
    float _particleSize;
    float pixelRatio;
} params;

#define particleSize params._particleSize

layout(location = 0) out vec2 vCorner;

const vec2 corners[4] = vec2[4](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(-1.0, 1.0),
    vec2(1.0, 1.0)
);

void main() {
    vec2 corner = corners[uint(gl_VertexIndex)];
    vec4 clip = params.viewProjection * vec4(position, 1.0);
    float depth = max(clip.w, 0.0001);
    // Diameter in device pixels, attenuated with distance.
    float diameter = size * particleSize / (params.pixelRatio * depth);
    vec2 offset = corner * diameter / max(params.viewport, vec2(1.0));
    gl_Position = clip + vec4(offset * clip.w, 0.0, 0.0);
    vCorner = corner;
}
";

pub const PARTICLE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 vCorner;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform ParticleParams {
    mat4 viewProjection;
    vec4 _lightDirection;
    vec2 viewport;
    float _particleSize;
    float pixelRatio;
} params;

layout(set = 0, binding = 1) uniform texture2D normalMapTexture;
layout(set = 0, binding = 2) uniform sampler normalMapSampler;

#define lightDirection params._lightDirection.xyz
#define normalMap sampler2D(normalMapTexture, normalMapSampler)

void main() {
    if (dot(vCorner, vCorner) > 1.0) {
        discard;
    }
    vec2 uv = vec2(vCorner.x, -vCorner.y) * 0.5 + 0.5;
    vec4 texel = texture(normalMap, uv);
    vec3 normal = normalize(texel.rgb * 2.0 - 1.0);
    vec3 light = lightDirection;
    float lightLength = max(length(light), 0.0001);
    float diffuse = max(dot(normal, light / lightLength), 0.0);
    outColor = vec4(vec3(diffuse) * texel.a, texel.a);
}
";

/// Layout must match `CompositeBlock` in `compositor.rs`.
pub const COMPOSITE_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 0) out vec2 vUv;

layout(std140, set = 0, binding = 0) uniform CompositeParams {
    mat4 projection;
    vec2 resolution;
    float time;
    float noiseSpeed;
    float noiseAmount;
} params;

void main() {
    vUv = vec2(position.x * 0.5 + 0.5, 0.5 - position.y * 0.5);
    gl_Position = params.projection * vec4(position, 1.0);
}
";

pub const COMPOSITE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 vUv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform CompositeParams {
    mat4 _projection;
    vec2 _resolution;
    float _time;
    float _noiseSpeed;
    float _noiseAmount;
} params;

layout(set = 0, binding = 1) uniform texture2D textureMapTexture;
layout(set = 0, binding = 2) uniform sampler textureMapSampler;

#define textureMap sampler2D(textureMapTexture, textureMapSampler)
#define resolution params._resolution
#define time params._time
#define noiseSpeed params._noiseSpeed
#define noiseAmount params._noiseAmount

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}

float valueNoise(vec2 p) {
    vec2 cell = floor(p);
    vec2 f = fract(p);
    vec2 w = f * f * (3.0 - 2.0 * f);
    float a = hash(cell);
    float b = hash(cell + vec2(1.0, 0.0));
    float c = hash(cell + vec2(0.0, 1.0));
    float d = hash(cell + vec2(1.0, 1.0));
    return mix(mix(a, b, w.x), mix(c, d, w.x), w.y);
}

void main() {
    vec2 texel = 1.0 / max(resolution, vec2(1.0));
    float t = time * noiseSpeed;
    vec2 warp = vec2(
        valueNoise(vUv * 8.0 + vec2(t)),
        valueNoise(vUv * 8.0 - vec2(t) + vec2(17.0))
    ) - 0.5;
    vec2 uv = vUv + warp * noiseAmount * 40.0 * texel;
    vec3 color = texture(textureMap, uv).rgb;
    float grain = hash(gl_FragCoord.xy + vec2(fract(t) * 100.0)) - 0.5;
    color += vec3(grain * noiseAmount * 0.15);
    outColor = vec4(color, 1.0);
}
";
