use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::error::RenderError;
use crate::field::ParticleField;
use crate::host::TextureId;
use crate::params::{ControlSurface, Tunable};
use crate::shader::ShaderSource;

/// Uniform scale applied to every particle's size.
pub const PARTICLE_SIZE: f32 = 100.0;

pub(crate) const PARTICLE_ATTRIBUTES: [&str; 2] = ["position", "size"];
pub(crate) const PARTICLE_UNIFORMS: [&str; 3] = ["particleSize", "lightDirection", "normalMap"];

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a drawable so renderers can cache its GPU resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(u64);

impl MeshId {
    pub(crate) fn allocate() -> Self {
        Self(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Light direction for the lambert term, one bounded handle per axis.
#[derive(Clone, Debug)]
pub struct LightDirection {
    pub x: Tunable,
    pub y: Tunable,
    pub z: Tunable,
}

impl LightDirection {
    pub fn new(direction: Vec3) -> Self {
        Self {
            x: Tunable::new(direction.x, -1.0, 1.0),
            y: Tunable::new(direction.y, -1.0, 1.0),
            z: Tunable::new(direction.z, -1.0, 1.0),
        }
    }

    pub fn get(&self) -> Vec3 {
        Vec3::new(self.x.get(), self.y.get(), self.z.get())
    }

    pub fn set(&self, direction: Vec3) {
        self.x.set(direction.x);
        self.y.set(direction.y);
        self.z.set(direction.z);
    }
}

impl Default for LightDirection {
    fn default() -> Self {
        Self::new(Vec3::ONE)
    }
}

/// Everything the particle shaders read besides the vertex attributes.
#[derive(Clone, Debug)]
pub struct ParticleUniforms {
    pub particle_size: f32,
    pub light_direction: LightDirection,
    pub normal_map: TextureId,
    pub pixel_ratio: f32,
}

/// std140 mirror of `ParticleParams` in the particle shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ParticleBlock {
    pub view_projection: [[f32; 4]; 4],
    pub light_direction: [f32; 4],
    pub viewport: [f32; 2],
    pub particle_size: f32,
    pub pixel_ratio: f32,
}

impl ParticleUniforms {
    pub fn block(&self, view_projection: Mat4, viewport: (u32, u32)) -> ParticleBlock {
        ParticleBlock {
            view_projection: view_projection.to_cols_array_2d(),
            light_direction: self.light_direction.get().extend(0.0).to_array(),
            viewport: [viewport.0 as f32, viewport.1 as f32],
            particle_size: self.particle_size,
            pixel_ratio: self.pixel_ratio,
        }
    }
}

/// A particle field bound to its shader program, drawn as one point sprite per
/// particle in a single instanced draw call.
pub struct ParticleMesh {
    id: MeshId,
    field: ParticleField,
    uniforms: ParticleUniforms,
    shaders: ShaderSource,
}

impl ParticleMesh {
    /// Binds `field` to the bundled particle shaders.
    ///
    /// `normal_map` is sampled per sprite for lighting and must name a texture
    /// the renderer knows about by the time the mesh is drawn.
    pub fn new(
        field: ParticleField,
        pixel_ratio: f32,
        normal_map: TextureId,
    ) -> Result<Self, RenderError> {
        Self::with_shaders(field, pixel_ratio, normal_map, ShaderSource::particles())
    }

    pub fn with_shaders(
        field: ParticleField,
        pixel_ratio: f32,
        normal_map: TextureId,
        shaders: ShaderSource,
    ) -> Result<Self, RenderError> {
        shaders.require(&PARTICLE_ATTRIBUTES, &PARTICLE_UNIFORMS)?;
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(crate::error::FieldError::InvalidPixelRatio(pixel_ratio).into());
        }
        Ok(Self {
            id: MeshId::allocate(),
            field,
            uniforms: ParticleUniforms {
                particle_size: PARTICLE_SIZE,
                light_direction: LightDirection::default(),
                normal_map,
                pixel_ratio,
            },
            shaders,
        })
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    /// Number of instances submitted by the single draw call.
    pub fn instance_count(&self) -> u32 {
        self.field.count() as u32
    }

    pub fn uniforms(&self) -> &ParticleUniforms {
        &self.uniforms
    }

    pub fn shaders(&self) -> &ShaderSource {
        &self.shaders
    }

    pub fn light_direction(&self) -> &LightDirection {
        &self.uniforms.light_direction
    }

    /// Exposes the light direction axes as `light x`, `light y`, `light z`.
    pub fn publish(&self, surface: &mut dyn ControlSurface) {
        let light = &self.uniforms.light_direction;
        surface.publish("light x", light.x.clone());
        surface.publish("light y", light.y.clone());
        surface.publish("light z", light.z.clone());
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::field::ParticleFieldBuilder;
    use crate::params::ParameterRegistry;
    use crate::sampling::SphereSurface;

    fn mesh(count: usize) -> ParticleMesh {
        let mut rng = StdRng::seed_from_u64(11);
        let field = ParticleFieldBuilder::new(count)
            .build(&mut rng, &SphereSurface, 2.0)
            .unwrap();
        ParticleMesh::new(field, 2.0, TextureId::allocate()).unwrap()
    }

    #[test]
    fn defaults_match_the_particle_shader_contract() {
        let mesh = mesh(8);
        let uniforms = mesh.uniforms();
        assert_eq!(uniforms.particle_size, 100.0);
        assert_eq!(uniforms.light_direction.get(), Vec3::ONE);
        assert_eq!(uniforms.pixel_ratio, 2.0);
        assert_eq!(mesh.instance_count(), 8);
    }

    #[test]
    fn std140_block_is_96_bytes() {
        assert_eq!(std::mem::size_of::<ParticleBlock>(), 96);
    }

    #[test]
    fn block_carries_live_light_direction() {
        let mesh = mesh(4);
        mesh.light_direction().set(Vec3::new(0.5, -0.25, 2.0));
        let block = mesh.uniforms().block(Mat4::IDENTITY, (640, 480));
        assert_eq!(block.light_direction, [0.5, -0.25, 1.0, 0.0]);
        assert_eq!(block.viewport, [640.0, 480.0]);
        assert_eq!(block.particle_size, 100.0);
    }

    #[test]
    fn publishes_light_axes() {
        let mesh = mesh(4);
        let mut registry = ParameterRegistry::new();
        mesh.publish(&mut registry);

        let names: Vec<_> = registry.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["light x", "light y", "light z"]);
        registry.set("light y", -3.0).unwrap();
        assert_eq!(mesh.light_direction().get(), Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(registry.get("light x").unwrap().range(), (-1.0, 1.0));
    }

    #[test]
    fn rejects_shaders_without_required_symbols() {
        let mut rng = StdRng::seed_from_u64(1);
        let field = ParticleFieldBuilder::new(2)
            .build(&mut rng, &SphereSurface, 1.0)
            .unwrap();
        let shaders = ShaderSource::new(
            "plain",
            crate::shader::PARTICLE_VERTEX_GLSL,
            "uniform vec3 lightDirection;\nvoid main() {}",
        );
        let err = ParticleMesh::with_shaders(field, 1.0, TextureId::allocate(), shaders)
            .err()
            .expect("missing normalMap must fail");
        assert!(matches!(
            err,
            RenderError::MissingShaderSymbol {
                symbol: "normalMap",
                ..
            }
        ));
    }
}
