use std::ops::Range;

use glam::Vec3;
use rand::Rng;

use crate::error::FieldError;
use crate::sampling::PointSampler;

pub const DEFAULT_SIZE_RANGE: Range<f32> = 0.1..5.0;
pub const DEFAULT_RADIUS_RANGE: Range<f32> = 10.0..50.0;

/// Fixed-size set of particle attributes, laid out for direct GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleField {
    positions: Vec<f32>,
    sizes: Vec<f32>,
}

impl ParticleField {
    fn zeroed(count: usize) -> Self {
        Self {
            positions: vec![0.0; count * 3],
            sizes: vec![0.0; count],
        }
    }

    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Flat `x, y, z` triples, three floats per particle.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Point size in device pixels, one float per particle.
    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn position(&self, index: usize) -> Option<Vec3> {
        let start = index.checked_mul(3)?;
        self.positions
            .get(start..start + 3)
            .map(|xyz| Vec3::new(xyz[0], xyz[1], xyz[2]))
    }

    pub fn size(&self, index: usize) -> Option<f32> {
        self.sizes.get(index).copied()
    }

    /// Overwrites one particle in place. Out-of-range indices are ignored.
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        if let Some(slot) = self.positions.get_mut(index * 3..index * 3 + 3) {
            slot.copy_from_slice(&position.to_array());
        }
    }

    pub fn set_size(&mut self, index: usize, size: f32) {
        if let Some(slot) = self.sizes.get_mut(index) {
            *slot = size;
        }
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn size_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.sizes)
    }
}

/// Samples initial particle positions and sizes.
#[derive(Clone, Debug)]
pub struct ParticleFieldBuilder {
    total_particles: usize,
    size_range: Range<f32>,
    radius_range: Range<f32>,
}

impl ParticleFieldBuilder {
    pub fn new(total_particles: usize) -> Self {
        Self {
            total_particles,
            size_range: DEFAULT_SIZE_RANGE,
            radius_range: DEFAULT_RADIUS_RANGE,
        }
    }

    /// Point size range in logical pixels, before the pixel ratio is applied.
    pub fn size_range(mut self, range: Range<f32>) -> Self {
        self.size_range = range;
        self
    }

    /// Distance range from the origin.
    pub fn radius_range(mut self, range: Range<f32>) -> Self {
        self.radius_range = range;
        self
    }

    /// Draws every particle from `rng`.
    ///
    /// Per particle the draws are, in order: azimuth, polar, radius, size.
    pub fn build<R, S>(
        &self,
        rng: &mut R,
        sampler: &S,
        pixel_ratio: f32,
    ) -> Result<ParticleField, FieldError>
    where
        R: Rng + ?Sized,
        S: PointSampler + ?Sized,
    {
        if self.total_particles == 0 {
            return Err(FieldError::EmptyField);
        }
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(FieldError::InvalidPixelRatio(pixel_ratio));
        }
        validate_range("size", &self.size_range)?;
        validate_range("radius", &self.radius_range)?;

        let mut field = ParticleField::zeroed(self.total_particles);
        for index in 0..self.total_particles {
            let u = rng.gen::<f32>();
            let v = rng.gen::<f32>();
            let radius = rng.gen_range(self.radius_range.clone());
            field.set_position(index, sampler.sample(Vec3::ZERO, u, v, radius));

            let size = rng.gen_range(self.size_range.clone()) * pixel_ratio;
            field.set_size(index, size);
        }
        Ok(field)
    }
}

fn validate_range(name: &'static str, range: &Range<f32>) -> Result<(), FieldError> {
    let finite = range.start.is_finite() && range.end.is_finite();
    if !finite || range.start >= range.end || range.start < 0.0 {
        return Err(FieldError::InvalidRange {
            name,
            min: range.start,
            max: range.end,
        });
    }
    Ok(())
}
