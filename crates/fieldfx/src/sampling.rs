use std::f32::consts::TAU;

use glam::Vec3;

/// Maps two unit-interval scalars and a radius to a point around `origin`.
///
/// Implementations must be pure: the same inputs always yield the same point.
pub trait PointSampler {
    fn sample(&self, origin: Vec3, u: f32, v: f32, radius: f32) -> Vec3;
}

/// Uniform distribution over the surface of a sphere.
///
/// `u` picks the azimuth (`2πu`) and `v` the polar angle (`acos(1 - 2v)`), so
/// uniformly drawn `u, v` cover the surface with constant density. The point
/// always lies exactly `radius` away from `origin`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SphereSurface;

impl PointSampler for SphereSurface {
    fn sample(&self, origin: Vec3, u: f32, v: f32, radius: f32) -> Vec3 {
        let theta = TAU * u;
        let phi = (1.0 - 2.0 * v).clamp(-1.0, 1.0).acos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        origin
            + Vec3::new(
                radius * sin_phi * cos_theta,
                radius * sin_phi * sin_theta,
                radius * cos_phi,
            )
    }
}
