//! The smallest scene description a [`crate::host::HostRenderer`] can draw:
//! an ordered list of borrowed drawables plus a camera.

use glam::{Mat4, Vec3};

use crate::compositor::CompositeQuad;
use crate::particles::ParticleMesh;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrthographicCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl PerspectiveCamera {
    pub fn new(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y,
            aspect,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 100.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Camera {
    Orthographic(OrthographicCamera),
    Perspective(PerspectiveCamera),
}

impl Camera {
    pub fn orthographic(left: f32, right: f32, top: f32, bottom: f32, near: f32, far: f32) -> Self {
        Camera::Orthographic(OrthographicCamera {
            left,
            right,
            top,
            bottom,
            near,
            far,
        })
    }

    /// Projection times view, mapping world space to `wgpu` clip space (depth 0..1).
    pub fn view_projection(&self) -> Mat4 {
        match self {
            Camera::Orthographic(camera) => Mat4::orthographic_rh(
                camera.left,
                camera.right,
                camera.bottom,
                camera.top,
                camera.near,
                camera.far,
            ),
            Camera::Perspective(camera) => {
                let projection = Mat4::perspective_rh(
                    camera.fov_y.to_radians(),
                    camera.aspect.max(f32::EPSILON),
                    camera.near,
                    camera.far,
                );
                let view = Mat4::look_at_rh(camera.position, camera.target, camera.up);
                projection * view
            }
        }
    }

    /// Updates the aspect ratio of perspective cameras; orthographic ones are left alone.
    pub fn set_aspect(&mut self, aspect: f32) {
        if let Camera::Perspective(camera) = self {
            camera.aspect = aspect;
        }
    }
}

/// A borrowed drawable. Scenes are cheap views built per frame; the meshes
/// themselves (and their cached GPU resources) outlive them.
#[derive(Clone, Copy)]
pub enum SceneObject<'a> {
    Points(&'a ParticleMesh),
    FullScreen(&'a CompositeQuad),
}

impl SceneObject<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            SceneObject::Points(_) => "points",
            SceneObject::FullScreen(_) => "fullscreen",
        }
    }
}

impl<'a> From<&'a ParticleMesh> for SceneObject<'a> {
    fn from(mesh: &'a ParticleMesh) -> Self {
        SceneObject::Points(mesh)
    }
}

impl<'a> From<&'a CompositeQuad> for SceneObject<'a> {
    fn from(quad: &'a CompositeQuad) -> Self {
        SceneObject::FullScreen(quad)
    }
}

/// Drawables rendered in insertion order.
#[derive(Clone, Default)]
pub struct Scene<'a> {
    objects: Vec<SceneObject<'a>>,
}

impl<'a> Scene<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: impl Into<SceneObject<'a>>) {
        self.objects.push(object.into());
    }

    pub fn with(mut self, object: impl Into<SceneObject<'a>>) -> Self {
        self.add(object);
        self
    }

    pub fn objects(&self) -> &[SceneObject<'a>] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
