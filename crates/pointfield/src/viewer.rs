use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use fieldconfig::FieldConfig;
use fieldfx::normal_map::sphere_normal_map;
use fieldfx::{
    Camera, GpuOptions, OffscreenCompositor, ParameterRegistry, ParticleFieldBuilder,
    ParticleMesh, PerspectiveCamera, RenderError, Scene, SphereSurface, WgpuRenderer,
};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::cli::ParamOverride;

/// Everything drawn in the window: the particle mesh, the post-processing
/// compositor and the camera orbiting them.
pub(crate) struct Viewer {
    // Declared before `window` so the surface is dropped first.
    renderer: WgpuRenderer,
    mesh: ParticleMesh,
    compositor: OffscreenCompositor,
    registry: ParameterRegistry,
    camera: Camera,
    distance: f32,
    orbit_speed: f32,
    elapsed: f32,
    last_frame: Instant,
    window: Arc<Window>,
}

impl Viewer {
    pub(crate) fn new(window: Arc<Window>, config: &FieldConfig) -> Result<Self> {
        let size = window.inner_size();
        let pixel_ratio = window.scale_factor() as f32;
        let mut renderer = WgpuRenderer::new(
            window.as_ref(),
            (size.width, size.height),
            pixel_ratio,
            GpuOptions {
                high_performance: config.window.high_performance,
                vsync: config.window.vsync,
            },
        )
        .context("failed to initialise GPU renderer")?;
        renderer.set_clear_color(opaque(config.window.clear_color));

        let texels = config.particles.normal_map_size;
        let normal_map = renderer
            .upload_rgba_texture(texels, texels, &sphere_normal_map(texels))
            .context("failed to upload particle normal map")?;

        let particles = &config.particles;
        let seed = particles.seed.unwrap_or_else(rand::random);
        info!(
            seed,
            particles = particles.count,
            pixel_ratio,
            "building particle field"
        );
        let mut rng = StdRng::seed_from_u64(seed);
        let field = ParticleFieldBuilder::new(particles.count)
            .size_range(particles.size_min..particles.size_max)
            .radius_range(particles.radius_min..particles.radius_max)
            .build(&mut rng, &SphereSurface, pixel_ratio)
            .context("failed to build particle field")?;
        let mesh = ParticleMesh::new(field, pixel_ratio, normal_map)?;
        mesh.light_direction()
            .set(Vec3::from_array(particles.light_direction));

        let logical = size.to_logical::<f64>(f64::from(pixel_ratio));
        let compositor = OffscreenCompositor::new(
            &mut renderer,
            (logical.width.round() as u32).max(1),
            (logical.height.round() as u32).max(1),
        )
        .context("failed to create post-processing target")?;
        compositor.noise_speed().set(config.post.noise_speed);
        compositor.noise_amount().set(config.post.noise_amount);

        let mut registry = ParameterRegistry::new();
        mesh.publish(&mut registry);
        compositor.publish(&mut registry);

        let camera_config = &config.camera;
        let camera = Camera::Perspective(PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, camera_config.distance),
            ..PerspectiveCamera::new(
                camera_config.fov,
                aspect_ratio(size),
                camera_config.near,
                camera_config.far,
            )
        });

        Ok(Self {
            renderer,
            mesh,
            compositor,
            registry,
            camera,
            distance: camera_config.distance,
            orbit_speed: camera_config.orbit_speed,
            elapsed: 0.0,
            last_frame: Instant::now(),
            window,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub(crate) fn apply_overrides(&self, overrides: &[ParamOverride]) -> Result<()> {
        apply_overrides(&self.registry, overrides)
    }

    /// Follows a window resize given in physical pixels.
    pub(crate) fn resize(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if size.width == 0 || size.height == 0 {
            debug!("ignoring zero-sized resize");
            return Ok(());
        }
        self.renderer.resize_surface(size.width, size.height);
        let logical = size.to_logical::<f64>(self.window.scale_factor());
        self.compositor.resize(
            &mut self.renderer,
            (logical.width.round() as u32).max(1),
            (logical.height.round() as u32).max(1),
        )?;
        self.camera.set_aspect(aspect_ratio(size));
        Ok(())
    }

    pub(crate) fn set_scale_factor(&mut self, scale_factor: f64) {
        debug!(scale_factor, "scale factor changed");
        self.renderer.set_pixel_ratio(scale_factor as f32);
    }

    /// Reconfigures the surface after it was lost or became outdated.
    pub(crate) fn recover_surface(&mut self) {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            self.renderer.reconfigure_surface();
        } else {
            self.renderer.resize_surface(size.width, size.height);
        }
    }

    pub(crate) fn render_frame(&mut self) -> Result<(), RenderError> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.elapsed += delta;
        self.orbit();

        let scene = Scene::new().with(&self.mesh);
        self.compositor
            .render(&mut self.renderer, &scene, &self.camera, delta)
    }

    fn orbit(&mut self) {
        if let Camera::Perspective(camera) = &mut self.camera {
            let angle = self.elapsed * self.orbit_speed;
            camera.position = Vec3::new(
                self.distance * angle.sin(),
                0.0,
                self.distance * angle.cos(),
            );
        }
    }
}

fn opaque([r, g, b]: [f32; 3]) -> [f64; 4] {
    [f64::from(r), f64::from(g), f64::from(b), 1.0]
}

fn aspect_ratio(size: PhysicalSize<u32>) -> f32 {
    size.width.max(1) as f32 / size.height.max(1) as f32
}

/// Writes each override through the registry, warning when a value is clamped.
pub(crate) fn apply_overrides(
    registry: &ParameterRegistry,
    overrides: &[ParamOverride],
) -> Result<()> {
    for ParamOverride { name, value } in overrides {
        let applied = registry.set(name, *value).map_err(|err| {
            let known: Vec<_> = registry
                .entries()
                .iter()
                .map(|entry| entry.name.as_str())
                .collect();
            anyhow!("{err} (known parameters: {})", known.join(", "))
        })?;
        if applied != *value {
            warn!(parameter = %name, requested = value, applied, "parameter clamped");
        } else {
            debug!(parameter = %name, value = applied, "parameter set");
        }
    }
    Ok(())
}

/// One line per published parameter: name, current value and bounds.
pub(crate) fn describe_parameters(registry: &ParameterRegistry) -> Vec<String> {
    registry
        .entries()
        .iter()
        .map(|entry| {
            let (min, max) = entry.handle.range();
            format!(
                "{:<12} {:>8.3}  [{min}, {max}]",
                entry.name,
                entry.handle.get()
            )
        })
        .collect()
}
