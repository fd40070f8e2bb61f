use fieldfx::compositor::{DEFAULT_NOISE_AMOUNT, DEFAULT_NOISE_SPEED};
use fieldfx::{
    Camera, ControlSurface, HostRenderer, OffscreenCompositor, ParameterRegistry, ParticleFieldBuilder,
    ParticleMesh, PerspectiveCamera, RenderError, RenderTarget, RenderTargetDescriptor, Scene,
    ShaderSource, SphereSurface, TextureId,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Clone, Debug, PartialEq)]
enum Call {
    CreateTarget(u32, u32),
    ResizeTarget(TextureId, u32, u32),
    SetTarget(Option<TextureId>),
    Render {
        objects: Vec<&'static str>,
        target: Option<TextureId>,
    },
}

/// Records every call instead of touching a GPU.
struct RecordingRenderer {
    pixel_ratio: f32,
    max_dimension: u32,
    fail_next_render: bool,
    active: Option<TextureId>,
    calls: Vec<Call>,
}

impl RecordingRenderer {
    fn new(pixel_ratio: f32) -> Self {
        Self {
            pixel_ratio,
            max_dimension: 8192,
            fail_next_render: false,
            active: None,
            calls: Vec::new(),
        }
    }

    fn renders(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Render { .. }))
            .count()
    }

    fn check(&self, width: u32, height: u32) -> Result<(), RenderError> {
        if width > self.max_dimension || height > self.max_dimension {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: format!("limit is {}", self.max_dimension),
            });
        }
        Ok(())
    }
}

impl HostRenderer for RecordingRenderer {
    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn create_render_target(
        &mut self,
        descriptor: &RenderTargetDescriptor,
    ) -> Result<RenderTarget, RenderError> {
        self.check(descriptor.width, descriptor.height)?;
        self.calls
            .push(Call::CreateTarget(descriptor.width, descriptor.height));
        Ok(RenderTarget::new(TextureId::allocate(), descriptor))
    }

    fn resize_render_target(
        &mut self,
        target: &mut RenderTarget,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        self.check(width, height)?;
        self.calls
            .push(Call::ResizeTarget(target.texture(), width, height));
        target.set_size(width, height);
        Ok(())
    }

    fn set_render_target(&mut self, target: Option<&RenderTarget>) {
        self.active = target.map(RenderTarget::texture);
        self.calls.push(Call::SetTarget(self.active));
    }

    fn render(&mut self, scene: &Scene<'_>, _camera: &Camera) -> Result<(), RenderError> {
        if self.fail_next_render {
            self.fail_next_render = false;
            return Err(RenderError::Device("lost device".into()));
        }
        self.calls.push(Call::Render {
            objects: scene.objects().iter().map(|object| object.label()).collect(),
            target: self.active,
        });
        Ok(())
    }
}

fn particle_mesh(count: usize, pixel_ratio: f32) -> ParticleMesh {
    let mut rng = StdRng::seed_from_u64(2024);
    let field = ParticleFieldBuilder::new(count)
        .build(&mut rng, &SphereSurface, pixel_ratio)
        .expect("field");
    ParticleMesh::new(field, pixel_ratio, TextureId::allocate()).expect("mesh")
}

fn scene_camera() -> Camera {
    Camera::Perspective(PerspectiveCamera::new(45.0, 800.0 / 600.0, 0.1, 1000.0))
}

#[test]
fn render_draws_scene_offscreen_then_composites() {
    let mut renderer = RecordingRenderer::new(1.0);
    let mesh = particle_mesh(100, 1.0);
    let mut compositor = OffscreenCompositor::new(&mut renderer, 800, 600).unwrap();
    let target = compositor.target().texture();
    renderer.calls.clear();

    let scene = Scene::new().with(&mesh);
    compositor
        .render(&mut renderer, &scene, &scene_camera(), 0.016)
        .unwrap();

    assert_eq!(
        renderer.calls,
        vec![
            Call::SetTarget(Some(target)),
            Call::Render {
                objects: vec!["points"],
                target: Some(target),
            },
            Call::SetTarget(None),
            Call::Render {
                objects: vec!["fullscreen"],
                target: None,
            },
        ]
    );
    assert_eq!(renderer.renders(), 2);
    assert_eq!(compositor.time(), 0.016);
    assert_eq!(mesh.instance_count(), 100);
    assert!(mesh.field().positions().iter().all(|value| value.is_finite()));
}

#[test]
fn composite_quad_samples_the_offscreen_target() {
    let mut renderer = RecordingRenderer::new(1.0);
    let compositor = OffscreenCompositor::new(&mut renderer, 320, 200).unwrap();
    assert_eq!(
        compositor.quad().uniforms().texture_map,
        compositor.target().texture()
    );
    assert_eq!(compositor.resolution(), [320.0, 200.0]);
    assert_eq!(compositor.time(), 0.0);
    assert_eq!(compositor.noise_speed().get(), DEFAULT_NOISE_SPEED);
    assert_eq!(compositor.noise_amount().get(), DEFAULT_NOISE_AMOUNT);
}

#[test]
fn time_accumulates_across_frames() {
    let mut renderer = RecordingRenderer::new(1.0);
    let mut compositor = OffscreenCompositor::new(&mut renderer, 64, 64).unwrap();
    let scene = Scene::new();
    for delta in [0.5, 0.25, 0.25] {
        compositor
            .render(&mut renderer, &scene, &scene_camera(), delta)
            .unwrap();
    }
    assert_eq!(compositor.time(), 1.0);
    assert_eq!(renderer.renders(), 6);
}

#[test]
fn target_follows_pixel_ratio_through_resizes() {
    let mut renderer = RecordingRenderer::new(2.0);
    let mut compositor = OffscreenCompositor::new(&mut renderer, 800, 600).unwrap();
    assert_eq!(compositor.target().size(), (1600, 1200));
    assert_eq!(renderer.calls, vec![Call::CreateTarget(1600, 1200)]);

    compositor.resize(&mut renderer, 400, 300).unwrap();
    assert_eq!(compositor.target().size(), (800, 600));
    assert_eq!(compositor.resolution(), [800.0, 600.0]);

    renderer.pixel_ratio = 1.0;
    compositor.resize(&mut renderer, 400, 300).unwrap();
    assert_eq!(compositor.target().size(), (400, 300));
    assert_eq!(compositor.resolution(), [400.0, 300.0]);
}

#[test]
fn resize_is_idempotent() {
    let mut renderer = RecordingRenderer::new(2.0);
    let mut compositor = OffscreenCompositor::new(&mut renderer, 800, 600).unwrap();
    compositor.resize(&mut renderer, 640, 480).unwrap();
    let after_first = (compositor.target().clone(), compositor.resolution());
    let calls = renderer.calls.len();

    compositor.resize(&mut renderer, 640, 480).unwrap();
    assert_eq!((compositor.target().clone(), compositor.resolution()), after_first);
    assert_eq!(renderer.calls.len(), calls);
}

#[test]
fn zero_sized_resize_is_ignored() {
    let mut renderer = RecordingRenderer::new(1.0);
    let mut compositor = OffscreenCompositor::new(&mut renderer, 800, 600).unwrap();
    renderer.calls.clear();

    compositor.resize(&mut renderer, 0, 600).unwrap();
    compositor.resize(&mut renderer, 800, 0).unwrap();
    assert!(renderer.calls.is_empty());
    assert_eq!(compositor.target().size(), (800, 600));
    assert_eq!(compositor.resolution(), [800.0, 600.0]);
}

#[test]
fn zero_sized_construction_is_rejected() {
    let mut renderer = RecordingRenderer::new(1.0);
    let err = OffscreenCompositor::new(&mut renderer, 0, 600)
        .err()
        .expect("zero width must fail");
    assert!(matches!(
        err,
        RenderError::InvalidDimensions {
            width: 0,
            height: 600
        }
    ));
    assert!(renderer.calls.is_empty());
}

#[test]
fn allocation_failures_surface() {
    let mut renderer = RecordingRenderer::new(2.0);
    renderer.max_dimension = 1024;
    let err = OffscreenCompositor::new(&mut renderer, 800, 600)
        .err()
        .expect("1600x1200 exceeds the limit");
    assert!(matches!(
        err,
        RenderError::TargetAllocation {
            width: 1600,
            height: 1200,
            ..
        }
    ));

    renderer.pixel_ratio = 1.0;
    let mut compositor = OffscreenCompositor::new(&mut renderer, 800, 600).unwrap();
    let err = compositor
        .resize(&mut renderer, 2000, 600)
        .expect_err("resize beyond the limit must fail");
    assert!(matches!(err, RenderError::TargetAllocation { .. }));
    assert_eq!(compositor.target().size(), (800, 600));
}

#[test]
fn failed_scene_render_restores_default_target() {
    let mut renderer = RecordingRenderer::new(1.0);
    let mut compositor = OffscreenCompositor::new(&mut renderer, 128, 128).unwrap();
    let target = compositor.target().texture();
    renderer.calls.clear();
    renderer.fail_next_render = true;

    let result = compositor.render(&mut renderer, &Scene::new(), &scene_camera(), 0.1);
    assert!(matches!(result, Err(RenderError::Device(_))));
    assert_eq!(
        renderer.calls,
        vec![Call::SetTarget(Some(target)), Call::SetTarget(None)]
    );
    assert_eq!(renderer.active, None);
    assert_eq!(compositor.time(), 0.0);

    compositor
        .render(&mut renderer, &Scene::new(), &scene_camera(), 0.25)
        .unwrap();
    assert_eq!(compositor.time(), 0.25);
}

#[test]
fn publishes_noise_parameters() {
    let mut renderer = RecordingRenderer::new(1.0);
    let compositor = OffscreenCompositor::new(&mut renderer, 64, 64).unwrap();
    let mut registry = ParameterRegistry::new();
    compositor.publish(&mut registry);

    let names: Vec<_> = registry
        .entries()
        .iter()
        .map(|entry| entry.name.as_str())
        .collect();
    assert_eq!(names, ["noiseAmount", "noiseSpeed"]);
    assert_eq!(registry.get("noiseSpeed").unwrap().range(), (0.0, 1.0));

    assert_eq!(registry.set("noiseAmount", 2.0).unwrap(), 1.0);
    registry.set("noiseSpeed", 0.5).unwrap();
    assert_eq!(compositor.noise_amount().get(), 1.0);

    let block = compositor
        .quad()
        .uniforms()
        .block(compositor.camera().view_projection());
    assert_eq!(block.noise_amount, 1.0);
    assert_eq!(block.noise_speed, 0.5);
}

#[test]
fn publishing_to_a_custom_surface() {
    #[derive(Default)]
    struct Names(Vec<String>);

    impl ControlSurface for Names {
        fn publish(&mut self, name: &str, _handle: fieldfx::Tunable) {
            self.0.push(name.to_string());
        }
    }

    let mut renderer = RecordingRenderer::new(1.0);
    let compositor = OffscreenCompositor::new(&mut renderer, 64, 64).unwrap();
    let mesh = particle_mesh(4, 1.0);
    let mut names = Names::default();
    mesh.publish(&mut names);
    compositor.publish(&mut names);
    assert_eq!(
        names.0,
        ["light x", "light y", "light z", "noiseAmount", "noiseSpeed"]
    );
}

#[test]
fn custom_composite_shaders_are_validated() {
    let mut renderer = RecordingRenderer::new(1.0);
    let shaders = ShaderSource::new(
        "flat",
        fieldfx::shader::COMPOSITE_VERTEX_GLSL,
        "#version 450\nvoid main() {}\n",
    );
    let err = OffscreenCompositor::with_shaders(&mut renderer, 64, 64, shaders)
        .err()
        .expect("missing textureMap must fail");
    assert!(matches!(
        err,
        RenderError::MissingShaderSymbol {
            symbol: "textureMap",
            ..
        }
    ));
    assert!(renderer.calls.is_empty());
}
