use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use fieldconfig::FieldConfig;
use fieldfx::SurfaceError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::Cli;
use crate::viewer::{describe_parameters, Viewer};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Reads the configuration file (if any) and applies the command-line overrides.
pub(crate) fn load_config(cli: &Cli) -> Result<FieldConfig> {
    let mut config = match &cli.config {
        Some(path) => FieldConfig::from_path(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => FieldConfig::default(),
    };
    if let Some(count) = cli.particles {
        config.particles.count = count;
    }
    if let Some(seed) = cli.seed {
        config.particles.seed = Some(seed);
    }
    config
        .validate()
        .context("invalid configuration after applying command-line overrides")?;
    Ok(config)
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let mut viewer = Viewer::new(Arc::new(window), &config)?;
    viewer.apply_overrides(&cli.overrides)?;

    if cli.list_params {
        for line in describe_parameters(viewer.registry()) {
            println!("{line}");
        }
        return Ok(());
    }

    let window_id = viewer.window().id();
    info!(
        particles = config.particles.count,
        width = config.window.width,
        height = config.window.height,
        "viewer ready"
    );

    let mut result = Ok(());
    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id: id, event } if id == window_id => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => elwt.exit(),
            WindowEvent::Resized(size) => {
                if let Err(err) = viewer.resize(size) {
                    error!("failed to resize viewer: {err:?}");
                    result = Err(err);
                    elwt.exit();
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                viewer.set_scale_factor(scale_factor);
            }
            WindowEvent::RedrawRequested => {
                let Err(err) = viewer.render_frame() else {
                    return;
                };
                match err.as_surface_error().cloned() {
                    Some(SurfaceError::Lost | SurfaceError::Outdated) => {
                        warn!("surface lost or outdated; reconfiguring");
                        viewer.recover_surface();
                    }
                    Some(SurfaceError::OutOfMemory) => {
                        error!("surface out of memory; exiting");
                        result = Err(anyhow!(err));
                        elwt.exit();
                    }
                    Some(SurfaceError::Timeout) => {
                        warn!("surface timeout; retrying next frame");
                    }
                    Some(other) => {
                        warn!("surface error: {other:?}; retrying next frame");
                    }
                    None => {
                        error!(error = %err, "failed to render frame");
                        result = Err(anyhow!(err).context("failed to render frame"));
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => viewer.window().request_redraw(),
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))?;
    result
}
