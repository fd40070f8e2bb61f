use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Viewer configuration. Every section is optional and falls back to the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub particles: ParticleConfig,
    #[serde(default)]
    pub post: PostConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    pub high_performance: bool,
    /// Background behind the particles, linear RGB in `[0, 1]`.
    pub clear_color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub distance: f32,
    pub near: f32,
    pub far: f32,
    /// Radians per second around the Y axis; zero keeps the camera still.
    pub orbit_speed: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub size_min: f32,
    pub size_max: f32,
    pub radius_min: f32,
    pub radius_max: f32,
    pub light_direction: [f32; 3],
    /// Edge length of the generated sphere normal map, in texels.
    pub normal_map_size: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PostConfig {
    pub noise_speed: f32,
    pub noise_amount: f32,
}

fn default_version() -> u32 {
    1
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            window: WindowConfig::default(),
            camera: CameraConfig::default(),
            particles: ParticleConfig::default(),
            post: PostConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "pointfield".into(),
            vsync: true,
            high_performance: false,
            clear_color: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            distance: 100.0,
            near: 0.1,
            far: 1000.0,
            orbit_speed: 0.1,
        }
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 4000,
            seed: None,
            size_min: 0.1,
            size_max: 5.0,
            radius_min: 10.0,
            radius_max: 50.0,
            light_direction: [1.0, 1.0, 1.0],
            normal_map_size: 64,
        }
    }
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            noise_speed: 0.18,
            noise_amount: 0.35,
        }
    }
}

impl FieldConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FieldConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        let window = &self.window;
        if window.width == 0 || window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero (got {}x{})",
                window.width, window.height
            )));
        }

        if let Some(component) = window
            .clear_color
            .iter()
            .find(|value| !(0.0..=1.0).contains(*value))
        {
            return Err(ConfigError::Invalid(format!(
                "window.clear_color components must lie in [0, 1] (got {component})"
            )));
        }

        let camera = &self.camera;
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov must be between 0 and 180 degrees (got {})",
                camera.fov
            )));
        }
        if !(camera.near > 0.0 && camera.near < camera.far) {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (got {}..{})",
                camera.near, camera.far
            )));
        }
        if !camera.distance.is_finite() || camera.distance <= 0.0 {
            return Err(ConfigError::Invalid(
                "camera.distance must be greater than zero".into(),
            ));
        }
        if !camera.orbit_speed.is_finite() {
            return Err(ConfigError::Invalid("camera.orbit_speed must be finite".into()));
        }

        let particles = &self.particles;
        if particles.count == 0 {
            return Err(ConfigError::Invalid(
                "particles.count must be greater than zero".into(),
            ));
        }
        validate_range("particles.size", particles.size_min, particles.size_max)?;
        validate_range(
            "particles.radius",
            particles.radius_min,
            particles.radius_max,
        )?;
        if let Some(component) = particles
            .light_direction
            .iter()
            .find(|value| !(-1.0..=1.0).contains(*value))
        {
            return Err(ConfigError::Invalid(format!(
                "particles.light_direction components must lie in [-1, 1] (got {component})"
            )));
        }
        if particles.normal_map_size == 0 {
            return Err(ConfigError::Invalid(
                "particles.normal_map_size must be greater than zero".into(),
            ));
        }

        for (name, value) in [
            ("post.noise_speed", self.post.noise_speed),
            ("post.noise_amount", self.post.noise_amount),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must lie in [0, 1] (got {value})"
                )));
            }
        }

        Ok(())
    }
}

fn validate_range(name: &str, min: f32, max: f32) -> Result<(), ConfigError> {
    if !(min.is_finite() && max.is_finite()) || min < 0.0 || min >= max {
        return Err(ConfigError::Invalid(format!(
            "{name} range must satisfy 0 <= min < max (got {min}..{max})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"
version = 1

[window]
width = 800
height = 600
title = "field"
vsync = false
clear_color = [0.1, 0.0, 0.2]

[camera]
fov = 60.0
orbit_speed = 0.0

[particles]
count = 100
seed = 7
size_min = 0.5
size_max = 2.0
radius_min = 5.0
radius_max = 20.0
light_direction = [0.0, 1.0, -0.5]

[post]
noise_speed = 0.5
noise_amount = 0.0
"#;

    #[test]
    fn parses_sample_config() {
        let config = FieldConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.title, "field");
        assert!(!config.window.vsync);
        assert_eq!(config.window.clear_color, [0.1, 0.0, 0.2]);
        assert_eq!(config.camera.fov, 60.0);
        assert_eq!(config.camera.distance, 100.0);
        assert_eq!(config.particles.count, 100);
        assert_eq!(config.particles.seed, Some(7));
        assert_eq!(config.particles.light_direction, [0.0, 1.0, -0.5]);
        assert_eq!(config.particles.normal_map_size, 64);
        assert_eq!(config.post.noise_speed, 0.5);
        assert_eq!(config.post.noise_amount, 0.0);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = FieldConfig::from_toml_str("").expect("defaults");
        assert_eq!(config, FieldConfig::default());
        assert_eq!(config.particles.count, 4000);
        assert_eq!(config.particles.seed, None);
        assert_eq!(config.post.noise_speed, 0.18);
        assert_eq!(config.post.noise_amount, 0.35);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = FieldConfig::from_toml_str("[particles]\ncount = 12\n").unwrap();
        assert_eq!(config.particles.count, 12);
        assert_eq!(config.particles.size_min, 0.1);
        assert_eq!(config.particles.radius_max, 50.0);
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = FieldConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_particles() {
        let err = FieldConfig::from_toml_str("[particles]\ncount = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("count")));
    }

    #[test]
    fn rejects_inverted_ranges() {
        let err =
            FieldConfig::from_toml_str("[particles]\nradius_min = 60.0\nradius_max = 50.0\n")
                .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("radius")));
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let err = FieldConfig::from_toml_str("[post]\nnoise_amount = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("noise_amount")));

        let err = FieldConfig::from_toml_str("[particles]\nlight_direction = [2.0, 0.0, 0.0]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = FieldConfig::from_toml_str("[window]\nclear_color = [0.0, 1.5, 0.0]\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("clear_color")));
    }

    #[test]
    fn reports_parse_errors() {
        let err = FieldConfig::from_toml_str("[window]\nwidth = \"wide\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = FieldConfig::from_path(file.path()).unwrap();
        assert_eq!(config.particles.count, 100);

        let missing = file.path().with_extension("missing");
        let err = FieldConfig::from_path(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn serialised_defaults_parse_back() {
        let text = FieldConfig::default().to_toml_string().unwrap();
        let parsed = FieldConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, FieldConfig::default());
    }
}
