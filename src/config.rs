use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::renderer::frame::{Projection, RenderMode};
use crate::renderer::lighting::{Light, MAX_LIGHTS, default_lights};
use crate::terrain::GenerationParams;

/// Looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "terrain3d.toml";
/// Largest accepted grid side.
pub const MAX_GRID_SIDE: u32 = 4096;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// 0 wireframe, 1 fill, 2 points.
    pub mode: u32,
    pub vsync: bool,
    /// Fixed aspect ratio; follows the window when unset.
    pub aspect: Option<f32>,
    pub near: f32,
    pub far: f32,
    /// Lights uploaded per frame, at most 16.
    pub max_lights: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let projection = Projection::default();
        Self {
            mode: RenderMode::Fill.into(),
            vsync: true,
            aspect: None,
            near: projection.near,
            far: projection.far,
            max_lights: MAX_LIGHTS,
        }
    }
}

impl RenderConfig {
    pub fn render_mode(&self) -> RenderMode {
        RenderMode::try_from(self.mode).unwrap_or_default()
    }

    /// Projection for a window of aspect `window_aspect`, unless overridden.
    pub fn projection(&self, window_aspect: f32) -> Projection {
        Projection {
            aspect: self.aspect.unwrap_or(window_aspect),
            near: self.near,
            far: self.far,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            position: Vec3::new(0.0, 40.0, 100.0),
            target: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub terrain: GenerationParams,
    pub render: RenderConfig,
    pub camera: CameraConfig,
    pub lights: Vec<Light>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            terrain: GenerationParams::default(),
            render: RenderConfig::default(),
            camera: CameraConfig::default(),
            lights: default_lights(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::info!(path = %path.display(), lights = config.lights.len(), "configuration loaded");
        Ok(config)
    }

    /// Picks the config file: the first argument if given, otherwise
    /// [`DEFAULT_CONFIG_FILE`] in `dir` when it exists.
    pub fn locate(mut args: impl Iterator<Item = String>, dir: &Path) -> Option<PathBuf> {
        if let Some(arg) = args.next() {
            return Some(PathBuf::from(arg));
        }
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    }

    /// Loads the located file, or falls back to defaults when there is none.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("no configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.terrain;
        for (name, side) in [("terrain.width", t.width), ("terrain.height", t.height)] {
            if side == 0 || side > MAX_GRID_SIDE {
                return Err(invalid(format!("{name} must be in 1..={MAX_GRID_SIDE}, got {side}")));
            }
        }
        finite("terrain.scale", t.scale)?;
        finite("terrain.frequency", t.frequency)?;
        finite("terrain.amplitude", t.amplitude)?;

        let r = &self.render;
        RenderMode::try_from(r.mode).map_err(|e| invalid(e.to_string()))?;
        finite("render.near", r.near)?;
        finite("render.far", r.far)?;
        if r.near <= 0.0 || r.near >= r.far {
            return Err(invalid(format!(
                "render.near must be positive and below render.far, got {} and {}",
                r.near, r.far
            )));
        }
        if r.max_lights > MAX_LIGHTS {
            return Err(invalid(format!(
                "render.max_lights must be at most {MAX_LIGHTS}, got {}",
                r.max_lights
            )));
        }
        if let Some(aspect) = r.aspect {
            finite("render.aspect", aspect)?;
            if aspect <= 0.0 {
                return Err(invalid(format!("render.aspect must be positive, got {aspect}")));
            }
        }

        let c = &self.camera;
        finite("camera.fov_degrees", c.fov_degrees)?;
        if c.fov_degrees <= 0.0 || c.fov_degrees >= 180.0 {
            return Err(invalid(format!(
                "camera.fov_degrees must be between 0 and 180, got {}",
                c.fov_degrees
            )));
        }
        if !c.position.is_finite() || !c.target.is_finite() {
            return Err(invalid("camera position and target must be finite".to_string()));
        }

        for (i, light) in self.lights.iter().enumerate() {
            if !light.position.is_finite() || !light.color.is_finite() {
                return Err(invalid(format!("lights[{i}] has a non-finite component")));
            }
        }
        Ok(())
    }
}

fn finite(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be finite, got {value}")))
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}
