//! Scene files.
//!
//! Scenes are TOML documents, every table is optional:
//!
//! ```toml
//! sky = [0.5, 0.7, 1.0]
//!
//! [camera]
//! position = [0.0, 2.0, 6.0]
//! pitch = -10.0
//!
//! [[model]]
//! mesh = { kind = "obj", path = "teapot.obj" }
//! scale = 0.5
//! material = { color = [0.9, 0.2, 0.2], specular = 0.5 }
//!
//! [[sphere]]
//! center = [2.0, 1.0, 0.0]
//! radius = 1.0
//! ```

use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    camera::Camera,
    geometry::{FloatType, ScreenSize, WorldPoint, WorldVector},
    renderer::RenderSettings,
    scene::{Light, Material, Model, Scene, SceneError, Sphere, Transform},
    util::Rgb,
};

const DEMO_SCENE: &str = include_str!("../scenes/demo.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid scene: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub sky: Option<[FloatType; 3]>,
    pub render: RenderConfig,
    #[serde(rename = "model")]
    pub models: Vec<ModelConfig>,
    #[serde(rename = "sphere")]
    pub spheres: Vec<SphereConfig>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [FloatType; 3],
    /// Degrees
    pub yaw: FloatType,
    /// Degrees
    pub pitch: FloatType,
    /// Vertical field of view in degrees
    pub fov: FloatType,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            position: [0.0, 1.0, 5.0],
            yaw: -90.0,
            pitch: 0.0,
            fov: 60.0,
            width: 640,
            height: 480,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LightConfig {
    pub position: [FloatType; 3],
    pub color: [FloatType; 3],
    pub intensity: FloatType,
}

impl Default for LightConfig {
    fn default() -> Self {
        let light = Light::default();
        LightConfig {
            position: light.position.into(),
            color: [light.color.r, light.color.g, light.color.b],
            intensity: light.intensity,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub tile_size: NonZeroU32,
    pub samples: NonZeroU32,
    pub bounces: u32,
    /// One worker per core when missing
    pub threads: Option<NonZeroUsize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let settings = RenderSettings::default();
        RenderConfig {
            tile_size: settings.tile_size,
            samples: settings.sample_count,
            bounces: settings.max_bounces,
            threads: settings.worker_count,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MaterialConfig {
    pub color: [FloatType; 3],
    pub reflectivity: FloatType,
    pub specular: FloatType,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        let material = Material::default();
        MaterialConfig {
            color: [material.color.r, material.color.g, material.color.b],
            reflectivity: material.reflectivity,
            specular: material.specular,
        }
    }
}

impl From<&MaterialConfig> for Material {
    fn from(config: &MaterialConfig) -> Self {
        Material::new(rgb(config.color), config.reflectivity, config.specular)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum MeshConfig {
    /// Path is relative to the scene file
    Obj { path: PathBuf },
    Cube,
    Plane,
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScaleConfig {
    Uniform(FloatType),
    PerAxis([FloatType; 3]),
}

impl From<ScaleConfig> for WorldVector {
    fn from(scale: ScaleConfig) -> Self {
        match scale {
            ScaleConfig::Uniform(s) => WorldVector::repeat(s),
            ScaleConfig::PerAxis(s) => s.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub mesh: MeshConfig,
    #[serde(default)]
    pub position: [FloatType; 3],
    /// Euler angles in degrees
    #[serde(default)]
    pub rotation: [FloatType; 3],
    #[serde(default = "unit_scale")]
    pub scale: ScaleConfig,
    #[serde(default)]
    pub material: MaterialConfig,
}

fn unit_scale() -> ScaleConfig {
    ScaleConfig::Uniform(1.0)
}

impl ModelConfig {
    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position.into(),
            rotation: WorldVector::from(self.rotation).map(FloatType::to_radians),
            scale: self.scale.into(),
        }
    }

    /// Loads the mesh, OBJ paths are resolved against `base_dir`.
    pub fn load(&self, base_dir: &Path) -> Result<Model, SceneError> {
        let material = Material::from(&self.material);
        let mut model = match &self.mesh {
            MeshConfig::Obj { path } => Model::with_obj(base_dir.join(path), material)?,
            MeshConfig::Cube => Model::cube(material),
            MeshConfig::Plane => Model::plane(material),
        };
        model.transform = self.transform();
        Ok(model)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SphereConfig {
    pub center: [FloatType; 3],
    pub radius: FloatType,
    #[serde(default)]
    pub material: MaterialConfig,
}

impl SceneConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<SceneConfig, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config = content.parse::<SceneConfig>()?;
        log::info!("Loaded scene {}", path.display());
        Ok(config)
    }

    /// The built-in demo scene.
    pub fn demo() -> Result<SceneConfig, ConfigError> {
        DEMO_SCENE.parse()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if camera.width == 0 || camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Resolution must be non-zero, got {}x{}",
                camera.width, camera.height
            )));
        }
        if !(camera.fov > 0.0 && camera.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "Field of view must be between 0 and 180 degrees, got {}",
                camera.fov
            )));
        }
        if let Some(sphere) = self.spheres.iter().find(|s| !(s.radius > 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "Sphere radius must be positive, got {}",
                sphere.radius
            )));
        }
        Ok(())
    }

    pub fn camera(&self) -> Camera {
        Camera::builder()
            .position(WorldPoint::from(self.camera.position))
            .yaw(self.camera.yaw)
            .pitch(self.camera.pitch)
            .fov(self.camera.fov)
            .resolution(ScreenSize::new(self.camera.width, self.camera.height))
            .build()
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            tile_size: self.render.tile_size,
            sample_count: self.render.samples,
            max_bounces: self.render.bounces,
            worker_count: self.render.threads,
        }
    }

    /// Loads all models and builds the scene.
    /// Relative mesh paths are resolved against `base_dir`.
    pub fn to_scene(&self, base_dir: &Path) -> Result<Scene, SceneError> {
        let models = self
            .models
            .iter()
            .map(|model| model.load(base_dir))
            .collect::<Result<Vec<_>, _>>()?;
        let spheres = self
            .spheres
            .iter()
            .map(|s| Sphere::new(s.center.into(), s.radius, (&s.material).into()))
            .collect();
        let light = Light {
            position: self.light.position.into(),
            color: rgb(self.light.color),
            intensity: self.light.intensity,
        };

        Scene::builder()
            .models(models)
            .spheres(spheres)
            .light(light)
            .maybe_sky(self.sky.map(rgb))
            .build()
    }
}

impl FromStr for SceneConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SceneConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn rgb(c: [FloatType; 3]) -> Rgb {
    Rgb::new(c[0], c[1], c[2])
}
