pub mod camera;
pub mod config;
pub mod geometry;
pub mod renderer;
pub mod scene;
mod screen_block;
pub mod util;

pub use crate::renderer::{RenderProgress, RenderSettings, render};
pub use camera::Camera;
pub use config::SceneConfig;
pub use scene::Scene;
