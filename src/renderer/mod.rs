mod machinery;
pub mod shading;
mod worker;

use std::num::{NonZeroU32, NonZeroUsize};

pub use crate::renderer::machinery::{RenderProgress, render};

#[derive(Copy, Clone, Debug)]
pub struct RenderSettings {
    pub tile_size: NonZeroU32,
    pub sample_count: NonZeroU32,
    /// Maximum number of mirror reflections followed from a camera ray
    pub max_bounces: u32,
    /// `None` means one worker per CPU core
    pub worker_count: Option<NonZeroUsize>,
}

const DEFAULT_TILE_SIZE: NonZeroU32 = NonZeroU32::new(32).unwrap();

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            tile_size: DEFAULT_TILE_SIZE,
            sample_count: NonZeroU32::MIN,
            max_bounces: 3,
            worker_count: None,
        }
    }
}
