use image::RgbaImage;
use rand::{SeedableRng, rngs::SmallRng};

use crate::{
    camera::Camera,
    geometry::{ScreenBlock, ScreenPoint},
    renderer::{RenderSettings, shading},
    scene::{Scene, triangle_bvh::StackCache},
    screen_block::ScreenBlockExt as _,
    util::{Rgb, linear_to_srgb8},
};

/// Per thread rendering state.
pub struct Worker {
    rng: SmallRng,
    stack_cache: StackCache,
}

impl Worker {
    pub fn new(worker_id: usize, scene: &Scene) -> Self {
        log::debug!("Starting worker {worker_id}");
        Self {
            rng: SmallRng::from_os_rng(),
            stack_cache: scene.stack_cache(),
        }
    }

    /// Renders a tile into the top left corner of `buffer`.
    pub fn render_tile(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
        tile: &ScreenBlock,
        buffer: &mut RgbaImage,
    ) {
        let sample_count = settings.sample_count.get();
        for point in tile.internal_points() {
            let mut pixel_sum = Rgb::new(0.0, 0.0, 0.0);
            for _i in 0..sample_count {
                pixel_sum += self.render_sample(scene, camera, settings, &point);
            }
            let pixel = pixel_sum * (1.0 / sample_count as f32);

            let buffer_position = point - tile.min;
            buffer.put_pixel(buffer_position.x, buffer_position.y, color_to_image(pixel));
        }
    }

    fn render_sample(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
        point: &ScreenPoint,
    ) -> Rgb {
        // A single sample goes through the pixel center so that the image stays deterministic
        let ray = if settings.sample_count.get() == 1 {
            camera.pixel_ray(point)
        } else {
            camera.sample_ray(point, &mut self.rng)
        };
        shading::trace(scene, &ray, settings.max_bounces, &mut self.stack_cache)
    }
}

/// Maps a linear rgb pixel to an opaque sRGB pixel compatible with module image.
pub fn color_to_image(color: Rgb) -> image::Rgba<u8> {
    image::Rgba([
        linear_to_srgb8(color.r),
        linear_to_srgb8(color.g),
        linear_to_srgb8(color.b),
        255,
    ])
}
