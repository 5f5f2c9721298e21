use assert2::assert;
use bon::bon;

use crate::geometry::{FloatType, Ray, ScreenPoint, ScreenSize, WorldPoint, WorldVector};

/// Pitch is kept away from the poles, where the basis degenerates.
pub const MAX_PITCH: FloatType = 89.0;

/// First person camera, oriented by yaw and pitch in degrees.
///
/// Yaw of -90 degrees looks down the negative z axis, positive pitch looks up.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    position: WorldPoint,
    resolution: ScreenSize,

    yaw: FloatType,
    pitch: FloatType,

    front: WorldVector,
    right: WorldVector,
    up: WorldVector,

    /// Half of the viewport size at unit distance from the camera
    half_extent: (FloatType, FloatType),
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        position: WorldPoint,
        #[builder(default = -90.0)] yaw: FloatType,
        #[builder(default)] pitch: FloatType,
        // Vertical, in degrees
        #[builder(default = 60.0)] fov: FloatType,
        resolution: ScreenSize,
    ) -> Self {
        assert!(resolution.x > 0);
        assert!(resolution.y > 0);
        assert!(fov > 0.0 && fov < 180.0);

        let half_height = (fov.to_radians() / 2.0).tan();
        let aspect = resolution.x as FloatType / resolution.y as FloatType;

        let mut camera = Camera {
            position,
            resolution,
            yaw: 0.0,
            pitch: 0.0,
            front: WorldVector::zeros(),
            right: WorldVector::zeros(),
            up: WorldVector::zeros(),
            half_extent: (half_height * aspect, half_height),
        };
        camera.set_orientation(yaw, pitch);
        camera
    }
}

impl Camera {
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    pub fn front(&self) -> WorldVector {
        self.front
    }

    pub fn yaw(&self) -> FloatType {
        self.yaw
    }

    pub fn pitch(&self) -> FloatType {
        self.pitch
    }

    pub fn set_position(&mut self, position: WorldPoint) {
        self.position = position;
    }

    /// Sets the view direction, pitch gets clamped to +-[`MAX_PITCH`].
    pub fn set_orientation(&mut self, yaw: FloatType, pitch: FloatType) {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);

        let (yaw_sin, yaw_cos) = self.yaw.to_radians().sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.to_radians().sin_cos();

        self.front =
            WorldVector::new(yaw_cos * pitch_cos, pitch_sin, yaw_sin * pitch_cos).normalize();
        self.right = self.front.cross(&WorldVector::y()).normalize();
        self.up = self.right.cross(&self.front);
    }

    /// Ray through a continuous position on the image.
    /// (0, 0) is the top left corner of the image, pixel centers are at half-integer coordinates.
    pub fn ray_through(&self, x: FloatType, y: FloatType) -> Ray {
        let u = 2.0 * x / self.resolution.x as FloatType - 1.0;
        let v = 1.0 - 2.0 * y / self.resolution.y as FloatType;
        let direction =
            self.front + self.right * (u * self.half_extent.0) + self.up * (v * self.half_extent.1);
        Ray::new(self.position, direction)
    }

    /// Ray through the center of a pixel.
    pub fn pixel_ray(&self, point: &ScreenPoint) -> Ray {
        self.ray_through(point.x as FloatType + 0.5, point.y as FloatType + 0.5)
    }

    /// Ray through a uniformly random position inside a pixel.
    pub fn sample_ray(&self, point: &ScreenPoint, rng: &mut impl rand::Rng) -> Ray {
        let x = point.x as FloatType + rng.random::<FloatType>();
        let y = point.y as FloatType + rng.random::<FloatType>();
        self.ray_through(x, y)
    }
}
