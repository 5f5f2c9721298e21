use crate::{
    geometry::{FloatType, WorldPoint},
    util::Rgb,
};

/// Point light.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    pub position: WorldPoint,
    pub color: Rgb,
    pub intensity: FloatType,
}

impl Light {
    /// Color the light contributes, before any falloff or shading terms.
    pub fn radiance(&self) -> Rgb {
        self.color * self.intensity
    }
}

impl Default for Light {
    fn default() -> Self {
        Light {
            position: WorldPoint::new(5.0, 10.0, 5.0),
            color: Rgb::new(1.0, 1.0, 1.0),
            intensity: 1.0,
        }
    }
}
