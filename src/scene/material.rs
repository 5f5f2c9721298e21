use crate::util::Rgb;

/// Surface properties shared by all triangles of a model.
/// Copied by value into every BVH leaf entry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Rgb,
    /// 0.0 = matte, 1.0 = mirror
    pub reflectivity: f32,
    pub specular: f32,
}

impl Material {
    pub fn new(color: Rgb, reflectivity: f32, specular: f32) -> Material {
        Material {
            color,
            reflectivity: reflectivity.clamp(0.0, 1.0),
            specular: specular.max(0.0),
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::new(Rgb::new(0.8, 0.8, 0.8), 0.0, 0.0)
    }
}
