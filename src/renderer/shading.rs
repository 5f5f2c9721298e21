//! Whitted style shading of camera rays.

use crate::{
    geometry::{FloatType, Ray, WorldVector},
    scene::{HitRecord, Scene, triangle_bvh::StackCache},
    util::Rgb,
};

/// Fraction of the surface color visible without any direct light.
pub const AMBIENT: FloatType = 0.1;

/// Phong exponent of specular highlights.
pub const SHININESS: FloatType = 32.0;

/// Offset of secondary ray origins along the normal, keeps them from hitting their own surface.
pub const SURFACE_BIAS: FloatType = 1e-3;

/// Traces a ray through the scene and returns its color.
/// `bounces` limits how many mirror reflections are followed.
pub fn trace(scene: &Scene, ray: &Ray, bounces: u32, stack: &mut StackCache) -> Rgb {
    let mut hit = HitRecord::default();
    if !scene.intersect(ray, &mut hit, stack) {
        return scene.sky;
    }

    // Hit records keep the winding normal, shading wants the side facing the ray
    let normal = if hit.normal.dot(&ray.direction) > 0.0 {
        -hit.normal
    } else {
        hit.normal
    };
    let material = hit.material;
    let surface = hit.point + normal * SURFACE_BIAS;

    let mut color = material.color * AMBIENT;

    let to_light = scene.light.position - hit.point;
    let light_distance = to_light.norm();
    let light_direction = to_light / light_distance;
    let lambert = normal.dot(&light_direction);

    if lambert > 0.0 {
        let shadow_ray = Ray::new(surface, light_direction);
        if !scene.occluded(&shadow_ray, light_distance - SURFACE_BIAS, stack) {
            let radiance = scene.light.radiance();
            color += modulate(material.color, radiance) * lambert;

            if material.specular > 0.0 {
                let highlight = reflect(&-light_direction, &normal)
                    .dot(&-ray.direction)
                    .max(0.0)
                    .powf(SHININESS);
                color += radiance * (highlight * material.specular);
            }
        }
    }

    if material.reflectivity > 0.0 && bounces > 0 {
        let reflected_ray = Ray::new(surface, reflect(&ray.direction, &normal));
        let reflection = trace(scene, &reflected_ray, bounces - 1, stack);
        color = color * (1.0 - material.reflectivity) + reflection * material.reflectivity;
    }

    color
}

fn reflect(direction: &WorldVector, normal: &WorldVector) -> WorldVector {
    direction - normal * (2.0 * direction.dot(normal))
}

fn modulate(a: Rgb, b: Rgb) -> Rgb {
    Rgb::new(a.r * b.r, a.g * b.g, a.b * b.b)
}
