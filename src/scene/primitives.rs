use crate::geometry::{EPSILON, FloatType, Ray, WorldBox, WorldPoint, WorldVector};

use super::{HitRecord, Material, Object, triangle_bvh::StackCache};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Sphere {
    pub center: WorldPoint,
    pub radius: FloatType,
    pub material: Material,
}

impl Sphere {
    pub fn new(center: WorldPoint, radius: FloatType, material: Material) -> Self {
        Sphere {
            center,
            radius,
            material,
        }
    }

    /// Distance to the nearest intersection in `[EPSILON, max_t)`.
    /// A ray starting inside the sphere hits it from the inside.
    pub fn intersect_distance(&self, ray: &Ray, max_t: FloatType) -> Option<FloatType> {
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        [-b - sqrt_disc, -b + sqrt_disc]
            .into_iter()
            .find(|t| *t >= EPSILON && *t < max_t)
    }
}

impl Object for Sphere {
    fn intersect(&self, ray: &Ray, hit: &mut HitRecord, _stack: &mut StackCache) -> bool {
        let Some(t) = self.intersect_distance(ray, hit.t) else {
            return false;
        };
        let normal = (ray.point_at(t) - self.center).normalize();
        hit.record(ray, t, normal, self.material);
        true
    }

    fn bounding_box(&self) -> Option<WorldBox> {
        let r_vec = WorldVector::repeat(self.radius);
        Some(WorldBox {
            min: self.center - r_vec,
            max: self.center + r_vec,
        })
    }
}
