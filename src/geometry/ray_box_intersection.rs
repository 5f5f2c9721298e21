use super::{FloatType, Ray, WorldBox};

/// Exit distances get scaled by this before narrowing, so that rays touching an edge or
/// a corner survive rounding of the origin and of the slab distances.
const EXIT_DISTANCE_SCALE: FloatType = 1.0 + 16.0 * FloatType::EPSILON;

pub trait RayIntersectionExt {
    /// Checks whether the ray passes through the box somewhere within `[t_min, t_max]`.
    fn intersects(&self, ray: &Ray, t_min: FloatType, t_max: FloatType) -> bool;
}

impl RayIntersectionExt for WorldBox {
    /// Slab test: narrows the parametric interval axis by axis and bails out
    /// once it is empty.
    fn intersects(&self, ray: &Ray, mut t_min: FloatType, mut t_max: FloatType) -> bool {
        for axis in 0..3 {
            let inv = ray.inv_direction[axis];

            let mut t0 = (self.min[axis] - ray.origin[axis]) * inv;
            let mut t1 = (self.max[axis] - ray.origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }

            // The multiplication is NAN if the ray is starting on the slab bounding plane
            // and is parallel to it, or if the box itself has NAN bounds. In this case we
            // blend to +-infinity, so that the range of this axis becomes infinite and the
            // ray counts as inside the slab.
            if t0.is_nan() {
                t0 = FloatType::NEG_INFINITY;
            }
            if t1.is_nan() {
                t1 = FloatType::INFINITY;
            }
            t1 *= EXIT_DISTANCE_SCALE;

            t_min = t_min.max(t0);
            t_max = t_max.min(t1);

            // Touching is still a hit, flat boxes around axis aligned triangles
            // have identical entry and exit distances.
            if t_max < t_min {
                return false;
            }
        }
        true
    }
}
