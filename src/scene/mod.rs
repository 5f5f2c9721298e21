pub mod light;
pub mod material;
pub mod model;
pub mod primitives;
pub mod triangle_bvh;

use bon::bon;
use thiserror::Error;

use crate::{
    geometry::{FloatType, Ray, WorldBox, WorldPoint, WorldVector},
    util::Rgb,
};

pub use light::Light;
pub use material::Material;
pub use model::{Model, ObjOpenError, Transform};
pub use primitives::Sphere;
use triangle_bvh::{BuildError, Primitive, StackCache, TriangleBvh};

/// Closest intersection found so far.
///
/// `t` doubles as the ceiling for further queries: anything at or beyond it is ignored,
/// so one record can be threaded through several objects.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HitRecord {
    pub hit: bool,
    pub t: FloatType,
    pub point: WorldPoint,
    /// Unit geometric normal, oriented by the triangle winding, not towards the ray
    pub normal: WorldVector,
    pub material: Material,
}

impl HitRecord {
    pub fn with_max_distance(t: FloatType) -> Self {
        HitRecord {
            hit: false,
            t,
            point: WorldPoint::origin(),
            normal: WorldVector::zeros(),
            material: Material::default(),
        }
    }

    /// Stores a hit at distance `t` along the ray.
    /// Callers are responsible for only recording hits closer than the current `t`.
    pub fn record(&mut self, ray: &Ray, t: FloatType, normal: WorldVector, material: Material) {
        debug_assert!(t < self.t);
        self.hit = true;
        self.t = t;
        self.point = ray.point_at(t);
        self.normal = normal;
        self.material = material;
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        HitRecord::with_max_distance(FloatType::INFINITY)
    }
}

/// Something rays can hit.
pub trait Object: Send + Sync {
    /// Updates `hit` if the object is hit closer than `hit.t`.
    /// Returns true if the record was updated.
    fn intersect(&self, ray: &Ray, hit: &mut HitRecord, stack: &mut StackCache) -> bool;

    /// Bounds of the object, `None` for objects without any geometry.
    fn bounding_box(&self) -> Option<WorldBox>;
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Failed to load model: {0}")]
    Model(#[from] ObjOpenError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Everything a renderer needs to trace rays.
///
/// Triangles of all models are snapshotted into a single BVH. After mutating
/// models through [`Scene::models_mut`], call [`Scene::rebuild`] to make the
/// changes visible to rays.
pub struct Scene {
    models: Vec<Model>,
    pub spheres: Vec<Sphere>,
    pub light: Light,
    pub sky: Rgb,
    bvh: TriangleBvh,
}

#[bon]
impl Scene {
    #[builder]
    pub fn new(
        #[builder(default)] models: Vec<Model>,
        #[builder(default)] spheres: Vec<Sphere>,
        #[builder(default)] light: Light,
        #[builder(default = Rgb::new(0.5, 0.7, 1.0))] sky: Rgb,
    ) -> Result<Self, SceneError> {
        let bvh = TriangleBvh::build(&collect_primitives(&models))?;
        Ok(Scene {
            models,
            spheres,
            light,
            sky,
            bvh,
        })
    }
}

impl Scene {
    pub fn models(&self) -> &[Model] {
        &self.models
    }

    /// Models can be changed freely,
    /// but rays keep seeing the old geometry until [`Scene::rebuild`].
    pub fn models_mut(&mut self) -> &mut Vec<Model> {
        &mut self.models
    }

    /// Replaces the BVH with a fresh snapshot of the models.
    /// The previous tree is kept if building fails.
    pub fn rebuild(&mut self) -> Result<(), SceneError> {
        self.bvh = TriangleBvh::build(&collect_primitives(&self.models))?;
        Ok(())
    }

    pub fn bvh(&self) -> &TriangleBvh {
        &self.bvh
    }

    pub fn objects(&self) -> impl Iterator<Item = &dyn Object> {
        std::iter::once(&self.bvh as &dyn Object)
            .chain(self.spheres.iter().map(|s| s as &dyn Object))
    }

    /// Finds the closest hit among all objects, closer than `hit.t`.
    pub fn intersect(&self, ray: &Ray, hit: &mut HitRecord, stack: &mut StackCache) -> bool {
        let mut found = false;
        for object in self.objects() {
            found |= object.intersect(ray, hit, stack);
        }
        found
    }

    /// Checks whether anything blocks the ray before `distance`.
    pub fn occluded(&self, ray: &Ray, distance: FloatType, stack: &mut StackCache) -> bool {
        let mut hit = HitRecord::with_max_distance(distance);
        self.objects()
            .any(|object| object.intersect(ray, &mut hit, stack))
    }

    pub fn bounding_box(&self) -> Option<WorldBox> {
        self.objects()
            .filter_map(|object| object.bounding_box())
            .reduce(|a, b| a.union(&b))
    }

    pub fn stack_cache(&self) -> StackCache {
        self.bvh.stack_cache()
    }
}

fn collect_primitives(models: &[Model]) -> Vec<Primitive> {
    models
        .iter()
        .flat_map(|model| {
            model.world_triangles().map(|triangle| Primitive {
                triangle,
                material: model.material,
            })
        })
        .collect()
}
