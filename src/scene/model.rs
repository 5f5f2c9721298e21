use std::{fs, path::Path};

use nalgebra::{Matrix4, Rotation3, Vector3};
use thiserror::Error;

use crate::geometry::{FloatType, Triangle, WorldPoint, WorldTriangle, WorldVector};

use super::Material;

#[derive(Debug, Error)]
pub enum ObjOpenError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    ParseError(#[from] wavefront_obj::ParseError),
}

/// Placement of a model in the world.
/// Applied as scale, rotation around z, x and y (in that order), then translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: WorldVector,
    /// Euler angles in radians
    pub rotation: WorldVector,
    pub scale: WorldVector,
}

impl Transform {
    pub fn matrix(&self) -> Matrix4<FloatType> {
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation.y)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation.x)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation.z);
        Matrix4::new_translation(&self.position)
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: WorldVector::zeros(),
            rotation: WorldVector::zeros(),
            scale: WorldVector::repeat(1.0),
        }
    }
}

/// Triangle mesh with a single material.
#[derive(Clone, Debug)]
pub struct Model {
    /// Object space triangles
    pub triangles: Vec<WorldTriangle>,
    pub transform: Transform,
    pub material: Material,
}

impl Model {
    pub fn new(triangles: Vec<WorldTriangle>, material: Material) -> Self {
        Model {
            triangles,
            transform: Transform::default(),
            material,
        }
    }

    /// Loads triangles from a Wavefront OBJ file.
    /// Polygons are triangulated by the parser, points and lines are skipped.
    pub fn with_obj(path: impl AsRef<Path>, material: Material) -> Result<Model, ObjOpenError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let parsed = wavefront_obj::obj::parse(content)?;

        let mut triangles = Vec::new();
        let mut vertex_count = 0;
        let mut skipped = 0usize;

        for o in parsed.objects {
            vertex_count += o.vertices.len();
            let vertex = |index: usize| {
                let v = &o.vertices[index];
                WorldPoint::new(v.x as f32, v.y as f32, v.z as f32)
            };

            for geometry in &o.geometry {
                for shape in &geometry.shapes {
                    let wavefront_obj::obj::Primitive::Triangle(a, b, c) = &shape.primitive else {
                        skipped += 1;
                        continue;
                    };
                    triangles.push(Triangle::new(vertex(a.0), vertex(b.0), vertex(c.0)));
                }
            }
        }

        if skipped > 0 {
            log::warn!(
                "{}: skipped {skipped} non-triangle primitives",
                path.display()
            );
        }
        log::info!(
            "Loaded {}: {vertex_count} vertices, {} triangles",
            path.display(),
            triangles.len()
        );

        Ok(Model::new(triangles, material))
    }

    /// Axis aligned cube with unit edges, centered at the origin.
    /// Triangles are wound counter-clockwise when seen from outside.
    pub fn cube(material: Material) -> Self {
        let mut triangles = Vec::with_capacity(12);
        for axis in 0..3 {
            for sign in [1.0, -1.0] {
                let normal = WorldVector::ith(axis, sign);
                let u = WorldVector::ith((axis + 1) % 3, 1.0);
                let v = WorldVector::ith((axis + 2) % 3, sign);
                triangles.extend(quad(WorldPoint::origin() + normal * 0.5, u, v));
            }
        }
        Model::new(triangles, material)
    }

    /// Unit square in the XZ plane, centered at the origin and facing +y.
    pub fn plane(material: Material) -> Self {
        let triangles = quad(WorldPoint::origin(), WorldVector::z(), WorldVector::x()).to_vec();
        Model::new(triangles, material)
    }

    /// Triangles with the transform applied.
    pub fn world_triangles(&self) -> impl Iterator<Item = WorldTriangle> + '_ {
        let matrix = self.transform.matrix();
        self.triangles
            .iter()
            .map(move |triangle| triangle.map(|p| matrix.transform_point(p)))
    }
}

/// Square spanned by unit vectors `u` and `v` around `center`, facing `u × v`.
fn quad(center: WorldPoint, u: WorldVector, v: WorldVector) -> [WorldTriangle; 2] {
    let corner = |a: FloatType, b: FloatType| center + u * (0.5 * a) + v * (0.5 * b);
    let corners = [
        corner(-1.0, -1.0),
        corner(1.0, -1.0),
        corner(1.0, 1.0),
        corner(-1.0, 1.0),
    ];
    [
        Triangle::new(corners[0], corners[1], corners[2]),
        Triangle::new(corners[0], corners[2], corners[3]),
    ]
}
