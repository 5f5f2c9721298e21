//! Binary BVH over a static soup of world space triangles.
//!
//! The tree is a snapshot: it is built once from already transformed triangles
//! and never updated. Any change of the source models needs a full rebuild.

mod building;
mod printing;
mod ray_bvh_intersection;

use arrayvec::ArrayVec;
use index_vec::IndexVec;

use crate::{
    geometry::{WorldBox, WorldTriangle},
    scene::Material,
};

pub use building::BuildError;
pub use printing::BvhStatistics;
pub use ray_bvh_intersection::StackCache;

pub const LEAF_NODE_MAX_TRIANGLES: usize = 4;

/// Triangle together with the material of the model it came from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primitive {
    pub triangle: WorldTriangle,
    pub material: Material,
}

#[derive(Clone, Debug, Default)]
pub struct TriangleBvh {
    nodes: IndexVec<NodeIdx, Node>,
    /// `None` for a tree built from no triangles, such a tree never hits anything.
    root: Option<NodeIdx>,
    /// Number of nodes on the longest root to leaf path
    depth: usize,
}

#[derive(Clone, Debug)]
enum Node {
    Inner {
        bounds: WorldBox,
        children: [NodeIdx; 2],
    },
    Leaf {
        bounds: WorldBox,
        primitives: ArrayVec<Primitive, LEAF_NODE_MAX_TRIANGLES>,
    },
}

impl Node {
    fn bounds(&self) -> &WorldBox {
        match self {
            Node::Inner { bounds, .. } | Node::Leaf { bounds, .. } => bounds,
        }
    }
}

index_vec::define_index_type! {
    struct NodeIdx = u32;
}

impl TriangleBvh {
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounding box of all triangles in the tree.
    pub fn bounding_box(&self) -> Option<&WorldBox> {
        self.root.map(|root| self.nodes[root].bounds())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        geometry::{
            Ray, Triangle, WorldPoint, WorldVector,
            test::{OutsideRayWrapper, scene_coordinate, scene_triangle},
        },
        scene::HitRecord,
        util::Rgb,
    };

    use assert2::{assert, check};
    use proptest::{
        array::uniform3,
        collection::vec,
        prelude::{BoxedStrategy, Just, Strategy, prop_oneof},
        prop_assert, prop_assert_eq,
    };
    use test_case::test_case;
    use test_strategy::proptest;

    fn primitives(triangles: &[WorldTriangle]) -> Vec<Primitive> {
        triangles
            .iter()
            .enumerate()
            .map(|(i, triangle)| Primitive {
                triangle: *triangle,
                material: Material::new(Rgb::new(i as f32, 0.0, 0.0), 0.0, 0.0),
            })
            .collect()
    }

    /// Regular grid of small triangles in the z = 0 plane.
    fn grid(n: usize) -> Vec<Primitive> {
        let triangles: Vec<_> = (0..n)
            .map(|i| {
                let x = (i % 10) as f32;
                let y = (i / 10) as f32;
                Triangle::new(
                    WorldPoint::new(x, y, 0.0),
                    WorldPoint::new(x + 0.9, y, 0.0),
                    WorldPoint::new(x, y + 0.9, 0.0),
                )
            })
            .collect();
        primitives(&triangles)
    }

    /// Collects triangles of all leaves, checks bounds on the way.
    /// Returns the depth of the subtree.
    fn check_subtree(bvh: &TriangleBvh, index: NodeIdx, collected: &mut Vec<Primitive>) -> usize {
        match &bvh.nodes[index] {
            Node::Inner { bounds, children } => {
                let left = bvh.nodes[children[0]].bounds();
                let right = bvh.nodes[children[1]].bounds();
                assert!(*bounds == left.union(right));

                let left_depth = check_subtree(bvh, children[0], collected);
                let right_depth = check_subtree(bvh, children[1], collected);
                1 + left_depth.max(right_depth)
            }
            Node::Leaf { bounds, primitives } => {
                assert!(!primitives.is_empty());
                let expected = primitives
                    .iter()
                    .map(|p| WorldBox::from_triangle(&p.triangle))
                    .reduce(|a, b| a.union(&b));
                assert!(Some(bounds) == expected.as_ref());
                collected.extend(primitives.iter().copied());
                1
            }
        }
    }

    /// Checks structural invariants, returns leaf contents in tree order.
    fn check_tree(bvh: &TriangleBvh) -> Vec<Primitive> {
        let mut collected = Vec::new();
        if let Some(root) = bvh.root {
            let depth = check_subtree(bvh, root, &mut collected);
            assert!(depth == bvh.depth());
        } else {
            assert!(bvh.depth() == 0);
            assert!(bvh.node_count() == 0);
        }
        collected
    }

    fn max_depth(n: usize) -> usize {
        if n <= LEAF_NODE_MAX_TRIANGLES {
            1
        } else {
            (n as f64 / LEAF_NODE_MAX_TRIANGLES as f64).log2().ceil() as usize + 1
        }
    }

    /// Reference implementation, linear scan over everything.
    fn brute_force(primitives: &[Primitive], ray: &Ray, hit: &mut HitRecord) -> bool {
        let mut found = false;
        for p in primitives {
            if let Some(t) = p.triangle.intersect(ray, hit.t) {
                hit.record(ray, t, p.triangle.normal().normalize(), p.material);
                found = true;
            }
        }
        found
    }

    fn assert_same_hit(actual: &HitRecord, expected: &HitRecord) {
        assert!(actual.hit == expected.hit);
        if expected.hit {
            assert!((actual.t - expected.t).abs() <= 1e-4 * expected.t.max(1.0));
        } else {
            assert!(actual.t == f32::INFINITY);
        }
    }

    /// Small triangles sitting in the corners of the cube [0, 4]^3,
    /// the first vertex of each one is a corner of the cube and of its leaf box.
    fn cube_corners() -> Vec<Primitive> {
        let mut triangles = Vec::new();
        for x in [0.0, 4.0] {
            for y in [0.0, 4.0] {
                for z in [0.0, 4.0] {
                    let inward = |c: f32| if c == 0.0 { 1.0 } else { -1.0 };
                    triangles.push(Triangle::new(
                        WorldPoint::new(x, y, z),
                        WorldPoint::new(x + inward(x), y, z),
                        WorldPoint::new(x, y + inward(y), z),
                    ));
                }
            }
        }
        primitives(&triangles)
    }

    /// Coordinates that overflow or poison the arithmetic, mixed with ordinary ones.
    fn malformed_coordinate() -> BoxedStrategy<f32> {
        prop_oneof![
            Just(f32::NAN),
            Just(f32::INFINITY),
            Just(f32::NEG_INFINITY),
            Just(f32::MAX),
            Just(-f32::MAX),
            Just(1e30),
            scene_coordinate(),
        ]
        .boxed()
    }

    fn malformed_triangle() -> BoxedStrategy<WorldTriangle> {
        uniform3(uniform3(malformed_coordinate()))
            .prop_map(|[a, b, c]| {
                Triangle::new(WorldPoint::from(a), WorldPoint::from(b), WorldPoint::from(c))
            })
            .boxed()
    }

    fn sorted_by_material(mut primitives: Vec<Primitive>) -> Vec<Primitive> {
        primitives.sort_by(|a, b| a.material.color.r.total_cmp(&b.material.color.r));
        primitives
    }

    #[test]
    fn empty_input_never_hits() {
        let bvh = TriangleBvh::build(&[]).unwrap();
        assert!(bvh.is_empty());
        assert!(bvh.bounding_box().is_none());
        check_tree(&bvh);

        let ray = Ray::new(WorldPoint::origin(), WorldVector::new(0.0, 0.0, 1.0));
        let mut hit = HitRecord::default();
        assert!(!bvh.intersect(&ray, &mut hit, &mut StackCache::default()));
        assert!(!hit.hit);
    }

    #[test]
    fn exact_hit() {
        let bvh = TriangleBvh::build(&primitives(&[Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        )]))
        .unwrap();
        let ray = Ray::new(
            WorldPoint::new(0.3, 0.3, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let mut hit = HitRecord::default();

        assert!(bvh.intersect(&ray, &mut hit, &mut bvh.stack_cache()));
        check!(hit.hit);
        check!((hit.t - 5.0).abs() < 1e-4);
        check!((hit.point - WorldPoint::new(0.3, 0.3, 0.0)).norm() < 1e-4);
        check!(hit.normal.cross(&WorldVector::z()).norm() < 1e-4);
        check!((hit.normal.norm() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn rays_aimed_at_box_corners_match_brute_force() {
        let input = cube_corners();
        let bvh = TriangleBvh::build(&input).unwrap();
        assert!(bvh.node_count() == 3);
        let mut stack = bvh.stack_cache();

        let components = [-1.0, 1.0, 2.0, 3.0];
        let mut hit_count = 0;
        for primitive in &input {
            let corner = primitive.triangle[0];
            for (&x, &y, &z) in itertools::iproduct!(&components, &components, &components) {
                let direction = WorldVector::new(x, y, z);
                let origin = Ray::new(corner, direction).point_at(10.0);
                let ray = Ray::new(origin, -direction);

                let mut expected = HitRecord::default();
                if brute_force(&input, &ray, &mut expected) {
                    hit_count += 1;
                }
                let mut actual = HitRecord::default();
                bvh.intersect(&ray, &mut actual, &mut stack);
                assert_same_hit(&actual, &expected);
            }
        }
        assert!(hit_count > 0);
    }

    #[test]
    fn infinite_vertex_never_hits() {
        let mut input = grid(20);
        input[3].triangle[1] = WorldPoint::new(f32::INFINITY, 0.0, 0.0);
        let bvh = TriangleBvh::build(&input).unwrap();

        // Straight onto the poisoned triangle
        let ray = Ray::new(
            WorldPoint::new(3.05, 0.05, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let mut hit = HitRecord::default();
        assert!(!bvh.intersect(&ray, &mut hit, &mut bvh.stack_cache()));
        assert!(hit.t == f32::INFINITY);
    }

    #[test]
    fn normal_is_not_flipped_towards_the_ray() {
        let bvh = TriangleBvh::build(&primitives(&[Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        )]))
        .unwrap();
        let ray = Ray::new(
            WorldPoint::new(0.3, 0.3, -5.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let mut hit = HitRecord::default();

        assert!(bvh.intersect(&ray, &mut hit, &mut bvh.stack_cache()));
        assert!((hit.normal - WorldVector::z()).norm() < 1e-6);
    }

    #[test]
    fn miss_leaves_ceiling_untouched() {
        let bvh = TriangleBvh::build(&grid(50)).unwrap();
        let ray = Ray::new(
            WorldPoint::new(5.0, 2.0, 5.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let mut hit = HitRecord::with_max_distance(123.5);

        assert!(!bvh.intersect(&ray, &mut hit, &mut bvh.stack_cache()));
        assert!(!hit.hit);
        assert!(hit.t == 123.5);
    }

    #[test]
    fn hit_beyond_ceiling_is_ignored() {
        let bvh = TriangleBvh::build(&grid(50)).unwrap();
        let ray = Ray::new(
            WorldPoint::new(0.2, 0.2, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let mut hit = HitRecord::with_max_distance(4.0);

        assert!(!bvh.intersect(&ray, &mut hit, &mut bvh.stack_cache()));
        assert!(hit.t == 4.0);
    }

    #[test]
    fn nearest_of_stacked_triangles_wins() {
        let layers: Vec<_> = (0..20)
            .map(|i| {
                let z = i as f32;
                Triangle::new(
                    WorldPoint::new(0.0, 0.0, z),
                    WorldPoint::new(1.0, 0.0, z),
                    WorldPoint::new(0.0, 1.0, z),
                )
            })
            .collect();
        let primitives = primitives(&layers);
        let bvh = TriangleBvh::build(&primitives).unwrap();
        let ray = Ray::new(
            WorldPoint::new(0.25, 0.25, 30.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let mut hit = HitRecord::default();

        assert!(bvh.intersect(&ray, &mut hit, &mut bvh.stack_cache()));
        assert!((hit.t - 11.0).abs() < 1e-4);
        assert!(hit.material == primitives[19].material);
    }

    #[test_case(1 ; "single")]
    #[test_case(4 ; "full_leaf")]
    #[test_case(5 ; "smallest_split")]
    #[test_case(17 ; "odd")]
    #[test_case(64 ; "power_of_two")]
    #[test_case(1000 ; "large")]
    fn grid_structure(n: usize) {
        let input = grid(n);
        let bvh = TriangleBvh::build(&input).unwrap();

        let collected = check_tree(&bvh);
        assert!(sorted_by_material(collected) == input);
        assert!(bvh.depth() <= max_depth(n));
    }

    #[test]
    fn identical_centroids_build_deterministically() {
        let triangle = Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        );
        let mut input = primitives(&[triangle; 13]);
        // Spread along x so that the split axis is fixed but centroids tie per column
        for (i, p) in input.iter_mut().enumerate() {
            let offset = WorldVector::new((i % 3) as f32 * 2.0, 0.0, 0.0);
            p.triangle = p.triangle.map(|v| v + offset);
        }

        let a = TriangleBvh::build(&input).unwrap();
        let b = TriangleBvh::build(&input).unwrap();
        assert!(check_tree(&a) == check_tree(&b));
    }

    #[proptest]
    fn partition_and_bounds(
        #[strategy(vec(scene_triangle(), 0..200))] triangles: Vec<WorldTriangle>,
    ) {
        let input = primitives(&triangles);
        let bvh = TriangleBvh::build(&input).unwrap();

        let collected = check_tree(&bvh);
        prop_assert_eq!(sorted_by_material(collected), input);
        prop_assert!(bvh.depth() <= max_depth(triangles.len()));
    }

    #[proptest]
    fn matches_brute_force(
        #[strategy(vec(scene_triangle(), 1..100))] triangles: Vec<WorldTriangle>,
        rays: [OutsideRayWrapper; 16],
    ) {
        let input = primitives(&triangles);
        let bvh = TriangleBvh::build(&input).unwrap();
        let mut stack = bvh.stack_cache();

        for ray in rays.iter() {
            let mut expected = HitRecord::default();
            let expected_found = brute_force(&input, ray, &mut expected);

            let mut actual = HitRecord::default();
            let actual_found = bvh.intersect(ray, &mut actual, &mut stack);

            prop_assert_eq!(actual_found, expected_found);
            prop_assert_eq!(actual.hit, expected.hit);
            if expected_found {
                prop_assert!((actual.t - expected.t).abs() < 1e-4);
            } else {
                prop_assert!(actual.t == f32::INFINITY);
            }
        }
    }

    #[proptest]
    fn malformed_geometry_degrades_to_no_hit(
        #[strategy(vec(scene_triangle(), 0..50))] finite: Vec<WorldTriangle>,
        #[strategy(vec(malformed_triangle(), 1..50))] malformed: Vec<WorldTriangle>,
        rays: [OutsideRayWrapper; 12],
    ) {
        let input = primitives(&[finite, malformed].concat());
        let bvh = TriangleBvh::build(&input).unwrap();
        let mut stack = bvh.stack_cache();

        let well_formed: Vec<_> = input
            .iter()
            .filter(|p| p.triangle.iter().all(|v| v.coords.iter().all(|c| c.is_finite())))
            .copied()
            .collect();

        for ray in rays.iter() {
            let mut expected = HitRecord::default();
            brute_force(&well_formed, ray, &mut expected);

            let mut actual = HitRecord::default();
            bvh.intersect(ray, &mut actual, &mut stack);

            prop_assert!(!actual.t.is_nan());
            assert_same_hit(&actual, &expected);
        }
    }

    #[proptest]
    fn rebuild_is_deterministic(
        #[strategy(vec(scene_triangle(), 1..100))] triangles: Vec<WorldTriangle>,
        rays: [OutsideRayWrapper; 8],
    ) {
        let input = primitives(&triangles);
        let a = TriangleBvh::build(&input).unwrap();
        let b = TriangleBvh::build(&input).unwrap();

        prop_assert_eq!(a.node_count(), b.node_count());
        prop_assert_eq!(a.depth(), b.depth());
        prop_assert_eq!(check_tree(&a), check_tree(&b));

        let mut stack = a.stack_cache();
        for ray in rays.iter() {
            let mut hit_a = HitRecord::default();
            let mut hit_b = HitRecord::default();
            a.intersect(ray, &mut hit_a, &mut stack);
            b.intersect(ray, &mut hit_b, &mut stack);
            prop_assert_eq!(hit_a.t.to_bits(), hit_b.t.to_bits());
            prop_assert_eq!(hit_a.material, hit_b.material);
        }
    }

    #[test]
    fn concurrent_traversal() {
        let bvh = TriangleBvh::build(&grid(100)).unwrap();

        std::thread::scope(|s| {
            for worker in 0..4 {
                let bvh = &bvh;
                s.spawn(move || {
                    let mut stack = bvh.stack_cache();
                    for i in 0..100 {
                        let x = (i % 10) as f32 + 0.2;
                        let y = (i / 10) as f32 + 0.2;
                        let ray = Ray::new(
                            WorldPoint::new(x, y, 1.0 + worker as f32),
                            WorldVector::new(0.0, 0.0, -1.0),
                        );
                        let mut hit = HitRecord::default();
                        assert!(bvh.intersect(&ray, &mut hit, &mut stack));
                        assert!((hit.t - (1.0 + worker as f32)).abs() < 1e-4);
                        assert!(hit.material.color.r == i as f32);
                    }
                });
            }
        });
    }
}
