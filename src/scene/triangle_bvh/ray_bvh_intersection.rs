use crate::{
    geometry::{BOX_EPSILON, Ray, RayIntersectionExt as _, WorldBox},
    scene::{HitRecord, Object},
};

use super::{Node, NodeIdx, TriangleBvh};

/// Traversal stack that can be kept between queries to avoid allocating.
/// Each thread traversing the tree needs its own.
#[derive(Clone, Debug, Default)]
#[repr(transparent)]
pub struct StackCache {
    stack: Vec<NodeIdx>,
}

impl StackCache {
    /// Stack large enough to traverse a tree of given depth without growing.
    pub fn with_depth(depth: usize) -> Self {
        StackCache {
            stack: Vec::with_capacity(depth + 1),
        }
    }
}

impl TriangleBvh {
    pub fn stack_cache(&self) -> StackCache {
        StackCache::with_depth(self.depth)
    }

    /// Finds the nearest triangle hit closer than `hit.t`.
    ///
    /// `hit` is only modified when a strictly closer hit is found, so a miss
    /// leaves the caller's ceiling in place. Returns true if this query recorded a hit.
    pub fn intersect(&self, ray: &Ray, hit: &mut HitRecord, stack: &mut StackCache) -> bool {
        let Some(root) = self.root else {
            return false;
        };

        let stack = &mut stack.stack;
        stack.clear();
        stack.push(root);

        let mut found = false;

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];

            // Upper bound is the best hit so far, subtrees that can't beat it get skipped
            if !node.bounds().intersects(ray, BOX_EPSILON, hit.t) {
                continue;
            }

            match node {
                Node::Leaf { primitives, .. } => {
                    for primitive in primitives {
                        if let Some(t) = primitive.triangle.intersect(ray, hit.t) {
                            hit.record(
                                ray,
                                t,
                                primitive.triangle.normal().normalize(),
                                primitive.material,
                            );
                            found = true;
                        }
                    }
                }
                Node::Inner { children, .. } => {
                    // TODO: Push the farther child first, so that the nearer one gets popped first
                    // and tightens hit.t sooner.
                    stack.extend_from_slice(children);
                }
            }
        }

        found
    }
}

impl Object for TriangleBvh {
    fn intersect(&self, ray: &Ray, hit: &mut HitRecord, stack: &mut StackCache) -> bool {
        TriangleBvh::intersect(self, ray, hit, stack)
    }

    fn bounding_box(&self) -> Option<WorldBox> {
        TriangleBvh::bounding_box(self).cloned()
    }
}
