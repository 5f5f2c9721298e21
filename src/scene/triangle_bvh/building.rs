use std::{collections::TryReserveError, time::Instant};

use index_vec::IndexVec;
use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::geometry::{WorldBox, WorldPoint};

use super::{LEAF_NODE_MAX_TRIANGLES, Node, NodeIdx, Primitive, TriangleBvh};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to allocate BVH storage: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Build time data of a single triangle.
struct BuildItem {
    primitive: Primitive,
    bounds: WorldBox,
    centroid: WorldPoint,
    /// Position in the input, breaks ties between equal centroids.
    index: usize,
}

impl TriangleBvh {
    /// Builds the tree from world space triangles.
    /// Empty input gives an empty tree that never reports a hit.
    ///
    /// Nodes are split at the count median along the largest axis of their bounding box,
    /// which keeps the tree balanced regardless of how the triangles are distributed.
    pub fn build(primitives: &[Primitive]) -> Result<TriangleBvh, BuildError> {
        let start = Instant::now();

        if primitives.is_empty() {
            log::debug!("Building BVH from no triangles, the tree is empty");
            return Ok(TriangleBvh::default());
        }

        let mut items = Vec::new();
        items.try_reserve_exact(primitives.len())?;
        items.extend(
            primitives
                .iter()
                .enumerate()
                .map(|(index, primitive)| BuildItem {
                    primitive: *primitive,
                    bounds: WorldBox::from_triangle(&primitive.triangle),
                    centroid: primitive.triangle.centroid(),
                    index,
                }),
        );

        // At most n leaves, so at most 2n - 1 nodes. Reserving up front means
        // the build itself never allocates nodes.
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(2 * primitives.len() - 1)?;

        let mut bvh = TriangleBvh {
            nodes: IndexVec::from_vec(nodes),
            root: None,
            depth: 0,
        };
        let (root, depth) = bvh.build_recursive(&mut items);
        bvh.root = Some(root);
        bvh.depth = depth;

        log::info!(
            "Built BVH over {} triangles: {} nodes, depth {}, took {:.1?}",
            primitives.len(),
            bvh.nodes.len(),
            bvh.depth,
            start.elapsed()
        );

        Ok(bvh)
    }

    /// Builds a subtree from a non-empty slice of items.
    /// Returns index of the subtree root and depth of the subtree.
    fn build_recursive(&mut self, items: &mut [BuildItem]) -> (NodeIdx, usize) {
        debug_assert!(!items.is_empty());

        let bounds = items
            .iter()
            .skip(1)
            .fold(items[0].bounds.clone(), |acc, item| acc.union(&item.bounds));

        if items.len() <= LEAF_NODE_MAX_TRIANGLES {
            let primitives = items.iter().map(|item| item.primitive).collect();
            return (self.nodes.push(Node::Leaf { bounds, primitives }), 1);
        }

        let axis = bounds.largest_axis();
        items.sort_unstable_by_key(|item| (OrderedFloat(item.centroid[axis]), item.index));

        let (left_items, right_items) = items.split_at_mut(items.len() / 2);
        let (left, left_depth) = self.build_recursive(left_items);
        let (right, right_depth) = self.build_recursive(right_items);

        let node = Node::Inner {
            bounds,
            children: [left, right],
        };
        (self.nodes.push(node), 1 + left_depth.max(right_depth))
    }
}
