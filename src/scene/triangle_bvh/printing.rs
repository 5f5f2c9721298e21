use std::fmt::{self, Display};

use crate::util::Stats;

use super::{Node, NodeIdx, TriangleBvh};

/// Shape summary of a built tree.
#[derive(Clone, Debug, PartialEq)]
pub struct BvhStatistics {
    pub triangle_count: usize,
    pub node_count: usize,
    pub leaf_count: usize,
    /// Depth of the individual leaves, root counts as 1
    pub leaf_depth: Stats,
    /// Triangles per leaf
    pub leaf_fill: Stats,
}

impl Display for BvhStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Triangles: {}", self.triangle_count)?;
        writeln!(f, "Nodes: {} ({} leaves)", self.node_count, self.leaf_count)?;
        writeln!(f, "Leaf depth: {}", self.leaf_depth)?;
        write!(f, "Leaf fill: {}", self.leaf_fill)
    }
}

impl TriangleBvh {
    pub fn statistics(&self) -> BvhStatistics {
        let mut leaf_fill = Stats::default();
        for node in self.nodes.iter() {
            if let Node::Leaf { primitives, .. } = node {
                leaf_fill.add_sample(primitives.len());
            }
        }

        let leaf_depth = match self.root {
            Some(root) => self.depth_statistics_recursive(root),
            None => Stats::default(),
        };

        BvhStatistics {
            triangle_count: leaf_fill.sum(),
            node_count: self.nodes.len(),
            leaf_count: leaf_fill.count,
            leaf_depth,
            leaf_fill,
        }
    }

    /// Dumps the whole tree to the trace log.
    pub fn log_tree(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        match self.root {
            Some(root) => self.log_recursive(0, root),
            None => log::trace!("<EMPTY>"),
        }
    }

    fn depth_statistics_recursive(&self, index: NodeIdx) -> Stats {
        match &self.nodes[index] {
            Node::Leaf { .. } => Stats::new_single(1),
            Node::Inner { children, .. } => {
                let mut ret = self
                    .depth_statistics_recursive(children[0])
                    .merge(&self.depth_statistics_recursive(children[1]));
                ret.min += 1;
                ret.max += 1;
                ret.avg += 1.0;
                ret
            }
        }
    }

    fn log_recursive(&self, indent: usize, index: NodeIdx) {
        let node = &self.nodes[index];
        let bounds = node.bounds();
        let (min, max) = (&bounds.min, &bounds.max);
        let indent_str = "  ".repeat(indent);

        match node {
            Node::Leaf { primitives, .. } => {
                log::trace!("{indent_str}- L{}: {min:?}-{max:?}", index.index());
                for p in primitives {
                    log::trace!(
                        "{indent_str}    {:?}, {:?}, {:?}",
                        p.triangle[0],
                        p.triangle[1],
                        p.triangle[2]
                    );
                }
            }
            Node::Inner { children, .. } => {
                log::trace!("{indent_str}- I{}: {min:?}-{max:?}", index.index());
                for child in children {
                    self.log_recursive(indent + 1, *child);
                }
            }
        }
    }
}
