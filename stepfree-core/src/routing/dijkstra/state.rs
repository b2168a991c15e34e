use std::cmp::Ordering;

use petgraph::graph::NodeIndex;

use crate::WalkingTime;

#[derive(Copy, Clone, Eq, PartialEq)]
pub(super) struct State {
    pub(super) cost: WalkingTime,
    pub(super) node: NodeIndex,
}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap),
        // equal costs pop the lower node index first
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
