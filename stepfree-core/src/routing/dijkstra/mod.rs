//! Bounded Dijkstra over the street graph under a travel profile

mod state;

use std::collections::BinaryHeap;

use hashbrown::HashMap;
use petgraph::{graph::NodeIndex, visit::EdgeRef};
use serde::{Deserialize, Serialize};

use crate::{WalkingTime, model::Profile, model::StreetGraph};
use state::State;

/// Which end of a path the search starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Paths leave the anchor (outbound from an origin)
    Forward,
    /// Paths arrive at the anchor (inbound to a destination)
    Backward,
}

impl Direction {
    fn edge_direction(self) -> petgraph::Direction {
        match self {
            Direction::Forward => petgraph::Direction::Outgoing,
            Direction::Backward => petgraph::Direction::Incoming,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchParams<'a> {
    pub profile: Profile,
    pub direction: Direction,
    /// Nodes settled above this cost are not expanded
    pub max_cost: WalkingTime,
    /// Nodes the search may not enter
    pub blocked: &'a [NodeIndex],
}

impl SearchParams<'_> {
    pub fn new(profile: Profile, direction: Direction, max_cost: WalkingTime) -> Self {
        SearchParams {
            profile,
            direction,
            max_cost,
            blocked: &[],
        }
    }
}

/// Costs and predecessors of a finished search
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    direction: Direction,
    costs: HashMap<NodeIndex, WalkingTime>,
    predecessors: HashMap<NodeIndex, NodeIndex>,
}

impl ShortestPathTree {
    pub fn cost(&self, node: NodeIndex) -> Option<WalkingTime> {
        self.costs.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// All reached nodes with their cost, ordered by node index
    pub fn reached(&self) -> Vec<(NodeIndex, WalkingTime)> {
        let mut reached: Vec<_> = self.costs.iter().map(|(&n, &c)| (n, c)).collect();
        reached.sort_unstable();
        reached
    }

    /// Nodes of the path to `node` in travel order
    ///
    /// For a forward search the path runs from the start to `node`, for a
    /// backward search from `node` to the start.
    pub fn path(&self, node: NodeIndex) -> Option<Vec<NodeIndex>> {
        if !self.costs.contains_key(&node) {
            return None;
        }

        let mut chain = vec![node];
        let mut current = node;
        while let Some(&prev) = self.predecessors.get(&current) {
            chain.push(prev);
            current = prev;
        }

        if self.direction == Direction::Forward {
            chain.reverse();
        }
        Some(chain)
    }
}

/// Dijkstra's algorithm restricted to the edges a profile permits
///
/// `starts` are the initial nodes with their initial cost. Only nodes with
/// a cost of at most `max_cost` are reported. Ties are resolved by node
/// index, so identical inputs always produce the same tree.
pub fn bounded_dijkstra(
    graph: &StreetGraph,
    starts: &[(NodeIndex, WalkingTime)],
    params: &SearchParams<'_>,
) -> ShortestPathTree {
    let estimated_nodes = graph.node_count().min(1000);
    let mut costs: HashMap<NodeIndex, WalkingTime> = HashMap::with_capacity(estimated_nodes);
    let mut predecessors: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(estimated_nodes);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    for &(node, cost) in starts {
        if cost > params.max_cost || params.blocked.contains(&node) {
            continue;
        }
        if costs.get(&node).is_none_or(|&best| cost < best) {
            costs.insert(node, cost);
            heap.push(State { cost, node });
        }
    }

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've found a better path
        if let Some(&best) = costs.get(&node) {
            if cost > best {
                continue;
            }
        }

        for edge in graph.edges_directed(node, params.direction.edge_direction()) {
            let next = match params.direction {
                Direction::Forward => edge.target(),
                Direction::Backward => edge.source(),
            };
            if params.blocked.contains(&next) {
                continue;
            }
            let Some(edge_cost) = params.profile.edge_cost(edge.weight()) else {
                continue;
            };
            let node_cost = graph
                .node(next)
                .map_or(0, |weight| params.profile.node_cost(weight));
            let next_cost = cost.saturating_add(edge_cost).saturating_add(node_cost);
            if next_cost > params.max_cost {
                continue;
            }

            // Add or update distance if better using Entry API
            match costs.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                    predecessors.insert(next, node);
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                        predecessors.insert(next, node);
                    }
                }
            }
        }
    }

    ShortestPathTree {
        direction: params.direction,
        costs,
        predecessors,
    }
}
