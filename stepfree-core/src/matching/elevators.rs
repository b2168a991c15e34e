use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    StreetNodeId,
    model::{
        Elevator, ElevatorId, StreetGraph, StreetNode,
        streets::network::{build_rtree, nodes_within},
    },
};

/// Elevator equipment matched onto elevator nodes of the street graph
///
/// Every equipment maps to at most one node, several equipment records may
/// share a node. Never mutated after the import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevatorMatches {
    by_elevator: BTreeMap<ElevatorId, StreetNodeId>,
    by_node: BTreeMap<StreetNodeId, Vec<ElevatorId>>,
    unmatched: usize,
}

impl ElevatorMatches {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ElevatorId, StreetNodeId)>) -> Self {
        let mut matches = Self::default();
        for (elevator, node) in pairs {
            matches.insert(elevator, node);
        }
        matches
    }

    fn insert(&mut self, elevator: ElevatorId, node: StreetNodeId) {
        if let Some(previous) = self.by_elevator.insert(elevator, node) {
            if let Some(ids) = self.by_node.get_mut(&previous) {
                ids.retain(|&id| id != elevator);
            }
        }
        let ids = self.by_node.entry(node).or_default();
        ids.push(elevator);
        ids.sort_unstable();
    }

    /// Node an elevator was matched to
    pub fn node_of(&self, elevator: ElevatorId) -> Option<StreetNodeId> {
        self.by_elevator.get(&elevator).copied()
    }

    /// Equipment matched to `node`, empty for nodes without a match
    pub fn elevators_at(&self, node: StreetNodeId) -> &[ElevatorId] {
        self.by_node.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn is_matched_node(&self, node: StreetNodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElevatorId, StreetNodeId)> + '_ {
        self.by_elevator.iter().map(|(&e, &n)| (e, n))
    }

    pub fn len(&self) -> usize {
        self.by_elevator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_elevator.is_empty()
    }

    /// Number of equipment records without an elevator node in range
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }
}

/// Match every elevator to the nearest elevator node within `radius` meters
///
/// Elevators without a candidate are dropped with a warning.
pub fn match_elevators(elevators: &[Elevator], graph: &StreetGraph, radius: f64) -> ElevatorMatches {
    let rtree = build_rtree(&graph.graph, StreetNode::is_elevator);
    info!(
        "Matching {} elevators onto {} elevator nodes",
        elevators.len(),
        rtree.size()
    );

    let mut matches = ElevatorMatches::default();
    for elevator in elevators {
        match nodes_within(&rtree, &graph.graph, &elevator.geometry, radius).first() {
            Some(&(node, distance)) => {
                debug!(
                    "Elevator {} matched to node {} ({distance:.1}m)",
                    elevator.id,
                    graph.graph[node].id
                );
                matches.insert(elevator.id, node);
            }
            None => {
                warn!(
                    "Elevator {} ({}) has no elevator node within {radius}m - dropping",
                    elevator.id, elevator.description
                );
                matches.unmatched += 1;
            }
        }
    }

    if matches.unmatched > 0 {
        warn!(
            "{} of {} elevators could not be matched",
            matches.unmatched,
            elevators.len()
        );
    }
    info!("Matched {} elevators", matches.len());
    matches
}
