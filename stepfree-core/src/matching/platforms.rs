use std::collections::BTreeMap;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    LocationIdx, StreetNodeId,
    model::{
        Location, Locations, StreetGraph, StreetNode,
        streets::network::{build_rtree, nodes_within},
    },
};

/// Timetable locations matched onto platform (or walkable) nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformMatches {
    by_location: Vec<Option<StreetNodeId>>,
    by_node: BTreeMap<StreetNodeId, Vec<LocationIdx>>,
}

impl PlatformMatches {
    pub fn new(by_location: Vec<Option<StreetNodeId>>) -> Self {
        let mut by_node: BTreeMap<StreetNodeId, Vec<LocationIdx>> = BTreeMap::new();
        for (location, node) in by_location.iter().enumerate() {
            if let Some(node) = node {
                by_node.entry(*node).or_default().push(location);
            }
        }
        Self {
            by_location,
            by_node,
        }
    }

    pub fn node_of(&self, location: LocationIdx) -> Option<StreetNodeId> {
        self.by_location.get(location).copied().flatten()
    }

    /// Locations matched to `node`, ordered by index
    pub fn locations_at(&self, node: StreetNodeId) -> &[LocationIdx] {
        self.by_node.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Matched locations in index order
    pub fn iter(&self) -> impl Iterator<Item = (LocationIdx, StreetNodeId)> + '_ {
        self.by_location
            .iter()
            .enumerate()
            .filter_map(|(location, node)| node.map(|node| (location, node)))
    }

    /// Number of matched locations
    pub fn matched(&self) -> usize {
        self.by_location.iter().flatten().count()
    }

    /// Number of locations covered, matched or not
    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

/// Match every location to a street node within `radius` meters
///
/// Walkable platform nodes carrying the location's platform code are
/// preferred, then the nearest walkable platform node, then the nearest
/// walkable node of any kind.
pub fn match_platforms(locations: &Locations, graph: &StreetGraph, radius: f64) -> PlatformMatches {
    let rtree = build_rtree(&graph.graph, StreetNode::is_platform);
    info!(
        "Matching {} locations onto {} platform nodes",
        locations.len(),
        rtree.size()
    );

    let by_location: Vec<Option<StreetNodeId>> = locations
        .as_slice()
        .par_iter()
        .map(|location| {
            let candidates: Vec<_> = nodes_within(&rtree, &graph.graph, &location.geometry, radius)
                .into_iter()
                .filter(|&(node, _)| graph.is_walkable(node))
                .collect();
            let platform = same_platform_code(location, graph, &candidates)
                .or_else(|| candidates.first().map(|&(node, _)| node));

            let matched = platform.or_else(|| {
                graph
                    .nearest_node(&location.geometry, radius)
                    .map(|(node, _)| node)
            });
            if matched.is_none() {
                debug!("Location '{}' has no street node within {radius}m", location.id);
            }
            matched
        })
        .collect();

    let matches = PlatformMatches::new(by_location);
    let unmatched = matches.len() - matches.matched();
    if unmatched > 0 {
        warn!(
            "{unmatched} of {} locations could not be matched to the street graph",
            matches.len()
        );
    }
    info!("Matched {} locations", matches.matched());
    matches
}

fn same_platform_code(
    location: &Location,
    graph: &StreetGraph,
    candidates: &[(StreetNodeId, f64)],
) -> Option<StreetNodeId> {
    let code = location.platform_code.as_deref()?;
    candidates
        .iter()
        .find(|&&(node, _)| graph.graph[node].platform_code.as_deref() == Some(code))
        .map(|&(node, _)| node)
}

#[cfg(test)]
mod tests {
    use geo::Point;
    use petgraph::graph::NodeIndex;

    use super::*;
    use crate::matching::test_support::{chain, node};
    use crate::model::NodeCapabilities;

    const PLATFORM: NodeCapabilities = NodeCapabilities {
        elevator: false,
        platform: true,
        entrance: false,
    };

    fn location(id: &str, lon: f64, lat: f64, code: Option<&str>) -> Location {
        Location {
            id: id.to_string(),
            name: id.to_string(),
            geometry: Point::new(lon, lat),
            platform_code: code.map(str::to_string),
            parent: None,
        }
    }

    fn graph() -> StreetGraph {
        chain(vec![
            node(1, 8.66300, 50.1070, NodeCapabilities::default(), None),
            node(2, 8.66330, 50.1070, PLATFORM, Some("101")),
            node(3, 8.66360, 50.1070, PLATFORM, Some("102")),
            node(4, 8.67000, 50.1070, NodeCapabilities::default(), None),
        ])
    }

    #[test]
    fn platform_code_beats_distance() {
        let graph = graph();
        let locations = Locations::new(vec![
            location("S101", 8.66340, 50.1070, Some("101")),
            location("S102", 8.66340, 50.1070, Some("102")),
            location("none", 8.66340, 50.1070, None),
            location("other", 8.66340, 50.1070, Some("7")),
        ]);
        let matches = match_platforms(&locations, &graph, 100.0);

        assert_eq!(matches.node_of(0), Some(NodeIndex::new(1)));
        assert_eq!(matches.node_of(1), Some(NodeIndex::new(2)));
        assert_eq!(matches.node_of(2), Some(NodeIndex::new(1)));
        assert_eq!(matches.node_of(3), Some(NodeIndex::new(1)));
        assert_eq!(matches.locations_at(NodeIndex::new(1)), &[0, 2, 3]);
    }

    #[test]
    fn falls_back_to_walkable_nodes() {
        let graph = graph();
        let locations = Locations::new(vec![
            location("street", 8.67001, 50.1070, None),
            location("nowhere", 8.80, 50.2, None),
        ]);
        let matches = match_platforms(&locations, &graph, 100.0);

        assert_eq!(matches.node_of(0), Some(NodeIndex::new(3)));
        assert_eq!(matches.node_of(1), None);
        assert_eq!(matches.matched(), 1);
    }

    #[test]
    fn matching_is_idempotent() {
        let graph = graph();
        let locations = Locations::new(vec![
            location("a", 8.66345, 50.1070, None),
            location("b", 8.66301, 50.1071, Some("102")),
            location("c", 8.66990, 50.1070, None),
        ]);
        assert_eq!(
            match_platforms(&locations, &graph, 100.0),
            match_platforms(&locations, &graph, 100.0)
        );
    }
}
