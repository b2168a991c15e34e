//! Street graph with a spatial index over its nodes

use geo::{Distance, Haversine, Point};
use petgraph::{
    Directed, Direction,
    graph::{DiGraph, Edges, NodeIndex},
};
use rstar::{AABB, RTree, primitives::GeomWithData};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::components::{StreetEdge, StreetNode};

/// R-tree entry: `[lon, lat]` with the node it belongs to
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Meters per degree of latitude, used to size search envelopes
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Street network used for walking and wheelchair routing
///
/// Only the graph itself is persisted, the spatial index is rebuilt on load.
#[derive(Debug, Clone)]
pub struct StreetGraph {
    pub graph: DiGraph<StreetNode, StreetEdge>,
    rtree: RTree<IndexedPoint>,
}

impl StreetGraph {
    pub fn new(graph: DiGraph<StreetNode, StreetEdge>) -> Self {
        let rtree = build_rtree(&graph, |_| true);
        Self { graph, rtree }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, node: NodeIndex) -> Option<&StreetNode> {
        self.graph.node_weight(node)
    }

    /// Iterate over all nodes in index order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &StreetNode)> {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    pub fn edges_directed(
        &self,
        node: NodeIndex,
        direction: Direction,
    ) -> Edges<'_, StreetEdge, Directed> {
        self.graph.edges_directed(node, direction)
    }

    /// A node is walkable if any edge touches it
    pub fn is_walkable(&self, node: NodeIndex) -> bool {
        self.graph.edges(node).next().is_some()
            || self
                .graph
                .edges_directed(node, Direction::Incoming)
                .next()
                .is_some()
    }

    /// Nearest walkable node within `max_distance` meters
    pub fn nearest_node(&self, point: &Point<f64>, max_distance: f64) -> Option<(NodeIndex, f64)> {
        self.nodes_within(point, max_distance, |idx, _| self.is_walkable(idx))
            .into_iter()
            .next()
    }

    /// Nodes within `radius` meters accepted by `filter`, ordered by
    /// distance and then node index
    pub fn nodes_within<F>(&self, point: &Point<f64>, radius: f64, filter: F) -> Vec<(NodeIndex, f64)>
    where
        F: Fn(NodeIndex, &StreetNode) -> bool,
    {
        nodes_within(&self.rtree, &self.graph, point, radius)
            .into_iter()
            .filter(|&(idx, _)| filter(idx, &self.graph[idx]))
            .collect()
    }
}

impl Serialize for StreetGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.graph.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StreetGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        DiGraph::<StreetNode, StreetEdge>::deserialize(deserializer).map(Self::new)
    }
}

/// Build an R-tree over the nodes accepted by `keep`
pub(crate) fn build_rtree<F>(graph: &DiGraph<StreetNode, StreetEdge>, keep: F) -> RTree<IndexedPoint>
where
    F: Fn(&StreetNode) -> bool,
{
    let points = graph
        .node_indices()
        .filter(|&idx| keep(&graph[idx]))
        .map(|idx| {
            let geometry = graph[idx].geometry;
            IndexedPoint::new([geometry.x(), geometry.y()], idx)
        })
        .collect();
    RTree::bulk_load(points)
}

/// Entries of `rtree` within `radius` meters of `point`, nearest first
///
/// The R-tree is queried with a lon/lat envelope, the result is filtered
/// with the haversine distance. Equal distances are ordered by node index.
pub(crate) fn nodes_within(
    rtree: &RTree<IndexedPoint>,
    graph: &DiGraph<StreetNode, StreetEdge>,
    point: &Point<f64>,
    radius: f64,
) -> Vec<(NodeIndex, f64)> {
    let mut found: Vec<(NodeIndex, f64)> = rtree
        .locate_in_envelope(&search_envelope(point, radius))
        .filter_map(|entry| {
            let idx = entry.data;
            let distance = distance_m(point, &graph[idx].geometry);
            (distance <= radius).then_some((idx, distance))
        })
        .collect();
    found.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    found
}

/// Haversine distance in meters
pub fn distance_m(a: &Point<f64>, b: &Point<f64>) -> f64 {
    Haversine.distance(*a, *b)
}

fn search_envelope(point: &Point<f64>, radius: f64) -> AABB<[f64; 2]> {
    // 1% slack so that points right at the radius are not cut off by the
    // degree approximation
    let dlat = radius * 1.01 / METERS_PER_DEGREE;
    let dlon = dlat / point.y().to_radians().cos().max(0.01);
    AABB::from_corners(
        [point.x() - dlon, point.y() - dlat],
        [point.x() + dlon, point.y() + dlat],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeKind, NodeCapabilities, WheelchairAccess};

    fn node(id: i64, lon: f64, lat: f64) -> StreetNode {
        StreetNode {
            id,
            geometry: Point::new(lon, lat),
            capabilities: NodeCapabilities::default(),
            platform_code: None,
        }
    }

    fn edge(length: f64) -> StreetEdge {
        StreetEdge {
            length,
            kind: EdgeKind::Footway,
            wheelchair: WheelchairAccess::Yes,
        }
    }

    fn sample() -> StreetGraph {
        let mut graph = DiGraph::new();
        let a = graph.add_node(node(1, 8.6630, 50.1070));
        let b = graph.add_node(node(2, 8.6632, 50.1070));
        graph.add_node(node(3, 8.6700, 50.1100));
        graph.add_edge(a, b, edge(14.0));
        StreetGraph::new(graph)
    }

    #[test]
    fn nearest_node_respects_radius() {
        let streets = sample();
        let query = Point::new(8.66301, 50.10701);

        let (node, distance) = streets.nearest_node(&query, 50.0).unwrap();
        assert_eq!(node, NodeIndex::new(0));
        assert!(distance < 2.0);

        let far = Point::new(8.70, 50.20);
        assert!(streets.nearest_node(&far, 50.0).is_none());
    }

    #[test]
    fn isolated_nodes_are_not_walkable() {
        let streets = sample();
        assert!(streets.is_walkable(NodeIndex::new(1)));
        assert!(!streets.is_walkable(NodeIndex::new(2)));

        let query = Point::new(8.6700, 50.1100);
        assert!(streets.nearest_node(&query, 10.0).is_none());
    }

    #[test]
    fn nodes_within_are_sorted_by_distance() {
        let streets = sample();
        let query = Point::new(8.66319, 50.1070);
        let found = streets.nodes_within(&query, 100.0, |_, _| true);
        let ids: Vec<_> = found.iter().map(|(idx, _)| idx.index()).collect();
        assert_eq!(ids, vec![1, 0]);
    }
}
