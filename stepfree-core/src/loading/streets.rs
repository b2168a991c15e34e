//! Reading pre-extracted street tables (`nodes.csv`, `edges.csv`)

use std::path::Path;

use geo::Point;
use hashbrown::HashMap;
use log::{info, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Deserialize;

use super::table::read_table;
use crate::{
    Error,
    model::{
        EdgeKind, NodeCapabilities, StreetEdge, StreetGraph, StreetNode, WheelchairAccess,
        streets::network::distance_m,
    },
};

#[derive(Debug, Deserialize)]
struct RawNode {
    node_id: i64,
    lon: f64,
    lat: f64,
    #[serde(default, deserialize_with = "deserialize_flag")]
    elevator: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    platform: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    entrance: bool,
    #[serde(default)]
    platform_code: String,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    from: i64,
    to: i64,
    /// Meters, derived from the node positions when missing
    #[serde(default)]
    length: Option<f64>,
    kind: EdgeKind,
    #[serde(default)]
    wheelchair: WheelchairAccess,
    #[serde(default, deserialize_with = "deserialize_flag")]
    oneway: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "" | "0" | "false" | "no" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag '{other}'"))),
    }
}

/// Build the street graph from `nodes.csv` and `edges.csv` in `dir`
///
/// # Errors
///
/// Returns an error if one of the tables can not be opened.
pub fn street_graph_from_csv(dir: &Path) -> Result<StreetGraph, Error> {
    let raw_nodes: Vec<RawNode> = read_table(&dir.join("nodes.csv"))?;
    let raw_edges: Vec<RawEdge> = read_table(&dir.join("edges.csv"))?;

    let mut graph = DiGraph::with_capacity(raw_nodes.len(), raw_edges.len() * 2);
    let mut node_ids: HashMap<i64, NodeIndex> = HashMap::with_capacity(raw_nodes.len());

    for raw in raw_nodes {
        if node_ids.contains_key(&raw.node_id) {
            warn!("Duplicate node {} ignored", raw.node_id);
            continue;
        }
        let platform_code = Some(raw.platform_code.trim().to_string()).filter(|c| !c.is_empty());
        let idx = graph.add_node(StreetNode {
            id: raw.node_id,
            geometry: Point::new(raw.lon, raw.lat),
            capabilities: NodeCapabilities {
                elevator: raw.elevator,
                platform: raw.platform,
                entrance: raw.entrance,
            },
            platform_code,
        });
        node_ids.insert(raw.node_id, idx);
    }

    let mut dangling = 0usize;
    for raw in raw_edges {
        let (Some(&from), Some(&to)) = (node_ids.get(&raw.from), node_ids.get(&raw.to)) else {
            dangling += 1;
            continue;
        };
        let length = raw
            .length
            .unwrap_or_else(|| distance_m(&graph[from].geometry, &graph[to].geometry));
        let edge = StreetEdge {
            length,
            kind: raw.kind,
            wheelchair: raw.wheelchair,
        };
        if !raw.oneway {
            graph.add_edge(to, from, edge.clone());
        }
        graph.add_edge(from, to, edge);
    }

    if dangling > 0 {
        warn!("{dangling} edges reference unknown nodes and were dropped");
    }

    info!(
        "Street graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    Ok(StreetGraph::new(graph))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nodes_and_edges() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("nodes.csv"),
            "node_id,lon,lat,elevator,platform,entrance,platform_code\n\
             1,8.6630,50.1070,0,1,0,101\n\
             2,8.6631,50.1070,1,0,0,\n\
             3,8.6632,50.1070,0,0,0,\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("edges.csv"),
            "from,to,length,kind,wheelchair,oneway\n\
             1,2,10.0,footway,yes,0\n\
             2,3,,elevator,yes,1\n\
             3,9,5.0,footway,yes,0\n",
        )
        .unwrap();

        let streets = street_graph_from_csv(dir.path()).unwrap();
        assert_eq!(streets.node_count(), 3);
        // two for the bidirectional edge, one oneway, the dangling edge is dropped
        assert_eq!(streets.edge_count(), 3);

        let first = streets.node(NodeIndex::new(0)).unwrap();
        assert!(first.is_platform());
        assert_eq!(first.platform_code.as_deref(), Some("101"));
        assert!(streets.node(NodeIndex::new(1)).unwrap().is_elevator());

        let derived = streets
            .edges_directed(NodeIndex::new(1), petgraph::Direction::Outgoing)
            .find(|e| e.weight().kind == EdgeKind::Elevator)
            .unwrap();
        assert!((derived.weight().length - 7.1).abs() < 0.5);
    }
}
