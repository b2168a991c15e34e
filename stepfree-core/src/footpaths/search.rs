//! Shortest paths with elevator-avoiding detours

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    StreetNodeId, WalkingTime,
    matching::ElevatorMatches,
    model::{Profile, StreetGraph},
    routing::{Direction, SearchParams, ShortestPathTree, bounded_dijkstra},
};

use super::FootpathCandidate;

pub(crate) struct CandidateSearch<'a> {
    pub graph: &'a StreetGraph,
    pub elevators: &'a ElevatorMatches,
    pub profile: Profile,
    pub direction: Direction,
    pub max_cost: WalkingTime,
    pub max_alternatives: usize,
}

impl CandidateSearch<'_> {
    /// Paths from `starts` to every node accepted by `is_target`
    ///
    /// The first candidate per node is the shortest path. For profiles that
    /// depend on elevators, each elevator node on a shortest path is blocked
    /// in turn and the resulting detours are kept as further candidates,
    /// ordered by duration and at most `max_alternatives` of them.
    pub fn run<F>(
        &self,
        starts: &[(StreetNodeId, WalkingTime)],
        is_target: F,
    ) -> BTreeMap<StreetNodeId, Vec<FootpathCandidate>>
    where
        F: Fn(StreetNodeId) -> bool,
    {
        let params = SearchParams::new(self.profile, self.direction, self.max_cost);
        let tree = bounded_dijkstra(self.graph, starts, &params);

        let mut found: BTreeMap<StreetNodeId, Vec<FootpathCandidate>> = tree
            .reached()
            .into_iter()
            .filter(|&(node, _)| is_target(node))
            .filter_map(|(node, _)| Some((node, vec![self.candidate(&tree, node)?])))
            .collect();

        if self.max_alternatives == 0 || !self.profile.tracks_elevators() {
            return found;
        }

        let used: BTreeSet<StreetNodeId> = found
            .values()
            .flat_map(|candidates| candidates[0].elevators.iter().copied())
            .collect();

        for elevator in used {
            let blocked = [elevator];
            let params = SearchParams {
                blocked: &blocked,
                ..params
            };
            let detours = bounded_dijkstra(self.graph, starts, &params);

            for (node, candidates) in &mut found {
                if !candidates[0].elevators.contains(&elevator) {
                    continue;
                }
                if let Some(detour) = self.candidate(&detours, *node) {
                    if !candidates.iter().any(|c| c.elevators == detour.elevators) {
                        candidates.push(detour);
                    }
                }
            }
        }

        for candidates in found.values_mut() {
            candidates[1..].sort_unstable();
            candidates.truncate(self.max_alternatives + 1);
        }
        found
    }

    fn candidate(&self, tree: &ShortestPathTree, node: StreetNodeId) -> Option<FootpathCandidate> {
        let duration = tree.cost(node)?;
        let elevators = if self.profile.tracks_elevators() {
            tree.path(node)?
                .into_iter()
                .filter(|&n| self.elevators.is_matched_node(n))
                .collect()
        } else {
            Vec::new()
        };
        Some(FootpathCandidate {
            duration,
            elevators,
        })
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;
    use petgraph::graph::{DiGraph, NodeIndex};

    use super::*;
    use crate::model::{ElevatorId, EdgeKind, NodeCapabilities, StreetEdge, StreetNode, WheelchairAccess};

    fn node(id: i64, elevator: bool) -> StreetNode {
        StreetNode {
            id,
            geometry: Point::new(8.0, 50.0),
            capabilities: NodeCapabilities {
                elevator,
                ..Default::default()
            },
            platform_code: None,
        }
    }

    fn footway(length: f64) -> StreetEdge {
        StreetEdge {
            length,
            kind: EdgeKind::Footway,
            wheelchair: WheelchairAccess::Yes,
        }
    }

    /// 0 -> 1(elevator) -> 3 short, 0 -> 2(elevator) -> 3 longer, 0 -> 4 -> 3 ramp
    fn station() -> (StreetGraph, ElevatorMatches) {
        let mut g = DiGraph::new();
        let n: Vec<_> = (0..5).map(|i| g.add_node(node(i, i == 1 || i == 2))).collect();
        g.add_edge(n[0], n[1], footway(8.0));
        g.add_edge(n[1], n[3], footway(8.0));
        g.add_edge(n[0], n[2], footway(16.0));
        g.add_edge(n[2], n[3], footway(16.0));
        g.add_edge(n[0], n[4], footway(200.0));
        g.add_edge(n[4], n[3], footway(200.0));
        let matches = ElevatorMatches::from_pairs([(ElevatorId(1), n[1]), (ElevatorId(2), n[2])]);
        (StreetGraph::new(g), matches)
    }

    fn search<'a>(graph: &'a StreetGraph, elevators: &'a ElevatorMatches, profile: Profile) -> CandidateSearch<'a> {
        CandidateSearch {
            graph,
            elevators,
            profile,
            direction: Direction::Forward,
            max_cost: 900,
            max_alternatives: 3,
        }
    }

    #[test]
    fn detours_avoid_elevators_of_the_shortest_path() {
        let (graph, elevators) = station();
        let target = NodeIndex::new(3);
        let found = search(&graph, &elevators, Profile::Wheelchair)
            .run(&[(NodeIndex::new(0), 0)], |n| n == target);

        let candidates = &found[&target];
        // 10 + 60 + 10
        assert_eq!(candidates[0].duration, 80);
        assert_eq!(candidates[0].elevators, vec![NodeIndex::new(1)]);
        // 20 + 60 + 20
        assert_eq!(candidates[1].duration, 100);
        assert_eq!(candidates[1].elevators, vec![NodeIndex::new(2)]);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn foot_paths_carry_no_elevators() {
        let (graph, elevators) = station();
        let target = NodeIndex::new(3);
        let found = search(&graph, &elevators, Profile::Foot)
            .run(&[(NodeIndex::new(0), 0)], |n| n == target);
        assert_eq!(
            found[&target],
            vec![FootpathCandidate {
                duration: 14,
                elevators: vec![]
            }]
        );
    }

    #[test]
    fn zero_alternatives_keeps_the_shortest_path_only() {
        let (graph, elevators) = station();
        let target = NodeIndex::new(3);
        let mut search = search(&graph, &elevators, Profile::Wheelchair);
        search.max_alternatives = 0;
        let found = search.run(&[(NodeIndex::new(0), 0)], |n| n == target);
        assert_eq!(found[&target].len(), 1);
    }
}
