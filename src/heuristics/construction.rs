use crate::error::{Result, SolverError};
use crate::network::{Link, Network};
use crate::route::Route;
use log::debug;

pub trait ConstructionHeuristic {
    fn construct(&self, network: &Network) -> Result<Route>;
    fn name(&self) -> &str;
}

/// Greedy start-to-end path construction
///
/// Starting at the network's start node, repeatedly walks the cheapest link
/// to a node that has not been visited yet. The end node is held back until
/// it is the only node left, so every route finishes there.
///
/// Ties are broken by node insertion order: the first candidate in
/// `network.nodes` with the minimum cost wins. Links are symmetric; a link's
/// single cost applies in both directions and asymmetric costs are not
/// supported.
pub struct GreedyConstruction;

impl GreedyConstruction {
    pub fn new() -> Self {
        GreedyConstruction
    }

    /// Find the cheapest link from `current` to an eligible remaining node.
    ///
    /// Returns the node's insertion index and the link, or `None` if no
    /// eligible node is reachable.
    fn find_nearest<'a>(
        &self,
        network: &'a Network,
        current: usize,
        remaining: &[bool],
        remaining_count: usize,
        end: usize,
    ) -> Option<(usize, &'a Link)> {
        let from = network.nodes[current].id;
        let mut best: Option<(usize, &'a Link)> = None;

        for (idx, node) in network.nodes.iter().enumerate() {
            if !remaining[idx] || (idx == end && remaining_count > 1) {
                continue;
            }

            let Some(link) = network.link_between(from, node.id) else {
                continue;
            };

            if best.map_or(true, |(_, b)| link.cost < b.cost) {
                best = Some((idx, link));
            }
        }

        best
    }
}

impl Default for GreedyConstruction {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for GreedyConstruction {
    fn construct(&self, network: &Network) -> Result<Route> {
        let timer = std::time::Instant::now();

        if network.nodes.is_empty() {
            let mut route = Route::new();
            route.algorithm = self.name().to_string();
            return Ok(route);
        }

        network.validate()?;
        let start = network
            .node_index(network.start)
            .ok_or(SolverError::UnknownStart(network.start))?;
        let end = network
            .node_index(network.end)
            .ok_or(SolverError::UnknownEnd(network.end))?;

        let mut remaining = vec![true; network.nodes.len()];
        remaining[start] = false;
        let mut remaining_count = network.nodes.len() - 1;

        let mut route = Route::starting_at(network.start, self.name());
        let mut current = start;

        while remaining_count > 0 {
            let (next, link) = self
                .find_nearest(network, current, &remaining, remaining_count, end)
                .ok_or_else(|| SolverError::NoFeasiblePath {
                    from: network.nodes[current].id,
                    remaining: remaining_count,
                })?;

            debug!(
                "greedy: {} -> {} via link {} (cost {})",
                network.nodes[current].name, network.nodes[next].name, link.id, link.cost
            );

            remaining[next] = false;
            remaining_count -= 1;
            route.push(link.clone(), network.nodes[next].id);
            current = next;
        }

        route.computation_time = timer.elapsed().as_secs_f64();
        debug!("greedy: {} links, total cost {}", route.len(), route.cost());
        Ok(route)
    }

    fn name(&self) -> &str {
        "Greedy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LinkId, Node, NodeId};
    use proptest::prelude::*;
    use std::collections::HashSet;

    const AAA: NodeId = NodeId(1);
    const BBB: NodeId = NodeId(2);
    const CCC: NodeId = NodeId(3);
    const DDD: NodeId = NodeId(4);
    const EEE: NodeId = NodeId(5);

    /// Five nodes whose cheapest walk is aaa -> bbb -> ddd -> ccc -> eee.
    /// Link directions are mixed on purpose.
    fn five_node_network() -> Network {
        Network::new(
            "New Document",
            vec![
                Node::new(1, "aaa"),
                Node::new(2, "bbb"),
                Node::new(3, "ccc"),
                Node::new(4, "ddd"),
                Node::new(5, "eee"),
            ],
            vec![
                Link::new(1, AAA, BBB, 5),
                Link::new(2, DDD, BBB, 10),
                Link::new(3, DDD, CCC, 8),
                Link::new(4, EEE, CCC, 12),
                Link::new(5, AAA, CCC, 20),
                Link::new(6, BBB, CCC, 15),
                Link::new(7, AAA, EEE, 1),
                Link::new(8, BBB, EEE, 2),
            ],
            AAA,
            EEE,
        )
        .unwrap()
    }

    /// Start in the hub; once a spoke is taken there is no way onwards.
    fn hub_spoke_network() -> Network {
        Network::new(
            "hub-spoke",
            vec![
                Node::new(1, "hub"),
                Node::new(2, "north"),
                Node::new(3, "south"),
                Node::new(4, "west"),
                Node::new(5, "east"),
            ],
            vec![
                Link::new(1, NodeId(1), NodeId(2), 1),
                Link::new(2, NodeId(1), NodeId(3), 2),
                Link::new(3, NodeId(1), NodeId(4), 3),
                Link::new(4, NodeId(1), NodeId(5), 4),
            ],
            NodeId(1),
            NodeId(5),
        )
        .unwrap()
    }

    #[test]
    fn test_five_node_route() {
        let network = five_node_network();
        let route = GreedyConstruction::new().construct(&network).unwrap();

        assert_eq!(route.len(), 4);
        assert_eq!(route.cost(), 35);
        assert_eq!(route.nodes(), &[AAA, BBB, DDD, CCC, EEE]);
        assert_eq!(route.describe(&network), "aaa -> bbb -> ddd -> ccc -> eee");

        let ids: Vec<LinkId> = route.links().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![LinkId(1), LinkId(2), LinkId(3), LinkId(4)]);

        // stored direction is preserved
        assert_eq!(route.links()[1].start, DDD);
        assert_eq!(route.links()[1].end, BBB);
    }

    #[test]
    fn test_sample_files() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/samples");

        let network = Network::from_file(format!("{dir}/five_nodes.json")).unwrap();
        let route = GreedyConstruction::new().construct(&network).unwrap();
        assert_eq!(route.cost(), 35);
        assert_eq!(route.describe(&network), "aaa -> bbb -> ddd -> ccc -> eee");

        let network = Network::from_file(format!("{dir}/hub_spoke.json")).unwrap();
        let err = GreedyConstruction::new().construct(&network).unwrap_err();
        assert!(matches!(err, SolverError::NoFeasiblePath { .. }));
    }

    #[test]
    fn test_route_links_are_consecutive() {
        let route = GreedyConstruction::new().construct(&five_node_network()).unwrap();

        for (i, link) in route.links().iter().enumerate() {
            assert!(link.connects(route.nodes()[i], route.nodes()[i + 1]));
        }
        let summed: i64 = route.links().iter().map(|l| l.cost as i64).sum();
        assert_eq!(route.cost(), summed);
    }

    #[test]
    fn test_hub_spoke_has_no_feasible_path() {
        let err = GreedyConstruction::new()
            .construct(&hub_spoke_network())
            .unwrap_err();

        match err {
            SolverError::NoFeasiblePath { from, remaining } => {
                assert_eq!(from, NodeId(2));
                assert_eq!(remaining, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_network_gives_empty_route() {
        let network = Network {
            id: 0,
            name: "empty".to_string(),
            nodes: vec![],
            links: vec![],
            start: NodeId(1),
            end: NodeId(2),
        };

        let route = GreedyConstruction::new().construct(&network).unwrap();
        assert!(route.is_empty());
        assert_eq!(route.cost(), 0);
    }

    #[test]
    fn test_single_node_network() {
        let network =
            Network::new("single", vec![Node::new(1, "solo")], vec![], NodeId(1), NodeId(1)).unwrap();

        let route = GreedyConstruction::new().construct(&network).unwrap();
        assert!(route.is_empty());
        assert_eq!(route.nodes(), &[NodeId(1)]);
    }

    #[test]
    fn test_unknown_start_is_rejected_before_solving() {
        let mut network = five_node_network();
        network.start = NodeId(42);

        let err = GreedyConstruction::new().construct(&network).unwrap_err();
        assert!(matches!(err, SolverError::UnknownStart(NodeId(42))));
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn test_end_is_visited_last_even_when_cheapest() {
        // aaa -> eee costs 1 but eee must wait until everything else is visited
        let route = GreedyConstruction::new().construct(&five_node_network()).unwrap();
        assert_eq!(route.nodes().last(), Some(&EEE));
        assert!(route.nodes()[..4].iter().all(|&n| n != EEE));
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let network = Network::new(
            "ties",
            vec![
                Node::new(1, "s"),
                Node::new(3, "first"),
                Node::new(2, "second"),
                Node::new(4, "e"),
            ],
            vec![
                Link::new(1, NodeId(1), NodeId(2), 3),
                Link::new(2, NodeId(1), NodeId(3), 3),
                Link::new(3, NodeId(2), NodeId(3), 1),
                Link::new(4, NodeId(2), NodeId(4), 1),
                Link::new(5, NodeId(3), NodeId(4), 1),
            ],
            NodeId(1),
            NodeId(4),
        )
        .unwrap();

        let route = GreedyConstruction::new().construct(&network).unwrap();
        assert_eq!(route.nodes(), &[NodeId(1), NodeId(3), NodeId(2), NodeId(4)]);
        assert_eq!(route.cost(), 5);
    }

    #[test]
    fn test_parallel_links_use_lowest_id() {
        let mut network = five_node_network();
        network.links.push(Link::new(0, BBB, AAA, 40));

        let route = GreedyConstruction::new().construct(&network).unwrap();
        // aaa-bbb now costs 40 through link 0, so aaa-ccc (20) is taken first
        assert_eq!(route.nodes()[1], CCC);
        assert_eq!(route.nodes().last(), Some(&EEE));
    }

    #[test]
    fn test_dead_end_before_end_node() {
        // s - a - e, plus b reachable only from e: b can never be reached before e
        let network = Network::new(
            "dead-end",
            vec![Node::new(1, "s"), Node::new(2, "a"), Node::new(3, "b"), Node::new(4, "e")],
            vec![
                Link::new(1, NodeId(1), NodeId(2), 1),
                Link::new(2, NodeId(2), NodeId(4), 1),
                Link::new(3, NodeId(4), NodeId(3), 1),
            ],
            NodeId(1),
            NodeId(4),
        )
        .unwrap();

        let err = GreedyConstruction::new().construct(&network).unwrap_err();
        assert!(matches!(err, SolverError::NoFeasiblePath { from: NodeId(2), remaining: 2 }));
    }

    /// Random undirected graph: node count, optional cost per pair, start and end index
    fn arb_network() -> impl Strategy<Value = Network> {
        (2usize..9).prop_flat_map(|n| {
            (
                prop::collection::vec(prop::option::weighted(0.6, -5i32..20), n * n),
                0..n,
                0..n - 1,
            )
                .prop_map(move |(costs, start, end)| {
                    let end = if end >= start { end + 1 } else { end };
                    let nodes = (0..n).map(|i| Node::new(i as u64 + 1, format!("n{i}"))).collect();
                    let mut links = Vec::new();
                    for i in 0..n {
                        for j in i + 1..n {
                            if let Some(cost) = costs[i * n + j] {
                                let id = links.len() as u64 + 1;
                                links.push(Link::new(id, NodeId(i as u64 + 1), NodeId(j as u64 + 1), cost));
                            }
                        }
                    }
                    Network::new(
                        "random",
                        nodes,
                        links,
                        NodeId(start as u64 + 1),
                        NodeId(end as u64 + 1),
                    )
                    .unwrap()
                })
        })
    }

    proptest! {
        #[test]
        fn prop_greedy_route_is_a_cheapest_step_walk(network in arb_network()) {
            let n = network.nodes.len();
            let route = match GreedyConstruction::new().construct(&network) {
                Ok(route) => route,
                Err(err) => {
                    prop_assert!(matches!(err, SolverError::NoFeasiblePath { .. }), "{err}");
                    return Ok(());
                }
            };

            prop_assert_eq!(route.len(), n - 1);
            prop_assert_eq!(route.nodes().len(), n);
            prop_assert_eq!(route.nodes()[0], network.start);
            prop_assert_eq!(route.nodes()[n - 1], network.end);

            let distinct: HashSet<NodeId> = route.nodes().iter().copied().collect();
            prop_assert_eq!(distinct.len(), n);

            let summed: i64 = route.links().iter().map(|l| l.cost as i64).sum();
            prop_assert_eq!(route.cost(), summed);

            // each link is the cheapest way on to a node still eligible at that point
            let mut visited = HashSet::new();
            for (i, link) in route.links().iter().enumerate() {
                let (from, to) = (route.nodes()[i], route.nodes()[i + 1]);
                prop_assert!(link.connects(from, to));
                visited.insert(from);

                let last_step = i == n - 2;
                for node in &network.nodes {
                    if visited.contains(&node.id) || (node.id == network.end && !last_step) {
                        continue;
                    }
                    if let Some(other) = network.link_between(from, node.id) {
                        prop_assert!(link.cost <= other.cost, "{} beat {}", other.id, link.id);
                    }
                }
            }
        }
    }
}
