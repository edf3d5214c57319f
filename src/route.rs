//! Route representation for start-to-end solutions.
//!
//! A route is the ordered list of links walked from the start node to the end
//! node, together with the node sequence it visits.

use crate::network::{Link, Network, NodeId};
use serde::{Deserialize, Serialize};

/// Represents a start-to-end route through a network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Links in walking order; consecutive links share an endpoint
    links: Vec<Link>,
    /// Visited nodes, start first. Holds one more entry than `links` unless empty.
    nodes: Vec<NodeId>,
    /// Algorithm that generated this route
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
}

impl Route {
    /// Create an empty route
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a route at `start` with no links yet
    pub(crate) fn starting_at(start: NodeId, algorithm: &str) -> Self {
        Route {
            links: Vec::new(),
            nodes: vec![start],
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
        }
    }

    /// Extend the route along `link` to `next`
    pub(crate) fn push(&mut self, link: Link, next: NodeId) {
        self.links.push(link);
        self.nodes.push(next);
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Sum of link costs
    pub fn cost(&self) -> i64 {
        self.links.iter().map(|l| l.cost as i64).sum()
    }

    /// Human readable node sequence, e.g. `a -> b -> c`
    pub fn describe(&self, network: &Network) -> String {
        self.nodes
            .iter()
            .map(|&id| network.label(id))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Route ({})", self.algorithm)?;
        writeln!(f, "  Cost: {}", self.cost())?;
        writeln!(f, "  Links: {}", self.len())?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        let ids: Vec<u64> = self.nodes.iter().map(|n| n.0).collect();
        writeln!(f, "  Nodes: {:?}", ids)
    }
}
