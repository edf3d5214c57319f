//! Module for representing start-to-end TSP networks.
//!
//! A network is a set of labelled nodes, a set of undirected candidate links
//! with integer costs, and a designated start and end node. The graph does not
//! have to be complete. Solvers only read a network; building one is up to the
//! caller.

use crate::error::{Result, SolverError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Identifier of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Identifier of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A position in the plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Represents a node (city) in the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Display label
    pub name: String,
    /// Layout position, used as the city position when annealing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

impl Node {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Node {
            id: NodeId(id),
            name: name.into(),
            position: None,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }
}

/// Represents a candidate link between two nodes.
///
/// Links are undirected for solving: `start` and `end` only record how the
/// link was drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub start: NodeId,
    pub end: NodeId,
    /// Traversal cost, the same in both directions. Negative values are
    /// accepted as-is.
    pub cost: i32,
}

impl Link {
    pub fn new(id: u64, start: NodeId, end: NodeId, cost: i32) -> Self {
        Link {
            id: LinkId(id),
            start,
            end,
            cost,
        }
    }

    /// Check whether this link joins `a` and `b`, in either direction
    #[inline]
    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        (self.start == a && self.end == b) || (self.start == b && self.end == a)
    }
}

/// A complete start-to-end TSP network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// Nodes in insertion order. This order breaks ties in the solvers.
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub start: NodeId,
    pub end: NodeId,
}

impl Network {
    /// Build a network and check that it is well formed
    pub fn new(
        name: impl Into<String>,
        nodes: Vec<Node>,
        links: Vec<Link>,
        start: NodeId,
        end: NodeId,
    ) -> Result<Self> {
        let network = Network {
            id: 0,
            name: name.into(),
            nodes,
            links,
            start,
            end,
        };
        network.validate()?;
        Ok(network)
    }

    /// Parse a network from a JSON document on disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let network: Network = serde_json::from_reader(BufReader::new(file))?;
        network.validate()?;
        Ok(network)
    }

    /// Parse a network from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let network: Network = serde_json::from_str(json)?;
        network.validate()?;
        Ok(network)
    }

    /// Check node uniqueness, start/end membership and link endpoints.
    ///
    /// An empty network is valid whatever its start and end say.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(SolverError::DuplicateNode(node.id));
            }
        }

        if !seen.contains(&self.start) {
            return Err(SolverError::UnknownStart(self.start));
        }
        if !seen.contains(&self.end) {
            return Err(SolverError::UnknownEnd(self.end));
        }

        for link in &self.links {
            for endpoint in [link.start, link.end] {
                if !seen.contains(&endpoint) {
                    return Err(SolverError::UnknownLinkEndpoint {
                        link: link.id,
                        node: endpoint,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Insertion index of a node
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Find the link joining `a` and `b` regardless of direction.
    ///
    /// If parallel links exist the one with the lowest id is returned.
    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.links
            .iter()
            .filter(|l| l.connects(a, b))
            .min_by_key(|l| l.id)
    }

    /// Label of a node, or its id when the node is unknown
    pub fn label(&self, id: NodeId) -> String {
        self.node(id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Positions of the given nodes, in order.
    ///
    /// Returns `None` if any of them is unknown or has no position.
    pub fn positions_of(&self, ids: &[NodeId]) -> Option<Vec<Point>> {
        ids.iter()
            .map(|&id| self.node(id).and_then(|n| n.position))
            .collect()
    }

    /// Positions of all nodes in insertion order
    pub fn positions(&self) -> Option<Vec<Point>> {
        self.nodes.iter().map(|n| n.position).collect()
    }

    /// Get statistics about the network
    pub fn statistics(&self) -> NetworkStatistics {
        let n = self.nodes.len();
        let possible = n * n.saturating_sub(1) / 2;
        let density = if possible == 0 {
            0.0
        } else {
            self.links.len() as f64 / possible as f64
        };

        NetworkStatistics {
            name: self.name.clone(),
            num_nodes: n,
            num_links: self.links.len(),
            density,
            min_cost: self.links.iter().map(|l| l.cost).min(),
            max_cost: self.links.iter().map(|l| l.cost).max(),
            total_cost: self.links.iter().map(|l| l.cost as i64).sum(),
            start: self.label(self.start),
            end: self.label(self.end),
            positioned: self.nodes.iter().all(|n| n.position.is_some()),
        }
    }
}

/// Statistics about a network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub name: String,
    pub num_nodes: usize,
    pub num_links: usize,
    /// Fraction of node pairs joined by at least one link (parallel links count twice)
    pub density: f64,
    pub min_cost: Option<i32>,
    pub max_cost: Option<i32>,
    pub total_cost: i64,
    pub start: String,
    pub end: String,
    /// Whether every node has a position
    pub positioned: bool,
}

impl fmt::Display for NetworkStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network: {}", self.name)?;
        writeln!(f, "  Nodes: {}", self.num_nodes)?;
        writeln!(f, "  Links: {} (density {:.2})", self.num_links, self.density)?;
        match (self.min_cost, self.max_cost) {
            (Some(min), Some(max)) => writeln!(f, "  Link cost: {}..={} (total {})", min, max, self.total_cost)?,
            _ => writeln!(f, "  Link cost: n/a")?,
        }
        writeln!(f, "  Start: {}", self.start)?;
        writeln!(f, "  End: {}", self.end)?;
        writeln!(f, "  Positions: {}", if self.positioned { "all nodes" } else { "incomplete" })
    }
}
