//! Error types shared by the network model and the solvers.

use crate::network::{LinkId, NodeId};
use thiserror::Error;

/// Errors reported by the solvers and by network loading.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The designated start node is not part of the network.
    #[error("start node {0} is not part of the network")]
    UnknownStart(NodeId),

    /// The designated end node is not part of the network.
    #[error("end node {0} is not part of the network")]
    UnknownEnd(NodeId),

    /// Two nodes share the same identifier.
    #[error("node {0} appears more than once")]
    DuplicateNode(NodeId),

    /// A link references a node that does not exist.
    #[error("link {link} references unknown node {node}")]
    UnknownLinkEndpoint { link: LinkId, node: NodeId },

    /// A configuration value is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The nearest-neighbour walk reached a node with no link to any
    /// remaining candidate. No partial route is produced.
    #[error("no feasible continuation from node {from} with {remaining} node(s) left to visit")]
    NoFeasiblePath { from: NodeId, remaining: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed network document: {0}")]
    Json(#[from] serde_json::Error),
}

impl SolverError {
    /// True for every error raised while checking inputs, before any solving
    /// work starts.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            SolverError::UnknownStart(_)
                | SolverError::UnknownEnd(_)
                | SolverError::DuplicateNode(_)
                | SolverError::UnknownLinkEndpoint { .. }
                | SolverError::InvalidParameter { .. }
        )
    }

    pub(crate) fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        SolverError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
