//! Core error types for cyclic-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering graph
//! invariant violations and malformed cycle templates.

use thiserror::Error;

use crate::id::{EdgeId, NodeId, TEdgeId, TKeyRef, TNodeId};

/// Core errors produced by the cyclic-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A node with this ID is already in the graph.
    #[error("duplicate node: {id}")]
    DuplicateNode { id: NodeId },

    /// An edge with this ID is already in the graph.
    #[error("duplicate edge: {id}")]
    DuplicateEdge { id: EdgeId },

    /// A node ID was not found in the graph.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// An edge ID was not found in the graph.
    #[error("edge not found: {id}")]
    EdgeNotFound { id: EdgeId },

    /// Edges may not start and end at the same room.
    #[error("self-loop rejected: edge {edge} on node {node}")]
    SelfLoop { edge: EdgeId, node: NodeId },

    /// A template edge or arc references a template node that does not exist.
    #[error("template '{template}': unknown node {node}")]
    UnknownTemplateNode { template: String, node: TNodeId },

    /// A template seam or arc references a template edge that does not exist.
    #[error("template '{template}': unknown edge {edge}")]
    UnknownTemplateEdge { template: String, edge: TEdgeId },

    /// A template grant or lock references an undeclared key.
    #[error("template '{template}': unknown key {key}")]
    UnknownTemplateKey { template: String, key: TKeyRef },

    /// A template failed a structural check.
    #[error("template '{template}' is invalid: {reason}")]
    InvalidTemplate { template: String, reason: String },
}
