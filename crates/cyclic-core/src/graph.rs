//! DungeonGraph: the owned room/passage graph produced by generation.
//!
//! [`DungeonGraph`] owns every [`RoomNode`] and [`RoomEdge`] keyed by their
//! allocator-issued IDs. Storage is a petgraph `StableGraph`, which doubles as
//! the adjacency index: removing an edge from the `StableGraph` removes it
//! from every adjacency list in the same call.
//!
//! # Invariants
//!
//! - Node and edge IDs are unique; re-adding an existing ID is rejected.
//! - Every edge references two existing, distinct nodes (no self-loops).
//! - The ID maps and the `StableGraph` always describe the same elements.
//!
//! Iteration order over nodes and edges is insertion order, so two runs that
//! perform the same mutations observe the same sequence.

use std::collections::HashSet;

use indexmap::IndexMap;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::edge::{Gate, RoomEdge, TraversalKind};
use crate::error::CoreError;
use crate::id::{EdgeId, NodeId};
use crate::node::{RoomNode, RoomTag};

/// The dungeon connectivity graph.
#[derive(Debug, Clone, Default)]
pub struct DungeonGraph {
    graph: StableGraph<RoomNode, RoomEdge, Directed, u32>,
    nodes: IndexMap<NodeId, NodeIndex<u32>>,
    edges: IndexMap<EdgeId, EdgeIndex<u32>>,
}

/// A read-only, serializable copy of a [`DungeonGraph`].
///
/// This is what presentation layers consume: rooms with their kind, tags and
/// label, passages with traversal kind and gate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<RoomNode>,
    pub edges: Vec<RoomEdge>,
}

impl DungeonGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a graph from a snapshot, re-checking every invariant.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self, CoreError> {
        let mut graph = DungeonGraph::new();
        for node in snapshot.nodes {
            graph.add_node(node)?;
        }
        for edge in snapshot.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Adds a room. Rejects an ID that is already present.
    pub fn add_node(&mut self, node: RoomNode) -> Result<NodeId, CoreError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(CoreError::DuplicateNode { id });
        }
        let idx = self.graph.add_node(node);
        self.nodes.insert(id, idx);
        Ok(id)
    }

    /// Adds a passage.
    ///
    /// Rejects duplicate IDs, self-loops, and endpoints that are not in the
    /// graph.
    pub fn add_edge(&mut self, edge: RoomEdge) -> Result<EdgeId, CoreError> {
        let id = edge.id;
        if self.edges.contains_key(&id) {
            return Err(CoreError::DuplicateEdge { id });
        }
        if edge.from == edge.to {
            return Err(CoreError::SelfLoop {
                edge: id,
                node: edge.from,
            });
        }
        let from_idx = self.index_of(edge.from)?;
        let to_idx = self.index_of(edge.to)?;

        let idx = self.graph.add_edge(from_idx, to_idx, edge);
        self.edges.insert(id, idx);

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(id)
    }

    /// Removes a passage and returns it. The adjacency index is updated in the
    /// same step.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<RoomEdge, CoreError> {
        let idx = self
            .edges
            .shift_remove(&id)
            .ok_or(CoreError::EdgeNotFound { id })?;
        let edge = self
            .graph
            .remove_edge(idx)
            .ok_or(CoreError::EdgeNotFound { id })?;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(edge)
    }

    /// Removes a room together with every passage touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RoomNode, CoreError> {
        let idx = self
            .nodes
            .shift_remove(&id)
            .ok_or(CoreError::NodeNotFound { id })?;
        let incident: Vec<EdgeId> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight().id)
            .collect();
        for edge in incident {
            self.edges.shift_remove(&edge);
        }
        let node = self
            .graph
            .remove_node(idx)
            .ok_or(CoreError::NodeNotFound { id })?;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(node)
    }

    /// Mutable access to a room, for tagging.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut RoomNode, CoreError> {
        let idx = self.index_of(id)?;
        self.graph
            .node_weight_mut(idx)
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Adds `tag` to a room unless already present. Returns `true` if added.
    pub fn tag_node(&mut self, id: NodeId, tag: RoomTag) -> Result<bool, CoreError> {
        Ok(self.node_mut(id)?.add_tag(tag))
    }

    /// Mutable access to a passage's gate slot. Endpoints stay read-only.
    pub fn gate_mut(&mut self, id: EdgeId) -> Result<&mut Option<Gate>, CoreError> {
        let idx = *self.edges.get(&id).ok_or(CoreError::EdgeNotFound { id })?;
        self.graph
            .edge_weight_mut(idx)
            .map(|edge| &mut edge.gate)
            .ok_or(CoreError::EdgeNotFound { id })
    }

    /// Replaces a passage's traversal kind, returning the old one.
    pub fn set_traversal(
        &mut self,
        id: EdgeId,
        traversal: TraversalKind,
    ) -> Result<TraversalKind, CoreError> {
        let idx = *self.edges.get(&id).ok_or(CoreError::EdgeNotFound { id })?;
        let edge = self
            .graph
            .edge_weight_mut(idx)
            .ok_or(CoreError::EdgeNotFound { id })?;
        Ok(std::mem::replace(&mut edge.traversal, traversal))
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&RoomNode> {
        self.nodes
            .get(&id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&RoomEdge> {
        self.edges
            .get(&id)
            .and_then(|&idx| self.graph.edge_weight(idx))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Rooms in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &RoomNode> + '_ {
        self.nodes
            .values()
            .filter_map(move |&idx| self.graph.node_weight(idx))
    }

    /// Passages in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &RoomEdge> + '_ {
        self.edges
            .values()
            .filter_map(move |&idx| self.graph.edge_weight(idx))
    }

    /// IDs of passages leaving `node`, ascending.
    pub fn outgoing(&self, node: NodeId) -> Result<Vec<EdgeId>, CoreError> {
        self.incident(node, Direction::Outgoing)
    }

    /// IDs of passages entering `node`, ascending.
    pub fn incoming(&self, node: NodeId) -> Result<Vec<EdgeId>, CoreError> {
        self.incident(node, Direction::Incoming)
    }

    /// Rooms carrying `tag`, in insertion order.
    pub fn nodes_with_tag(&self, tag: &RoomTag) -> Vec<NodeId> {
        self.nodes()
            .filter(|n| n.has_tag(tag))
            .map(|n| n.id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Structural queries
    // -----------------------------------------------------------------------

    /// Every room reachable from `start` following passages in their stored
    /// direction, `start` included. Traversal kinds and gates are ignored;
    /// this is macro-level connectivity.
    pub fn reachable_from(&self, start: NodeId) -> Result<HashSet<NodeId>, CoreError> {
        let start_idx = self.index_of(start)?;
        let mut bfs = Bfs::new(&self.graph, start_idx);
        let mut seen = HashSet::new();
        while let Some(idx) = bfs.next(&self.graph) {
            if let Some(node) = self.graph.node_weight(idx) {
                seen.insert(node.id);
            }
        }
        Ok(seen)
    }

    /// Returns `true` if a directed path leads from `from` to `to`.
    pub fn has_path(&self, from: NodeId, to: NodeId) -> Result<bool, CoreError> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        Ok(has_path_connecting(&self.graph, from_idx, to_idx, None))
    }

    /// Edges whose recorded endpoints are missing or disagree with the
    /// adjacency storage.
    pub fn dangling_edges(&self) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, &idx)| {
                let Some(edge) = self.graph.edge_weight(idx) else {
                    return true;
                };
                let Some((a, b)) = self.graph.edge_endpoints(idx) else {
                    return true;
                };
                self.nodes.get(&edge.from) != Some(&a) || self.nodes.get(&edge.to) != Some(&b)
            })
            .map(|(&id, _)| id)
            .collect()
    }

    /// Drops every dangling edge and returns the IDs that were removed.
    pub fn remove_dangling_edges(&mut self) -> Vec<EdgeId> {
        let dangling = self.dangling_edges();
        for &id in &dangling {
            if let Some(idx) = self.edges.shift_remove(&id) {
                self.graph.remove_edge(idx);
            }
        }
        dangling
    }

    /// Copies the graph into a [`GraphSnapshot`].
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn index_of(&self, id: NodeId) -> Result<NodeIndex<u32>, CoreError> {
        self.nodes
            .get(&id)
            .copied()
            .ok_or(CoreError::NodeNotFound { id })
    }

    fn incident(&self, node: NodeId, dir: Direction) -> Result<Vec<EdgeId>, CoreError> {
        let idx = self.index_of(node)?;
        let mut ids: Vec<EdgeId> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| e.weight().id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Verifies that the ID maps and the `StableGraph` agree on counts.
    ///
    /// Only called in debug builds (via `cfg(debug_assertions)`).
    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        assert_eq!(
            self.nodes.len(),
            self.graph.node_count(),
            "node map and graph disagree"
        );
        assert_eq!(
            self.edges.len(),
            self.graph.edge_count(),
            "edge map and graph disagree"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::LockType;
    use crate::id::{GateId, KeyId};

    fn room(id: u32) -> RoomNode {
        RoomNode::new(NodeId(id))
    }

    fn passage(id: u32, from: u32, to: u32) -> RoomEdge {
        RoomEdge::new(EdgeId(id), NodeId(from), NodeId(to))
    }

    /// Helper: a -> b -> c
    fn build_chain() -> DungeonGraph {
        let mut graph = DungeonGraph::new();
        for id in 0..3 {
            graph.add_node(room(id)).unwrap();
        }
        graph.add_edge(passage(0, 0, 1)).unwrap();
        graph.add_edge(passage(1, 1, 2)).unwrap();
        graph
    }

    #[test]
    fn basic_construction() {
        let graph = build_chain();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.outgoing(NodeId(1)).unwrap(), vec![EdgeId(1)]);
        assert_eq!(graph.incoming(NodeId(1)).unwrap(), vec![EdgeId(0)]);
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut graph = build_chain();
        let err = graph.add_node(room(1)).unwrap_err();
        assert_eq!(err, CoreError::DuplicateNode { id: NodeId(1) });
    }

    #[test]
    fn duplicate_edge_rejected() {
        let mut graph = build_chain();
        let err = graph.add_edge(passage(0, 2, 0)).unwrap_err();
        assert_eq!(err, CoreError::DuplicateEdge { id: EdgeId(0) });
    }

    #[test]
    fn self_loop_rejected() {
        let mut graph = build_chain();
        let err = graph.add_edge(passage(9, 2, 2)).unwrap_err();
        assert!(matches!(err, CoreError::SelfLoop { node: NodeId(2), .. }));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn missing_endpoint_rejected() {
        let mut graph = build_chain();
        let err = graph.add_edge(passage(9, 0, 77)).unwrap_err();
        assert_eq!(err, CoreError::NodeNotFound { id: NodeId(77) });
        assert!(!graph.contains_edge(EdgeId(9)));
    }

    #[test]
    fn remove_edge_updates_adjacency() {
        let mut graph = build_chain();
        let removed = graph.remove_edge(EdgeId(0)).unwrap();
        assert_eq!(removed.from, NodeId(0));
        assert!(!graph.contains_edge(EdgeId(0)));
        assert!(graph.outgoing(NodeId(0)).unwrap().is_empty());
        assert!(graph.incoming(NodeId(1)).unwrap().is_empty());
        assert_eq!(
            graph.remove_edge(EdgeId(0)).unwrap_err(),
            CoreError::EdgeNotFound { id: EdgeId(0) }
        );
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut graph = build_chain();
        graph.remove_node(NodeId(1)).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.dangling_edges().is_empty());
    }

    #[test]
    fn edge_ids_are_not_petgraph_indices() {
        // Re-adding after removal reuses a StableGraph slot but keeps our IDs.
        let mut graph = build_chain();
        graph.remove_edge(EdgeId(0)).unwrap();
        graph.add_edge(passage(50, 0, 2)).unwrap();
        assert_eq!(graph.edge(EdgeId(50)).unwrap().to, NodeId(2));
        assert!(graph.edge(EdgeId(0)).is_none());
        assert_eq!(graph.outgoing(NodeId(0)).unwrap(), vec![EdgeId(50)]);
    }

    #[test]
    fn reachability() {
        let graph = build_chain();
        let seen = graph.reachable_from(NodeId(0)).unwrap();
        assert_eq!(seen.len(), 3);
        assert!(graph.has_path(NodeId(0), NodeId(2)).unwrap());
        assert!(!graph.has_path(NodeId(2), NodeId(0)).unwrap());
    }

    #[test]
    fn tagging_and_gates() {
        let mut graph = build_chain();
        assert!(graph.tag_node(NodeId(2), RoomTag::LockHint).unwrap());
        assert_eq!(graph.nodes_with_tag(&RoomTag::LockHint), vec![NodeId(2)]);

        *graph.gate_mut(EdgeId(1)).unwrap() =
            Some(Gate::single(GateId(0), KeyId(3), LockType::Standard));
        assert!(graph.edge(EdgeId(1)).unwrap().is_gated());

        let old = graph.set_traversal(EdgeId(0), TraversalKind::OneWay).unwrap();
        assert_eq!(old, TraversalKind::Normal);
    }

    #[test]
    fn snapshot_roundtrip_preserves_order() {
        let mut graph = build_chain();
        graph.add_node(room(10)).unwrap();
        graph.add_edge(passage(7, 2, 10)).unwrap();
        let snapshot = graph.snapshot();
        let ids: Vec<NodeId> = snapshot.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(10)]);

        let rebuilt = DungeonGraph::from_snapshot(snapshot.clone()).unwrap();
        assert_eq!(rebuilt.snapshot(), snapshot);
    }

    #[test]
    fn from_snapshot_rejects_dangling_edge() {
        let snapshot = GraphSnapshot {
            nodes: vec![room(0)],
            edges: vec![passage(0, 0, 1)],
        };
        assert!(DungeonGraph::from_snapshot(snapshot).is_err());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(u32, u32),
            Remove(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u32..6, 0u32..6).prop_map(|(a, b)| Op::Add(a, b)),
                (0usize..32).prop_map(Op::Remove),
            ]
        }

        proptest! {
            #[test]
            fn adjacency_tracks_edge_mutations(ops in prop::collection::vec(op(), 0..40)) {
                let mut graph = DungeonGraph::new();
                for id in 0..6 {
                    graph.add_node(room(id)).unwrap();
                }
                let mut next_edge = 0u32;
                let mut live: Vec<EdgeId> = Vec::new();

                for op in ops {
                    match op {
                        Op::Add(a, b) => {
                            let result = graph.add_edge(passage(next_edge, a, b));
                            prop_assert_eq!(result.is_ok(), a != b);
                            if a != b {
                                live.push(EdgeId(next_edge));
                            }
                            next_edge += 1;
                        }
                        Op::Remove(i) if !live.is_empty() => {
                            let id = live.remove(i % live.len());
                            prop_assert!(graph.remove_edge(id).is_ok());
                        }
                        Op::Remove(_) => {}
                    }
                }

                prop_assert_eq!(graph.edge_count(), live.len());
                prop_assert!(graph.dangling_edges().is_empty());
                for id in &live {
                    let edge = graph.edge(*id).unwrap();
                    prop_assert!(graph.outgoing(edge.from).unwrap().contains(id));
                    prop_assert!(graph.incoming(edge.to).unwrap().contains(id));
                }
            }
        }
    }
}
