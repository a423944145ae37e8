//! Provenance: which cycle and arc every room and passage came from.
//!
//! The [`Provenance`] bundle is the whole contract between generation and
//! any consumer (editor, renderer, analysis). It records every
//! [`CycleInstance`], the node -> cycle and edge -> (cycle, arc) maps, the
//! ordered insertion history, and the final state of every scheduled
//! insertion point.
//!
//! Cycle records are immutable once registered. Their arc lists describe the
//! cycle as instantiated; the live membership of edges after later splices is
//! tracked by the edge map.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cyclic_core::id::{CycleId, EdgeId, InsertionId, NodeId};
use cyclic_core::{CycleArc, CycleType, DungeonGraph};

/// A live seam: an edge of some cycle instance that may be replaced by a
/// sub-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionPoint {
    pub id: InsertionId,
    /// Cycle the seam belongs to.
    pub cycle: CycleId,
    pub seam_edge: EdgeId,
    /// Nesting depth of the owning cycle.
    pub depth: u32,
}

/// Provenance record of one generated cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleInstance {
    pub id: CycleId,
    pub cycle_type: CycleType,
    pub depth: u32,
    pub entry: NodeId,
    pub exit: NodeId,
    pub arc_a: Vec<EdgeId>,
    pub arc_b: Vec<EdgeId>,
    /// Rooms strictly between entry and exit on arc A, in path order.
    pub arc_a_rooms: Vec<NodeId>,
    /// Rooms strictly between entry and exit on arc B, in path order.
    pub arc_b_rooms: Vec<NodeId>,
    pub insertion_points: Vec<InsertionPoint>,
    /// `None` only for the root cycle.
    pub parent_cycle: Option<CycleId>,
    /// `None` only for the root cycle.
    pub parent_insertion: Option<InsertionId>,
}

impl CycleInstance {
    pub fn arc(&self, arc: CycleArc) -> &[EdgeId] {
        match arc {
            CycleArc::A => &self.arc_a,
            CycleArc::B => &self.arc_b,
        }
    }

    /// Which arc `edge` was instantiated on, if any.
    pub fn arc_of(&self, edge: EdgeId) -> Option<CycleArc> {
        if self.arc_a.contains(&edge) {
            Some(CycleArc::A)
        } else if self.arc_b.contains(&edge) {
            Some(CycleArc::B)
        } else {
            None
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_cycle.is_none()
    }

    /// Rooms strictly between entry and exit along `arc`, in path order.
    ///
    /// Fixed at instantiation: splicing a sub-cycle into one of the arc's
    /// edges does not change the answer.
    pub fn arc_interior(&self, arc: CycleArc) -> &[NodeId] {
        match arc {
            CycleArc::A => &self.arc_a_rooms,
            CycleArc::B => &self.arc_b_rooms,
        }
    }
}

/// Cycle and arc membership of a live edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeProvenance {
    pub cycle: CycleId,
    pub arc: Option<CycleArc>,
}

/// Why an insertion point was not expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneReason {
    /// Expanding would exceed `max_depth`.
    DepthLimit,
    /// The total insertion budget is spent.
    InsertionBudget,
    /// The sub-cycle would push the graph past `max_nodes`.
    NodeBudget,
    /// The owning cycle already used its `max_rewrites_per_cycle`.
    RewriteLimit,
    /// The rewrite-probability roll failed.
    ProbabilityRoll,
    /// No template is registered for the selected sub-cycle type.
    MissingTemplate,
}

/// Lifecycle of a scheduled insertion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InsertionState {
    Pending,
    Expanded { cycle: CycleId },
    Pruned { reason: PruneReason },
}

/// One entry of the insertion history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionRecord {
    pub insertion: InsertionId,
    pub parent_cycle: CycleId,
    pub child_cycle: CycleId,
    pub child_type: CycleType,
    /// Depth of the inserted sub-cycle.
    pub depth: u32,
    /// The removed seam edge and its endpoints at the time of the splice.
    pub seam_edge: EdgeId,
    pub seam_from: NodeId,
    pub seam_to: NodeId,
    pub entry_bridge: EdgeId,
    pub exit_bridge: EdgeId,
}

/// Everything recorded about one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    root: Option<CycleId>,
    cycles: IndexMap<CycleId, CycleInstance>,
    node_cycles: IndexMap<NodeId, CycleId>,
    edge_arcs: IndexMap<EdgeId, EdgeProvenance>,
    insertions: Vec<InsertionRecord>,
    insertion_states: IndexMap<InsertionId, InsertionState>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Registers a freshly instantiated cycle together with the IDs of the
    /// rooms and passages its fragment created.
    pub fn register_cycle(&mut self, cycle: CycleInstance, nodes: &[NodeId], edges: &[EdgeId]) {
        if cycle.is_root() && self.root.is_none() {
            self.root = Some(cycle.id);
        }
        for &node in nodes {
            self.node_cycles.insert(node, cycle.id);
        }
        for &edge in edges {
            self.edge_arcs.insert(
                edge,
                EdgeProvenance {
                    cycle: cycle.id,
                    arc: cycle.arc_of(edge),
                },
            );
        }
        self.cycles.insert(cycle.id, cycle);
    }

    /// Records a completed splice. The bridging edges inherit the seam's
    /// cycle and arc; the seam itself leaves the edge map.
    pub fn record_splice(&mut self, record: InsertionRecord) {
        if let Some(seam) = self.edge_arcs.shift_remove(&record.seam_edge) {
            self.edge_arcs.insert(record.entry_bridge, seam);
            self.edge_arcs.insert(record.exit_bridge, seam);
        }
        self.insertion_states.insert(
            record.insertion,
            InsertionState::Expanded {
                cycle: record.child_cycle,
            },
        );
        self.insertions.push(record);
    }

    pub fn mark_pending(&mut self, insertion: InsertionId) {
        self.insertion_states
            .insert(insertion, InsertionState::Pending);
    }

    pub fn mark_pruned(&mut self, insertion: InsertionId, reason: PruneReason) {
        self.insertion_states
            .insert(insertion, InsertionState::Pruned { reason });
    }

    /// Drops map entries for rooms and passages that are no longer in
    /// `graph`.
    pub fn retain_existing(&mut self, graph: &DungeonGraph) {
        self.node_cycles.retain(|node, _| graph.contains_node(*node));
        self.edge_arcs.retain(|edge, _| graph.contains_edge(*edge));
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn root(&self) -> Option<&CycleInstance> {
        self.root.and_then(|id| self.cycles.get(&id))
    }

    pub fn cycle(&self, id: CycleId) -> Option<&CycleInstance> {
        self.cycles.get(&id)
    }

    /// All cycles in creation order.
    pub fn cycles(&self) -> impl Iterator<Item = &CycleInstance> + '_ {
        self.cycles.values()
    }

    pub fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    /// Cycle that created `node`.
    pub fn node_cycle(&self, node: NodeId) -> Option<CycleId> {
        self.node_cycles.get(&node).copied()
    }

    /// Nesting depth of the cycle that created `node`.
    pub fn node_depth(&self, node: NodeId) -> Option<u32> {
        self.node_cycle(node)
            .and_then(|c| self.cycles.get(&c))
            .map(|c| c.depth)
    }

    pub fn edge_arc(&self, edge: EdgeId) -> Option<EdgeProvenance> {
        self.edge_arcs.get(&edge).copied()
    }

    pub fn node_cycles(&self) -> &IndexMap<NodeId, CycleId> {
        &self.node_cycles
    }

    pub fn edge_arcs(&self) -> &IndexMap<EdgeId, EdgeProvenance> {
        &self.edge_arcs
    }

    /// Insertion history in processing order.
    pub fn insertions(&self) -> &[InsertionRecord] {
        &self.insertions
    }

    pub fn insertion_state(&self, insertion: InsertionId) -> Option<InsertionState> {
        self.insertion_states.get(&insertion).copied()
    }

    pub fn insertion_states(&self) -> &IndexMap<InsertionId, InsertionState> {
        &self.insertion_states
    }

    pub fn expanded_count(&self) -> usize {
        self.insertion_states
            .values()
            .filter(|s| matches!(s, InsertionState::Expanded { .. }))
            .count()
    }

    pub fn pruned_count(&self) -> usize {
        self.insertion_states
            .values()
            .filter(|s| matches!(s, InsertionState::Pruned { .. }))
            .count()
    }

    /// Deepest cycle depth reached, `0` for an empty run.
    pub fn max_depth_reached(&self) -> u32 {
        self.cycles.values().map(|c| c.depth).max().unwrap_or(0)
    }
}
