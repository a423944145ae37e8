//! Identity allocator for the output graph.
//!
//! [`IdAllocator`] issues monotonically increasing identifiers, one counter
//! per ID kind. Nothing is ever reused, not even IDs handed to a fragment that
//! was later discarded, so every ID is unique for the whole generation run.
//!
//! One allocator belongs to exactly one run. Concurrent runs each construct
//! their own. Key IDs are issued by the
//! [`KeyRegistry`](crate::key::KeyRegistry) instead.

use serde::{Deserialize, Serialize};

use crate::id::{CycleId, EdgeId, GateId, InsertionId, NodeId};

/// Per-kind monotonic counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_node: u32,
    next_edge: u32,
    next_insertion: u32,
    next_cycle: u32,
    next_gate: u32,
}

fn bump(counter: &mut u32) -> u32 {
    let id = *counter;
    *counter += 1;
    id
}

impl IdAllocator {
    /// Creates an allocator with every counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_node(&mut self) -> NodeId {
        NodeId(bump(&mut self.next_node))
    }

    pub fn new_edge(&mut self) -> EdgeId {
        EdgeId(bump(&mut self.next_edge))
    }

    pub fn new_insertion(&mut self) -> InsertionId {
        InsertionId(bump(&mut self.next_insertion))
    }

    pub fn new_cycle(&mut self) -> CycleId {
        CycleId(bump(&mut self.next_cycle))
    }

    pub fn new_gate(&mut self) -> GateId {
        GateId(bump(&mut self.next_gate))
    }

    /// Number of node IDs issued so far.
    pub fn nodes_issued(&self) -> u32 {
        self.next_node
    }

    /// Number of edge IDs issued so far.
    pub fn edges_issued(&self) -> u32 {
        self.next_edge
    }
}
