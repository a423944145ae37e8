//! Data model for cyclic dungeon generation.
//!
//! Identifiers and their allocator, room/passage graph, cycle templates and
//! the template library, and the key registry. Generation itself lives in
//! `cyclic-rewrite`.

pub mod alloc;
pub mod cycle_type;
pub mod edge;
pub mod error;
pub mod graph;
pub mod id;
pub mod key;
pub mod library;
pub mod node;
pub mod template;

// Re-export commonly used types
pub use alloc::IdAllocator;
pub use cycle_type::CycleType;
pub use edge::{Gate, LockRequirement, LockType, RoomEdge, TraversalKind};
pub use error::CoreError;
pub use graph::{DungeonGraph, GraphSnapshot};
pub use id::{
    CycleId, EdgeId, GateId, InsertionId, KeyId, NodeId, TEdgeId, TInsertionId, TKeyRef, TNodeId,
};
pub use key::{KeyIdentity, KeyOrigin, KeyPolicy, KeyRegistry, KeyType};
pub use library::TemplateLibrary;
pub use node::{RoomKind, RoomNode, RoomTag};
pub use template::{CycleArc, CycleTemplate, TemplateBuilder, TemplateNodeKind};
