//! Stable ID newtypes for dungeon graph entities.
//!
//! Output-graph IDs ([`NodeId`], [`EdgeId`], [`InsertionId`], [`CycleId`],
//! [`KeyId`], [`GateId`]) are distinct newtype wrappers over `u32`, so a
//! `NodeId` cannot be passed where an `EdgeId` is expected. They are only ever
//! issued by an [`IdAllocator`](crate::alloc::IdAllocator).
//!
//! Template-local IDs ([`TNodeId`], [`TEdgeId`], [`TInsertionId`],
//! [`TKeyRef`]) live in a separate namespace scoped to one
//! [`CycleTemplate`](crate::template::CycleTemplate). They are never valid in
//! the output graph and are only read during instantiation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Output-graph identifiers
// ---------------------------------------------------------------------------

id_newtype!(
    /// Room identity in the generated dungeon graph.
    NodeId,
    "n"
);
id_newtype!(
    /// Passage identity in the generated dungeon graph.
    EdgeId,
    "e"
);
id_newtype!(
    /// Identity of one insertion-point instance (a live seam).
    InsertionId,
    "i"
);
id_newtype!(
    /// Identity of one generated cycle instance.
    CycleId,
    "c"
);
id_newtype!(
    /// Global key identity, unique across a generation run.
    KeyId,
    "k"
);
id_newtype!(
    /// Identity of a gate (lock) attached to an edge.
    GateId,
    "g"
);

// ---------------------------------------------------------------------------
// Template-local identifiers
// ---------------------------------------------------------------------------

id_newtype!(
    /// Node identity inside one cycle template.
    TNodeId,
    "tn"
);
id_newtype!(
    /// Edge identity inside one cycle template.
    TEdgeId,
    "te"
);
id_newtype!(
    /// Insertion seam identity inside one cycle template.
    TInsertionId,
    "ti"
);
id_newtype!(
    /// Key reference inside one cycle template. Resolved to a [`KeyId`] by the
    /// [`KeyRegistry`](crate::key::KeyRegistry) at instantiation time.
    TKeyRef,
    "tk"
);
