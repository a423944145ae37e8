//! Generation error types.
//!
//! Every variant here is fatal: the run is aborted and no partial graph is
//! returned. Recoverable conditions (depth or budget limits, unresolvable
//! sub-cycle templates) never surface as errors; they are recorded as pruned
//! insertion points instead.

use cyclic_core::id::{EdgeId, InsertionId, TEdgeId};
use cyclic_core::{CoreError, CycleType};
use thiserror::Error;

/// Errors produced while generating a dungeon.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// A graph or template invariant was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A template seam references an edge the template does not define.
    #[error("malformed template '{template}': seam references missing edge {edge}")]
    MalformedTemplate { template: String, edge: TEdgeId },

    /// A pending insertion point's seam edge is no longer in the graph.
    #[error("insertion {insertion}: seam edge {edge} is missing from the graph")]
    MissingSeamEdge { insertion: InsertionId, edge: EdgeId },

    /// The selector chose a root cycle type the library does not hold.
    #[error("no template registered for root cycle type {cycle_type}")]
    MissingRootTemplate { cycle_type: CycleType },

    /// Settings failed validation.
    #[error("invalid settings: {reason}")]
    InvalidSettings { reason: String },
}
