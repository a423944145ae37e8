//! Recursive graph rewriting for cyclic dungeon generation.
//!
//! The [`Generator`] instantiates a root cycle template and then grows the
//! dungeon by splicing sub-cycles in place of seam edges, either breadth-first
//! under an insertion budget or recursively under a node budget. Every room
//! and passage is traced back to the cycle and arc it came from in the
//! [`Provenance`] bundle.
//!
//! ```no_run
//! use cyclic_core::{CycleType, TemplateLibrary};
//! use cyclic_rewrite::{FixedSelector, GenerationSettings, Generator, RuleRegistry};
//!
//! let library = TemplateLibrary::standard()?;
//! let generator = Generator::new(&library).with_rules(RuleRegistry::standard());
//! let mut selector = FixedSelector::new(CycleType::TwoKeys, CycleType::Gambit);
//! let dungeon = generator.generate(&GenerationSettings::seam_splice(7, 2, 6), &mut selector)?;
//! println!("{} rooms", dungeon.graph.node_count());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod context;
pub mod error;
pub mod generator;
pub mod provenance;
pub mod rewrite;
pub mod rules;
pub mod selector;
pub mod settings;

pub use context::GenerationContext;
pub use error::GenerationError;
pub use generator::{DungeonReport, DungeonSummary, GeneratedDungeon, Generator};
pub use provenance::{
    CycleInstance, EdgeProvenance, InsertionPoint, InsertionRecord, InsertionState, Provenance,
    PruneReason,
};
pub use rewrite::{instantiate, splice_replace_edge, Fragment, SpliceOutcome};
pub use rules::{CycleRule, KeyGateRule, PatrolRule, RuleRegistry};
pub use selector::{CycleSelector, FixedSelector, ScriptedSelector, UniformSelector};
pub use settings::{Budget, GenerationSettings, MAX_SUPPORTED_DEPTH};
