//! Generation settings and their validation.
//!
//! [`GenerationSettings`] carries the seed, the nesting-depth limit, the key
//! policy, and a [`Budget`]. The budget variant also selects the generation
//! strategy:
//!
//! - [`Budget::SeamSplice`]: breadth-first seam splicing bounded by a total
//!   insertion count.
//! - [`Budget::TreeRewrite`]: depth-first recursive rewriting bounded by node
//!   count, per-cycle rewrite count, and a rewrite probability.

use cyclic_core::KeyPolicy;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Deepest nesting the generator accepts.
pub const MAX_SUPPORTED_DEPTH: u32 = 32;

/// Expansion budget, one variant per generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Budget {
    /// Breadth-first splicing: at most `max_insertions_total` insertion points
    /// are ever expanded.
    SeamSplice { max_insertions_total: u32 },
    /// Recursive tree rewriting: stop growing once the graph would exceed
    /// `max_nodes`; each cycle expands at most `max_rewrites_per_cycle` of
    /// its seams, each with probability `rewrite_probability`.
    TreeRewrite {
        max_nodes: usize,
        max_rewrites_per_cycle: u32,
        rewrite_probability: f64,
    },
}

impl Default for Budget {
    fn default() -> Self {
        Budget::SeamSplice {
            max_insertions_total: 8,
        }
    }
}

/// Everything needed to reproduce a generation run, given the same library,
/// selector and rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationSettings {
    pub seed: u64,
    pub max_depth: u32,
    #[serde(default)]
    pub budget: Budget,
    #[serde(default)]
    pub key_policy: KeyPolicy,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            seed: 0,
            max_depth: 2,
            budget: Budget::default(),
            key_policy: KeyPolicy::default(),
        }
    }
}

impl GenerationSettings {
    /// Settings for breadth-first seam splicing.
    pub fn seam_splice(seed: u64, max_depth: u32, max_insertions_total: u32) -> Self {
        GenerationSettings {
            seed,
            max_depth,
            budget: Budget::SeamSplice {
                max_insertions_total,
            },
            key_policy: KeyPolicy::default(),
        }
    }

    /// Settings for recursive tree rewriting.
    pub fn tree_rewrite(
        seed: u64,
        max_depth: u32,
        max_nodes: usize,
        max_rewrites_per_cycle: u32,
        rewrite_probability: f64,
    ) -> Self {
        GenerationSettings {
            seed,
            max_depth,
            budget: Budget::TreeRewrite {
                max_nodes,
                max_rewrites_per_cycle,
                rewrite_probability,
            },
            key_policy: KeyPolicy::default(),
        }
    }

    pub fn with_key_policy(mut self, key_policy: KeyPolicy) -> Self {
        self.key_policy = key_policy;
        self
    }

    /// Checks the settings on their own. Combinations that depend on the
    /// template library (a node budget below the root template's size) are
    /// checked when the run starts.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(invalid(format!(
                "max_depth {} exceeds the supported maximum of {MAX_SUPPORTED_DEPTH}",
                self.max_depth
            )));
        }
        if let Budget::TreeRewrite {
            max_nodes,
            rewrite_probability,
            ..
        } = self.budget
        {
            if !rewrite_probability.is_finite() || !(0.0..=1.0).contains(&rewrite_probability) {
                return Err(invalid(format!(
                    "rewrite_probability must lie in [0, 1], got {rewrite_probability}"
                )));
            }
            if max_nodes < 2 {
                return Err(invalid(format!(
                    "max_nodes must allow at least a start and a goal room, got {max_nodes}"
                )));
            }
        }
        Ok(())
    }

    /// Short strategy name for logs.
    pub fn strategy_name(&self) -> &'static str {
        match self.budget {
            Budget::SeamSplice { .. } => "seam_splice",
            Budget::TreeRewrite { .. } => "tree_rewrite",
        }
    }
}

fn invalid(reason: String) -> GenerationError {
    GenerationError::InvalidSettings { reason }
}
