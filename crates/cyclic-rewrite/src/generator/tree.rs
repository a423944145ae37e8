//! Recursive tree rewriting.
//!
//! Every cycle walks its own seams in template order. A seam is rewritten
//! when it passes, in order: the depth limit, the owning cycle's rewrite
//! limit, the rewrite-probability roll, template lookup, and the node
//! budget. A rewritten seam's sub-cycle is fully expanded before the next
//! sibling seam is considered, so the run is depth-first.
//!
//! Recursion depth is bounded by `max_depth`, which settings validation caps.

use rand::Rng;

use super::Run;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, PruneReason};
use crate::selector::CycleSelector;

/// Limits of the tree strategy, unpacked from the budget.
#[derive(Debug, Clone, Copy)]
pub(super) struct TreeLimits {
    pub max_nodes: usize,
    pub max_rewrites_per_cycle: u32,
    pub rewrite_probability: f64,
}

pub(super) fn expand(
    run: &mut Run<'_>,
    selector: &mut dyn CycleSelector,
    root: &CycleInstance,
    limits: &TreeLimits,
) -> Result<(), GenerationError> {
    rewrite_cycle(run, selector, root, limits)
}

fn rewrite_cycle(
    run: &mut Run<'_>,
    selector: &mut dyn CycleSelector,
    cycle: &CycleInstance,
    limits: &TreeLimits,
) -> Result<(), GenerationError> {
    let mut rewrites = 0u32;
    for point in &cycle.insertion_points {
        run.schedule(point);
        let depth = point.depth + 1;

        if depth > run.max_depth() {
            run.prune(point, PruneReason::DepthLimit);
            continue;
        }
        if rewrites >= limits.max_rewrites_per_cycle {
            run.prune(point, PruneReason::RewriteLimit);
            continue;
        }
        if !run.rng.gen_bool(limits.rewrite_probability) {
            run.prune(point, PruneReason::ProbabilityRoll);
            continue;
        }

        let cycle_type = selector.select_subcycle(&mut run.rng, depth);
        let Some(template) = run.subcycle_template(point, cycle_type) else {
            continue;
        };
        if run.node_count() + template.node_count() > limits.max_nodes {
            run.prune(point, PruneReason::NodeBudget);
            continue;
        }

        let child = run.expand(point, template)?;
        rewrites += 1;
        rewrite_cycle(run, selector, &child, limits)?;
    }
    Ok(())
}
