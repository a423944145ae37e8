//! Breadth-first seam splicing.
//!
//! Insertion points wait in a FIFO work-list. Each one dequeued is either
//! expanded (a sub-cycle replaces its seam and the sub-cycle's own seams join
//! the back of the queue) or pruned (its seam stays a plain passage for
//! good). Two counters bound the run:
//!
//! - `reserved`: insertion points ever enqueued. Child seams are only
//!   enqueued while this is below the budget, so the root's seams are always
//!   considered and no more than `max_insertions_total` points ever are.
//! - `expanded`: insertion points actually expanded. A dequeued point is
//!   pruned once this reaches the budget.

use std::collections::VecDeque;

use tracing::debug;

use super::Run;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, PruneReason};
use crate::selector::CycleSelector;

pub(super) fn expand(
    run: &mut Run<'_>,
    selector: &mut dyn CycleSelector,
    root: &CycleInstance,
    max_insertions_total: u32,
) -> Result<(), GenerationError> {
    let budget = max_insertions_total as usize;
    let mut queue = VecDeque::with_capacity(root.insertion_points.len());
    for point in &root.insertion_points {
        run.schedule(point);
        queue.push_back(*point);
    }
    let mut reserved = queue.len();
    let mut expanded = 0usize;

    while let Some(point) = queue.pop_front() {
        if point.depth + 1 > run.max_depth() {
            run.prune(&point, PruneReason::DepthLimit);
            continue;
        }
        if expanded >= budget {
            run.prune(&point, PruneReason::InsertionBudget);
            continue;
        }

        let cycle_type = selector.select_subcycle(&mut run.rng, point.depth + 1);
        let Some(template) = run.subcycle_template(&point, cycle_type) else {
            continue;
        };
        let child = run.expand(&point, template)?;
        expanded += 1;

        for child_point in &child.insertion_points {
            if reserved >= budget {
                debug!(
                    cycle = %child.id,
                    budget,
                    "insertion budget reserved, remaining child seams not scheduled"
                );
                break;
            }
            run.schedule(child_point);
            queue.push_back(*child_point);
            reserved += 1;
        }
    }
    Ok(())
}
