//! Patrol: mark the rooms a wandering monster walks through.
//!
//! The root's arc B interior is always a patrol route. Each sub-cycle spliced
//! into a patrol cycle gets one of its arcs tagged too, picked by a coin flip
//! from the run's RNG.

use rand::Rng;
use tracing::debug;

use cyclic_core::{CycleArc, RoomTag};

use super::RuleContext;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, InsertionPoint};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatrolRule {
    tagged: usize,
}

impl PatrolRule {
    /// Rooms tagged so far.
    pub fn tagged(&self) -> usize {
        self.tagged
    }

    fn tag_arc(
        &mut self,
        rc: &mut RuleContext<'_>,
        cycle: &CycleInstance,
        arc: CycleArc,
    ) -> Result<(), GenerationError> {
        for &room in cycle.arc_interior(arc) {
            if rc.graph.tag_node(room, RoomTag::Patrol)? {
                self.tagged += 1;
            }
        }
        debug!(cycle = %cycle.id, ?arc, "patrol route tagged");
        Ok(())
    }

    pub(super) fn on_root_instantiated(
        &mut self,
        rc: &mut RuleContext<'_>,
        root: &CycleInstance,
    ) -> Result<(), GenerationError> {
        self.tag_arc(rc, root, CycleArc::B)
    }

    pub(super) fn on_subcycle_inserted(
        &mut self,
        rc: &mut RuleContext<'_>,
        _replaced: &InsertionPoint,
        inserted: &CycleInstance,
    ) -> Result<(), GenerationError> {
        let arc = if rc.rng.gen_bool(0.5) {
            CycleArc::A
        } else {
            CycleArc::B
        };
        self.tag_arc(rc, inserted, arc)
    }
}
