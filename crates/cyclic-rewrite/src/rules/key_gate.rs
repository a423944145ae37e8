//! Key gate: scatter keys through sub-cycles, lock the goal behind them.
//!
//! The rule anchors on the first cycle of its type it sees (normally the
//! root). The exit room of each of the first `quota` sub-cycles spliced into
//! that cycle grants a freshly minted key. Once generation finishes, and only
//! if the full quota was placed, every passage into the anchor's goal gets a
//! gate requiring all of them. With a quota of two this is the classic
//! "two keys" loop.

use tracing::debug;

use cyclic_core::id::{CycleId, KeyId, NodeId};
use cyclic_core::{Gate, KeyType, LockType, RoomTag};

use super::RuleContext;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, InsertionPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Anchor {
    cycle: CycleId,
    exit: NodeId,
}

/// Per-run state of a key gate.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyGateRule {
    quota: usize,
    lock_type: LockType,
    anchor: Option<Anchor>,
    placed: Vec<KeyId>,
}

impl KeyGateRule {
    pub fn new(quota: usize) -> Self {
        KeyGateRule {
            quota,
            lock_type: LockType::Standard,
            anchor: None,
            placed: Vec::new(),
        }
    }

    pub fn with_lock_type(mut self, lock_type: LockType) -> Self {
        self.lock_type = lock_type;
        self
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Keys placed so far, in placement order.
    pub fn placed(&self) -> &[KeyId] {
        &self.placed
    }

    fn anchor_on(
        &mut self,
        rc: &mut RuleContext<'_>,
        cycle: CycleId,
        exit: NodeId,
    ) -> Result<(), GenerationError> {
        self.anchor = Some(Anchor { cycle, exit });
        rc.graph.tag_node(exit, RoomTag::LockHint)?;
        Ok(())
    }

    pub(super) fn on_root_instantiated(
        &mut self,
        rc: &mut RuleContext<'_>,
        root: &CycleInstance,
    ) -> Result<(), GenerationError> {
        if self.anchor.is_none() {
            self.anchor_on(rc, root.id, root.exit)?;
        }
        Ok(())
    }

    pub(super) fn on_subcycle_inserted(
        &mut self,
        rc: &mut RuleContext<'_>,
        replaced: &InsertionPoint,
        inserted: &CycleInstance,
    ) -> Result<(), GenerationError> {
        if self.anchor.is_none() {
            // First sighting of this type below the root.
            if let Some(parent) = rc.provenance.cycle(replaced.cycle) {
                let exit = parent.exit;
                self.anchor_on(rc, replaced.cycle, exit)?;
            }
        }
        let Some(anchor) = self.anchor else {
            return Ok(());
        };
        if anchor.cycle != replaced.cycle || self.placed.len() >= self.quota {
            return Ok(());
        }

        let ordinal = self.placed.len() + 1;
        let key = rc.ctx.keys.mint(&format!("key {ordinal}"), KeyType::Item);
        rc.ctx.keys.set_metadata(key, "placed_by", "key_gate");
        rc.ctx
            .keys
            .set_metadata(key, "ordinal", &format!("{ordinal}/{}", self.quota));
        rc.graph.tag_node(inserted.exit, RoomTag::KeyGrant(key))?;
        self.placed.push(key);
        debug!(%key, room = %inserted.exit, cycle = %inserted.id, "key placed");
        Ok(())
    }

    pub(super) fn on_generation_finished(
        &mut self,
        rc: &mut RuleContext<'_>,
    ) -> Result<(), GenerationError> {
        let Some(anchor) = self.anchor else {
            return Ok(());
        };
        if self.quota == 0 || self.placed.len() != self.quota {
            debug!(
                placed = self.placed.len(),
                quota = self.quota,
                "key quota not met, goal left ungated"
            );
            return Ok(());
        }
        for edge in rc.graph.incoming(anchor.exit)? {
            let gate = rc.graph.gate_mut(edge)?;
            match gate {
                Some(existing) => {
                    for &key in &self.placed {
                        existing.require(key, self.lock_type);
                    }
                }
                None => {
                    *gate = Some(Gate::multi(
                        rc.ctx.ids.new_gate(),
                        &self.placed,
                        self.lock_type,
                    ));
                }
            }
        }
        Ok(())
    }
}
