//! Passages between rooms, with traversal kinds and gates.
//!
//! A [`RoomEdge`] is always stored directed (`from -> to`). Whether the player
//! can walk it both ways is a property of its [`TraversalKind`], not of the
//! graph structure. A [`Gate`] is a lock on the passage, satisfied by holding
//! every key in its [`LockRequirement`] list.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{EdgeId, GateId, KeyId, NodeId};

/// How a passage may be traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TraversalKind {
    /// Walkable in both directions.
    #[default]
    Normal,
    /// Walkable only from `from` to `to`.
    OneWay,
    /// The far room can be seen but not reached through this passage.
    SightlineOnly,
    /// Not walkable at all (collapsed, sealed).
    Blocked,
}

impl TraversalKind {
    /// Returns `true` if a player can move `from -> to` along this passage.
    pub fn is_walkable_forward(self) -> bool {
        matches!(self, TraversalKind::Normal | TraversalKind::OneWay)
    }

    /// Returns `true` if a player can move `to -> from` along this passage.
    pub fn is_walkable_backward(self) -> bool {
        matches!(self, TraversalKind::Normal)
    }
}

/// What sort of lock a requirement represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    #[default]
    Standard,
    Terrain,
    Ability,
    Puzzle,
    OneWay,
    Narrative,
    Boss,
}

/// A single key needed to pass a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockRequirement {
    /// Global key identity. Never a template-local reference.
    pub key: KeyId,
    pub lock_type: LockType,
}

/// A lock on a passage. Passing requires every listed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub id: GateId,
    pub requirements: SmallVec<[LockRequirement; 2]>,
}

impl Gate {
    /// Creates a gate requiring a single key.
    pub fn single(id: GateId, key: KeyId, lock_type: LockType) -> Self {
        let mut requirements = SmallVec::new();
        requirements.push(LockRequirement { key, lock_type });
        Gate { id, requirements }
    }

    /// Creates a gate requiring all of `keys`, each with the same lock type.
    pub fn multi(id: GateId, keys: &[KeyId], lock_type: LockType) -> Self {
        Gate {
            id,
            requirements: keys
                .iter()
                .map(|&key| LockRequirement { key, lock_type })
                .collect(),
        }
    }

    /// Returns `true` if the gate lists `key`.
    pub fn requires(&self, key: KeyId) -> bool {
        self.requirements.iter().any(|r| r.key == key)
    }

    /// Adds a requirement unless the key is already required. Returns `true`
    /// if the gate changed.
    pub fn require(&mut self, key: KeyId, lock_type: LockType) -> bool {
        if self.requires(key) {
            return false;
        }
        self.requirements.push(LockRequirement { key, lock_type });
        true
    }

    /// Iterates over the required key IDs.
    pub fn keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.requirements.iter().map(|r| r.key)
    }
}

/// A passage in the output graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub traversal: TraversalKind,
    pub gate: Option<Gate>,
}

impl RoomEdge {
    /// Creates an ungated, normally traversable passage.
    pub fn new(id: EdgeId, from: NodeId, to: NodeId) -> Self {
        RoomEdge {
            id,
            from,
            to,
            traversal: TraversalKind::Normal,
            gate: None,
        }
    }

    pub fn with_traversal(mut self, traversal: TraversalKind) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_directions() {
        assert!(TraversalKind::Normal.is_walkable_forward());
        assert!(TraversalKind::Normal.is_walkable_backward());
        assert!(TraversalKind::OneWay.is_walkable_forward());
        assert!(!TraversalKind::OneWay.is_walkable_backward());
        assert!(!TraversalKind::SightlineOnly.is_walkable_forward());
        assert!(!TraversalKind::Blocked.is_walkable_forward());
    }

    #[test]
    fn multi_gate_requires_every_key() {
        let gate = Gate::multi(GateId(0), &[KeyId(1), KeyId(2)], LockType::Standard);
        assert!(gate.requires(KeyId(1)));
        assert!(gate.requires(KeyId(2)));
        assert!(!gate.requires(KeyId(3)));
        assert_eq!(gate.keys().collect::<Vec<_>>(), vec![KeyId(1), KeyId(2)]);
    }

    #[test]
    fn require_does_not_duplicate() {
        let mut gate = Gate::single(GateId(5), KeyId(1), LockType::Boss);
        assert!(!gate.require(KeyId(1), LockType::Boss));
        assert!(gate.require(KeyId(2), LockType::Standard));
        assert_eq!(gate.requirements.len(), 2);
    }

    #[test]
    fn lock_type_serializes_snake_case() {
        let json = serde_json::to_string(&LockType::OneWay).unwrap();
        assert_eq!(json, "\"one_way\"");
    }

    #[test]
    fn new_edge_is_ungated() {
        let edge = RoomEdge::new(EdgeId(0), NodeId(0), NodeId(1))
            .with_traversal(TraversalKind::OneWay);
        assert!(!edge.is_gated());
        assert_eq!(edge.traversal, TraversalKind::OneWay);
    }
}
