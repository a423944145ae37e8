//! Room nodes of the generated dungeon graph.
//!
//! A [`RoomNode`] is a room in the connectivity graph, not a spatial cell. Its
//! [`RoomKind`] is structural (only the root cycle has an entrance and an
//! exit) while its [`RoomTag`] list carries role annotations added by
//! instantiation and by cycle rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{KeyId, NodeId};

/// Structural role of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoomKind {
    #[default]
    Normal,
    /// The Start room of the root cycle.
    Entrance,
    /// The Goal room of the root cycle.
    Exit,
}

/// Role annotation on a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomTag {
    /// The Start room of some cycle instance.
    CycleStart,
    /// The Goal room of some cycle instance.
    CycleGoal,
    /// Picking up this room grants the key.
    KeyGrant(KeyId),
    /// Marks a room that sits behind a lock placed later in generation.
    LockHint,
    /// Route walked by a patrolling monster.
    Patrol,
    /// Risky room (traps, strong enemies).
    Danger,
    /// Optional reward room.
    Reward,
    /// Looks like the goal but is a dead end of the loop.
    FalseGoal,
    /// Room that reveals a later area from a distance.
    Vista,
    /// Hidden or secret passage room.
    Secret,
}

impl RoomTag {
    /// Returns the granted key if this is a [`RoomTag::KeyGrant`].
    pub fn granted_key(&self) -> Option<KeyId> {
        match self {
            RoomTag::KeyGrant(key) => Some(*key),
            _ => None,
        }
    }
}

impl fmt::Display for RoomTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomTag::CycleStart => write!(f, "cycle-start"),
            RoomTag::CycleGoal => write!(f, "cycle-goal"),
            RoomTag::KeyGrant(key) => write!(f, "key-grant({key})"),
            RoomTag::LockHint => write!(f, "lock-hint"),
            RoomTag::Patrol => write!(f, "patrol"),
            RoomTag::Danger => write!(f, "danger"),
            RoomTag::Reward => write!(f, "reward"),
            RoomTag::FalseGoal => write!(f, "false-goal"),
            RoomTag::Vista => write!(f, "vista"),
            RoomTag::Secret => write!(f, "secret"),
        }
    }
}

/// A room in the output graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomNode {
    pub id: NodeId,
    pub kind: RoomKind,
    pub tags: Vec<RoomTag>,
    /// Debug label copied from the template node.
    pub label: Option<String>,
}

impl RoomNode {
    /// Creates an untagged normal room.
    pub fn new(id: NodeId) -> Self {
        RoomNode {
            id,
            kind: RoomKind::Normal,
            tags: Vec::new(),
            label: None,
        }
    }

    /// Returns `true` if the room carries `tag`.
    pub fn has_tag(&self, tag: &RoomTag) -> bool {
        self.tags.contains(tag)
    }

    /// Adds `tag` unless it is already present. Returns `true` if added.
    pub fn add_tag(&mut self, tag: RoomTag) -> bool {
        if self.has_tag(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Keys granted by this room, in tag order.
    pub fn granted_keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.tags.iter().filter_map(RoomTag::granted_key)
    }
}
