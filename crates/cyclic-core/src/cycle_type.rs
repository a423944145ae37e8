//! The closed set of cycle grammar patterns.
//!
//! Every [`CycleTemplate`](crate::template::CycleTemplate) is registered under
//! one [`CycleType`]. The set is fixed, which lets rule dispatch be a plain
//! lookup keyed by this enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The twelve cycle patterns of the dungeon grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CycleType {
    TwoAlternativePaths,
    TwoKeys,
    HiddenShortcut,
    DangerousRoute,
    ForeshadowingLoop,
    LockAndKeyCycle,
    BlockedRetreat,
    MonsterPatrol,
    AlteredReturn,
    FalseGoal,
    SimpleLockAndKey,
    Gambit,
}

impl CycleType {
    /// All cycle types, in declaration order.
    pub const ALL: [CycleType; 12] = [
        CycleType::TwoAlternativePaths,
        CycleType::TwoKeys,
        CycleType::HiddenShortcut,
        CycleType::DangerousRoute,
        CycleType::ForeshadowingLoop,
        CycleType::LockAndKeyCycle,
        CycleType::BlockedRetreat,
        CycleType::MonsterPatrol,
        CycleType::AlteredReturn,
        CycleType::FalseGoal,
        CycleType::SimpleLockAndKey,
        CycleType::Gambit,
    ];

    /// Canonical name, identical to the variant name.
    pub fn name(self) -> &'static str {
        match self {
            CycleType::TwoAlternativePaths => "TwoAlternativePaths",
            CycleType::TwoKeys => "TwoKeys",
            CycleType::HiddenShortcut => "HiddenShortcut",
            CycleType::DangerousRoute => "DangerousRoute",
            CycleType::ForeshadowingLoop => "ForeshadowingLoop",
            CycleType::LockAndKeyCycle => "LockAndKeyCycle",
            CycleType::BlockedRetreat => "BlockedRetreat",
            CycleType::MonsterPatrol => "MonsterPatrol",
            CycleType::AlteredReturn => "AlteredReturn",
            CycleType::FalseGoal => "FalseGoal",
            CycleType::SimpleLockAndKey => "SimpleLockAndKey",
            CycleType::Gambit => "Gambit",
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown cycle type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cycle type '{0}'")]
pub struct UnknownCycleType(pub String);

impl FromStr for CycleType {
    type Err = UnknownCycleType;

    /// Accepts the canonical name, case-insensitively, with or without
    /// `-`/`_` separators (`two-keys`, `TWO_KEYS`, `TwoKeys`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        CycleType::ALL
            .iter()
            .copied()
            .find(|t| t.name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownCycleType(s.to_string()))
    }
}
