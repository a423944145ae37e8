//! Per-cycle-type rules.
//!
//! A rule observes generation at three points (root instantiated, sub-cycle
//! inserted, generation finished) and annotates the graph with type-specific
//! semantics: keys, locks, patrol routes. The generator never inspects cycle
//! types itself; it only asks the [`RuleRegistry`] to dispatch.
//!
//! The set of rules is closed, so dispatch is a `match` over [`CycleRule`]
//! rather than a trait object.

pub mod key_gate;
pub mod patrol;

use indexmap::IndexMap;
use rand_chacha::ChaCha8Rng;

use cyclic_core::{CycleType, DungeonGraph};

use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::provenance::{CycleInstance, InsertionPoint, Provenance};

pub use key_gate::KeyGateRule;
pub use patrol::PatrolRule;

/// Run state handed to every hook. Provenance is read-only: rules annotate
/// the graph, they never restructure it.
pub struct RuleContext<'a> {
    pub graph: &'a mut DungeonGraph,
    pub ctx: &'a mut GenerationContext,
    pub rng: &'a mut ChaCha8Rng,
    pub provenance: &'a Provenance,
}

/// A rule implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleRule {
    /// Places `quota` keys in sub-cycles and gates the anchor cycle's goal
    /// behind all of them.
    KeyGate(KeyGateRule),
    /// Marks patrol routes.
    Patrol(PatrolRule),
}

impl CycleRule {
    /// "Two keys": a key gate with a quota of two.
    pub fn two_keys() -> Self {
        CycleRule::KeyGate(KeyGateRule::new(2))
    }

    pub fn patrol() -> Self {
        CycleRule::Patrol(PatrolRule::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            CycleRule::KeyGate(_) => "key_gate",
            CycleRule::Patrol(_) => "patrol",
        }
    }

    pub fn on_root_instantiated(
        &mut self,
        rc: &mut RuleContext<'_>,
        root: &CycleInstance,
    ) -> Result<(), GenerationError> {
        match self {
            CycleRule::KeyGate(rule) => rule.on_root_instantiated(rc, root),
            CycleRule::Patrol(rule) => rule.on_root_instantiated(rc, root),
        }
    }

    pub fn on_subcycle_inserted(
        &mut self,
        rc: &mut RuleContext<'_>,
        replaced: &InsertionPoint,
        inserted: &CycleInstance,
    ) -> Result<(), GenerationError> {
        match self {
            CycleRule::KeyGate(rule) => rule.on_subcycle_inserted(rc, replaced, inserted),
            CycleRule::Patrol(rule) => rule.on_subcycle_inserted(rc, replaced, inserted),
        }
    }

    /// Must be safe to call more than once.
    pub fn on_generation_finished(
        &mut self,
        rc: &mut RuleContext<'_>,
    ) -> Result<(), GenerationError> {
        match self {
            CycleRule::KeyGate(rule) => rule.on_generation_finished(rc),
            CycleRule::Patrol(_) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Cycle type -> rule lookup.
///
/// A type with no rule is valid; its cycles are purely structural. Rules
/// carry per-run state, so the generator works on a fresh clone of the
/// registry for every run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleRegistry {
    rules: IndexMap<CycleType, CycleRule>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in rules: `TwoKeys` gets a two-key gate, `MonsterPatrol`
    /// gets patrol tagging.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(CycleType::TwoKeys, CycleRule::two_keys());
        registry.register(CycleType::MonsterPatrol, CycleRule::patrol());
        registry
    }

    /// Registers `rule` for `ty`, returning the rule it replaces.
    pub fn register(&mut self, ty: CycleType, rule: CycleRule) -> Option<CycleRule> {
        self.rules.insert(ty, rule)
    }

    pub fn get(&self, ty: CycleType) -> Option<&CycleRule> {
        self.rules.get(&ty)
    }

    pub fn get_mut(&mut self, ty: CycleType) -> Option<&mut CycleRule> {
        self.rules.get_mut(&ty)
    }

    pub fn contains(&self, ty: CycleType) -> bool {
        self.rules.contains_key(&ty)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Dispatches the root hook to the rule for the root's type, if any.
    pub fn root_instantiated(
        &mut self,
        rc: &mut RuleContext<'_>,
        root: &CycleInstance,
    ) -> Result<(), GenerationError> {
        match self.rules.get_mut(&root.cycle_type) {
            Some(rule) => rule.on_root_instantiated(rc, root),
            None => Ok(()),
        }
    }

    /// Dispatches the insertion hook to the rule for the *parent* cycle's
    /// type, if any.
    pub fn subcycle_inserted(
        &mut self,
        rc: &mut RuleContext<'_>,
        parent_type: CycleType,
        replaced: &InsertionPoint,
        inserted: &CycleInstance,
    ) -> Result<(), GenerationError> {
        match self.rules.get_mut(&parent_type) {
            Some(rule) => rule.on_subcycle_inserted(rc, replaced, inserted),
            None => Ok(()),
        }
    }

    /// Runs every registered rule's finishing hook in registration order.
    pub fn generation_finished(&mut self, rc: &mut RuleContext<'_>) -> Result<(), GenerationError> {
        for rule in self.rules.values_mut() {
            rule.on_generation_finished(rc)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_contents() {
        let registry = RuleRegistry::standard();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(CycleType::TwoKeys).map(CycleRule::name), Some("key_gate"));
        assert_eq!(registry.get(CycleType::MonsterPatrol).map(CycleRule::name), Some("patrol"));
        assert!(!registry.contains(CycleType::LockAndKeyCycle));
    }

    #[test]
    fn register_replaces_previous_rule() {
        let mut registry = RuleRegistry::new();
        assert!(registry.register(CycleType::Gambit, CycleRule::patrol()).is_none());
        let old = registry.register(CycleType::Gambit, CycleRule::two_keys());
        assert_eq!(old, Some(CycleRule::patrol()));
        assert_eq!(registry.len(), 1);
    }
}
