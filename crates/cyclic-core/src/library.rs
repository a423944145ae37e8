//! Template library: the read-only lookup from [`CycleType`] to template.
//!
//! Templates are stored behind `Arc`, so one library can serve any number of
//! concurrent generation runs. Nothing in a registered template is ever
//! mutated.
//!
//! [`TemplateLibrary::standard`] registers the twelve built-in patterns.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::cycle_type::CycleType;
use crate::edge::{LockType, TraversalKind};
use crate::error::CoreError;
use crate::key::KeyType;
use crate::node::RoomTag;
use crate::template::{CycleArc, CycleTemplate, TemplateBuilder};

/// Cycle type -> template lookup.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: IndexMap<CycleType, Arc<CycleTemplate>>,
}

impl TemplateLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a library holding all twelve built-in patterns.
    pub fn standard() -> Result<Self, CoreError> {
        let mut library = TemplateLibrary::new();
        for ty in CycleType::ALL {
            library.register(standard_template(ty)?)?;
        }
        Ok(library)
    }

    /// Validates and registers `template` under its cycle type, returning the
    /// template it replaced, if any.
    pub fn register(
        &mut self,
        template: CycleTemplate,
    ) -> Result<Option<Arc<CycleTemplate>>, CoreError> {
        template.validate()?;
        Ok(self
            .templates
            .insert(template.cycle_type(), Arc::new(template)))
    }

    pub fn get(&self, ty: CycleType) -> Option<&CycleTemplate> {
        self.templates.get(&ty).map(Arc::as_ref)
    }

    /// Returns a shared handle to the template for `ty`.
    pub fn get_shared(&self, ty: CycleType) -> Option<Arc<CycleTemplate>> {
        self.templates.get(&ty).cloned()
    }

    pub fn contains(&self, ty: CycleType) -> bool {
        self.templates.contains_key(&ty)
    }

    /// Registered cycle types, in registration order.
    pub fn cycle_types(&self) -> Vec<CycleType> {
        self.templates.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CycleType, &CycleTemplate)> + '_ {
        self.templates.iter().map(|(ty, t)| (*ty, t.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// Built-in patterns
// ---------------------------------------------------------------------------

/// Builds the built-in template for `ty`.
pub fn standard_template(ty: CycleType) -> Result<CycleTemplate, CoreError> {
    let mut b = TemplateBuilder::new(ty);
    match ty {
        CycleType::TwoAlternativePaths => {
            let a = b.node("left");
            let c = b.node("right");
            let arc_a = b.arc(CycleArc::A, &[a]);
            let arc_b = b.arc(CycleArc::B, &[c]);
            b.seam(arc_a[0]);
            b.seam(arc_b[1]);
        }
        CycleType::TwoKeys => {
            let k1 = b.node("first key wing");
            let k2 = b.node("second key wing");
            let arc_a = b.arc(CycleArc::A, &[k1]);
            let arc_b = b.arc(CycleArc::B, &[k2]);
            b.seam(arc_a[0]);
            b.seam(arc_b[0]);
        }
        CycleType::HiddenShortcut => {
            let a1 = b.node("long way");
            let a2 = b.node("long way end");
            let s = b.tagged_node("hidden passage", &[RoomTag::Secret]);
            let arc_a = b.arc(CycleArc::A, &[a1, a2]);
            let arc_b = b.arc(CycleArc::B, &[s]);
            b.traversal(arc_b[1], TraversalKind::OneWay);
            b.seam(arc_a[1]);
        }
        CycleType::DangerousRoute => {
            let d = b.tagged_node("dangerous room", &[RoomTag::Danger]);
            let s1 = b.node("safe detour");
            let s2 = b.node("safe detour end");
            let arc_a = b.arc(CycleArc::A, &[d]);
            let arc_b = b.arc(CycleArc::B, &[s1, s2]);
            b.seam(arc_a[0]);
            b.seam(arc_b[1]);
        }
        CycleType::ForeshadowingLoop => {
            let v = b.tagged_node("overlook", &[RoomTag::Vista]);
            let r1 = b.node("winding path");
            let r2 = b.node("winding path end");
            let arc_a = b.arc(CycleArc::A, &[v]);
            let arc_b = b.arc(CycleArc::B, &[r1, r2]);
            b.traversal(arc_a[1], TraversalKind::SightlineOnly);
            b.seam(arc_b[0]);
            b.seam(arc_b[2]);
        }
        CycleType::LockAndKeyCycle => {
            let key = b.key("cycle key", KeyType::Item);
            let k = b.node("key room");
            let l = b.node("lock antechamber");
            let arc_a = b.arc(CycleArc::A, &[k]);
            let arc_b = b.arc(CycleArc::B, &[l]);
            b.grant(k, key);
            b.lock(arc_b[1], key, LockType::Standard);
            b.seam(arc_a[0]);
        }
        CycleType::BlockedRetreat => {
            let a = b.node("point of no return");
            let r = b.node("collapsed hall");
            let arc_a = b.arc(CycleArc::A, &[a]);
            let arc_b = b.arc(CycleArc::B, &[r]);
            b.traversal(arc_a[1], TraversalKind::OneWay);
            b.traversal(arc_b[0], TraversalKind::Blocked);
            b.seam(arc_a[0]);
            b.seam(arc_b[1]);
        }
        CycleType::MonsterPatrol => {
            let p1 = b.node("patrol route");
            let p2 = b.node("patrol return");
            let arc_a = b.arc(CycleArc::A, &[p1]);
            let arc_b = b.arc(CycleArc::B, &[p2]);
            b.seam(arc_a[0]);
            b.seam(arc_b[0]);
        }
        CycleType::AlteredReturn => {
            let a = b.node("outbound");
            let r = b.node("changed return");
            let arc_a = b.arc(CycleArc::A, &[a]);
            let arc_b = b.arc(CycleArc::B, &[r]);
            b.traversal(arc_b[0], TraversalKind::OneWay);
            b.seam(arc_a[1]);
        }
        CycleType::FalseGoal => {
            let f = b.tagged_node("false goal", &[RoomTag::FalseGoal]);
            let r1 = b.node("true path");
            let r2 = b.node("true path end");
            b.arc(CycleArc::A, &[f]);
            let arc_b = b.arc(CycleArc::B, &[r1, r2]);
            b.seam(arc_b[1]);
        }
        CycleType::SimpleLockAndKey => {
            let key = b.key("simple key", KeyType::Item);
            let k = b.node("key room");
            let arc_a = b.arc(CycleArc::A, &[k]);
            let arc_b = b.arc(CycleArc::B, &[]);
            b.grant(k, key);
            b.lock(arc_b[0], key, LockType::Standard);
            b.seam(arc_a[0]);
        }
        CycleType::Gambit => {
            let r = b.tagged_node("gambit room", &[RoomTag::Danger, RoomTag::Reward]);
            b.arc(CycleArc::A, &[r]);
            let arc_b = b.arc(CycleArc::B, &[]);
            b.seam(arc_b[0]);
        }
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_library_has_all_twelve() {
        let library = TemplateLibrary::standard().unwrap();
        assert_eq!(library.len(), 12);
        for ty in CycleType::ALL {
            let t = library.get(ty).unwrap();
            assert_eq!(t.cycle_type(), ty);
            assert!(!t.seams().is_empty(), "{ty} has no seams");
        }
    }

    #[test]
    fn two_alternative_paths_shape() {
        let t = standard_template(CycleType::TwoAlternativePaths).unwrap();
        assert_eq!(t.node_count(), 4);
        assert_eq!(t.edge_count(), 4);
        assert_eq!(t.seams().len(), 2);
        assert_eq!(t.arc(CycleArc::A).len(), 2);
        assert_eq!(t.arc(CycleArc::B).len(), 2);
    }

    #[test]
    fn lock_and_key_templates_declare_keys() {
        for ty in [CycleType::LockAndKeyCycle, CycleType::SimpleLockAndKey] {
            let t = standard_template(ty).unwrap();
            assert_eq!(t.keys().len(), 1);
            assert!(t.nodes().values().any(|n| n.grants.is_some()));
            assert!(t.edges().values().any(|e| e.lock.is_some()));
        }
    }

    #[test]
    fn register_replaces_and_returns_previous() {
        let mut library = TemplateLibrary::new();
        let first = standard_template(CycleType::Gambit).unwrap();
        assert!(library.register(first.clone()).unwrap().is_none());
        let previous = library.register(first).unwrap();
        assert!(previous.is_some());
        assert_eq!(library.len(), 1);
        assert_eq!(library.cycle_types(), vec![CycleType::Gambit]);
    }

    #[test]
    fn shared_handles_point_at_same_template() {
        let library = TemplateLibrary::standard().unwrap();
        let a = library.get_shared(CycleType::TwoKeys).unwrap();
        let b = library.get_shared(CycleType::TwoKeys).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
