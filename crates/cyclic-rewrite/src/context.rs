//! Per-run mutable state threaded through every rewrite call.
//!
//! A [`GenerationContext`] owns the identity allocator and the key registry of
//! exactly one generation run. It is passed explicitly (`&mut`) to the rewrite
//! engine and to rules; there is no process-wide registry, so concurrent runs
//! cannot observe each other's counters.

use cyclic_core::id::{CycleId, KeyId, TKeyRef};
use cyclic_core::{CoreError, CycleTemplate, IdAllocator, KeyPolicy, KeyRegistry};

/// Allocator, key registry and key policy for one run.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub ids: IdAllocator,
    pub keys: KeyRegistry,
    pub key_policy: KeyPolicy,
}

impl GenerationContext {
    /// Creates a fresh context. Every run needs its own.
    pub fn new(key_policy: KeyPolicy) -> Self {
        GenerationContext {
            ids: IdAllocator::new(),
            keys: KeyRegistry::new(),
            key_policy,
        }
    }

    /// Resolves template key `key` of `template`, referenced from cycle
    /// instance `instance`, to its global key under the configured policy.
    pub fn resolve_template_key(
        &mut self,
        template: &CycleTemplate,
        key: TKeyRef,
        instance: CycleId,
    ) -> Result<KeyId, CoreError> {
        let decl = template
            .keys()
            .get(&key)
            .ok_or_else(|| CoreError::UnknownTemplateKey {
                template: template.name().to_string(),
                key,
            })?;
        let origin = self
            .key_policy
            .origin(template.name(), key, decl, instance);
        Ok(self.keys.register_key(origin, decl.key_type, &decl.name))
    }
}
