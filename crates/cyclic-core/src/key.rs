//! Key identities and the per-run key registry.
//!
//! Templates name their keys with template-local [`TKeyRef`]s. When a template
//! is instantiated, each reference is resolved through the [`KeyRegistry`] to
//! a global [`KeyId`]. Resolution is idempotent by *origin*, never by display
//! name: the same origin always maps to the same key, different origins never
//! collide.
//!
//! Whether two instantiations of one template share a key is a policy
//! decision, captured by [`KeyPolicy`].

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{CycleId, KeyId, TKeyRef};
use crate::template::TemplateKey;

/// What kind of thing a key is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// A physical item (brass key, keycard).
    #[default]
    Item,
    /// A learned ability (double jump, swim).
    Ability,
    /// Information (a password, a map).
    Knowledge,
    /// Proof of a defeated guardian.
    Trophy,
}

/// A global key identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyIdentity {
    pub id: KeyId,
    pub name: String,
    pub key_type: KeyType,
    /// Template the key was declared in. `None` for keys minted by rules.
    pub template: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// How template keys map onto global keys across instantiations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Every instantiation mints its own keys.
    #[default]
    PerInstance,
    /// All instances of a template share each of its keys.
    SharedPerTemplate,
    /// Keys flagged `shared` in the template are shared, the rest are
    /// per-instance.
    AuthorMarked,
}

/// Where a key grant or lock came from. This is the registry's lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyOrigin {
    pub template: String,
    pub key: TKeyRef,
    /// Set when the key is scoped to one cycle instance.
    pub instance: Option<CycleId>,
}

impl KeyPolicy {
    /// Computes the origin for `key` declared as `decl` in `template`, as
    /// referenced from cycle instance `instance`.
    pub fn origin(
        self,
        template: &str,
        key: TKeyRef,
        decl: &TemplateKey,
        instance: CycleId,
    ) -> KeyOrigin {
        let shared = match self {
            KeyPolicy::PerInstance => false,
            KeyPolicy::SharedPerTemplate => true,
            KeyPolicy::AuthorMarked => decl.shared,
        };
        KeyOrigin {
            template: template.to_string(),
            key,
            instance: if shared { None } else { Some(instance) },
        }
    }
}

/// Registry of every key issued during one generation run.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    by_origin: HashMap<KeyOrigin, KeyId>,
    keys: IndexMap<KeyId, KeyIdentity>,
    next_id: u32,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a template key reference to its global key, allocating one on
    /// first sight of `origin`.
    ///
    /// `key_type` and `display_name` are only used when a new identity is
    /// created; later calls with the same origin return the existing key
    /// unchanged.
    pub fn register_key(
        &mut self,
        origin: KeyOrigin,
        key_type: KeyType,
        display_name: &str,
    ) -> KeyId {
        if let Some(&id) = self.by_origin.get(&origin) {
            return id;
        }
        let id = self.issue(display_name, key_type, Some(origin.template.clone()));
        self.by_origin.insert(origin, id);
        id
    }

    /// Issues a key that no template declared (placed by a cycle rule).
    pub fn mint(&mut self, display_name: &str, key_type: KeyType) -> KeyId {
        self.issue(display_name, key_type, None)
    }

    /// Looks up a key by global ID.
    pub fn get(&self, id: KeyId) -> Option<&KeyIdentity> {
        self.keys.get(&id)
    }

    /// Attaches free-form metadata to an existing key.
    pub fn set_metadata(&mut self, id: KeyId, field: &str, value: &str) -> bool {
        match self.keys.get_mut(&id) {
            Some(key) => {
                key.metadata.insert(field.to_string(), value.to_string());
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Every issued key, in issue order.
    pub fn identities(&self) -> impl Iterator<Item = &KeyIdentity> + '_ {
        self.keys.values()
    }

    fn issue(&mut self, name: &str, key_type: KeyType, template: Option<String>) -> KeyId {
        let id = KeyId(self.next_id);
        self.next_id += 1;
        self.keys.insert(
            id,
            KeyIdentity {
                id,
                name: name.to_string(),
                key_type,
                template,
                metadata: BTreeMap::new(),
            },
        );
        id
    }
}
