//! Per-kind tag registries.

use std::collections::{BTreeMap, HashMap};

use super::known::BUILTIN_TAGS;
use super::{ProtocolTag, TagKind, UnknownPolicy};
use crate::error::TagError;

/// Known tags of one [`TagKind`] plus the policy for everything else.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    kind: TagKind,
    policy: UnknownPolicy,
    known: BTreeMap<u32, ProtocolTag>,
}

impl TagRegistry {
    pub fn new(kind: TagKind, policy: UnknownPolicy) -> Self {
        Self {
            kind,
            policy,
            known: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> TagKind {
        self.kind
    }

    pub fn policy(&self) -> UnknownPolicy {
        self.policy
    }

    fn check_width(&self, value: u32) -> Result<(), TagError> {
        if value > self.kind.max_value() {
            return Err(TagError::OutOfRange {
                kind: self.kind,
                value,
                width: self.kind.width(),
            });
        }
        Ok(())
    }

    /// Register a known tag. Each value may be interned once.
    pub fn intern(&mut self, value: u32, name: &'static str) -> Result<ProtocolTag, TagError> {
        self.check_width(value)?;
        if self.known.contains_key(&value) {
            return Err(TagError::Duplicate {
                kind: self.kind,
                value,
            });
        }
        let tag = ProtocolTag::new(self.kind, value, name);
        self.known.insert(value, tag);
        Ok(tag)
    }

    /// The interned tag for `value`, or one synthesized per the policy.
    pub fn lookup(&self, value: u32) -> Result<ProtocolTag, TagError> {
        if let Some(tag) = self.known.get(&value) {
            return Ok(*tag);
        }
        self.check_width(value)?;
        match self.policy {
            UnknownPolicy::Synthesize => Ok(ProtocolTag::unknown(self.kind, value)),
            UnknownPolicy::Reject => Err(TagError::Unknown {
                kind: self.kind,
                value,
            }),
        }
    }

    /// The interned tag for `value`, if any.
    pub fn get(&self, value: u32) -> Option<ProtocolTag> {
        self.known.get(&value).copied()
    }

    /// Known tags in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = &ProtocolTag> {
        self.known.values()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

/// One [`TagRegistry`] per [`TagKind`].
///
/// Built once at startup and shared by reference; tests build their own
/// isolated catalogs.
#[derive(Debug, Clone)]
pub struct TagCatalog {
    registries: HashMap<TagKind, TagRegistry>,
}

impl TagCatalog {
    /// Empty catalog using each kind's default policy.
    pub fn new() -> Self {
        let registries = TagKind::ALL
            .iter()
            .map(|&kind| (kind, TagRegistry::new(kind, kind.default_policy())))
            .collect();
        Self { registries }
    }

    /// Catalog with every built-in known tag interned.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for &(kind, value, name) in BUILTIN_TAGS {
            let interned = catalog.intern(kind, value, name);
            debug_assert!(interned.is_ok(), "bad built-in tag {kind:?} {value}: {interned:?}");
        }
        catalog
    }

    pub fn intern(
        &mut self,
        kind: TagKind,
        value: u32,
        name: &'static str,
    ) -> Result<ProtocolTag, TagError> {
        self.registry_mut(kind).intern(value, name)
    }

    pub fn lookup(&self, kind: TagKind, value: u32) -> Result<ProtocolTag, TagError> {
        match self.registries.get(&kind) {
            Some(registry) => registry.lookup(value),
            None => TagRegistry::new(kind, kind.default_policy()).lookup(value),
        }
    }

    pub fn registry(&self, kind: TagKind) -> Option<&TagRegistry> {
        self.registries.get(&kind)
    }

    /// Override the unknown-value policy of one kind.
    pub fn set_policy(&mut self, kind: TagKind, policy: UnknownPolicy) {
        self.registry_mut(kind).policy = policy;
    }

    fn registry_mut(&mut self, kind: TagKind) -> &mut TagRegistry {
        self.registries
            .entry(kind)
            .or_insert_with(|| TagRegistry::new(kind, kind.default_policy()))
    }
}

impl Default for TagCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
