//! Group keys identifying nested grouping levels.
//!
//! A [`Key`] names one group at one nesting depth: its values are the grouped
//! field values at that depth and its parent chain walks back up to the root
//! grouping. Keys are hashed on construction so that set membership checks
//! during accumulation (e.g. counting distinct child groups) stay cheap.

use crate::streamexpr::values::Val;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A grouping key with a pre-computed hash.
///
/// Serialized through [`KeyParts`] so the hash is recomputed on restore
/// rather than trusted from the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "KeyParts", into = "KeyParts")]
pub struct Key {
    parent: Option<Box<Key>>,
    values: Vec<Val>,
    depth: u32,
    hash: u64,
}

impl Key {
    /// Creates a root key (depth 0, no parent).
    pub fn root(values: Vec<Val>) -> Self {
        Self::build(None, values)
    }

    /// Creates a child key one level below `parent`.
    pub fn child(parent: Key, values: Vec<Val>) -> Self {
        Self::build(Some(Box::new(parent)), values)
    }

    fn build(parent: Option<Box<Key>>, values: Vec<Val>) -> Self {
        let mut hasher = FxHasher::default();
        if let Some(p) = &parent {
            hasher.write_u64(p.hash);
        }
        for v in &values {
            v.hash(&mut hasher);
        }
        let depth = parent.as_ref().map_or(0, |p| p.depth + 1);
        Key {
            hash: hasher.finish(),
            depth,
            parent,
            values,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    pub fn values(&self) -> &[Val] {
        &self.values
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        // Hash mismatch rules out equality without touching the value chain
        self.hash == other.hash
            && self.depth == other.depth
            && self.values == other.values
            && self.parent == other.parent
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Wire form of a [`Key`]: the parent chain and values, without the hash.
#[derive(Serialize, Deserialize)]
struct KeyParts {
    parent: Option<Box<KeyParts>>,
    values: Vec<Val>,
}

impl From<KeyParts> for Key {
    fn from(parts: KeyParts) -> Self {
        let parent = parts.parent.map(|p| Box::new(Key::from(*p)));
        Key::build(parent, parts.values)
    }
}

impl From<Key> for KeyParts {
    fn from(key: Key) -> Self {
        KeyParts {
            parent: key.parent.map(|p| Box::new(KeyParts::from(*p))),
            values: key.values,
        }
    }
}
