//! Immutable path specification chains
//!
//! A path specification is a chain of layers, each naming a format and the
//! parent it addresses into. Chains are interned in an arena: structurally
//! equal chains share one `PathSpecId`, so equality is an integer compare
//! and parents are shared rather than copied.

pub mod encode;
pub mod kind;

pub use encode::PathSpecRecord;
pub use kind::{AttrValue, CompressionMethod, EncryptionMethod, LayerKind};

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

use crate::error::{VfsError, VfsResult};

/// Kind names owned by the built-in layer types; foreign formats may not
/// shadow them.
const RESERVED_KIND_NAMES: [&str; 7] = [
    "OS",
    "RAW",
    "DATA_RANGE",
    "COMPRESSED_STREAM",
    "ENCRYPTED_STREAM",
    "CPIO",
    "MOUNT",
];

// =============================================================================
// Handles and Nodes
// =============================================================================

/// Handle naming an interned path specification
///
/// Only valid for the arena that issued it; accessors panic on a handle from
/// a different arena (out-of-range index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PathSpecId(u32);

impl PathSpecId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One interned node: a layer kind plus its parent link
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathSpecNode {
    kind: LayerKind,
    parent: Option<PathSpecId>,
}

// =============================================================================
// Arena
// =============================================================================

/// Arena owning every path specification node
///
/// Nodes are never mutated or removed; a parent id always predates its
/// children, so chains are finite and acyclic by construction.
#[derive(Debug, Default)]
pub struct PathSpecArena {
    nodes: Vec<PathSpecNode>,
    interned: HashMap<(LayerKind, Option<PathSpecId>), PathSpecId>,
}

impl PathSpecArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a layer over an optional parent
    ///
    /// Returns the existing id when a structurally equal node is already
    /// present. Parent rules and attribute validity are enforced here, so
    /// every id in the arena names a well-formed chain.
    pub fn intern(&mut self, kind: LayerKind, parent: Option<PathSpecId>) -> VfsResult<PathSpecId> {
        self.validate(&kind, parent)?;

        let key = (kind, parent);
        if let Some(&id) = self.interned.get(&key) {
            return Ok(id);
        }

        let id = PathSpecId(self.nodes.len() as u32);
        self.nodes.push(PathSpecNode {
            kind: key.0.clone(),
            parent,
        });
        self.interned.insert(key, id);
        trace!(id = id.0, kind = %self.nodes[id.index()].kind.name(), "interned path spec");
        Ok(id)
    }

    fn validate(&self, kind: &LayerKind, parent: Option<PathSpecId>) -> VfsResult<()> {
        match (kind.requires_parent(), parent) {
            (true, None) => {
                return Err(VfsError::MissingParent {
                    kind: kind.name().to_string(),
                })
            }
            (false, Some(_)) => {
                return Err(VfsError::UnexpectedParent {
                    kind: kind.name().to_string(),
                })
            }
            _ => {}
        }
        if let Some(parent) = parent {
            if parent.index() >= self.nodes.len() {
                return Err(VfsError::BadAttributes {
                    kind: kind.name().to_string(),
                    message: "parent specification not from this arena".to_string(),
                });
            }
        }
        match kind {
            LayerKind::Foreign { format, .. } if format.is_empty() => {
                return Err(VfsError::BadAttributes {
                    kind: "FOREIGN".to_string(),
                    message: "empty format name".to_string(),
                })
            }
            LayerKind::Foreign { format, .. } if RESERVED_KIND_NAMES.contains(&format.as_str()) => {
                return Err(VfsError::BadAttributes {
                    kind: "FOREIGN".to_string(),
                    message: format!("format name {} is reserved", format),
                })
            }
            LayerKind::DataRange {
                range_offset,
                range_size,
            } if range_offset.checked_add(*range_size).is_none() => {
                return Err(VfsError::BadAttributes {
                    kind: "DATA_RANGE".to_string(),
                    message: "range end overflows".to_string(),
                })
            }
            _ => {}
        }
        Ok(())
    }

    pub fn kind(&self, id: PathSpecId) -> &LayerKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: PathSpecId) -> Option<PathSpecId> {
        self.nodes[id.index()].parent
    }

    /// Full chain of `id`, root first
    pub fn chain(&self, id: PathSpecId) -> Vec<PathSpecId> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.parent(current);
        }
        chain.reverse();
        chain
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(location: &str) -> LayerKind {
        LayerKind::Os {
            location: location.to_string(),
        }
    }

    #[test]
    fn test_interning_dedupes() {
        let mut arena = PathSpecArena::new();
        let a = arena.intern(os("/ev/image.raw"), None).unwrap();
        let b = arena.intern(os("/ev/image.raw"), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);

        let raw_a = arena.intern(LayerKind::Raw, Some(a)).unwrap();
        let raw_b = arena.intern(LayerKind::Raw, Some(b)).unwrap();
        assert_eq!(raw_a, raw_b);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_distinct_chains_get_distinct_ids() {
        let mut arena = PathSpecArena::new();
        let a = arena.intern(os("/a"), None).unwrap();
        let b = arena.intern(os("/b"), None).unwrap();
        assert_ne!(a, b);

        let range_1 = arena
            .intern(
                LayerKind::DataRange {
                    range_offset: 0,
                    range_size: 10,
                },
                Some(a),
            )
            .unwrap();
        let range_2 = arena
            .intern(
                LayerKind::DataRange {
                    range_offset: 0,
                    range_size: 10,
                },
                Some(b),
            )
            .unwrap();
        assert_ne!(range_1, range_2, "same kind, different parents");
    }

    #[test]
    fn test_parent_rules() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/a"), None).unwrap();

        let err = arena.intern(LayerKind::Raw, None).unwrap_err();
        assert!(matches!(err, crate::error::VfsError::MissingParent { .. }));

        let err = arena.intern(os("/b"), Some(root)).unwrap_err();
        assert!(matches!(
            err,
            crate::error::VfsError::UnexpectedParent { .. }
        ));

        let err = arena
            .intern(
                LayerKind::Mount {
                    identifier: "C".to_string(),
                },
                Some(root),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::VfsError::UnexpectedParent { .. }
        ));
    }

    #[test]
    fn test_bad_attributes() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/a"), None).unwrap();

        let err = arena
            .intern(
                LayerKind::Foreign {
                    format: String::new(),
                    attributes: Default::default(),
                },
                Some(root),
            )
            .unwrap_err();
        assert!(matches!(err, crate::error::VfsError::BadAttributes { .. }));

        let err = arena
            .intern(
                LayerKind::DataRange {
                    range_offset: u64::MAX,
                    range_size: 1,
                },
                Some(root),
            )
            .unwrap_err();
        assert!(matches!(err, crate::error::VfsError::BadAttributes { .. }));

        let err = arena
            .intern(
                LayerKind::Foreign {
                    format: "CPIO".to_string(),
                    attributes: Default::default(),
                },
                Some(root),
            )
            .unwrap_err();
        assert!(matches!(err, crate::error::VfsError::BadAttributes { .. }));
    }

    #[test]
    fn test_chain_is_root_first() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/img"), None).unwrap();
        let raw = arena.intern(LayerKind::Raw, Some(root)).unwrap();
        let range = arena
            .intern(
                LayerKind::DataRange {
                    range_offset: 5,
                    range_size: 3,
                },
                Some(raw),
            )
            .unwrap();

        assert_eq!(arena.chain(range), vec![root, raw, range]);
        assert_eq!(arena.chain(root), vec![root]);
    }
}
