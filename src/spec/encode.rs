//! Canonical renderings of path specification chains
//!
//! `comparable()` is the universal cache and table key: a deterministic,
//! injective, multi-line rendering of a chain. `PathSpecRecord` is the serde
//! wire form for storing or exchanging chains.

use serde::{Deserialize, Serialize};

use super::kind::{AttrValue, LayerKind};
use super::{PathSpecArena, PathSpecId};
use crate::error::VfsResult;

// =============================================================================
// Comparable Rendering
// =============================================================================

impl PathSpecArena {
    /// Canonical rendering of a chain, ancestors first, one line per layer
    ///
    /// `type: KIND[, attr: value]*\n` with a fixed attribute order per kind.
    /// String values escape `\`, newline and `,` so separators cannot be
    /// forged; foreign attribute strings are additionally quoted to keep
    /// them apart from ints and bools. Distinct chains always produce
    /// distinct strings.
    pub fn comparable(&self, id: PathSpecId) -> String {
        let mut out = String::new();
        for layer in self.chain(id) {
            render_layer(&mut out, self.kind(layer));
        }
        out
    }
}

fn render_layer(out: &mut String, kind: &LayerKind) {
    out.push_str("type: ");
    out.push_str(&escape(kind.name()));
    match kind {
        LayerKind::Os { location } | LayerKind::Cpio { location } => {
            out.push_str(&format!(", location: {}", escape(location)));
        }
        LayerKind::Raw => {}
        LayerKind::DataRange {
            range_offset,
            range_size,
        } => {
            out.push_str(&format!(
                ", range_offset: {}, range_size: {}",
                range_offset, range_size
            ));
        }
        LayerKind::CompressedStream { method } => {
            out.push_str(&format!(", compression_method: {}", method.as_str()));
        }
        LayerKind::EncryptedStream { method, key } => {
            out.push_str(&format!(", encryption_method: {}", method.as_str()));
            if let Some(key) = key {
                out.push_str(&format!(", key: {}", hex::encode(key)));
            }
        }
        LayerKind::Mount { identifier } => {
            out.push_str(&format!(", identifier: {}", escape(identifier)));
        }
        LayerKind::Foreign { attributes, .. } => {
            for (name, value) in attributes {
                out.push_str(&format!(", {}: {}", escape(name), render_attr(value)));
            }
        }
    }
    out.push('\n');
}

fn render_attr(value: &AttrValue) -> String {
    match value {
        AttrValue::Bool(flag) => flag.to_string(),
        AttrValue::Int(number) => number.to_string(),
        AttrValue::Str(text) => format!("\"{}\"", escape(&text.replace('"', "\\\""))),
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            ',' => out.push_str("\\,"),
            other => out.push(other),
        }
    }
    out
}

// =============================================================================
// Wire Form
// =============================================================================

/// Serde wire form of a chain: one record per layer, parents nested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSpecRecord {
    #[serde(flatten)]
    pub kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<PathSpecRecord>>,
}

impl PathSpecRecord {
    pub fn to_json(&self) -> VfsResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> VfsResult<PathSpecRecord> {
        Ok(serde_json::from_str(text)?)
    }
}

impl PathSpecArena {
    /// Detach a chain into its wire form
    pub fn to_record(&self, id: PathSpecId) -> PathSpecRecord {
        let chain = self.chain(id);
        let mut record = PathSpecRecord {
            kind: self.kind(chain[0]).clone(),
            parent: None,
        };
        for layer in &chain[1..] {
            record = PathSpecRecord {
                kind: self.kind(*layer).clone(),
                parent: Some(Box::new(record)),
            };
        }
        record
    }

    /// Intern a wire-form chain, layer by layer from the root
    pub fn intern_record(&mut self, record: &PathSpecRecord) -> VfsResult<PathSpecId> {
        let parent = match &record.parent {
            Some(parent) => Some(self.intern_record(parent)?),
            None => None,
        };
        self.intern(record.kind.clone(), parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::kind::{CompressionMethod, EncryptionMethod};
    use std::collections::BTreeMap;

    fn os(location: &str) -> LayerKind {
        LayerKind::Os {
            location: location.to_string(),
        }
    }

    #[test]
    fn test_comparable_rendering() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/ev/image.raw"), None).unwrap();
        let raw = arena.intern(LayerKind::Raw, Some(root)).unwrap();
        let range = arena
            .intern(
                LayerKind::DataRange {
                    range_offset: 100,
                    range_size: 4096,
                },
                Some(raw),
            )
            .unwrap();

        assert_eq!(
            arena.comparable(range),
            "type: OS, location: /ev/image.raw\n\
             type: RAW\n\
             type: DATA_RANGE, range_offset: 100, range_size: 4096\n"
        );
        assert_eq!(arena.comparable(root), "type: OS, location: /ev/image.raw\n");
    }

    #[test]
    fn test_comparable_escapes_separators() {
        let mut arena = PathSpecArena::new();

        // A location embedding a layer line must not collide with a real
        // two-layer chain.
        let forged = arena.intern(os("/a\ntype: RAW"), None).unwrap();
        let root = arena.intern(os("/a"), None).unwrap();
        let raw = arena.intern(LayerKind::Raw, Some(root)).unwrap();
        assert_ne!(arena.comparable(forged), arena.comparable(raw));
        assert_eq!(
            arena.comparable(forged),
            "type: OS, location: /a\\ntype: RAW\n"
        );

        // Commas in values are escaped so they cannot fake an attribute.
        let comma = arena.intern(os("/a, location: /b"), None).unwrap();
        assert_eq!(
            arena.comparable(comma),
            "type: OS, location: /a\\, location: /b\n"
        );
    }

    #[test]
    fn test_comparable_foreign_attr_typing() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/a"), None).unwrap();

        let mut string_attr = BTreeMap::new();
        string_attr.insert("part".to_string(), AttrValue::Str("5".to_string()));
        let with_string = arena
            .intern(
                LayerKind::Foreign {
                    format: "TSK".to_string(),
                    attributes: string_attr,
                },
                Some(root),
            )
            .unwrap();

        let mut int_attr = BTreeMap::new();
        int_attr.insert("part".to_string(), AttrValue::Int(5));
        let with_int = arena
            .intern(
                LayerKind::Foreign {
                    format: "TSK".to_string(),
                    attributes: int_attr,
                },
                Some(root),
            )
            .unwrap();

        assert_ne!(arena.comparable(with_string), arena.comparable(with_int));
    }

    #[test]
    fn test_comparable_includes_key_material() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/a"), None).unwrap();
        let keyed = arena
            .intern(
                LayerKind::EncryptedStream {
                    method: EncryptionMethod::Rc4,
                    key: Some(vec![0xab, 0xcd]),
                },
                Some(root),
            )
            .unwrap();
        let bare = arena
            .intern(
                LayerKind::EncryptedStream {
                    method: EncryptionMethod::Rc4,
                    key: None,
                },
                Some(root),
            )
            .unwrap();

        assert!(arena.comparable(keyed).contains("key: abcd"));
        assert_ne!(arena.comparable(keyed), arena.comparable(bare));
    }

    #[test]
    fn test_record_round_trip_preserves_comparable() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/ev/dump.bin"), None).unwrap();
        let compressed = arena
            .intern(
                LayerKind::CompressedStream {
                    method: CompressionMethod::Zlib,
                },
                Some(root),
            )
            .unwrap();
        let entry = arena
            .intern(
                LayerKind::Cpio {
                    location: "/docs/report.txt".to_string(),
                },
                Some(compressed),
            )
            .unwrap();

        let json = arena.to_record(entry).to_json().unwrap();
        let record = PathSpecRecord::from_json(&json).unwrap();

        let mut fresh = PathSpecArena::new();
        let back = fresh.intern_record(&record).unwrap();
        assert_eq!(fresh.comparable(back), arena.comparable(entry));
    }

    #[test]
    fn test_record_wire_shape() {
        let mut arena = PathSpecArena::new();
        let root = arena.intern(os("/x"), None).unwrap();
        let raw = arena.intern(LayerKind::Raw, Some(root)).unwrap();

        let json = arena.to_record(raw).to_json().unwrap();
        assert_eq!(json, r#"{"type":"RAW","parent":{"type":"OS","location":"/x"}}"#);
    }
}
