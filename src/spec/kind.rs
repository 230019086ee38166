//! Layer kinds and their typed attributes
//!
//! Each supported layer type is one variant carrying exactly the attributes
//! that are legal for it, so an invalid combination cannot be constructed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Attribute Values
// =============================================================================

/// Free-form typed attribute for externally registered layer kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

// =============================================================================
// Transform Methods
// =============================================================================

/// Supported compression container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// zlib container (RFC 1950 header + adler32 trailer)
    Zlib,
    /// raw deflate stream (RFC 1951, no container)
    Deflate,
}

impl CompressionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::Zlib => "zlib",
            CompressionMethod::Deflate => "deflate",
        }
    }
}

/// Supported stream ciphers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMethod {
    Rc4,
}

impl EncryptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMethod::Rc4 => "rc4",
        }
    }
}

// =============================================================================
// Layer Kinds
// =============================================================================

/// One layer of a path specification chain
///
/// `Os` and `Mount` are chain roots; every other kind addresses data inside
/// its parent layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LayerKind {
    /// A path on the host file system
    #[serde(rename = "OS")]
    Os { location: String },
    /// Raw storage media image, possibly split into segment files
    #[serde(rename = "RAW")]
    Raw,
    /// Byte window into the parent stream
    #[serde(rename = "DATA_RANGE")]
    DataRange { range_offset: u64, range_size: u64 },
    /// Compressed payload inside the parent stream
    #[serde(rename = "COMPRESSED_STREAM")]
    CompressedStream {
        #[serde(rename = "compression_method")]
        method: CompressionMethod,
    },
    /// Encrypted payload inside the parent stream
    ///
    /// The key may be carried here or supplied through the keychain.
    #[serde(rename = "ENCRYPTED_STREAM")]
    EncryptedStream {
        #[serde(rename = "encryption_method")]
        method: EncryptionMethod,
        #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_key")]
        key: Option<Vec<u8>>,
    },
    /// A path inside a CPIO archive stored in the parent stream
    #[serde(rename = "CPIO")]
    Cpio { location: String },
    /// Symbolic reference resolved through the mount table
    #[serde(rename = "MOUNT")]
    Mount { identifier: String },
    /// Externally registered format with free-form attributes
    #[serde(rename = "FOREIGN")]
    Foreign {
        format: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attributes: BTreeMap<String, AttrValue>,
    },
}

impl LayerKind {
    /// Kind name used for helper lookup and the comparable rendering
    pub fn name(&self) -> &str {
        match self {
            LayerKind::Os { .. } => "OS",
            LayerKind::Raw => "RAW",
            LayerKind::DataRange { .. } => "DATA_RANGE",
            LayerKind::CompressedStream { .. } => "COMPRESSED_STREAM",
            LayerKind::EncryptedStream { .. } => "ENCRYPTED_STREAM",
            LayerKind::Cpio { .. } => "CPIO",
            LayerKind::Mount { .. } => "MOUNT",
            LayerKind::Foreign { format, .. } => format,
        }
    }

    /// Chain roots (`Os`, `Mount`) must not have a parent; all others must
    pub fn requires_parent(&self) -> bool {
        !matches!(self, LayerKind::Os { .. } | LayerKind::Mount { .. })
    }

    /// Location attribute, for kinds that carry one
    pub fn location(&self) -> Option<&str> {
        match self {
            LayerKind::Os { location } | LayerKind::Cpio { location } => Some(location),
            LayerKind::Foreign { attributes, .. } => match attributes.get("location") {
                Some(AttrValue::Str(location)) => Some(location),
                _ => None,
            },
            _ => None,
        }
    }

    /// Same kind with the location attribute replaced
    ///
    /// Used by the segment globber to build sibling specifications. Returns
    /// `None` for kinds without a location.
    pub fn with_location(&self, location: String) -> Option<LayerKind> {
        match self {
            LayerKind::Os { .. } => Some(LayerKind::Os { location }),
            LayerKind::Cpio { .. } => Some(LayerKind::Cpio { location }),
            LayerKind::Foreign { format, attributes } => {
                let mut attributes = attributes.clone();
                attributes.insert("location".to_string(), AttrValue::Str(location));
                Some(LayerKind::Foreign {
                    format: format.clone(),
                    attributes,
                })
            }
            _ => None,
        }
    }
}

/// Hex rendering for key material on the wire
mod hex_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Option<Vec<u8>>, ser: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(bytes) => ser.serialize_some(&hex::encode(bytes)),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(de)? {
            Some(text) => hex::decode(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
