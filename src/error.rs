//! Error types shared across the crate

use std::io;

use thiserror::Error;

/// Result type alias for VFS operations
pub type VfsResult<T> = Result<T, VfsError>;

/// Errors that can occur while building path specifications, resolving
/// them, or driving the resulting streams and containers.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Layer kind requires a parent but none was given
    #[error("layer kind {kind} requires a parent specification")]
    MissingParent { kind: String },
    /// Layer kind must be the root of a chain but a parent was given
    #[error("layer kind {kind} does not take a parent specification")]
    UnexpectedParent { kind: String },
    /// Attribute values rejected at construction time
    #[error("bad attributes for layer kind {kind}: {message}")]
    BadAttributes { kind: String, message: String },
    /// No helper registered for the layer kind
    #[error("unknown layer kind: {kind}")]
    UnknownLayerKind { kind: String },
    /// Helper for this kind is already registered
    #[error("helper already registered for layer kind {kind}")]
    HelperAlreadyRegistered { kind: String },
    /// Helper exists but does not provide the requested object type
    #[error("layer kind {kind} does not support {capability}")]
    UnsupportedCapability {
        kind: String,
        capability: &'static str,
    },
    /// Container has no entry at the requested location
    #[error("no entry at location: {location}")]
    EntryNotFound { location: String },
    /// Operation on a stream that is not open
    #[error("stream is not open")]
    NotOpen,
    /// Open (or pre-configuration) of a stream that is already open
    #[error("stream is already open")]
    AlreadyOpen,
    /// Seek arithmetic produced a negative effective offset
    #[error("invalid stream offset: {offset}")]
    InvalidOffset { offset: i64 },
    /// Magic bytes did not match any supported format
    #[error("unrecognized format signature")]
    BadSignature,
    /// Structurally invalid data past the signature check
    #[error("malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },
    /// Segment naming scheme has no further representable names
    #[error("segment naming scheme exhausted")]
    SegmentSchemeExhausted,
    /// First segment location does not match a known naming scheme
    #[error("unsupported segment suffix: {extension}")]
    UnsupportedSegmentSuffix { extension: String },
    /// Mount identifier not present in the mount table
    #[error("mount point not found: {identifier}")]
    MountPointNotFound { identifier: String },
    /// Mount identifier already present in the mount table
    #[error("mount point already registered: {identifier}")]
    MountPointAlreadyRegistered { identifier: String },
    /// Cache at capacity and the eviction candidate is still referenced
    #[error("object cache is full")]
    CacheFull,
    /// Required credential absent from both the spec and the keychain
    #[error("missing credential: {name}")]
    MissingCredential { name: &'static str },
    /// I/O error from the host file system
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Path specification record (de)serialization error
    #[error("record error: {0}")]
    Record(#[from] serde_json::Error),
}
