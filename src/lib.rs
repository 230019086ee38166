//! layervfs: a layered virtual file system core for forensic analysis
//!
//! Data buried inside nested containers (a partition inside a disk image
//! inside a compressed stream inside an encrypted volume) is addressed by an
//! immutable path specification chain and materialized by a cache-backed
//! resolver, without the caller knowing the container stack in advance.
//!
//! - [`spec`]: interned, structurally comparable layer chains.
//! - [`resolver`]: the [`resolver::ResolverContext`] entry point with
//!   per-kind helpers, LRU object caches (at most one open handle per
//!   distinct chain), a mount table and a keychain.
//! - [`stream`]: the byte-stream objects, including random access over
//!   forward-only transforms via replay realignment.
//! - [`cpio`]: the CPIO archive family (five on-disk variants).
//! - [`glob`]: segment file discovery for split images (`.E01` rolling
//!   extensions).
//!
//! Everything is single-threaded: handles are `Rc`-shared and never locked;
//! use one context per thread of work.

pub mod container;
pub mod cpio;
pub mod error;
pub mod glob;
pub mod resolver;
pub mod spec;
pub mod stream;
pub mod transform;

pub use container::{Container, ContainerEntry, EntryType, OsContainer, SharedContainer};
pub use cpio::{CpioArchive, CpioContainer, CpioEntry, CpioFormat};
pub use error::{VfsError, VfsResult};
pub use glob::{glob_segments, SegmentScheme};
pub use resolver::{Credential, ResolverContext, ResolverHelper};
pub use spec::{
    AttrValue, CompressionMethod, EncryptionMethod, LayerKind, PathSpecArena, PathSpecId,
    PathSpecRecord,
};
pub use stream::{SharedStream, VfsStream};
