//! Container objects: enumerable collections of named entries
//!
//! A container is the directory-shaped counterpart of a stream: a file
//! system or archive view whose entries are addressed by path specification.
//! Handles share the single-threaded `Rc<RefCell<...>>` model of streams.

pub mod os;

pub use os::OsContainer;

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::error::VfsResult;
use crate::spec::{PathSpecArena, PathSpecId};

/// Shared handle to a container object
pub type SharedContainer = Rc<RefCell<dyn Container>>;

/// Classification of a container entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
    /// Device nodes, sockets, links and anything else non-enumerable
    Other,
}

/// One named entry inside a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerEntry {
    pub name: String,
    /// Location within the container, usable as the location attribute of a
    /// sibling path specification
    pub location: String,
    pub entry_type: EntryType,
    pub size: u64,
    /// Byte offset of the entry data inside the backing stream, for
    /// containers that expose one (archives)
    pub data_offset: Option<u64>,
}

impl ContainerEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == EntryType::File
    }

    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Enumerable view over a file system or archive
///
/// Lookup methods take the arena so entries can be addressed by path
/// specification; the spec's location attribute names the entry within this
/// container.
pub trait Container {
    /// The container's top-level entry
    fn root(&mut self) -> VfsResult<ContainerEntry>;

    /// Entry addressed by the spec's location; `EntryNotFound` when absent
    fn entry(&mut self, arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<ContainerEntry>;

    fn entry_exists(&mut self, arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<bool>;

    /// Immediate children of a directory entry, in container order
    fn sub_entries(
        &mut self,
        arena: &PathSpecArena,
        entry: &ContainerEntry,
    ) -> VfsResult<Vec<ContainerEntry>>;
}

/// Wrap a container for shared use
pub fn share_container<C: Container + 'static>(container: C) -> SharedContainer {
    Rc::new(RefCell::new(container))
}
