//! Resolver context: the caller-facing entry point
//!
//! One context owns the spec arena, the helper registry, both object caches,
//! the mount table and the keychain. Contexts are plain values with no
//! global state; callers needing isolation construct one per unit of work.
//! Not safe for concurrent use: handles are `Rc`-shared and never locked.

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::container::{Container, SharedContainer};
use crate::error::{VfsError, VfsResult};
use crate::resolver::cache::ObjectsCache;
use crate::resolver::keychain::{Credential, KeyChain};
use crate::resolver::mount::MountTable;
use crate::resolver::registry::{HelperRegistry, ResolverHelper};
use crate::spec::{LayerKind, PathSpecArena, PathSpecId};
use crate::stream::{SharedStream, VfsStream};

const DEFAULT_STREAM_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(capacity) => capacity,
    None => unreachable!(),
};
const DEFAULT_CONTAINER_CAPACITY: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

pub struct ResolverContext {
    arena: PathSpecArena,
    registry: HelperRegistry,
    streams: ObjectsCache<RefCell<dyn VfsStream>>,
    containers: ObjectsCache<RefCell<dyn Container>>,
    mounts: MountTable,
    keychain: KeyChain,
}

impl Default for ResolverContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverContext {
    pub fn new() -> Self {
        Self::with_capacities(DEFAULT_STREAM_CAPACITY, DEFAULT_CONTAINER_CAPACITY)
    }

    pub fn with_capacities(streams: NonZeroUsize, containers: NonZeroUsize) -> Self {
        Self {
            arena: PathSpecArena::new(),
            registry: HelperRegistry::with_builtins(),
            streams: ObjectsCache::new(streams),
            containers: ObjectsCache::new(containers),
            mounts: MountTable::new(),
            keychain: KeyChain::new(),
        }
    }

    // =========================================================================
    // Spec construction
    // =========================================================================

    pub fn intern(
        &mut self,
        kind: LayerKind,
        parent: Option<PathSpecId>,
    ) -> VfsResult<PathSpecId> {
        self.arena.intern(kind, parent)
    }

    pub fn arena(&self) -> &PathSpecArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut PathSpecArena {
        &mut self.arena
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Materialize the stream a spec addresses
    ///
    /// A second resolution of the same spec returns the identical handle out
    /// of the cache; helpers resolve parent layers through the context, so
    /// every intermediate layer is cached too.
    pub fn open_stream(&mut self, spec: PathSpecId) -> VfsResult<SharedStream> {
        let key = self.arena.comparable(spec);
        if let Some(stream) = self.streams.get(&key) {
            trace!(kind = %self.arena.kind(spec).name(), "stream cache hit");
            return Ok(stream);
        }
        let helper = self.helper_for(spec)?;
        let stream = helper.open_stream(self, spec)?;
        self.streams.put(key, stream.clone())?;
        debug!(kind = %self.arena.kind(spec).name(), "opened stream");
        Ok(stream)
    }

    /// Materialize the container a spec addresses
    pub fn open_container(&mut self, spec: PathSpecId) -> VfsResult<SharedContainer> {
        let key = self.arena.comparable(spec);
        if let Some(container) = self.containers.get(&key) {
            trace!(kind = %self.arena.kind(spec).name(), "container cache hit");
            return Ok(container);
        }
        let helper = self.helper_for(spec)?;
        let container = helper.open_container(self, spec)?;
        self.containers.put(key, container.clone())?;
        debug!(kind = %self.arena.kind(spec).name(), "opened container");
        Ok(container)
    }

    /// Close a resolved stream and drop it from the cache
    ///
    /// A spec that was never resolved (or already closed) is a no-op.
    pub fn close_stream(&mut self, spec: PathSpecId) -> VfsResult<()> {
        let key = self.arena.comparable(spec);
        if let Some(stream) = self.streams.remove_by_key(&key) {
            stream.borrow_mut().close()?;
        }
        Ok(())
    }

    /// Drop every cached handle; handles still held elsewhere stay alive,
    /// the context just stops tracking them
    pub fn clear(&mut self) {
        self.streams.clear();
        self.containers.clear();
    }

    fn helper_for(&self, spec: PathSpecId) -> VfsResult<Rc<dyn ResolverHelper>> {
        let kind = self.arena.kind(spec).name();
        self.registry
            .get(kind)
            .ok_or_else(|| VfsError::UnknownLayerKind {
                kind: kind.to_string(),
            })
    }

    // =========================================================================
    // Extension surfaces
    // =========================================================================

    /// Register a foreign-format helper
    pub fn register_helper(&mut self, helper: Rc<dyn ResolverHelper>) -> VfsResult<()> {
        self.registry.register(helper)
    }

    pub fn register_mount(&mut self, identifier: &str, target: PathSpecId) -> VfsResult<()> {
        self.mounts.register(identifier, target)
    }

    pub fn deregister_mount(&mut self, identifier: &str) -> VfsResult<PathSpecId> {
        self.mounts.deregister(identifier)
    }

    pub fn mount_target(&self, identifier: &str) -> Option<PathSpecId> {
        self.mounts.target(identifier)
    }

    pub fn set_credential(&mut self, spec: PathSpecId, name: &str, value: Credential) {
        let key = self.arena.comparable(spec);
        self.keychain.set(&key, name, value);
    }

    pub fn credential(&self, spec: PathSpecId, name: &str) -> Option<Credential> {
        self.keychain
            .get(&self.arena.comparable(spec), name)
            .cloned()
    }
}
