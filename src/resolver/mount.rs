//! Mount table: short identifiers for deep chains

use std::collections::HashMap;

use tracing::debug;

use crate::error::{VfsError, VfsResult};
use crate::spec::PathSpecId;

/// Identifier -> target spec mapping consulted by the mount layer kind
#[derive(Debug, Default)]
pub struct MountTable {
    mounts: HashMap<String, PathSpecId>,
}

impl MountTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, identifier: &str, target: PathSpecId) -> VfsResult<()> {
        if self.mounts.contains_key(identifier) {
            return Err(VfsError::MountPointAlreadyRegistered {
                identifier: identifier.to_string(),
            });
        }
        debug!(identifier, "registered mount point");
        self.mounts.insert(identifier.to_string(), target);
        Ok(())
    }

    pub fn deregister(&mut self, identifier: &str) -> VfsResult<PathSpecId> {
        self.mounts
            .remove(identifier)
            .ok_or_else(|| VfsError::MountPointNotFound {
                identifier: identifier.to_string(),
            })
    }

    pub fn target(&self, identifier: &str) -> Option<PathSpecId> {
        self.mounts.get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn clear(&mut self) {
        self.mounts.clear();
    }
}
