//! Host file system container

use std::fs;
use std::path::Path;

use tracing::trace;

use crate::container::{Container, ContainerEntry, EntryType};
use crate::error::{VfsError, VfsResult};
use crate::spec::{PathSpecArena, PathSpecId};

/// Container view over the host file system
///
/// Entries are addressed by the location attribute of the spec (an absolute
/// or working-directory-relative host path).
#[derive(Debug, Default)]
pub struct OsContainer;

impl OsContainer {
    pub fn new() -> Self {
        Self
    }

    fn entry_at(&self, location: &str) -> VfsResult<ContainerEntry> {
        let path = Path::new(location);
        let metadata = fs::metadata(path).map_err(|_| VfsError::EntryNotFound {
            location: location.to_string(),
        })?;
        let entry_type = if metadata.is_dir() {
            EntryType::Directory
        } else if metadata.is_file() {
            EntryType::File
        } else {
            EntryType::Other
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| location.to_string());
        Ok(ContainerEntry {
            name,
            location: location.to_string(),
            entry_type,
            size: metadata.len(),
            data_offset: None,
        })
    }
}

fn location_of(arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<String> {
    let kind = arena.kind(spec);
    kind.location()
        .map(str::to_string)
        .ok_or_else(|| VfsError::BadAttributes {
            kind: kind.name().to_string(),
            message: "spec carries no location".to_string(),
        })
}

impl Container for OsContainer {
    fn root(&mut self) -> VfsResult<ContainerEntry> {
        self.entry_at("/")
    }

    fn entry(&mut self, arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<ContainerEntry> {
        self.entry_at(&location_of(arena, spec)?)
    }

    fn entry_exists(&mut self, arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<bool> {
        let location = location_of(arena, spec)?;
        let exists = Path::new(&location).exists();
        trace!(location = %location, exists, "probed host path");
        Ok(exists)
    }

    fn sub_entries(
        &mut self,
        _arena: &PathSpecArena,
        entry: &ContainerEntry,
    ) -> VfsResult<Vec<ContainerEntry>> {
        if !entry.is_directory() {
            return Ok(Vec::new());
        }
        let mut children = Vec::new();
        for child in fs::read_dir(&entry.location)? {
            let child = child?;
            children.push(self.entry_at(&child.path().to_string_lossy())?);
        }
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::LayerKind;
    use std::io::Write;
    use tempfile::TempDir;

    fn intern_os(arena: &mut PathSpecArena, location: &str) -> PathSpecId {
        arena
            .intern(
                LayerKind::Os {
                    location: location.to_string(),
                },
                None,
            )
            .unwrap()
    }

    #[test]
    fn test_entry_and_existence() {
        let dir = TempDir::new().unwrap();
        let file_path = dir.path().join("evidence.raw");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(b"0123456789").unwrap();

        let mut arena = PathSpecArena::new();
        let present = intern_os(&mut arena, &file_path.to_string_lossy());
        let absent = intern_os(&mut arena, &dir.path().join("missing").to_string_lossy());

        let mut container = OsContainer::new();
        assert!(container.entry_exists(&arena, present).unwrap());
        assert!(!container.entry_exists(&arena, absent).unwrap());

        let entry = container.entry(&arena, present).unwrap();
        assert_eq!(entry.name, "evidence.raw");
        assert_eq!(entry.size, 10);
        assert!(entry.is_file());
        assert_eq!(entry.data_offset, None);

        assert!(matches!(
            container.entry(&arena, absent),
            Err(VfsError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_sub_entries_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.bin"), b"bb").unwrap();
        std::fs::write(dir.path().join("a.bin"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut arena = PathSpecArena::new();
        let spec = intern_os(&mut arena, &dir.path().to_string_lossy());
        let mut container = OsContainer::new();

        let entry = container.entry(&arena, spec).unwrap();
        assert!(entry.is_directory());

        let children = container.sub_entries(&arena, &entry).unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a.bin", "b.bin", "sub"]);
        assert!(children[2].is_directory());

        // Files have no children
        assert!(container
            .sub_entries(&arena, &children[0])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_spec_without_location_is_rejected() {
        let mut arena = PathSpecArena::new();
        let root = intern_os(&mut arena, "/a");
        let raw = arena.intern(LayerKind::Raw, Some(root)).unwrap();

        let mut container = OsContainer::new();
        assert!(matches!(
            container.entry_exists(&arena, raw),
            Err(VfsError::BadAttributes { .. })
        ));
    }
}
