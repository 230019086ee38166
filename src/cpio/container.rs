//! Container view over a parsed CPIO archive

use crate::container::{Container, ContainerEntry, EntryType};
use crate::cpio::parser::CpioArchive;
use crate::cpio::types::CpioEntry;
use crate::error::{VfsError, VfsResult};
use crate::spec::{PathSpecArena, PathSpecId};

/// Archive entries exposed through the container interface
///
/// Locations are archive paths with an optional leading `/`; the root is a
/// synthetic directory because cpio archives have no root record.
pub struct CpioContainer {
    archive: CpioArchive,
}

impl CpioContainer {
    pub fn new(archive: CpioArchive) -> Self {
        Self { archive }
    }

    pub fn archive(&self) -> &CpioArchive {
        &self.archive
    }

    fn synthetic_root() -> ContainerEntry {
        ContainerEntry {
            name: String::new(),
            location: "/".to_string(),
            entry_type: EntryType::Directory,
            size: 0,
            data_offset: None,
        }
    }
}

/// Archive path of a location attribute: leading slash stripped
fn normalize(location: &str) -> &str {
    location.trim_start_matches('/')
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

fn to_container_entry(entry: &CpioEntry) -> ContainerEntry {
    let entry_type = if entry.is_directory() {
        EntryType::Directory
    } else if entry.is_regular_file() {
        EntryType::File
    } else {
        EntryType::Other
    };
    let name = entry
        .path
        .rsplit('/')
        .next()
        .unwrap_or(&entry.path)
        .to_string();
    ContainerEntry {
        name,
        location: entry.path.clone(),
        entry_type,
        size: entry.data_size,
        data_offset: Some(entry.data_offset),
    }
}

impl Container for CpioContainer {
    fn root(&mut self) -> VfsResult<ContainerEntry> {
        Ok(Self::synthetic_root())
    }

    fn entry(&mut self, arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<ContainerEntry> {
        let location = location_of(arena, spec)?;
        let path = normalize(&location);
        if path.is_empty() {
            return Ok(Self::synthetic_root());
        }
        self.archive
            .entry(path)
            .map(to_container_entry)
            .ok_or(VfsError::EntryNotFound { location })
    }

    fn entry_exists(&mut self, arena: &PathSpecArena, spec: PathSpecId) -> VfsResult<bool> {
        let location = location_of(arena, spec)?;
        let path = normalize(&location);
        Ok(path.is_empty() || self.archive.contains(path))
    }

    fn sub_entries(
        &mut self,
        _arena: &PathSpecArena,
        entry: &ContainerEntry,
    ) -> VfsResult<Vec<ContainerEntry>> {
        if !entry.is_directory() {
            return Ok(Vec::new());
        }
        let parent = normalize(&entry.location);
        let prefix = if parent.is_empty() {
            String::new()
        } else {
            format!("{}/", parent)
        };
        let children = self
            .archive
            .entries(&prefix)
            .filter(|child| {
                let rest = &child.path[prefix.len()..];
                !rest.is_empty() && !rest.contains('/')
            })
            .map(to_container_entry)
            .collect();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::LayerKind;
    use crate::stream::{share, MemoryStream, VfsStream};

    // A newc archive with docs/, docs/report.txt, docs/raw.bin and notes.txt
    fn fixture() -> CpioArchive {
        let mut buf = Vec::new();
        let mut push = |path: &str, data: &[u8], mode: u32| {
            buf.extend_from_slice(b"070701");
            for value in [
                1u64,
                mode as u64,
                0,
                0,
                1,
                0,
                data.len() as u64,
                0,
                0,
                0,
                0,
                path.len() as u64 + 1,
                0,
            ] {
                buf.extend_from_slice(format!("{:08x}", value).as_bytes());
            }
            buf.extend_from_slice(path.as_bytes());
            buf.push(0);
            while buf.len() % 4 != 0 {
                buf.push(0);
            }
            buf.extend_from_slice(data);
            while buf.len() % 4 != 0 {
                buf.push(0);
            }
        };
        push("docs", b"", 0o040755);
        push("docs/report.txt", b"findings", 0o100644);
        push("docs/raw.bin", b"\x01\x02", 0o100644);
        push("notes.txt", b"misc", 0o100644);
        push("TRAILER!!!", b"", 0);

        let stream = share(MemoryStream::new(buf));
        stream.borrow_mut().open().unwrap();
        CpioArchive::open(stream).unwrap()
    }

    fn cpio_spec(arena: &mut PathSpecArena, location: &str) -> PathSpecId {
        let root = arena
            .intern(
                LayerKind::Os {
                    location: "/image.cpio".to_string(),
                },
                None,
            )
            .unwrap();
        arena
            .intern(
                LayerKind::Cpio {
                    location: location.to_string(),
                },
                Some(root),
            )
            .unwrap()
    }

    #[test]
    fn test_entry_lookup_and_root() {
        let mut container = CpioContainer::new(fixture());
        let mut arena = PathSpecArena::new();

        let report = cpio_spec(&mut arena, "/docs/report.txt");
        assert!(container.entry_exists(&arena, report).unwrap());
        let entry = container.entry(&arena, report).unwrap();
        assert_eq!(entry.name, "report.txt");
        assert_eq!(entry.size, 8);
        assert!(entry.is_file());
        assert!(entry.data_offset.is_some());

        let root_spec = cpio_spec(&mut arena, "/");
        let root = container.entry(&arena, root_spec).unwrap();
        assert!(root.is_directory());
        assert_eq!(root, container.root().unwrap());

        let missing = cpio_spec(&mut arena, "/docs/absent");
        assert!(!container.entry_exists(&arena, missing).unwrap());
        assert!(matches!(
            container.entry(&arena, missing),
            Err(VfsError::EntryNotFound { .. })
        ));
    }

    #[test]
    fn test_sub_entries_are_immediate_children() {
        let mut container = CpioContainer::new(fixture());
        let mut arena = PathSpecArena::new();

        let root = container.root().unwrap();
        let top: Vec<String> = container
            .sub_entries(&arena, &root)
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(top, ["docs", "notes.txt"]);

        let docs_spec = cpio_spec(&mut arena, "docs");
        let docs = container.entry(&arena, docs_spec).unwrap();
        let children: Vec<String> = container
            .sub_entries(&arena, &docs)
            .unwrap()
            .iter()
            .map(|c| c.location.clone())
            .collect();
        assert_eq!(children, ["docs/report.txt", "docs/raw.bin"]);

        // Files have no children
        let report_spec = cpio_spec(&mut arena, "docs/report.txt");
        let report = container.entry(&arena, report_spec).unwrap();
        assert!(container.sub_entries(&arena, &report).unwrap().is_empty());
    }
}
