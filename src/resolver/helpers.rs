//! Built-in resolver helpers, one per layer kind
//!
//! A helper receives the context so parent layers resolve through the same
//! caches; every handle it returns is already open.

use std::rc::Rc;

use tracing::debug;

use crate::container::{share_container, OsContainer, SharedContainer};
use crate::cpio::{CpioArchive, CpioContainer};
use crate::error::{VfsError, VfsResult};
use crate::glob::{glob_segments, SegmentScheme};
use crate::resolver::context::ResolverContext;
use crate::resolver::registry::ResolverHelper;
use crate::spec::{LayerKind, PathSpecId};
use crate::stream::{
    share, CompressedStream, DataRangeStream, EncryptedStream, OsStream, SegmentedStream,
    SharedStream, VfsStream,
};

pub(crate) fn builtins() -> Vec<Rc<dyn ResolverHelper>> {
    vec![
        Rc::new(OsHelper),
        Rc::new(RawHelper),
        Rc::new(DataRangeHelper),
        Rc::new(CompressedHelper),
        Rc::new(EncryptedHelper),
        Rc::new(CpioHelper),
        Rc::new(MountHelper),
    ]
}

/// Registry dispatch guarantees the kind matches; a mismatch means a helper
/// was registered under the wrong name.
fn wrong_kind(expected: &'static str, actual: &str) -> VfsError {
    VfsError::BadAttributes {
        kind: actual.to_string(),
        message: format!("{} helper invoked for a different kind", expected),
    }
}

fn parent_of(ctx: &ResolverContext, spec: PathSpecId, kind: &'static str) -> VfsResult<PathSpecId> {
    ctx.arena()
        .parent(spec)
        .ok_or_else(|| VfsError::MissingParent {
            kind: kind.to_string(),
        })
}

// =============================================================================
// OS
// =============================================================================

pub struct OsHelper;

impl ResolverHelper for OsHelper {
    fn kind(&self) -> &str {
        "OS"
    }

    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let LayerKind::Os { location } = ctx.arena().kind(spec).clone() else {
            return Err(wrong_kind("OS", ctx.arena().kind(spec).name()));
        };
        let mut stream = OsStream::new(location);
        stream.open()?;
        Ok(share(stream))
    }

    fn open_container(
        &self,
        _ctx: &mut ResolverContext,
        _spec: PathSpecId,
    ) -> VfsResult<SharedContainer> {
        Ok(share_container(OsContainer::new()))
    }
}

// =============================================================================
// RAW
// =============================================================================

pub struct RawHelper;

impl ResolverHelper for RawHelper {
    fn kind(&self) -> &str {
        "RAW"
    }

    /// A RAW image over an OS location matching a segment scheme globs its
    /// sibling files; anything else wraps the single parent. Either way the
    /// result is a `SegmentedStream` so the lifecycle is uniform.
    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let parent = parent_of(ctx, spec, "RAW")?;
        let parent_kind = ctx.arena().kind(parent).clone();
        let segment_specs = match &parent_kind {
            LayerKind::Os { location } if SegmentScheme::parse(location).is_some() => {
                let mut host = OsContainer::new();
                glob_segments(ctx.arena_mut(), &mut host, parent)?
            }
            _ => Vec::new(),
        };
        let segment_specs = if segment_specs.is_empty() {
            vec![parent]
        } else {
            segment_specs
        };

        let mut segments = Vec::with_capacity(segment_specs.len());
        for segment in segment_specs {
            segments.push(ctx.open_stream(segment)?);
        }
        debug!(segment_count = segments.len(), "opened raw image");
        let mut stream = SegmentedStream::new(segments);
        stream.open()?;
        Ok(share(stream))
    }
}

// =============================================================================
// DATA_RANGE
// =============================================================================

pub struct DataRangeHelper;

impl ResolverHelper for DataRangeHelper {
    fn kind(&self) -> &str {
        "DATA_RANGE"
    }

    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let LayerKind::DataRange {
            range_offset,
            range_size,
        } = *ctx.arena().kind(spec)
        else {
            return Err(wrong_kind("DATA_RANGE", ctx.arena().kind(spec).name()));
        };
        let parent = parent_of(ctx, spec, "DATA_RANGE")?;
        let parent_stream = ctx.open_stream(parent)?;
        let mut stream = DataRangeStream::new(parent_stream, range_offset, range_size);
        stream.open()?;
        Ok(share(stream))
    }
}

// =============================================================================
// COMPRESSED_STREAM
// =============================================================================

pub struct CompressedHelper;

impl ResolverHelper for CompressedHelper {
    fn kind(&self) -> &str {
        "COMPRESSED_STREAM"
    }

    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let LayerKind::CompressedStream { method } = *ctx.arena().kind(spec) else {
            return Err(wrong_kind(
                "COMPRESSED_STREAM",
                ctx.arena().kind(spec).name(),
            ));
        };
        let parent = parent_of(ctx, spec, "COMPRESSED_STREAM")?;
        let parent_stream = ctx.open_stream(parent)?;
        let mut stream = CompressedStream::new(parent_stream, method);
        stream.open()?;
        Ok(share(stream))
    }
}

// =============================================================================
// ENCRYPTED_STREAM
// =============================================================================

pub struct EncryptedHelper;

impl ResolverHelper for EncryptedHelper {
    fn kind(&self) -> &str {
        "ENCRYPTED_STREAM"
    }

    /// The key comes from the spec attribute when present, otherwise from
    /// the keychain under the spec's own comparable.
    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let LayerKind::EncryptedStream { method, key } = ctx.arena().kind(spec).clone() else {
            return Err(wrong_kind(
                "ENCRYPTED_STREAM",
                ctx.arena().kind(spec).name(),
            ));
        };
        let key = match key {
            Some(key) => key,
            None => ctx
                .credential(spec, "key")
                .map(|credential| credential.to_bytes())
                .ok_or(VfsError::MissingCredential { name: "key" })?,
        };
        let parent = parent_of(ctx, spec, "ENCRYPTED_STREAM")?;
        let parent_stream = ctx.open_stream(parent)?;
        let mut stream = EncryptedStream::new(parent_stream, method, key);
        stream.open()?;
        Ok(share(stream))
    }
}

// =============================================================================
// CPIO
// =============================================================================

pub struct CpioHelper;

impl ResolverHelper for CpioHelper {
    fn kind(&self) -> &str {
        "CPIO"
    }

    /// The named entry's data, exposed as a window over the archive stream
    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let LayerKind::Cpio { location } = ctx.arena().kind(spec).clone() else {
            return Err(wrong_kind("CPIO", ctx.arena().kind(spec).name()));
        };
        let parent = parent_of(ctx, spec, "CPIO")?;
        let parent_stream = ctx.open_stream(parent)?;
        let archive = CpioArchive::open(parent_stream.clone())?;

        let path = location.trim_start_matches('/');
        let entry = archive
            .entry(path)
            .filter(|entry| entry.is_regular_file())
            .cloned()
            .ok_or(VfsError::EntryNotFound { location })?;
        let mut stream = DataRangeStream::new(parent_stream, entry.data_offset, entry.data_size);
        stream.open()?;
        Ok(share(stream))
    }

    fn open_container(
        &self,
        ctx: &mut ResolverContext,
        spec: PathSpecId,
    ) -> VfsResult<SharedContainer> {
        let parent = parent_of(ctx, spec, "CPIO")?;
        let parent_stream = ctx.open_stream(parent)?;
        let archive = CpioArchive::open(parent_stream)?;
        Ok(share_container(CpioContainer::new(archive)))
    }
}

// =============================================================================
// MOUNT
// =============================================================================

pub struct MountHelper;

impl MountHelper {
    fn resolve_target(ctx: &ResolverContext, spec: PathSpecId) -> VfsResult<PathSpecId> {
        let LayerKind::Mount { identifier } = ctx.arena().kind(spec).clone() else {
            return Err(wrong_kind("MOUNT", ctx.arena().kind(spec).name()));
        };
        ctx.mount_target(&identifier)
            .ok_or(VfsError::MountPointNotFound { identifier })
    }
}

impl ResolverHelper for MountHelper {
    fn kind(&self) -> &str {
        "MOUNT"
    }

    /// Resolves the aliased spec; the handle ends up cached under both the
    /// mount spec and the target.
    fn open_stream(&self, ctx: &mut ResolverContext, spec: PathSpecId) -> VfsResult<SharedStream> {
        let target = Self::resolve_target(ctx, spec)?;
        ctx.open_stream(target)
    }

    fn open_container(
        &self,
        ctx: &mut ResolverContext,
        spec: PathSpecId,
    ) -> VfsResult<SharedContainer> {
        let target = Self::resolve_target(ctx, spec)?;
        ctx.open_container(target)
    }
}
