//! End-to-end resolution of layered chains against on-disk fixtures

use std::io::{SeekFrom, Write};
use std::rc::Rc;

use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;
use tempfile::{NamedTempFile, TempDir};
use tracing_subscriber::EnvFilter;

use layervfs::{
    CompressionMethod, Container, Credential, EncryptionMethod, LayerKind, PathSpecId,
    PathSpecRecord, ResolverContext, VfsError, VfsStream,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn fixture(content: &[u8]) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(content).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 17 % 243) as u8).collect()
}

fn os_spec(ctx: &mut ResolverContext, location: &str) -> PathSpecId {
    ctx.intern(
        LayerKind::Os {
            location: location.to_string(),
        },
        None,
    )
    .unwrap()
}

/// Independent RC4 for building ciphertext fixtures
fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: Vec<u8> = (0..=255).collect();
    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|&byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            byte ^ s[(s[i as usize] as usize + s[j as usize] as usize) % 256]
        })
        .collect()
}

/// New ASCII (newc) archive from (path, data) pairs
fn newc_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut push = |buf: &mut Vec<u8>, path: &str, data: &[u8], mode: u32| {
        buf.extend_from_slice(b"070701");
        for value in [
            1u64,
            mode as u64,
            0,
            0,
            1,
            1_700_000_000,
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
    for (path, data) in members {
        push(&mut buf, path, data, 0o100644);
    }
    push(&mut buf, "TRAILER!!!", b"", 0);
    buf
}

#[test]
fn test_deflate_scenario_seek_and_slice() {
    init_tracing();
    let plain = pattern(1247);
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&plain).unwrap();
    let tmp = fixture(&enc.finish().unwrap());

    let mut ctx = ResolverContext::new();
    let root = os_spec(&mut ctx, &tmp.path().to_string_lossy());
    let compressed = ctx
        .intern(
            LayerKind::CompressedStream {
                method: CompressionMethod::Deflate,
            },
            Some(root),
        )
        .unwrap();

    let stream = ctx.open_stream(compressed).unwrap();
    let mut stream = stream.borrow_mut();
    stream.seek(SeekFrom::Start(167 + 10)).unwrap();
    assert_eq!(stream.read(5).unwrap(), &plain[177..182]);

    assert_eq!(stream.size().unwrap(), 1247);
    stream.seek(SeekFrom::Start(0)).unwrap();
    assert_eq!(stream.read_to_end().unwrap(), plain);
}

#[test]
fn test_cpio_inside_zlib_on_disk() {
    init_tracing();
    let report = b"quarterly findings: nothing of note";
    let archive = newc_archive(&[
        ("docs/report.txt", report.as_slice()),
        ("evidence.bin", &[0xAA, 0xBB, 0xCC]),
    ]);
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&archive).unwrap();
    let tmp = fixture(&enc.finish().unwrap());

    let mut ctx = ResolverContext::new();
    let root = os_spec(&mut ctx, &tmp.path().to_string_lossy());
    let compressed = ctx
        .intern(
            LayerKind::CompressedStream {
                method: CompressionMethod::Zlib,
            },
            Some(root),
        )
        .unwrap();
    let entry = ctx
        .intern(
            LayerKind::Cpio {
                location: "/docs/report.txt".to_string(),
            },
            Some(compressed),
        )
        .unwrap();

    let stream = ctx.open_stream(entry).unwrap();
    assert_eq!(stream.borrow_mut().read_to_end().unwrap(), report);

    // The archive is also enumerable as a container
    let listing = ctx
        .intern(
            LayerKind::Cpio {
                location: "/".to_string(),
            },
            Some(compressed),
        )
        .unwrap();
    let container = ctx.open_container(listing).unwrap();
    let mut container = container.borrow_mut();
    let root_entry = container.root().unwrap();
    let names: Vec<String> = container
        .sub_entries(ctx.arena(), &root_entry)
        .unwrap()
        .iter()
        .map(|child| child.name.clone())
        .collect();
    assert!(names.contains(&"evidence.bin".to_string()));
    drop(container);

    let missing = ctx
        .intern(
            LayerKind::Cpio {
                location: "/docs/absent.txt".to_string(),
            },
            Some(compressed),
        )
        .unwrap();
    assert!(matches!(
        ctx.open_stream(missing),
        Err(VfsError::EntryNotFound { .. })
    ));
}

#[test]
fn test_segmented_raw_image() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let parts: [&[u8]; 3] = [b"first-segment|", b"second|", b"third"];
    let mut whole = Vec::new();
    for (idx, part) in parts.iter().enumerate() {
        std::fs::write(dir.path().join(format!("image.s{:02}", idx + 1)), part).unwrap();
        whole.extend_from_slice(part);
    }

    let mut ctx = ResolverContext::new();
    let first = os_spec(
        &mut ctx,
        &dir.path().join("image.s01").to_string_lossy(),
    );
    let raw = ctx.intern(LayerKind::Raw, Some(first)).unwrap();

    let stream = ctx.open_stream(raw).unwrap();
    let mut stream = stream.borrow_mut();
    assert_eq!(stream.size().unwrap(), whole.len() as u64);
    assert_eq!(stream.read_to_end().unwrap(), whole);

    // A read spanning the first boundary
    stream.seek(SeekFrom::Start(10)).unwrap();
    assert_eq!(stream.read(8).unwrap(), &whole[10..18]);
}

#[test]
fn test_raw_over_single_unsegmented_file() {
    let tmp = fixture(b"not split at all");
    let mut ctx = ResolverContext::new();
    let root = os_spec(&mut ctx, &tmp.path().to_string_lossy());
    let raw = ctx.intern(LayerKind::Raw, Some(root)).unwrap();

    let stream = ctx.open_stream(raw).unwrap();
    assert_eq!(stream.borrow_mut().read_to_end().unwrap(), b"not split at all");
}

#[test]
fn test_encrypted_chain_via_keychain() {
    init_tracing();
    let plain = pattern(40_000);
    let tmp = fixture(&rc4(b"sekrit", &plain));

    let mut ctx = ResolverContext::new();
    let root = os_spec(&mut ctx, &tmp.path().to_string_lossy());
    let encrypted = ctx
        .intern(
            LayerKind::EncryptedStream {
                method: EncryptionMethod::Rc4,
                key: None,
            },
            Some(root),
        )
        .unwrap();

    assert!(matches!(
        ctx.open_stream(encrypted),
        Err(VfsError::MissingCredential { name: "key" })
    ));

    ctx.set_credential(encrypted, "key", Credential::Bytes(b"sekrit".to_vec()));
    let stream = ctx.open_stream(encrypted).unwrap();
    let mut stream = stream.borrow_mut();

    let first = stream.read_to_end().unwrap();
    assert_eq!(first, plain);
    stream.seek(SeekFrom::Start(0)).unwrap();
    assert_eq!(stream.read_to_end().unwrap(), first);

    // Backward seek into the middle of the keystream
    stream.seek(SeekFrom::Start(12_345)).unwrap();
    assert_eq!(stream.read(16).unwrap(), &plain[12_345..12_361]);
}

#[test]
fn test_cache_identity_for_deep_chains() {
    let plain = pattern(5_000);
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&plain).unwrap();
    let tmp = fixture(&enc.finish().unwrap());

    let mut ctx = ResolverContext::new();
    let root = os_spec(&mut ctx, &tmp.path().to_string_lossy());
    let compressed = ctx
        .intern(
            LayerKind::CompressedStream {
                method: CompressionMethod::Zlib,
            },
            Some(root),
        )
        .unwrap();
    let window = ctx
        .intern(
            LayerKind::DataRange {
                range_offset: 100,
                range_size: 200,
            },
            Some(compressed),
        )
        .unwrap();

    let first = ctx.open_stream(window).unwrap();
    let second = ctx.open_stream(window).unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    // A different window over the same parent is a distinct handle
    let other = ctx
        .intern(
            LayerKind::DataRange {
                range_offset: 0,
                range_size: 200,
            },
            Some(compressed),
        )
        .unwrap();
    let third = ctx.open_stream(other).unwrap();
    assert!(!Rc::ptr_eq(&first, &third));

    assert_eq!(first.borrow_mut().read_to_end().unwrap(), &plain[100..300]);
    assert_eq!(third.borrow_mut().read_to_end().unwrap(), &plain[..200]);
}

#[test]
fn test_wire_record_resolves_in_fresh_context() {
    let plain = pattern(3_000);
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&plain).unwrap();
    let tmp = fixture(&enc.finish().unwrap());

    let mut ctx = ResolverContext::new();
    let root = os_spec(&mut ctx, &tmp.path().to_string_lossy());
    let compressed = ctx
        .intern(
            LayerKind::CompressedStream {
                method: CompressionMethod::Zlib,
            },
            Some(root),
        )
        .unwrap();
    let json = ctx.arena().to_record(compressed).to_json().unwrap();

    // A second process would receive the record and rebuild the chain
    let mut other = ResolverContext::new();
    let record = PathSpecRecord::from_json(&json).unwrap();
    let rebuilt = other.arena_mut().intern_record(&record).unwrap();
    assert_eq!(
        other.arena().comparable(rebuilt),
        ctx.arena().comparable(compressed)
    );

    let stream = other.open_stream(rebuilt).unwrap();
    assert_eq!(stream.borrow_mut().read_to_end().unwrap(), plain);
}
