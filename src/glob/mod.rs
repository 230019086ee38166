//! Segment file discovery for split forensic images
//!
//! Split images roll a two-digit decimal extension (`.E01`..`.E99`) into an
//! alphabetic one (`.EAA`..`.ZZZ`); the alphabet's case follows the first
//! extension letter, and EWF2-style schemes keep an `x` infix (`.Ex01`).
//! Given the first segment's spec and a container for existence probes, the
//! globber reconstructs the ordered segment list.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::container::Container;
use crate::error::{VfsError, VfsResult};
use crate::spec::{PathSpecArena, PathSpecId};

fn scheme_regex() -> &'static Regex {
    static SCHEME_REGEX: OnceLock<Regex> = OnceLock::new();
    SCHEME_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<stem>.*\.)(?P<letter>[A-Za-z])(?P<infix>x)?01$")
            .expect("Invalid segment scheme regex")
    })
}

/// A recognized rolling-extension naming scheme
///
/// Captured from the first segment's location; generates the location of any
/// later segment number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentScheme {
    /// Location up to and including the extension dot
    stem: String,
    /// First extension letter; its case selects the alphabet
    initial: char,
    /// EWF2-style fixed `x` between the letter and the counter
    infix: bool,
}

impl SegmentScheme {
    /// Recognize a first-segment location (`...<letter>[x]01`)
    pub fn parse(location: &str) -> Option<SegmentScheme> {
        let captures = scheme_regex().captures(location)?;
        Some(SegmentScheme {
            stem: captures["stem"].to_string(),
            initial: captures["letter"].chars().next()?,
            infix: captures.name("infix").is_some(),
        })
    }

    /// Location of segment `n` (1-based)
    ///
    /// Segments 1-99 use the two-digit decimal suffix; from 100 on the
    /// counter is a two-letter odometer and the leading letter advances once
    /// per full cycle. Past the alphabet's final leading letter there is no
    /// representable name: `SegmentSchemeExhausted`.
    pub fn location(&self, n: u64) -> VfsResult<String> {
        debug_assert!(n >= 1, "segment numbers are 1-based");
        let infix = if self.infix { "x" } else { "" };
        if n <= 99 {
            return Ok(format!("{}{}{}{:02}", self.stem, self.initial, infix, n));
        }
        let base = if self.initial.is_ascii_uppercase() {
            b'A'
        } else {
            b'a'
        };
        let idx = n - 100;
        let lead_pos = (self.initial as u8 - base) as u64 + idx / 676;
        if lead_pos > 25 {
            return Err(VfsError::SegmentSchemeExhausted);
        }
        let lead = (base + lead_pos as u8) as char;
        let second = (base + ((idx / 26) % 26) as u8) as char;
        let third = (base + (idx % 26) as u8) as char;
        Ok(format!(
            "{}{}{}{}{}",
            self.stem, lead, infix, second, third
        ))
    }
}

/// Extension of a location, for error reporting
fn extension_of(location: &str) -> String {
    location
        .rsplit('.')
        .next()
        .filter(|ext| ext.len() < location.len())
        .unwrap_or_default()
        .to_string()
}

/// Reconstruct the ordered segment list starting at `first`
///
/// Builds sibling specs (same kind shape, same parent) for successive
/// segment locations and probes each against the container, stopping at the
/// first absent one. Probing one segment past the last representable name
/// propagates `SegmentSchemeExhausted`, so the returned list is always one
/// shorter than the scheme's name space.
pub fn glob_segments(
    arena: &mut PathSpecArena,
    container: &mut dyn Container,
    first: PathSpecId,
) -> VfsResult<Vec<PathSpecId>> {
    let kind = arena.kind(first).clone();
    let location = kind
        .location()
        .ok_or_else(|| VfsError::UnsupportedSegmentSuffix {
            extension: String::new(),
        })?
        .to_string();
    let scheme =
        SegmentScheme::parse(&location).ok_or_else(|| VfsError::UnsupportedSegmentSuffix {
            extension: extension_of(&location),
        })?;
    let parent = arena.parent(first);

    let mut segments = Vec::new();
    for n in 1u64.. {
        let sibling_kind = kind
            .with_location(scheme.location(n)?)
            .ok_or_else(|| VfsError::BadAttributes {
                kind: kind.name().to_string(),
                message: "kind cannot carry a location".to_string(),
            })?;
        let sibling = arena.intern(sibling_kind, parent)?;
        if !container.entry_exists(arena, sibling)? {
            break;
        }
        segments.push(sibling);
    }
    debug!(
        location = %location,
        segment_count = segments.len(),
        "globbed segment files"
    );
    Ok(segments)
}
