//! Stream metadata types and ICY parsing
//!
//! Decoding of completed ICY metadata blocks (`key=value;` entries, null
//! padded to a multiple of 16 bytes) and the artist/title view built on top.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::icy::{
    ENTRY_SEPARATOR, KEY_VALUE_SEPARATOR, STREAM_TITLE_KEY, STREAM_URL_KEY,
};

/// Source of stream metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataSource {
    Icy,
}

/// Decoded contents of one ICY metadata block.
///
/// Only `StreamTitle` and `StreamUrl` are kept; values are stored verbatim
/// (quotes included, if the server sends them).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcyMetadata {
    entries: HashMap<String, String>,
}

impl IcyMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a recognized entry. Later values for the same key win.
    fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn stream_title(&self) -> Option<&str> {
        self.get(STREAM_TITLE_KEY)
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.get(STREAM_URL_KEY)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.entries
    }
}

impl From<IcyMetadata> for HashMap<String, String> {
    fn from(metadata: IcyMetadata) -> Self {
        metadata.entries
    }
}

/// Result of parsing one metadata block, with per-block diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBlock {
    pub metadata: IcyMetadata,
    /// Entries without a `=` separator
    pub malformed_entries: u64,
    /// Well-formed entries whose key is not surfaced
    pub unknown_keys: u64,
    /// Block was not valid UTF-8 and was decoded with replacement characters
    pub lossy: bool,
}

/// Parse the text of a metadata block.
///
/// Entries are split on `;`, then on the first `=`. Anything after the first
/// NUL in a value is padding. Entries that are empty or pure padding are
/// ignored without a diagnostic.
pub fn parse_metadata(text: &str) -> ParsedBlock {
    let mut parsed = ParsedBlock::default();

    for entry in text.split(ENTRY_SEPARATOR) {
        if entry.trim_matches('\0').is_empty() {
            continue;
        }

        let Some((key, value)) = entry.split_once(KEY_VALUE_SEPARATOR) else {
            warn!(entry, "cannot parse metadata entry");
            parsed.malformed_entries += 1;
            continue;
        };

        let value = match value.find('\0') {
            Some(end) => &value[..end],
            None => value,
        };

        match key {
            STREAM_TITLE_KEY | STREAM_URL_KEY => parsed.metadata.insert(key, value),
            _ => {
                debug!(key, value, "unused metadata key");
                parsed.unknown_keys += 1;
            }
        }
    }

    parsed
}

/// Decode a raw, fully assembled metadata block.
///
/// Invalid UTF-8 sequences become U+FFFD, so a stray Latin-1 byte in the
/// title does not cost the other entries of the block.
pub fn decode_block(raw_block: &[u8]) -> ParsedBlock {
    let text = String::from_utf8_lossy(raw_block);
    let lossy = matches!(text, Cow::Owned(_));
    if lossy {
        warn!(len = raw_block.len(), "metadata block is not valid UTF-8");
    }

    let mut parsed = parse_metadata(&text);
    parsed.lossy = lossy;
    parsed
}

/// Parsed stream metadata with artist/title split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub source: MetadataSource,
}

impl StreamMetadata {
    /// Create metadata from an ICY title string.
    ///
    /// Splits on first ` - ` separator: "Artist - Title" → artist="Artist", title="Title".
    /// If no separator found, the whole string becomes the title.
    pub fn from_icy_title(raw: &str) -> Self {
        let raw = raw.trim();
        let Some((artist, title)) = raw.split_once(" - ") else {
            return Self {
                title: non_empty(raw),
                artist: None,
                source: MetadataSource::Icy,
            };
        };

        Self {
            title: non_empty(title.trim()),
            artist: non_empty(artist.trim()),
            source: MetadataSource::Icy,
        }
    }

    /// Build the artist/title view from a decoded block.
    ///
    /// Returns `None` when the block carries no `StreamTitle`. A title wrapped
    /// in single quotes (`StreamTitle='...'`) is unwrapped first.
    pub fn from_icy(metadata: &IcyMetadata) -> Option<Self> {
        let title = metadata.stream_title()?;
        Some(Self::from_icy_title(strip_quotes(title)))
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none()
    }
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
