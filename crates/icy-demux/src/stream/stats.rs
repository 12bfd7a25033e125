//! Demultiplexer statistics
//!
//! `DemuxStats` is a plain snapshot of byte accounting and diagnostic
//! counters. Anomalies that are only logged elsewhere are counted here, so
//! callers and tests can observe them without parsing log output.

use super::metadata::ParsedBlock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Every byte handed to the demuxer
    pub total_bytes_in: u64,
    /// Bytes returned as audio
    pub total_audio_bytes: u64,
    /// Metadata bytes, including the one-byte length markers
    pub total_metadata_bytes: u64,

    /// Metadata blocks fully assembled (decoded or not)
    pub blocks_completed: u64,
    /// Markers announcing a zero-length block
    pub empty_markers: u64,
    /// Entries without a `=` separator
    pub malformed_entries: u64,
    /// Entries with a key that is not surfaced
    pub unknown_keys: u64,
    /// Completed blocks that were not valid UTF-8 and were decoded lossily
    pub lossy_blocks: u64,
    /// Copy ranges that fell outside the input chunk
    pub bounds_violations: u64,
}

impl DemuxStats {
    /// True when every input byte was classified as either audio or metadata
    pub fn is_balanced(&self) -> bool {
        self.total_bytes_in == self.total_audio_bytes + self.total_metadata_bytes
    }

    pub(crate) fn record_parse(&mut self, parsed: &ParsedBlock) {
        self.malformed_entries += parsed.malformed_entries;
        self.unknown_keys += parsed.unknown_keys;
        if parsed.lossy {
            self.lossy_blocks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::metadata::{decode_block, parse_metadata};

    #[test]
    fn default_is_zeroed_and_balanced() {
        let stats = DemuxStats::default();
        assert_eq!(stats.total_bytes_in, 0);
        assert_eq!(stats.blocks_completed, 0);
        assert!(stats.is_balanced());
    }

    #[test]
    fn unbalanced_when_bytes_unaccounted() {
        let stats = DemuxStats {
            total_bytes_in: 10,
            total_audio_bytes: 8,
            total_metadata_bytes: 1,
            ..Default::default()
        };
        assert!(!stats.is_balanced());
    }

    #[test]
    fn record_parse_accumulates() {
        let mut stats = DemuxStats::default();
        stats.record_parse(&parse_metadata("a;b;Foo=1;StreamTitle=x;"));
        stats.record_parse(&parse_metadata("Bar=2;"));
        assert_eq!(stats.malformed_entries, 2);
        assert_eq!(stats.unknown_keys, 2);
        assert_eq!(stats.lossy_blocks, 0);
    }

    #[test]
    fn record_parse_counts_lossy_blocks() {
        let mut stats = DemuxStats::default();
        stats.record_parse(&decode_block(b"StreamTitle=Caf\xe9;"));
        stats.record_parse(&decode_block(b"StreamTitle=Cafe;"));
        assert_eq!(stats.lossy_blocks, 1);
    }
}
