//! ICY stream demultiplexer
//!
//! Splits a byte stream that interleaves audio with periodic metadata blocks
//! into the audio payload and decoded metadata. Every `interval_bytes` of
//! audio the server inserts one length byte (`n`), followed by `n * 16`
//! bytes of metadata text. Input may be fragmented arbitrarily; all cursor
//! state survives between calls to [`IcyDemuxer::handle`].

use tracing::{debug, trace, warn};

use crate::config::icy::METADATA_BLOCK_UNIT;
use crate::error::{DemuxError, Result};

use super::metadata::{decode_block, IcyMetadata};
use super::stats::DemuxStats;

/// Stateful splitter for one ICY stream session.
///
/// Calls to [`handle`](Self::handle) must follow the order the bytes arrived
/// in. The demuxer is not shared; whoever reads the stream owns it.
#[derive(Debug)]
pub struct IcyDemuxer {
    interval_bytes: usize,
    /// `interval_bytes` in cursor arithmetic
    interval: i64,
    /// Position of the next marker byte relative to the start of the next
    /// chunk. When a block is still being collected, relative to its end.
    bytes_until_next_marker: i64,
    pending_metadata: Vec<u8>,
    /// Declared size of the block in `pending_metadata`
    pending_metadata_len: usize,
    stats: DemuxStats,
}

impl IcyDemuxer {
    /// Create a demuxer for a stream announcing `interval_bytes` of audio
    /// between metadata markers (the `icy-metaint` header).
    ///
    /// The interval must be at least 1 and fit the signed cursor.
    pub fn new(interval_bytes: usize) -> Result<Self> {
        let interval = match i64::try_from(interval_bytes) {
            Ok(interval) if interval > 0 => interval,
            _ => return Err(DemuxError::InvalidInterval(interval_bytes)),
        };

        Ok(Self {
            interval_bytes,
            interval,
            bytes_until_next_marker: interval,
            pending_metadata: Vec::new(),
            pending_metadata_len: 0,
            stats: DemuxStats::default(),
        })
    }

    pub fn interval_bytes(&self) -> usize {
        self.interval_bytes
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// True while a metadata block has been started but not yet completed
    pub fn is_collecting_metadata(&self) -> bool {
        self.pending_metadata.len() < self.pending_metadata_len
    }

    /// Split one chunk, discarding metadata.
    pub fn extract_audio(&mut self, chunk: &[u8]) -> Vec<u8> {
        self.handle(chunk, None)
    }

    /// Split the next chunk of the stream.
    ///
    /// Returns the audio bytes contained in `chunk`. `on_metadata` runs once
    /// for every metadata block completed by this chunk. Malformed input is logged and counted in [`stats`](Self::stats);
    /// it never interrupts the audio.
    pub fn handle(
        &mut self,
        chunk: &[u8],
        mut on_metadata: Option<&mut dyn FnMut(IcyMetadata)>,
    ) -> Vec<u8> {
        self.stats.total_bytes_in += chunk.len() as u64;

        let len = chunk.len() as i64;
        let mut audio = Vec::with_capacity(chunk.len());
        let mut index: usize = 0;

        // Remainder of a block started in an earlier chunk
        if self.is_collecting_metadata() {
            let wanted = self.pending_metadata_len - self.pending_metadata.len();
            let end = wanted.min(chunk.len());
            index += self.collect_metadata(chunk, 0, end);

            if self.is_collecting_metadata() {
                trace!(
                    collected = self.pending_metadata.len(),
                    expected = self.pending_metadata_len,
                    "metadata block continues in next chunk"
                );
                return audio;
            }

            self.finish_block(&mut on_metadata);
            self.bytes_until_next_marker = self.bytes_until_next_marker.saturating_add(index as i64);
        }

        loop {
            let marker = self.bytes_until_next_marker;

            // Audio up to the end of the chunk
            if marker >= len {
                self.append_audio(&mut audio, chunk, index, chunk.len());
                self.bytes_until_next_marker -= len;
                break;
            }

            // Audio up to the marker
            if (index as i64) < marker {
                let marker = marker as usize;
                self.append_audio(&mut audio, chunk, index, marker);
                index = marker;
                continue;
            }

            if index as i64 != marker {
                warn!(index, marker, "marker cursor behind read position, resynchronizing");
                self.stats.bounds_violations += 1;
                self.append_audio(&mut audio, chunk, index, chunk.len());
                self.bytes_until_next_marker = 0;
                break;
            }

            let metadata_len = usize::from(chunk[index]) * METADATA_BLOCK_UNIT;
            index += 1;
            self.stats.total_metadata_bytes += 1;

            if metadata_len == 0 {
                self.stats.empty_markers += 1;
                self.bytes_until_next_marker = self.marker_after(index);
                continue;
            }

            self.pending_metadata_len = metadata_len;

            // Block runs past the end of the chunk
            if index + metadata_len > chunk.len() {
                index += self.collect_metadata(chunk, index, chunk.len());
                self.bytes_until_next_marker = self.marker_after(index) - len;
                break;
            }

            index += self.collect_metadata(chunk, index, index + metadata_len);
            self.finish_block(&mut on_metadata);
            self.bytes_until_next_marker = self.marker_after(index);
        }

        self.stats.total_audio_bytes += audio.len() as u64;
        audio
    }

    /// Marker position one interval after `index`. Saturates for intervals
    /// too long to reach within any realistic stream.
    fn marker_after(&self, index: usize) -> i64 {
        (index as i64).saturating_add(self.interval)
    }

    fn append_audio(&mut self, audio: &mut Vec<u8>, chunk: &[u8], start: usize, end: usize) {
        match chunk.get(start..end) {
            Some(bytes) => audio.extend_from_slice(bytes),
            None => {
                warn!(start, end, len = chunk.len(), "audio range out of bounds");
                self.stats.bounds_violations += 1;
            }
        }
    }

    fn collect_metadata(&mut self, chunk: &[u8], start: usize, end: usize) -> usize {
        match chunk.get(start..end) {
            Some(bytes) => {
                self.pending_metadata.extend_from_slice(bytes);
                self.stats.total_metadata_bytes += bytes.len() as u64;
                bytes.len()
            }
            None => {
                warn!(start, end, len = chunk.len(), "metadata range out of bounds");
                self.stats.bounds_violations += 1;
                0
            }
        }
    }

    /// Decode the completed block, hand it to the callback, reset the buffer.
    fn finish_block(&mut self, on_metadata: &mut Option<&mut dyn FnMut(IcyMetadata)>) {
        let block = std::mem::take(&mut self.pending_metadata);
        self.pending_metadata_len = 0;
        self.stats.blocks_completed += 1;

        let parsed = decode_block(&block);
        self.stats.record_parse(&parsed);
        debug!(
            len = block.len(),
            title = ?parsed.metadata.stream_title(),
            url = ?parsed.metadata.stream_url(),
            "metadata block"
        );
        if let Some(callback) = on_metadata.as_deref_mut() {
            callback(parsed.metadata);
        }
    }
}
