//! ICY stream reader
//!
//! Wraps any byte source carrying an ICY stream, strips metadata while
//! passing audio through, and provides a `Read` interface for a decoder.
//! Title changes are published on a channel.

use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, trace};

use crate::config::reader::READ_CHUNK_SIZE;
use crate::error::Result;
use crate::stream::demuxer::IcyDemuxer;
use crate::stream::metadata::{IcyMetadata, StreamMetadata};
use crate::stream::stats::DemuxStats;

/// Pull reader that demultiplexes an ICY stream on demand.
///
/// Uses a single-chunk design: holds at most one demuxed chunk at a time.
/// The demuxer is owned by the reader, so chunks are always handled in the
/// order they were read.
pub struct IcyReader<R> {
    inner: R,
    /// `None` when the stream carries no metadata (`icy-metaint` of 0)
    demuxer: Option<IcyDemuxer>,
    read_buffer: Vec<u8>,
    current_chunk: Vec<u8>,
    chunk_pos: usize,
    metadata_tx: Sender<StreamMetadata>,
    last_title: Option<String>,
    /// Total bytes pulled from the inner source, metadata included
    pub bytes_received: Arc<AtomicU64>,
}

impl<R: Read> IcyReader<R> {
    /// Wrap `inner`, expecting a metadata marker every `metaint` audio bytes.
    ///
    /// Returns the reader and a channel that receives metadata updates.
    pub fn new(inner: R, metaint: usize) -> Result<(Self, Receiver<StreamMetadata>)> {
        let demuxer = if metaint == 0 {
            None
        } else {
            Some(IcyDemuxer::new(metaint)?)
        };

        let (metadata_tx, metadata_rx) = unbounded::<StreamMetadata>();

        Ok((
            Self {
                inner,
                demuxer,
                read_buffer: vec![0u8; READ_CHUNK_SIZE],
                current_chunk: Vec::new(),
                chunk_pos: 0,
                metadata_tx,
                last_title: None,
                bytes_received: Arc::new(AtomicU64::new(0)),
            },
            metadata_rx,
        ))
    }

    /// Demuxer statistics; all zero when the stream carries no metadata
    pub fn stats(&self) -> DemuxStats {
        self.demuxer
            .as_ref()
            .map(IcyDemuxer::stats)
            .unwrap_or_default()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Pull one chunk from the inner source. Returns false at EOF.
    fn fill_chunk(&mut self) -> io::Result<bool> {
        let n = loop {
            match self.inner.read(&mut self.read_buffer) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };

        if n == 0 {
            return Ok(false);
        }

        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
        let raw = &self.read_buffer[..n];

        let audio = match self.demuxer.as_mut() {
            None => raw.to_vec(),
            Some(demuxer) => {
                let mut updates = Vec::new();
                let mut on_metadata = |metadata: IcyMetadata| updates.push(metadata);
                let audio = demuxer.handle(raw, Some(&mut on_metadata));
                for metadata in updates {
                    self.publish(&metadata);
                }
                audio
            }
        };
        self.current_chunk = audio;
        self.chunk_pos = 0;

        trace!(raw = n, audio = self.current_chunk.len(), "pulled chunk");
        Ok(true)
    }

    /// Send a metadata update if the title changed since the last one.
    fn publish(&mut self, metadata: &IcyMetadata) {
        let Some(title) = metadata.stream_title() else {
            return;
        };
        if self.last_title.as_deref() == Some(title) {
            return;
        }
        self.last_title = Some(title.to_string());

        if let Some(update) = StreamMetadata::from_icy(metadata) {
            debug!(artist = ?update.artist, title = ?update.title, "now playing");
            // Receiver may be gone; audio keeps flowing regardless
            let _ = self.metadata_tx.send(update);
        }
    }
}

impl<R: Read> Read for IcyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            // Serve from current chunk
            let remaining = self.current_chunk.len() - self.chunk_pos;
            if remaining > 0 {
                let n = buf.len().min(remaining);
                buf[..n].copy_from_slice(&self.current_chunk[self.chunk_pos..self.chunk_pos + n]);
                self.chunk_pos += n;
                return Ok(n);
            }

            // Chunks made only of metadata yield no audio; keep pulling
            if !self.fill_chunk()? {
                return Ok(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::config::icy::METADATA_BLOCK_UNIT;
    use crate::stream::metadata::MetadataSource;

    fn block(text: &str, units: u8) -> Vec<u8> {
        let mut out = vec![units];
        out.extend_from_slice(text.as_bytes());
        out.resize(usize::from(units) * METADATA_BLOCK_UNIT + 1, 0);
        out
    }

    /// Source that hands out at most `max` bytes per read
    struct Trickle {
        data: Cursor<Vec<u8>>,
        max: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.max);
            self.data.read(&mut buf[..n])
        }
    }

    // --- Pass-through ---

    #[test]
    fn zero_metaint_passes_bytes_through() {
        let data = vec![1u8, 0, 2, 0, 3];
        let (mut reader, rx) = IcyReader::new(Cursor::new(data.clone()), 0).unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
        assert!(rx.try_recv().is_err());
        assert_eq!(reader.stats(), DemuxStats::default());
        assert_eq!(reader.bytes_received.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn read_zero_length_buffer() {
        let (mut reader, _rx) = IcyReader::new(Cursor::new(vec![1, 2, 3]), 2).unwrap();
        let mut buf = [0u8; 0];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    // --- Demuxing ---

    #[test]
    fn strips_metadata_and_publishes_title() {
        let mut data = b"AAAA".to_vec();
        data.extend(block("StreamTitle='Pink Floyd - Time';", 3));
        data.extend_from_slice(b"BBBB");

        let (mut reader, rx) = IcyReader::new(Cursor::new(data.clone()), 4).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, b"AAAABBBB");
        let update = rx.try_recv().unwrap();
        assert_eq!(update.artist, Some("Pink Floyd".to_string()));
        assert_eq!(update.title, Some("Time".to_string()));
        assert_eq!(update.source, MetadataSource::Icy);
        assert!(rx.try_recv().is_err());

        let stats = reader.stats();
        assert_eq!(stats.total_bytes_in, data.len() as u64);
        assert!(stats.is_balanced());
        assert_eq!(
            reader.bytes_received.load(Ordering::Relaxed),
            data.len() as u64
        );
    }

    #[test]
    fn repeated_title_published_once() {
        let mut data = Vec::new();
        for title in ["One", "One", "Two", "Two", "One"] {
            data.extend_from_slice(b"xx");
            data.extend(block(&format!("StreamTitle={title};"), 1));
        }

        let (mut reader, rx) = IcyReader::new(Cursor::new(data), 2).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, b"xxxxxxxxxx");
        let titles: Vec<_> = rx.try_iter().filter_map(|m| m.title).collect();
        assert_eq!(titles, vec!["One", "Two", "One"]);
    }

    #[test]
    fn metadata_only_reads_do_not_signal_eof() {
        let mut data = b"ab".to_vec();
        data.extend(block("StreamTitle=Spread out;", 4));
        data.extend_from_slice(b"cd");

        let source = Trickle {
            data: Cursor::new(data),
            max: 3,
        };
        let (mut reader, rx) = IcyReader::new(source, 2).unwrap();

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcd");
        assert_eq!(rx.try_recv().unwrap().title, Some("Spread out".to_string()));
    }

    #[test]
    fn small_reads_serve_partial_chunks() {
        let mut data = b"abcdef".to_vec();
        data.push(0);
        data.extend_from_slice(b"ghi");

        let (mut reader, _rx) = IcyReader::new(Cursor::new(data), 6).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"efgh");
        assert_eq!(reader.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], b'i');
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn dropped_receiver_does_not_stop_audio() {
        let mut data = b"aa".to_vec();
        data.extend(block("StreamTitle=Nobody listening;", 2));
        data.extend_from_slice(b"bb");

        let (mut reader, rx) = IcyReader::new(Cursor::new(data), 2).unwrap();
        drop(rx);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"aabb");
    }

    #[test]
    fn url_only_block_is_not_published() {
        let mut data = b"aa".to_vec();
        data.extend(block("StreamUrl=http://x;", 2));

        let (mut reader, rx) = IcyReader::new(Cursor::new(data), 2).unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(reader.stats().blocks_completed, 1);
    }

    #[test]
    fn into_inner_returns_source() {
        let (reader, _rx) = IcyReader::new(Cursor::new(vec![9u8; 3]), 8).unwrap();
        let inner = reader.into_inner();
        assert_eq!(inner.get_ref(), &vec![9u8; 3]);
    }
}
