//! icy-demux — ICY stream demultiplexer
//!
//! Separates the periodic metadata blocks of an Icecast/Shoutcast stream from
//! its audio payload, across arbitrarily fragmented reads.
//!
//! ## Quick start
//!
//! ```
//! use icy_demux::stream::{IcyDemuxer, IcyMetadata};
//!
//! let mut demuxer = IcyDemuxer::new(4).unwrap();
//! let mut stream = b"AAAA".to_vec();
//! stream.push(1);
//! stream.extend_from_slice(b"StreamTitle=Hi;\0");
//! stream.extend_from_slice(b"BB");
//!
//! let mut titles = Vec::new();
//! let mut on_metadata = |m: IcyMetadata| titles.push(m.stream_title().map(str::to_string));
//! let audio = demuxer.handle(&stream, Some(&mut on_metadata));
//!
//! assert_eq!(audio, b"AAAABB");
//! assert_eq!(titles, vec![Some("Hi".to_string())]);
//! ```

pub mod config;
pub mod error;
pub mod stream;

pub use error::{DemuxError, Result};
