//! Stream handling
//!
//! Splits ICY (Icecast/Shoutcast) streams into audio and metadata: a
//! chunk-driven demuxer, metadata block decoding, and a `Read` adapter for
//! byte sources that carry an ICY stream.

pub mod demuxer;
pub mod metadata;
pub mod reader;
pub mod stats;

pub use demuxer::IcyDemuxer;
pub use metadata::{decode_block, parse_metadata, IcyMetadata, MetadataSource, StreamMetadata};
pub use reader::IcyReader;
pub use stats::DemuxStats;
