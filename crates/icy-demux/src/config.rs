//! Configuration constants for the demultiplexer

/// ICY wire-format constants
pub mod icy {
    /// Metadata length byte is multiplied by this to get the block size
    pub const METADATA_BLOCK_UNIT: usize = 16;

    /// Key carrying the now-playing title
    pub const STREAM_TITLE_KEY: &str = "StreamTitle";

    /// Key carrying the station or track URL
    pub const STREAM_URL_KEY: &str = "StreamUrl";

    /// Separator between metadata entries
    pub const ENTRY_SEPARATOR: char = ';';

    /// Separator between key and value inside an entry
    pub const KEY_VALUE_SEPARATOR: char = '=';
}

/// Pull reader configuration
pub mod reader {
    /// Chunk size for reads from the inner source (bytes)
    pub const READ_CHUNK_SIZE: usize = 8 * 1024;
}

/// Command line defaults
pub mod cli {
    /// Default size of each read fed to the demuxer (bytes)
    pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024;
}
