//! Error types for icy-demux
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Main error type for the demultiplexer
#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("Invalid metadata interval: {0} (must be between 1 and {max})", max = i64::MAX)]
    InvalidInterval(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for icy-demux
pub type Result<T> = std::result::Result<T, DemuxError>;
