//! Error types for the optimizer

use thiserror::Error;

/// Main error type for the optimizer
///
/// Only a small set of failures propagates as `Err` out of a run: a broken
/// in-place replacement and misconfiguration detected before any work starts.
/// Everything operational (damaged region files, per-record decode failures,
/// unwritable siblings) is recorded into the run report instead and never
/// aborts the surrounding loop.
#[derive(Error, Debug)]
pub enum Error {
    /// Region container error
    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    /// NBT parse error
    #[error("NBT error: {0}")]
    Nbt(#[from] NbtError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// In-place replacement failed after originals may have been overwritten.
    ///
    /// This is the single unrecoverable failure mode: continuing best-effort
    /// could corrupt the source world further, so it always propagates.
    #[error("In-place replacement failed: {0}")]
    InPlaceReplacement(String),
}

/// Region container errors
#[derive(Error, Debug)]
pub enum RegionError {
    /// File name does not match `r.<x>.<z>.mca`
    #[error("Invalid region filename: {0}")]
    InvalidFilename(String),

    /// Container is shorter than the two 4096-byte header tables
    #[error("Truncated region header: {len} bytes")]
    TruncatedHeader {
        /// Actual container length
        len: u64,
    },

    /// A non-empty slot's record range extends past the end of the container
    #[error("Slot {index} range [{offset}, +{length}) exceeds container length {file_len}")]
    OutOfBounds {
        /// Slot index (0..1024)
        index: usize,
        /// Record byte offset
        offset: u64,
        /// Record byte length
        length: u64,
        /// Actual container length
        file_len: u64,
    },

    /// Unknown compression method byte in a record header
    #[error("Unknown compression method: {0}")]
    UnknownCompression(i8),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compression codec errors
#[derive(Error, Debug)]
pub enum CompressionError {
    /// Block does not start with the `LZ4Block` magic
    #[error("Invalid LZ4 block magic at offset {offset}")]
    BadMagic {
        /// Byte offset of the offending block header
        offset: usize,
    },

    /// Block token selects neither stored nor compressed
    #[error("Unsupported LZ4 block token: {0:#04x}")]
    UnsupportedToken(u8),

    /// Block claims more bytes than remain in the buffer
    #[error("LZ4 block truncated: need {needed} bytes, {remaining} remain")]
    Truncated {
        /// Declared compressed length
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Checksum verification failed
    #[error("LZ4 checksum mismatch: expected {expected:#09x}, got {actual:#09x}")]
    ChecksumMismatch {
        /// The masked checksum stored in the block header
        expected: u32,
        /// The masked checksum computed over the decoded bytes
        actual: u32,
    },

    /// Bytes after the last block do not form another complete header
    #[error("Dangling bytes after last LZ4 block: {remaining}")]
    DanglingBytes {
        /// Leftover byte count
        remaining: usize,
    },

    /// Raw LZ4 block decompression failed
    #[error("LZ4 decompression failed: {0}")]
    Lz4(String),

    /// zlib/gzip inflate failed
    #[error("Inflate failed: {0}")]
    Inflate(#[from] std::io::Error),
}

/// NBT parse errors
#[derive(Error, Debug)]
pub enum NbtError {
    /// Root tag is not a compound
    #[error("Root tag must be a compound, got {0}")]
    RootNotCompound(u8),

    /// Unknown tag id in the stream
    #[error("Unsupported tag: {0}")]
    UnsupportedTag(u8),

    /// Stream ended mid-payload
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
