//! Compression codecs for region records
//!
//! The container format allows four decodable methods (gzip, zlib, raw, and a
//! block-framed LZ4 variant) plus a named-custom method and four "external"
//! markers whose payloads live outside the container. Decoding the latter
//! five yields an empty buffer; the retention fallback path handles that.

pub mod lz4_block;

use crate::error::CompressionError;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;

/// Compression method byte of a region record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Method 1: gzip
    Gzip,
    /// Method 2: zlib
    Zlib,
    /// Method 3: uncompressed
    Raw,
    /// Method 4: block-framed LZ4 (see [`lz4_block`])
    Lz4,
    /// Method 127: named custom codec, opaque to this crate
    Custom,
    /// Method -127: payload stored externally, gzip
    ExtGzip,
    /// Method -126: payload stored externally, zlib
    ExtZlib,
    /// Method -125: payload stored externally, uncompressed
    ExtRaw,
    /// Method -124: payload stored externally, block-framed LZ4
    ExtLz4,
}

impl CompressionMethod {
    /// Map a record's method byte, `None` for unknown values
    pub fn from_byte(b: i8) -> Option<Self> {
        match b {
            1 => Some(Self::Gzip),
            2 => Some(Self::Zlib),
            3 => Some(Self::Raw),
            4 => Some(Self::Lz4),
            127 => Some(Self::Custom),
            -127 => Some(Self::ExtGzip),
            -126 => Some(Self::ExtZlib),
            -125 => Some(Self::ExtRaw),
            -124 => Some(Self::ExtLz4),
            _ => None,
        }
    }

    /// The wire byte for this method
    pub fn as_byte(self) -> i8 {
        match self {
            Self::Gzip => 1,
            Self::Zlib => 2,
            Self::Raw => 3,
            Self::Lz4 => 4,
            Self::Custom => 127,
            Self::ExtGzip => -127,
            Self::ExtZlib => -126,
            Self::ExtRaw => -125,
            Self::ExtLz4 => -124,
        }
    }

    /// Whether the payload lives in a separate file outside the container
    pub fn is_external(self) -> bool {
        matches!(
            self,
            Self::ExtGzip | Self::ExtZlib | Self::ExtRaw | Self::ExtLz4
        )
    }
}

/// Decompress a record payload according to its method
///
/// Named-custom and external methods carry nothing decodable here and yield
/// an empty buffer.
pub fn decode(method: CompressionMethod, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    match method {
        CompressionMethod::Raw => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let mut out = Vec::new();
            ZlibDecoder::new(data).read_to_end(&mut out)?;
            Ok(out)
        }
        CompressionMethod::Gzip => {
            let mut out = Vec::new();
            GzDecoder::new(data).read_to_end(&mut out)?;
            Ok(out)
        }
        CompressionMethod::Lz4 => lz4_block::decode(data),
        CompressionMethod::Custom
        | CompressionMethod::ExtGzip
        | CompressionMethod::ExtZlib
        | CompressionMethod::ExtRaw
        | CompressionMethod::ExtLz4 => Ok(Vec::new()),
    }
}
