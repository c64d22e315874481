//! Block-framed LZ4 codec
//!
//! A payload is a sequence of one or more blocks, each laid out as:
//!
//! ```text
//! Offset | Size | Field
//! -------|------|----------------------------------------------
//!   0    |  8   | magic "LZ4Block"
//!   8    |  1   | token: high nibble 0x1 = stored, 0x2 = LZ4
//!   9    |  4   | compressed length (LE)
//!  13    |  4   | decompressed length (LE)
//!  17    |  4   | checksum (LE): xxh32(decoded, seed) & 0x0FFFFFFF
//!  21    |  -   | block bytes
//! ```
//!
//! Every block's magic and checksum are verified on decode; trailing bytes
//! that do not form another complete header are rejected.

use crate::error::CompressionError;
use xxhash_rust::xxh32::xxh32;

/// Fixed per-block magic string
pub const MAGIC: &[u8; 8] = b"LZ4Block";

/// Seed for the per-block xxh32 checksum
pub const XXHASH_SEED: u32 = 0x9747_b28c;

/// Stored checksums keep only the low 28 bits of the hash
pub const CHECKSUM_MASK: u32 = 0x0FFF_FFFF;

/// Default block size used by [`encode`]
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

const HEADER_LEN: usize = 8 + 1 + 4 + 4 + 4;
const TOKEN_STORED: u8 = 0x10;
const TOKEN_COMPRESSED: u8 = 0x20;

fn masked_checksum(data: &[u8]) -> u32 {
    xxh32(data, XXHASH_SEED) & CHECKSUM_MASK
}

fn read_u32_le(buf: &[u8]) -> u32 {
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

/// Decode a framed payload back to its original bytes
pub fn decode(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + HEADER_LEN <= input.len() {
        if &input[i..i + 8] != MAGIC {
            return Err(CompressionError::BadMagic { offset: i });
        }
        let token = input[i + 8];
        let comp_len = read_u32_le(&input[i + 9..]) as usize;
        let decomp_len = read_u32_le(&input[i + 13..]) as usize;
        let stored_checksum = read_u32_le(&input[i + 17..]);
        let start = i + HEADER_LEN;
        if comp_len > input.len() - start {
            return Err(CompressionError::Truncated {
                needed: comp_len,
                remaining: input.len() - start,
            });
        }
        let block = &input[start..start + comp_len];
        let decoded = match token & 0xF0 {
            TOKEN_STORED => block.to_vec(),
            TOKEN_COMPRESSED => lz4_flex::block::decompress(block, decomp_len)
                .map_err(|e| CompressionError::Lz4(e.to_string()))?,
            _ => return Err(CompressionError::UnsupportedToken(token)),
        };
        let checksum = masked_checksum(&decoded);
        if checksum != stored_checksum {
            return Err(CompressionError::ChecksumMismatch {
                expected: stored_checksum,
                actual: checksum,
            });
        }
        out.extend_from_slice(&decoded);
        i = start + comp_len;
    }
    if i != input.len() {
        return Err(CompressionError::DanglingBytes {
            remaining: input.len() - i,
        });
    }
    Ok(out)
}

/// Encode bytes into the framed format using [`DEFAULT_BLOCK_SIZE`]
pub fn encode(input: &[u8]) -> Vec<u8> {
    encode_with_block_size(input, DEFAULT_BLOCK_SIZE)
}

/// Encode bytes into the framed format, chunking at `block_size`
///
/// Each block is LZ4-compressed unless that does not shrink it, in which
/// case it is emitted stored. Empty input produces zero blocks, which
/// [`decode`] accepts as empty.
pub fn encode_with_block_size(input: &[u8], block_size: usize) -> Vec<u8> {
    assert!(block_size > 0, "block size must be positive");
    let level = compression_level(block_size);
    let mut out = Vec::new();
    for chunk in input.chunks(block_size) {
        let compressed = lz4_flex::block::compress(chunk);
        let (token, block): (u8, &[u8]) = if compressed.len() < chunk.len() {
            (TOKEN_COMPRESSED | level, &compressed)
        } else {
            (TOKEN_STORED | level, chunk)
        };
        out.extend_from_slice(MAGIC);
        out.push(token);
        out.extend_from_slice(&(block.len() as u32).to_le_bytes());
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        out.extend_from_slice(&masked_checksum(chunk).to_le_bytes());
        out.extend_from_slice(block);
    }
    out
}

/// Low-nibble token bits: log2 of the block size above the 1 KiB floor
fn compression_level(block_size: usize) -> u8 {
    let mut level = 0u8;
    while level < 0x0F && (1usize << (level + 10)) < block_size {
        level += 1;
    }
    level
}
