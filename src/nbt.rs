//! Minimal NBT parser for the forced-chunk pin list
//!
//! Just enough of the tag-tree format to read a dimension's persisted pin
//! list (`data/chunks.dat`): a gzip-compressed stream whose root must be a
//! compound. Two schema generations both contribute coordinates and are
//! unioned without deduplication:
//!
//! 1. `data.Forced`: a flat long-array read pairwise as `(x, z)`
//! 2. `data.tickets`: a list of compounds; entries whose `type` equals
//!    `"minecraft:forced"` contribute their 2-element `chunk_pos` int-array
//!
//! A missing file is an empty result; a malformed file is a parse error for
//! the caller to escalate (strict) or swallow to empty (lenient).

use crate::error::NbtError;
use crate::fs::FileSystem;
use flate2::read::GzDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_LONG: u8 = 4;
const TAG_FLOAT: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_BYTE_ARRAY: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_LIST: u8 = 9;
const TAG_COMPOUND: u8 = 10;
const TAG_INT_ARRAY: u8 = 11;
const TAG_LONG_ARRAY: u8 = 12;

/// Ticket type marking an administratively pinned chunk
pub const FORCED_TICKET_TYPE: &str = "minecraft:forced";

/// A decoded NBT payload
///
/// Closed over exactly the tag kinds the format defines so extraction code
/// can match exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// TAG_Byte
    Byte(i8),
    /// TAG_Short
    Short(i16),
    /// TAG_Int
    Int(i32),
    /// TAG_Long
    Long(i64),
    /// TAG_Float
    Float(f32),
    /// TAG_Double
    Double(f64),
    /// TAG_Byte_Array
    ByteArray(Vec<u8>),
    /// TAG_String
    String(String),
    /// TAG_List
    List(Vec<Value>),
    /// TAG_Compound
    Compound(HashMap<String, Value>),
    /// TAG_Int_Array
    IntArray(Vec<i32>),
    /// TAG_Long_Array
    LongArray(Vec<i64>),
}

fn read_exact<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N], NbtError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8, NbtError> {
    Ok(read_exact::<_, 1>(r)?[0])
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32, NbtError> {
    Ok(i32::from_be_bytes(read_exact(r)?))
}

fn read_utf<R: Read>(r: &mut R) -> Result<String, NbtError> {
    let len = u16::from_be_bytes(read_exact(r)?) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn read_payload<R: Read>(r: &mut R, tag: u8) -> Result<Value, NbtError> {
    match tag {
        TAG_BYTE => Ok(Value::Byte(read_u8(r)? as i8)),
        TAG_SHORT => Ok(Value::Short(i16::from_be_bytes(read_exact(r)?))),
        TAG_INT => Ok(Value::Int(read_i32(r)?)),
        TAG_LONG => Ok(Value::Long(i64::from_be_bytes(read_exact(r)?))),
        TAG_FLOAT => Ok(Value::Float(f32::from_be_bytes(read_exact(r)?))),
        TAG_DOUBLE => Ok(Value::Double(f64::from_be_bytes(read_exact(r)?))),
        TAG_BYTE_ARRAY => {
            let len = read_i32(r)?.max(0) as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            Ok(Value::ByteArray(buf))
        }
        TAG_STRING => Ok(Value::String(read_utf(r)?)),
        TAG_LIST => {
            let elem_tag = read_u8(r)?;
            let len = read_i32(r)?.max(0) as usize;
            let mut list = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                list.push(read_payload(r, elem_tag)?);
            }
            Ok(Value::List(list))
        }
        TAG_COMPOUND => Ok(Value::Compound(read_compound(r)?)),
        TAG_INT_ARRAY => {
            let len = read_i32(r)?.max(0) as usize;
            let mut arr = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                arr.push(read_i32(r)?);
            }
            Ok(Value::IntArray(arr))
        }
        TAG_LONG_ARRAY => {
            let len = read_i32(r)?.max(0) as usize;
            let mut arr = Vec::with_capacity(len.min(1 << 16));
            for _ in 0..len {
                arr.push(i64::from_be_bytes(read_exact(r)?));
            }
            Ok(Value::LongArray(arr))
        }
        other => Err(NbtError::UnsupportedTag(other)),
    }
}

fn read_compound<R: Read>(r: &mut R) -> Result<HashMap<String, Value>, NbtError> {
    let mut map = HashMap::new();
    loop {
        let tag = read_u8(r)?;
        if tag == TAG_END {
            return Ok(map);
        }
        let name = read_utf(r)?;
        let value = read_payload(r, tag)?;
        // duplicate names: last writer wins
        map.insert(name, value);
    }
}

/// Parse a gzip-compressed NBT stream down to its root compound body
pub fn parse_gzip(bytes: &[u8]) -> Result<HashMap<String, Value>, NbtError> {
    let mut r = GzDecoder::new(bytes);
    let root_tag = read_u8(&mut r)?;
    if root_tag != TAG_COMPOUND {
        return Err(NbtError::RootNotCompound(root_tag));
    }
    read_utf(&mut r)?; // root name, unused
    read_compound(&mut r)
}

/// Extract pinned coordinate pairs from a parsed pin-list root
///
/// Unions both schema generations; duplicates are kept (harmless to the
/// downstream membership check).
pub fn extract_forced_pairs(root: &HashMap<String, Value>) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    let Some(Value::Compound(data)) = root.get("data") else {
        return out;
    };
    if let Some(Value::LongArray(forced)) = data.get("Forced") {
        let mut i = 0;
        while i + 1 < forced.len() {
            out.push((forced[i] as i32, forced[i + 1] as i32));
            i += 2;
        }
    }
    if let Some(Value::List(tickets)) = data.get("tickets") {
        for ticket in tickets {
            let Value::Compound(entry) = ticket else {
                continue;
            };
            let Some(Value::String(ticket_type)) = entry.get("type") else {
                continue;
            };
            if ticket_type != FORCED_TICKET_TYPE {
                continue;
            }
            if let Some(Value::IntArray(pos)) = entry.get("chunk_pos") {
                if pos.len() == 2 {
                    out.push((pos[0], pos[1]));
                }
            }
        }
    }
    out
}

/// Read a dimension's pinned coordinates from `<dimension>/data/chunks.dat`
///
/// Missing file is an empty result, not an error.
pub fn read_forced_chunks(
    fs: &dyn FileSystem,
    dimension: &Path,
) -> Result<Vec<(i32, i32)>, NbtError> {
    let file = dimension.join("data").join("chunks.dat");
    let Some(bytes) = fs.read(&file) else {
        return Ok(Vec::new());
    };
    let root = parse_gzip(&bytes)?;
    Ok(extract_forced_pairs(&root))
}
