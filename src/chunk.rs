use byteorder::{ByteOrder, LittleEndian};

use crate::definitions::*;
use crate::error::{Error, Result};

/// The type tag carried in the first byte of every chunk header.
///
/// The chunk types are specified at
/// https://github.com/google/snappy/blob/master/framing_format.txt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkType {
    /// Section 4.2. Compressed data (chunk type 0x00).
    Compressed,
    /// Section 4.3. Uncompressed data (chunk type 0x01).
    Uncompressed,
    /// Section 4.5. Reserved unskippable chunks (chunk types 0x02-0x7f).
    Reserved(u8),
    /// Section 4.6. Reserved skippable chunks (chunk types 0x80-0xfd).
    Skippable(u8),
    /// Section 4.4. Padding (chunk type 0xfe).
    Padding,
    /// Section 4.1. Stream identifier (chunk type 0xff).
    StreamIdentifier,
}

impl From<u8> for ChunkType {
    fn from(b: u8) -> ChunkType {
        match b {
            CHUNK_TYPE_COMPRESSED_DATA => ChunkType::Compressed,
            CHUNK_TYPE_UNCOMPRESSED_DATA => ChunkType::Uncompressed,
            0x02..=0x7f => ChunkType::Reserved(b),
            0x80..=0xfd => ChunkType::Skippable(b),
            CHUNK_TYPE_PADDING => ChunkType::Padding,
            CHUNK_TYPE_STREAM_IDENTIFIER => ChunkType::StreamIdentifier,
        }
    }
}

impl From<ChunkType> for u8 {
    fn from(t: ChunkType) -> u8 {
        match t {
            ChunkType::Compressed => CHUNK_TYPE_COMPRESSED_DATA,
            ChunkType::Uncompressed => CHUNK_TYPE_UNCOMPRESSED_DATA,
            ChunkType::Reserved(b) | ChunkType::Skippable(b) => b,
            ChunkType::Padding => CHUNK_TYPE_PADDING,
            ChunkType::StreamIdentifier => CHUNK_TYPE_STREAM_IDENTIFIER,
        }
    }
}

/// A decoded 4-byte chunk header: type tag plus the length of the body that
/// follows it (the header itself is not counted).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub chunk_type: ChunkType,
    pub len: usize,
}

impl ChunkHeader {
    pub fn new(chunk_type: ChunkType, len: usize) -> ChunkHeader {
        ChunkHeader { chunk_type, len }
    }

    /// Reads a header from the first 4 bytes of `buf`, or `None` if `buf` is
    /// shorter than a header.
    pub fn decode(buf: &[u8]) -> Option<ChunkHeader> {
        if buf.len() < CHUNK_HEADER_SIZE {
            return None;
        }
        Some(ChunkHeader {
            chunk_type: ChunkType::from(buf[0]),
            len: LittleEndian::read_u24(&buf[1..CHUNK_HEADER_SIZE]) as usize,
        })
    }

    /// Writes the header out. Fails if the length does not fit in 24 bits.
    pub fn encode(&self) -> Result<[u8; CHUNK_HEADER_SIZE]> {
        if self.len > MAX_CHUNK_LEN {
            return Err(Error::IllegalChunkLength { len: self.len });
        }
        let mut buf = [0; CHUNK_HEADER_SIZE];
        buf[0] = self.chunk_type.into();
        LittleEndian::write_u24(&mut buf[1..], self.len as u32);
        Ok(buf)
    }
}

/// Splits the first chunk off `src`, returning its header, its body and
/// whatever follows it.
///
/// Returns `Ok(None)` when fewer than 4 bytes remain. A header whose length
/// runs past the end of `src` is an `IllegalChunkLength` error.
pub fn read_chunk(src: &[u8]) -> Result<Option<(ChunkHeader, &[u8], &[u8])>> {
    let header = match ChunkHeader::decode(src) {
        Some(header) => header,
        None => return Ok(None),
    };
    let rest = &src[CHUNK_HEADER_SIZE..];
    if header.len > rest.len() {
        return Err(Error::IllegalChunkLength { len: header.len });
    }
    let (body, rest) = rest.split_at(header.len);
    Ok(Some((header, body, rest)))
}

/// Splits a data chunk body into its stored checksum and the block bytes.
pub(crate) fn split_checksum(body: &[u8]) -> Result<(u32, &[u8])> {
    if body.len() < CHECK_SUM_SIZE {
        return Err(Error::IllegalChunkLength { len: body.len() });
    }
    let (sum, data) = body.split_at(CHECK_SUM_SIZE);
    Ok((LittleEndian::read_u32(sum), data))
}

/// Header plus checksum of a data chunk whose block (compressed or not) is
/// `data_len` bytes long.
pub(crate) fn data_chunk_prefix(
    chunk_type: ChunkType,
    checksum: u32,
    data_len: usize,
) -> Result<[u8; CHUNK_HEADER_SIZE + CHECK_SUM_SIZE]> {
    let header = ChunkHeader::new(chunk_type, data_len + CHECK_SUM_SIZE).encode()?;
    let mut buf = [0; CHUNK_HEADER_SIZE + CHECK_SUM_SIZE];
    buf[..CHUNK_HEADER_SIZE].copy_from_slice(&header);
    LittleEndian::write_u32(&mut buf[CHUNK_HEADER_SIZE..], checksum);
    Ok(buf)
}
