use std::io;
use std::io::{BufWriter, Write};

use log::trace;

use crate::block::{BlockCodec, Snappy};
use crate::checksum::masked_crc32c;
use crate::chunk::{data_chunk_prefix, ChunkType};
use crate::definitions::*;
use crate::error::Result;

/// Frames whole buffers in memory.
///
/// The input is split into blocks of at most 65536 bytes. Each block is
/// stored compressed if that makes it strictly smaller, and verbatim
/// otherwise.
pub struct Encoder<C: BlockCodec = Snappy> {
    codec: C,
    // Scratch for one compressed block, sized to the codec's worst case.
    buf_body: Vec<u8>,
}

impl Encoder<Snappy> {
    pub fn new() -> Encoder<Snappy> {
        Encoder::with_codec(Snappy::new())
    }
}

impl Default for Encoder<Snappy> {
    fn default() -> Encoder<Snappy> {
        Encoder::new()
    }
}

impl<C: BlockCodec> Encoder<C> {
    pub fn with_codec(codec: C) -> Encoder<C> {
        let buf_body = vec![0; codec.max_compressed_len(MAX_UNCOMPRESSED_CHUNK_LEN)];
        Encoder { codec, buf_body }
    }

    /// Returns the framed form of `src`: the stream identifier followed by
    /// one data chunk per block. Empty input yields the identifier alone.
    pub fn encode(&mut self, src: &[u8]) -> Result<Vec<u8>> {
        let blocks = (src.len() + MAX_UNCOMPRESSED_CHUNK_LEN - 1) / MAX_UNCOMPRESSED_CHUNK_LEN;
        let mut dst = Vec::with_capacity(
            MAGIC_CHUNK.len() + src.len() + blocks * (CHUNK_HEADER_SIZE + CHECK_SUM_SIZE),
        );
        dst.extend_from_slice(&MAGIC_CHUNK);
        for block in src.chunks(MAX_UNCOMPRESSED_CHUNK_LEN) {
            self.write_block(block, &mut dst)?;
        }
        Ok(dst)
    }

    // Writes one data chunk for `block` (at most 65536 bytes) to `dst`.
    fn write_block<W: Write>(&mut self, block: &[u8], dst: &mut W) -> Result<()> {
        // Checksum always covers the uncompressed bytes
        let checksum = masked_crc32c(block);

        let n = self.codec.compress(block, &mut self.buf_body)?;
        let (chunk_type, chunk_body) = if n < block.len() {
            (ChunkType::Compressed, &self.buf_body[..n])
        } else {
            (ChunkType::Uncompressed, block)
        };

        trace!(
            "snappy: framing {} byte block as {:?} ({} bytes)",
            block.len(),
            chunk_type,
            chunk_body.len()
        );

        dst.write_all(&data_chunk_prefix(chunk_type, checksum, chunk_body.len())?)?;
        dst.write_all(chunk_body)?;
        Ok(())
    }
}

/// Frames `src` with the default Snappy codec.
pub fn compress(src: &[u8]) -> Result<Vec<u8>> {
    Encoder::new().encode(src)
}

/// A writer that frames everything written to it.
///
/// Each call to `write` is split into blocks and every block becomes one
/// chunk, so many tiny writes produce many tiny chunks. The stream identifier
/// is written before the first chunk, or on `flush` if nothing was written.
pub struct Compressor<W: Write, C: BlockCodec = Snappy> {
    inner: BufWriter<W>,
    enc: Encoder<C>,
    wrote_header: bool,
}

impl<W: Write> Compressor<W> {
    pub fn new(inner: W) -> Compressor<W> {
        Compressor::with_codec(inner, Snappy::new())
    }
}

impl<W: Write, C: BlockCodec> Compressor<W, C> {
    pub fn with_codec(inner: W, codec: C) -> Compressor<W, C> {
        Compressor {
            inner: BufWriter::new(inner),
            enc: Encoder::with_codec(codec),
            wrote_header: false,
        }
    }

    /// Flushes everything framed so far and hands back the writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.write_header()?;
        self.inner.into_inner().map_err(|err| err.into_error())
    }

    fn write_header(&mut self) -> io::Result<()> {
        if !self.wrote_header {
            // Write Stream Literal
            self.inner.write_all(&MAGIC_CHUNK)?;
            self.wrote_header = true;
        }
        Ok(())
    }
}

impl<W: Write, C: BlockCodec> Write for Compressor<W, C> {
    // Source Buffer -> Destination (Inner) Buffer
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.write_header()?;
        for block in src.chunks(MAX_UNCOMPRESSED_CHUNK_LEN) {
            self.enc.write_block(block, &mut self.inner)?;
        }
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.write_header()?;
        self.inner.flush()
    }
}
