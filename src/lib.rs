
// Snappy framing format
// https://github.com/google/snappy/blob/master/framing_format.txt
//
// A framed stream is a sequence of chunks. Every chunk begins with a 1-byte
// chunk type and a 3-byte little-endian length of the body that follows.
// The first chunk of a stream is always the stream identifier.

// Definitions
mod definitions {

    pub const CHECK_SUM_SIZE: usize = 4;
    pub const CHUNK_HEADER_SIZE: usize = 4;
    pub const MAGIC_BODY: [u8; 6] = *b"sNaPpY";
    pub const MAGIC_CHUNK: [u8; 10] = [0xff, 0x06, 0x00, 0x00, 0x73, 0x4e, 0x61, 0x50, 0x70, 0x59];

    // https://github.com/google/snappy/blob/master/framing_format.txt says
    // that "the uncompressed data in a chunk must be no longer than 65536 bytes".
    pub const MAX_UNCOMPRESSED_CHUNK_LEN: usize = 65536;

    // Largest value a 3-byte chunk length can hold.
    pub const MAX_CHUNK_LEN: usize = (1 << 24) - 1;

    pub const CHUNK_TYPE_COMPRESSED_DATA: u8 = 0x00;
    pub const CHUNK_TYPE_UNCOMPRESSED_DATA: u8 = 0x01;
    pub const CHUNK_TYPE_PADDING: u8 = 0xfe;
    pub const CHUNK_TYPE_STREAM_IDENTIFIER: u8 = 0xff;
}

pub use self::definitions::{MAGIC_BODY, MAGIC_CHUNK, MAX_UNCOMPRESSED_CHUNK_LEN};

mod error;
pub use self::error::{Error, Result};

// Masked CRC-32C
mod checksum;
pub use self::checksum::masked_crc32c;

// Chunk Header Codec
mod chunk;
pub use self::chunk::{read_chunk, ChunkHeader, ChunkType};

// Raw Block Primitive
mod block;
pub use self::block::{BlockCodec, BlockError, Snappy};

// Framing Compressor
mod compress;
pub use self::compress::{compress, Compressor, Encoder};

// Framing Decompressor
mod decompress;
pub use self::decompress::{decompress, Decoder, DecoderConfig, Decompressor, Trailing};
