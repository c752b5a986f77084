use snap::raw;
use thiserror::Error;

/// Failure reported by a raw block codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlockError {
    /// The block is larger than the codec can handle.
    #[error("snappy: input buffer (size = {given}) is larger than allowed (size = {max})")]
    TooBig { given: u64, max: u64 },

    /// The output buffer cannot hold the result.
    #[error("snappy: output buffer (size = {given}) is smaller than required (size = {min})")]
    BufferTooSmall { given: u64, min: u64 },

    /// The compressed bytes are malformed.
    #[error("snappy: corrupt input ({0})")]
    Corrupt(String),
}

/// A raw (unframed) block compressor and decompressor.
///
/// The framing layer never hands a codec more than 65536 bytes at once.
pub trait BlockCodec {
    /// Worst-case compressed size of a block of `src_len` bytes.
    fn max_compressed_len(&self, src_len: usize) -> usize;

    /// Compresses `src` into `dst` and returns the number of bytes written.
    /// `dst` is at least `max_compressed_len(src.len())` bytes long.
    fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError>;

    /// Reads the decompressed length of a block without decompressing it.
    fn decompressed_len(&self, src: &[u8]) -> Result<usize, BlockError>;

    /// Decompresses `src` into `dst` and returns the number of bytes written.
    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError>;
}

/// The Snappy block format, backed by the `snap` crate.
pub struct Snappy {
    enc: raw::Encoder,
    dec: raw::Decoder,
}

impl Snappy {
    pub fn new() -> Snappy {
        Snappy {
            enc: raw::Encoder::new(),
            dec: raw::Decoder::new(),
        }
    }
}

impl Default for Snappy {
    fn default() -> Snappy {
        Snappy::new()
    }
}

impl BlockCodec for Snappy {
    fn max_compressed_len(&self, src_len: usize) -> usize {
        raw::max_compress_len(src_len)
    }

    fn compress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        self.enc.compress(src, dst).map_err(BlockError::from)
    }

    fn decompressed_len(&self, src: &[u8]) -> Result<usize, BlockError> {
        raw::decompress_len(src).map_err(BlockError::from)
    }

    fn decompress(&mut self, src: &[u8], dst: &mut [u8]) -> Result<usize, BlockError> {
        self.dec.decompress(src, dst).map_err(BlockError::from)
    }
}

impl From<snap::Error> for BlockError {
    fn from(err: snap::Error) -> BlockError {
        match err {
            snap::Error::TooBig { given, max } => BlockError::TooBig { given, max },
            snap::Error::BufferTooSmall { given, min } => BlockError::BufferTooSmall { given, min },
            err => BlockError::Corrupt(err.to_string()),
        }
    }
}
