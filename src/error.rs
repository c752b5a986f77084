use std::io;
use std::result;

use thiserror::Error;

use crate::block::BlockError;

pub type Result<T> = result::Result<T, Error>;

/// Everything that can go wrong while framing or unframing a stream.
///
/// Every variant is fatal to the encode or decode that produced it. Output
/// appended by earlier chunks is dropped along with the error.
#[derive(Debug, Error)]
pub enum Error {
    /// The stream does not start with the identifier frame, or a repeated
    /// identifier chunk carries the wrong magic.
    #[error("snappy: bad stream identifier")]
    BadIdentifier,

    /// The checksum stored in a chunk does not match its contents.
    #[error("snappy: bad checksum (expected {expected:#010x}, got {actual:#010x})")]
    BadChecksum { expected: u32, actual: u32 },

    /// A chunk is too short to hold its checksum, too long to be a block, or
    /// its header claims more bytes than the stream holds.
    #[error("snappy: illegal chunk length {len}")]
    IllegalChunkLength { len: usize },

    /// A chunk type from the reserved unskippable range (0x02-0x7f).
    #[error("snappy: unsupported chunk type {0:#04x}")]
    UnsupportedChunkType(u8),

    /// Bytes too short to be a chunk header were left at the end of the
    /// stream and the decoder is strict about them.
    #[error("snappy: {remaining} trailing bytes after last chunk")]
    TruncatedStream { remaining: usize },

    /// The raw block codec failed.
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
