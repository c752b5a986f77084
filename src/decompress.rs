use std::cmp;
use std::io;
use std::io::{BufReader, ErrorKind, Read};

use log::{debug, trace, warn};

use crate::block::{BlockCodec, Snappy};
use crate::checksum::masked_crc32c;
use crate::chunk::{read_chunk, split_checksum, ChunkHeader, ChunkType};
use crate::definitions::*;
use crate::error::{Error, Result};

/// What to do with 1 to 3 bytes left over after the last whole chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trailing {
	/// Ignore them (with a warning in the log).
	Lenient,
	/// Fail with `Error::TruncatedStream`.
	Strict,
}

impl Default for Trailing {
	fn default() -> Trailing {
		Trailing::Lenient
	}
}

/// Decoder settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecoderConfig {
	pub trailing: Trailing,
}

impl DecoderConfig {
	pub fn new() -> DecoderConfig {
		DecoderConfig::default()
	}

	pub fn trailing(mut self, trailing: Trailing) -> DecoderConfig {
		self.trailing = trailing;
		self
	}
}

// Handles one chunk. Data chunks are checked and decoded into `decoded`
// and their length returned; every other chunk yields `None`.
fn read_block<C: BlockCodec>(
	codec: &mut C,
	header: ChunkHeader,
	body: &[u8],
	decoded: &mut [u8],
) -> Result<Option<usize>> {
	// The chunk types are specified at
	// https://github.com/google/snappy/blob/master/framing_format.txt
	match header.chunk_type {
		ChunkType::Compressed => {
			let (check_sum, data) = split_checksum(body)?;

			// Check Decompressed Length before touching the data
			let n = codec.decompressed_len(data)?;
			if n > MAX_UNCOMPRESSED_CHUNK_LEN {
				return Err(Error::IllegalChunkLength { len: n });
			}
			let n = codec.decompress(data, &mut decoded[..n])?;

			verify(check_sum, &decoded[..n])?;
			trace!("snappy: compressed chunk, {} -> {} bytes", data.len(), n);
			Ok(Some(n))
		}
		ChunkType::Uncompressed => {
			let (check_sum, data) = split_checksum(body)?;
			if data.len() > MAX_UNCOMPRESSED_CHUNK_LEN {
				return Err(Error::IllegalChunkLength { len: data.len() });
			}

			verify(check_sum, data)?;
			decoded[..data.len()].copy_from_slice(data);
			trace!("snappy: uncompressed chunk, {} bytes", data.len());
			Ok(Some(data.len()))
		}
		ChunkType::StreamIdentifier => {
			if body != MAGIC_BODY {
				return Err(Error::BadIdentifier);
			}
			debug!("snappy: skipping repeated stream identifier");
			Ok(None)
		}
		ChunkType::Reserved(b) => Err(Error::UnsupportedChunkType(b)),
		ChunkType::Padding | ChunkType::Skippable(_) => {
			debug!("snappy: skipping {:?} chunk of {} bytes", header.chunk_type, header.len);
			Ok(None)
		}
	}
}

fn verify(expected: u32, data: &[u8]) -> Result<()> {
	let actual = masked_crc32c(data);
	if actual != expected {
		return Err(Error::BadChecksum { expected, actual });
	}
	Ok(())
}

fn trailing_bytes(config: &DecoderConfig, remaining: usize) -> Result<()> {
	match config.trailing {
		Trailing::Strict => Err(Error::TruncatedStream { remaining }),
		Trailing::Lenient => {
			warn!("snappy: ignoring {} trailing bytes", remaining);
			Ok(())
		}
	}
}

/// Unframes whole buffers in memory.
pub struct Decoder<C: BlockCodec = Snappy> {
	codec: C,
	config: DecoderConfig,
	decoded: Vec<u8>,
}

impl Decoder<Snappy> {
	pub fn new() -> Decoder<Snappy> {
		Decoder::with_config(DecoderConfig::default())
	}

	pub fn with_config(config: DecoderConfig) -> Decoder<Snappy> {
		Decoder::with_codec(Snappy::new(), config)
	}
}

impl Default for Decoder<Snappy> {
	fn default() -> Decoder<Snappy> {
		Decoder::new()
	}
}

impl<C: BlockCodec> Decoder<C> {
	pub fn with_codec(codec: C, config: DecoderConfig) -> Decoder<C> {
		Decoder {
			codec,
			config,
			decoded: vec![0; MAX_UNCOMPRESSED_CHUNK_LEN],
		}
	}

	/// Decodes a complete framed stream.
	///
	/// Returns `Ok(None)` for a valid stream that carries no data, such as
	/// the bare identifier frame.
	pub fn decode(&mut self, src: &[u8]) -> Result<Option<Vec<u8>>> {
		if !src.starts_with(&MAGIC_CHUNK) {
			return Err(Error::BadIdentifier);
		}

		let mut rest = &src[MAGIC_CHUNK.len()..];
		let mut out = Vec::new();
		while let Some((header, body, next)) = read_chunk(rest)? {
			if let Some(n) = read_block(&mut self.codec, header, body, &mut self.decoded)? {
				out.extend_from_slice(&self.decoded[..n]);
			}
			rest = next;
		}
		if !rest.is_empty() {
			trailing_bytes(&self.config, rest.len())?;
		}

		if out.is_empty() {
			Ok(None)
		} else {
			Ok(Some(out))
		}
	}
}

/// Unframes `src` with the default Snappy codec and lenient trailing bytes.
pub fn decompress(src: &[u8]) -> Result<Option<Vec<u8>>> {
	Decoder::new().decode(src)
}

/// A reader that unframes a stream one chunk at a time.
///
/// Each chunk is read and verified in full before any of it is handed out.
pub struct Decompressor<R: Read, C: BlockCodec = Snappy> {
	inner: BufReader<R>,
	codec: C,
	config: DecoderConfig,
	// Raw chunk body as read from the stream
	body: Vec<u8>,
	decoded: Vec<u8>,
	// decoded[i:j] contains decoded bytes that have not yet been passed on.
	i: usize,
	j: usize,
	read_header: bool,
	eof: bool,
}

impl<R: Read> Decompressor<R> {
	pub fn new(inner: R) -> Decompressor<R> {
		Decompressor::with_config(inner, DecoderConfig::default())
	}

	pub fn with_config(inner: R, config: DecoderConfig) -> Decompressor<R> {
		Decompressor::with_codec(inner, Snappy::new(), config)
	}
}

impl<R: Read, C: BlockCodec> Decompressor<R, C> {
	pub fn with_codec(inner: R, codec: C, config: DecoderConfig) -> Decompressor<R, C> {
		Decompressor {
			inner: BufReader::new(inner),
			codec,
			config,
			body: Vec::new(),
			decoded: vec![0; MAX_UNCOMPRESSED_CHUNK_LEN],
			i: 0,
			j: 0,
			read_header: false,
			eof: false,
		}
	}

	// Consumes the next chunk. Data lands in decoded[i:j].
	fn next_chunk(&mut self) -> Result<()> {
		if !self.read_header {
			let mut magic = [0; MAGIC_CHUNK.len()];
			match self.inner.read_exact(&mut magic) {
				Ok(()) => {}
				Err(ref err) if err.kind() == ErrorKind::UnexpectedEof => {
					return Err(Error::BadIdentifier)
				}
				Err(err) => return Err(err.into()),
			}
			if magic != MAGIC_CHUNK {
				return Err(Error::BadIdentifier);
			}
			self.read_header = true;
		}

		let mut buf = [0; CHUNK_HEADER_SIZE];
		let got = read_full(&mut self.inner, &mut buf)?;
		let header = match ChunkHeader::decode(&buf[..got]) {
			Some(header) => header,
			None => {
				if got > 0 {
					trailing_bytes(&self.config, got)?;
				}
				self.eof = true;
				return Ok(());
			}
		};

		// Bound the body before allocating for it
		let max_len = match header.chunk_type {
			ChunkType::Compressed => {
				CHECK_SUM_SIZE + self.codec.max_compressed_len(MAX_UNCOMPRESSED_CHUNK_LEN)
			}
			ChunkType::Uncompressed => CHECK_SUM_SIZE + MAX_UNCOMPRESSED_CHUNK_LEN,
			ChunkType::StreamIdentifier => {
				if header.len != MAGIC_BODY.len() {
					return Err(Error::BadIdentifier);
				}
				MAGIC_BODY.len()
			}
			ChunkType::Reserved(b) => return Err(Error::UnsupportedChunkType(b)),
			ChunkType::Padding | ChunkType::Skippable(_) => {
				// Streamed past rather than buffered
				let mut body = (&mut self.inner).take(header.len as u64);
				let skipped = io::copy(&mut body, &mut io::sink())?;
				if skipped != header.len as u64 {
					return Err(Error::IllegalChunkLength { len: header.len });
				}
				debug!("snappy: skipping {:?} chunk of {} bytes", header.chunk_type, header.len);
				return Ok(());
			}
		};
		if header.len > max_len {
			return Err(Error::IllegalChunkLength { len: header.len });
		}

		self.body.resize(header.len, 0);
		match self.inner.read_exact(&mut self.body) {
			Ok(()) => {}
			Err(ref err) if err.kind() == ErrorKind::UnexpectedEof => {
				return Err(Error::IllegalChunkLength { len: header.len })
			}
			Err(err) => return Err(err.into()),
		}

		if let Some(n) = read_block(&mut self.codec, header, &self.body, &mut self.decoded)? {
			self.i = 0;
			self.j = n;
		}
		Ok(())
	}
}

impl<R: Read, C: BlockCodec> Read for Decompressor<R, C> {
	// Source (Inner) Buffer into Destination Buffer, returning how many bytes were read.
	fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
		loop {
			if self.i < self.j {
				let n = cmp::min(dst.len(), self.j - self.i);
				dst[..n].copy_from_slice(&self.decoded[self.i..self.i + n]);
				self.i += n;
				return Ok(n);
			}
			if self.eof {
				return Ok(0);
			}
			self.next_chunk()?;
		}
	}
}

// Like read_exact, but a clean end of stream just returns a short count.
fn read_full<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
	let mut n = 0;
	while n < buf.len() {
		match src.read(&mut buf[n..]) {
			Ok(0) => break,
			Ok(m) => n += m,
			Err(ref err) if err.kind() == ErrorKind::Interrupted => {}
			Err(err) => return Err(err),
		}
	}
	Ok(n)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::block::BlockError;
	use crate::chunk::data_chunk_prefix;
	use crate::compress::compress;

	fn uncompressed_chunk(data: &[u8]) -> Vec<u8> {
		let mut chunk = data_chunk_prefix(ChunkType::Uncompressed, masked_crc32c(data), data.len())
			.unwrap()
			.to_vec();
		chunk.extend_from_slice(data);
		chunk
	}

	fn stream(chunks: &[&[u8]]) -> Vec<u8> {
		let mut out = MAGIC_CHUNK.to_vec();
		for chunk in chunks {
			out.extend_from_slice(chunk);
		}
		out
	}

	fn read_all(src: &[u8], config: DecoderConfig) -> io::Result<Vec<u8>> {
		let mut out = Vec::new();
		Decompressor::with_config(src, config).read_to_end(&mut out)?;
		Ok(out)
	}

	struct AlwaysFails;

	impl BlockCodec for AlwaysFails {
		fn max_compressed_len(&self, src_len: usize) -> usize {
			src_len
		}

		fn compress(&mut self, _: &[u8], _: &mut [u8]) -> std::result::Result<usize, BlockError> {
			Err(BlockError::Corrupt("no".to_string()))
		}

		fn decompressed_len(&self, _: &[u8]) -> std::result::Result<usize, BlockError> {
			Ok(1)
		}

		fn decompress(&mut self, _: &[u8], _: &mut [u8]) -> std::result::Result<usize, BlockError> {
			Err(BlockError::Corrupt("no".to_string()))
		}
	}

	#[test]
	fn identifier_only() {
		assert_eq!(decompress(&MAGIC_CHUNK).unwrap(), None);
		assert_eq!(read_all(&MAGIC_CHUNK, DecoderConfig::new()).unwrap(), b"");
	}

	#[test]
	fn missing_identifier() {
		match decompress(b"") {
			Err(Error::BadIdentifier) => {}
			other => panic!("unexpected {:?}", other),
		}
		let mut src = compress(b"hello").unwrap();
		src[4] = b'S';
		match decompress(&src) {
			Err(Error::BadIdentifier) => {}
			other => panic!("unexpected {:?}", other),
		}
		let err = read_all(&src, DecoderConfig::new()).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidData);
	}

	#[test]
	fn repeated_identifier() {
		let src = stream(&[
			&uncompressed_chunk(b"ab")[..],
			&MAGIC_CHUNK[..],
			&uncompressed_chunk(b"cd")[..],
		]);
		assert_eq!(decompress(&src).unwrap().unwrap(), b"abcd");
		assert_eq!(read_all(&src, DecoderConfig::new()).unwrap(), b"abcd");

		let bad = stream(&[&[0xff, 0x06, 0x00, 0x00, b's', b'n', b'a', b'p', b'p', b'y'][..]]);
		match decompress(&bad) {
			Err(Error::BadIdentifier) => {}
			other => panic!("unexpected {:?}", other),
		}
		assert!(read_all(&bad, DecoderConfig::new()).is_err());
	}

	#[test]
	fn skips_padding_and_skippable() {
		let padding: [u8; 7] = [0xfe, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00];
		let skippable: [u8; 6] = [0x80, 0x02, 0x00, 0x00, 0xde, 0xad];
		let src = stream(&[
			&uncompressed_chunk(b"one")[..],
			&padding[..],
			&skippable[..],
			&uncompressed_chunk(b"two")[..],
		]);
		assert_eq!(decompress(&src).unwrap().unwrap(), b"onetwo");
		assert_eq!(read_all(&src, DecoderConfig::new()).unwrap(), b"onetwo");
	}

	#[test]
	fn reserved_chunk_type() {
		let src = stream(&[&[0x02, 0x00, 0x00, 0x00][..]]);
		match decompress(&src) {
			Err(Error::UnsupportedChunkType(0x02)) => {}
			other => panic!("unexpected {:?}", other),
		}
		assert!(read_all(&src, DecoderConfig::new()).is_err());
	}

	#[test]
	fn body_past_end() {
		let mut chunk = uncompressed_chunk(b"abcdef");
		chunk.truncate(chunk.len() - 2);
		let src = stream(&[&chunk[..]]);
		match decompress(&src) {
			Err(Error::IllegalChunkLength { len: 10 }) => {}
			other => panic!("unexpected {:?}", other),
		}
		assert!(read_all(&src, DecoderConfig::new()).is_err());
	}

	#[test]
	fn chunk_shorter_than_checksum() {
		let src = stream(&[&[0x01, 0x02, 0x00, 0x00, 0xaa, 0xbb][..]]);
		match decompress(&src) {
			Err(Error::IllegalChunkLength { len: 2 }) => {}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn oversize_uncompressed() {
		let data = vec![0u8; MAX_UNCOMPRESSED_CHUNK_LEN + 1];
		let src = stream(&[&uncompressed_chunk(&data)[..]]);
		match decompress(&src) {
			Err(Error::IllegalChunkLength { len }) => assert_eq!(len, data.len()),
			other => panic!("unexpected {:?}", other),
		}
		assert!(read_all(&src, DecoderConfig::new()).is_err());
	}

	#[test]
	fn oversize_compressed() {
		let data = vec![b'z'; MAX_UNCOMPRESSED_CHUNK_LEN + 1];
		let packed = snap::raw::Encoder::new().compress_vec(&data).unwrap();
		let mut chunk = data_chunk_prefix(ChunkType::Compressed, masked_crc32c(&data), packed.len())
			.unwrap()
			.to_vec();
		chunk.extend_from_slice(&packed);
		match decompress(&stream(&[&chunk[..]])) {
			Err(Error::IllegalChunkLength { len }) => assert_eq!(len, data.len()),
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn bad_checksum() {
		let mut chunk = uncompressed_chunk(b"payload");
		chunk[4] ^= 0x01;
		match decompress(&stream(&[&chunk[..]])) {
			Err(Error::BadChecksum { expected, actual }) => {
				assert_eq!(actual, masked_crc32c(b"payload"));
				assert_eq!(expected, actual ^ 0x01);
			}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn codec_failure() {
		let src = stream(&[&[0x00, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00][..]]);
		let mut dec = Decoder::with_codec(AlwaysFails, DecoderConfig::new());
		match dec.decode(&src) {
			Err(Error::Block(BlockError::Corrupt(_))) => {}
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn trailing_bytes_lenient() {
		let mut src = compress(b"abc").unwrap();
		src.extend_from_slice(&[0x00, 0x01, 0x02]);
		assert_eq!(decompress(&src).unwrap().unwrap(), b"abc");
		assert_eq!(read_all(&src, DecoderConfig::new()).unwrap(), b"abc");
	}

	#[test]
	fn trailing_bytes_strict() {
		let strict = DecoderConfig::new().trailing(Trailing::Strict);
		let mut src = compress(b"abc").unwrap();
		src.push(0x00);
		match Decoder::with_config(strict).decode(&src) {
			Err(Error::TruncatedStream { remaining: 1 }) => {}
			other => panic!("unexpected {:?}", other),
		}
		assert!(read_all(&src, strict).is_err());

		// a clean end is fine either way
		let src = compress(b"abc").unwrap();
		assert_eq!(Decoder::with_config(strict).decode(&src).unwrap().unwrap(), b"abc");
		assert_eq!(read_all(&src, strict).unwrap(), b"abc");
	}

	#[test]
	fn small_reads() {
		let data = b"The quick red fox jumped over the lazy dog".repeat(2000);
		let src = compress(&data).unwrap();
		let mut dec = Decompressor::new(&src[..]);
		let mut out = Vec::new();
		let mut buf = [0; 7];
		loop {
			let n = dec.read(&mut buf).unwrap();
			if n == 0 {
				break;
			}
			out.extend_from_slice(&buf[..n]);
		}
		assert_eq!(out, data);
	}
}
