use crc::crc32;

// Added to the rotated CRC so framed checksums never collide with plain
// CRC-32C values stored elsewhere in the same data.
const MASK_DELTA: u32 = 0xa282_ead8;

/// Returns the masked CRC-32C (Castagnoli) of `bytes`, as stored in every
/// data chunk of a framed stream.
pub fn masked_crc32c(bytes: &[u8]) -> u32 {
    let crc = crc32::checksum_castagnoli(bytes);
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}
