//! Fixed-size block helpers shared by the CMAC engine.
//!
//! All helpers are pure: they take blocks by reference and return new ones.

/// AES block size in bytes. Keys are the same width.
pub const BLOCK_SIZE: usize = 16;

/// A single 128-bit cipher block.
pub type Block = [u8; BLOCK_SIZE];

/// The all-zero block.
pub const ZERO_BLOCK: Block = [0u8; BLOCK_SIZE];

/// Shift a block left by one bit, treating it as a big-endian 128-bit integer.
///
/// Bytes are walked from last (least significant) to first. Each byte takes
/// the high bit of the byte after it as its new low bit. The top bit of
/// `block[0]` falls off.
#[inline]
pub fn left_shift_one(block: &Block) -> Block {
    let mut out = ZERO_BLOCK;
    let mut carry = 0u8;
    for i in (0..BLOCK_SIZE).rev() {
        out[i] = (block[i] << 1) | carry;
        carry = block[i] >> 7;
    }
    out
}

/// XOR two blocks.
#[inline]
pub fn xor(a: &Block, b: &Block) -> Block {
    let mut out = ZERO_BLOCK;
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

/// ISO/IEC 9797-1 padding method 2 for a trailing partial block.
///
/// Appends `0x80` and fills with zeros. Returns `None` when `partial` is a
/// full block or longer, since the marker byte would not fit.
#[inline]
pub fn pad_iso9797_m2(partial: &[u8]) -> Option<Block> {
    if partial.len() >= BLOCK_SIZE {
        return None;
    }
    let mut out = ZERO_BLOCK;
    out[..partial.len()].copy_from_slice(partial);
    out[partial.len()] = 0x80;
    Some(out)
}

/// Constant-time comparison of two byte strings.
///
/// Length mismatch returns false immediately; lengths are not secret.
#[inline]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
