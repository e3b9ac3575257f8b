//! Bit-serial CRC-32 used by the card protocol.
//!
//! Non-reflected polynomial `0x04C11DB7`, zero initial register, no final
//! XOR. The message is augmented with four zero bytes, so the register left
//! after the flush is the checksum itself. This is NOT the reflected
//! Ethernet/ZIP CRC-32 and gives different results.
//!
//! Equivalent to CRC-32/POSIX without its final inversion.

/// CRC-32 polynomial (non-reflected form).
pub const POLYNOMIAL: u32 = 0x04C1_1DB7;

/// Checksum width in bytes.
pub const CRC_SIZE: usize = 4;

/// Compute the checksum as a register value.
pub fn compute_u32(data: &[u8]) -> u32 {
    let mut reg = 0u32;

    let flush = std::iter::repeat(0u8).take(CRC_SIZE);
    for byte in data.iter().copied().chain(flush) {
        for bit in (0..8).rev() {
            let popped = reg >> 31;
            reg = (reg << 1) | u32::from((byte >> bit) & 1);
            if popped == 1 {
                reg ^= POLYNOMIAL;
            }
        }
    }

    reg
}

/// Compute the checksum, most significant byte first.
#[inline]
pub fn compute(data: &[u8]) -> [u8; CRC_SIZE] {
    compute_u32(data).to_be_bytes()
}

/// Verify a big-endian checksum.
#[inline]
pub fn verify(data: &[u8], expected: &[u8; CRC_SIZE]) -> bool {
    compute(data) == *expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_check_value() {
        // CRC-32/POSIX check value 0x765E7680 with the final XOR removed
        assert_eq!(compute_u32(b"123456789"), 0x89A1_897F);
        assert_eq!(compute(b"123456789"), [0x89, 0xA1, 0x89, 0x7F]);
    }

    #[test]
    fn crc_empty_is_zero() {
        // An all-zero register flushed with zero bits never meets the polynomial
        assert_eq!(compute(&[]), [0, 0, 0, 0]);
    }

    #[test]
    fn crc_single_low_bit_is_polynomial() {
        // x^0 shifted through 32 flush bits reduces to the polynomial itself
        assert_eq!(compute_u32(&[0x01]), POLYNOMIAL);
    }

    #[test]
    fn crc_known_vectors() {
        assert_eq!(compute(&[0x6C, 0x00]), [0xAE, 0x89, 0x38, 0x91]);
        assert_eq!(compute_u32(b"123456789123456789"), 0xCDBA_C17A);
    }

    #[test]
    fn crc_self_append_changes_checksum() {
        let cases: [&[u8]; 3] = [b"123456789", &[0x6C, 0x00], &[0xFF]];
        for data in cases {
            let doubled = [data, data].concat();
            assert_ne!(compute(data), compute(&doubled));
        }
    }

    #[test]
    fn crc_is_linear_over_xor() {
        // No init and no final XOR: crc(a ^ b) == crc(a) ^ crc(b) for equal lengths
        let a = b"abcdefgh";
        let b = b"12345678";
        let x: Vec<u8> = a.iter().zip(b.iter()).map(|(p, q)| p ^ q).collect();
        assert_eq!(compute_u32(&x), compute_u32(a) ^ compute_u32(b));
    }

    #[test]
    fn crc_verify_works() {
        let data = b"test data";
        let crc = compute(data);
        assert!(verify(data, &crc));
        let mut flipped = crc;
        flipped[3] ^= 1;
        assert!(!verify(data, &flipped));
    }
}
