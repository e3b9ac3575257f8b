//! Block cipher collaborator.
//!
//! The CMAC engine only ever asks for CBC encryption of whole blocks under a
//! 128-bit key. The seam is a trait so sessions can run against a test double
//! or a hardware-backed primitive.
//!
//! [`Aes128Cbc`] is the software implementation used by default.

use aes::Aes128;
use cipher::{block_padding::NoPadding, BlockDecryptMut as _, BlockEncryptMut as _, KeyIvInit as _};

use crate::block::BLOCK_SIZE;

/// Failures reported by a [`BlockCipher`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherError {
    /// Key is not a supported length.
    #[error("cipher rejected key of {len} bytes")]
    InvalidKeyLength {
        /// Length of the rejected key.
        len: usize,
    },

    /// IV is not exactly one block.
    #[error("cipher rejected IV of {len} bytes")]
    InvalidIvLength {
        /// Length of the rejected IV.
        len: usize,
    },

    /// Input is not a whole number of blocks.
    #[error("input of {len} bytes is not a multiple of the block size")]
    UnalignedInput {
        /// Length of the rejected input.
        len: usize,
    },
}

/// A CBC-mode block cipher with 16-byte blocks.
pub trait BlockCipher {
    /// Encrypt `data` in CBC mode. Output length equals input length.
    fn encrypt_cbc(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Decrypt `data` in CBC mode. Output length equals input length.
    fn decrypt_cbc(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// AES-128 in CBC mode without padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes128Cbc;

/// Key width accepted by [`Aes128Cbc`].
pub const AES_128_KEY_SIZE: usize = 16;

fn check_inputs(key: &[u8], iv: &[u8], data: &[u8]) -> Result<(), CipherError> {
    if key.len() != AES_128_KEY_SIZE {
        return Err(CipherError::InvalidKeyLength { len: key.len() });
    }
    if iv.len() != BLOCK_SIZE {
        return Err(CipherError::InvalidIvLength { len: iv.len() });
    }
    if data.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::UnalignedInput { len: data.len() });
    }
    Ok(())
}

impl BlockCipher for Aes128Cbc {
    fn encrypt_cbc(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CipherError> {
        check_inputs(key, iv, data)?;
        let encryptor = cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CipherError::InvalidKeyLength { len: key.len() })?;

        let mut buf = data.to_vec();
        let len = buf.len();
        encryptor
            .encrypt_padded_mut::<NoPadding>(&mut buf, len)
            .map_err(|_| CipherError::UnalignedInput { len })?;
        Ok(buf)
    }

    fn decrypt_cbc(&self, key: &[u8], iv: &[u8], data: &[u8]) -> Result<Vec<u8>, CipherError> {
        check_inputs(key, iv, data)?;
        let decryptor = cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|_| CipherError::InvalidKeyLength { len: key.len() })?;

        let mut buf = data.to_vec();
        decryptor
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| CipherError::UnalignedInput { len: data.len() })?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    const KEY: [u8; 16] = hex!("2b7e151628aed2a6abf7158809cf4f3c");
    const IV: [u8; 16] = hex!("000102030405060708090a0b0c0d0e0f");

    // NIST SP 800-38A F.2.1 CBC-AES128.Encrypt
    #[test]
    fn encrypt_matches_sp800_38a() {
        let plaintext = hex!(
            "6bc1bee22e409f96e93d7e117393172a
             ae2d8a571e03ac9c9eb76fac45af8e51"
        );
        let expected = hex!(
            "7649abac8119b246cee98e9b12e9197d
             5086cb9b507219ee95db113a917678b2"
        );
        let ciphertext = Aes128Cbc.encrypt_cbc(&KEY, &IV, &plaintext).unwrap();
        assert_eq!(ciphertext, expected);
    }

    #[test]
    fn decrypt_inverts_encrypt() {
        let plaintext = [0x5Au8; 48];
        let ciphertext = Aes128Cbc.encrypt_cbc(&KEY, &IV, &plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let recovered = Aes128Cbc.decrypt_cbc(&KEY, &IV, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn empty_input_is_empty_output() {
        let out = Aes128Cbc.encrypt_cbc(&KEY, &IV, &[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn rejects_bad_lengths() {
        assert_eq!(
            Aes128Cbc.encrypt_cbc(&[0u8; 24], &IV, &[0u8; 16]),
            Err(CipherError::InvalidKeyLength { len: 24 })
        );
        assert_eq!(
            Aes128Cbc.encrypt_cbc(&KEY, &[0u8; 8], &[0u8; 16]),
            Err(CipherError::InvalidIvLength { len: 8 })
        );
        assert_eq!(
            Aes128Cbc.decrypt_cbc(&KEY, &IV, &[0u8; 15]),
            Err(CipherError::UnalignedInput { len: 15 })
        );
    }
}
