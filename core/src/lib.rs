//! DESFire Core - message authentication for AES secure messaging.
//!
//! This library provides the integrity primitives for DESFire-style card
//! sessions keyed with AES-128:
//! - CMAC subkey derivation (K1/K2)
//! - Truncated 8-byte CMAC tags with a chaining value carried across messages
//! - Bit-serial, non-reflected CRC-32
//!
//! # Constraints
//!
//! This library intentionally does NOT:
//! - Talk to a card or reader
//! - Build or parse APDUs
//! - Perform key exchange or authentication handshakes
//! - Support AES-192/256 session keys
//! - Log key material
//!
//! # Example: Authenticating a Command Exchange
//!
//! ```
//! use desfire_core::{crc, CmacSession, TAG_SIZE};
//!
//! // Session key and IV come from the authentication handshake
//! let key = [0x32, 0x01, 0x9B, 0xE4, 0xBC, 0x09, 0xA5, 0x20,
//!            0x7A, 0xC7, 0xC6, 0x38, 0x65, 0xC2, 0x02, 0xA4];
//! let mut reader = CmacSession::initialized(&key, &[0u8; 16]).unwrap();
//! let mut card = CmacSession::initialized(&key, &[0u8; 16]).unwrap();
//!
//! // Reader MACs the command; the card recomputes it with its own state
//! let command = [0x6C, 0x00];
//! let cmd_tag = reader.compute_tag(&command).unwrap();
//! assert_eq!(cmd_tag.len(), TAG_SIZE);
//! card.verify_tag(&command, &cmd_tag).unwrap();
//!
//! // The response tag chains on from the command on both sides
//! let response = [0x00, 0x10, 0x20];
//! let resp_tag = card.compute_tag(&response).unwrap();
//! reader.verify_tag(&response, &resp_tag).unwrap();
//!
//! // Checksums for enciphered payloads
//! let checksum = crc::compute(&command);
//! assert!(crc::verify(&command, &checksum));
//! ```

#![warn(missing_docs)]

pub mod block;
pub mod cipher;
pub mod cmac;
pub mod crc;
pub mod error;

// Re-export main types at crate root
pub use block::{Block, BLOCK_SIZE};
pub use self::cipher::{Aes128Cbc, BlockCipher, CipherError};
pub use cmac::{derive_subkeys, CmacSession, Subkeys, Tag, KEY_SIZE, TAG_SIZE};
pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
