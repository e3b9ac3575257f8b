//! AES-128 CMAC session engine with carried-over chaining value.
//!
//! # Construction
//!
//! ```text
//! L  = E_K(0^128)
//! K1 = L << 1        (^ 0x87 in the last byte if msb(L)  = 1)
//! K2 = K1 << 1       (^ 0x87 in the last byte if msb(K1) = 1)
//!
//! M_1 .. M_n   message split into 16-byte blocks, n >= 1
//! M_n'         = M_n ^ K1               if M_n is a full block
//!              = pad(M_n) ^ K2          otherwise (including empty messages)
//!
//! C_0 = chaining value held by the session
//! C_i = E_K(M_i ^ C_{i-1})
//! Tag = first 8 bytes of C_n, and the session keeps C_n
//! ```
//!
//! Every `E_K` is an independent single-block call with an all-zero IV; the
//! chain is carried by the session, not by the cipher.
//!
//! # Session Continuity
//!
//! The chaining value is never reset between calls. The second message's
//! first block is XORed with the last cipher output of the first message.
//! Card protocols rely on this across a command/response exchange, so two
//! tags computed in sequence differ from the same two tags computed on fresh
//! sessions. Use [`CmacSession::set_chaining_value`] to reset explicitly.
//!
//! With a zero chaining value, a single call is plain AES-CMAC (RFC 4493)
//! truncated to 8 bytes.
//!
//! # Example
//!
//! ```
//! use desfire_core::cmac::{CmacSession, TAG_SIZE};
//!
//! let key = [0x32, 0x01, 0x9B, 0xE4, 0xBC, 0x09, 0xA5, 0x20,
//!            0x7A, 0xC7, 0xC6, 0x38, 0x65, 0xC2, 0x02, 0xA4];
//! let mut session = CmacSession::new(&key, &[0u8; 16]).unwrap();
//! session.derive_subkeys().unwrap();
//!
//! let tag = session.compute_tag(&[0x6C, 0x00]).unwrap();
//! assert_eq!(tag.len(), TAG_SIZE);
//! ```

use std::fmt;

use tracing::{debug, trace};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::block::{self, Block, BLOCK_SIZE, ZERO_BLOCK};
use crate::cipher::{Aes128Cbc, BlockCipher, CipherError};
use crate::error::{Error, Result};

/// Size of the transmitted (truncated) tag in bytes.
pub const TAG_SIZE: usize = 8;

/// A truncated CMAC tag.
pub type Tag = [u8; TAG_SIZE];

/// Session key width in bytes. Only AES-128 is supported.
pub const KEY_SIZE: usize = 16;

/// GF(2^128) reduction constant for x^128 + x^7 + x^2 + x + 1.
const RB: u8 = 0x87;

/// The two CMAC subkeys derived from a session key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Subkeys {
    k1: Block,
    k2: Block,
}

impl Subkeys {
    /// Subkey applied to a full final block.
    pub fn k1(&self) -> &Block {
        &self.k1
    }

    /// Subkey applied to a padded final block.
    pub fn k2(&self) -> &Block {
        &self.k2
    }
}

impl fmt::Debug for Subkeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subkeys(..)")
    }
}

/// Multiply by x in GF(2^128).
fn double(input: &Block) -> Block {
    let mut out = block::left_shift_one(input);
    if input[0] & 0x80 != 0 {
        out[BLOCK_SIZE - 1] ^= RB;
    }
    out
}

fn key_from_slice(key: &[u8]) -> Result<Block> {
    key.try_into()
        .map_err(|_| Error::InvalidKeyLength { len: key.len() })
}

fn chaining_value_from_slice(value: &[u8]) -> Result<Block> {
    value
        .try_into()
        .map_err(|_| Error::InvalidChainingValueLength { len: value.len() })
}

/// One independent block encryption under `key` with a zero IV.
fn encrypt_block<C: BlockCipher + ?Sized>(cipher: &C, key: &Block, input: &Block) -> Result<Block> {
    let out = cipher.encrypt_cbc(key, &ZERO_BLOCK, input)?;
    let len = out.len();
    out.try_into()
        .map_err(|_| Error::Cipher(CipherError::UnalignedInput { len }))
}

/// Derive K1 and K2 from a 16-byte key.
///
/// Pure function of `key`: the same key always yields the same subkeys.
pub fn derive_subkeys<C: BlockCipher + ?Sized>(cipher: &C, key: &[u8]) -> Result<Subkeys> {
    let mut key = key_from_slice(key)?;
    let subkeys = encrypt_block(cipher, &key, &ZERO_BLOCK).map(|mut l| {
        let k1 = double(&l);
        let k2 = double(&k1);
        l.zeroize();
        Subkeys { k1, k2 }
    });
    key.zeroize();
    subkeys
}

/// Number of cipher blocks a message of `len` bytes occupies.
///
/// An empty message still occupies one (fully padded) block.
pub fn block_count(len: usize) -> usize {
    if len == 0 {
        1
    } else {
        len.div_ceil(BLOCK_SIZE)
    }
}

/// Split `message` into blocks and mask the last one with K1 or K2.
fn prepare_blocks(message: &[u8], subkeys: &Subkeys) -> Vec<Block> {
    let chunks = message.chunks_exact(BLOCK_SIZE);
    let remainder = chunks.remainder();
    let needs_padding = message.is_empty() || !remainder.is_empty();

    let mut blocks: Vec<Block> = Vec::with_capacity(block_count(message.len()));
    blocks.extend(chunks.map(|chunk| {
        let mut b = ZERO_BLOCK;
        b.copy_from_slice(chunk);
        b
    }));
    if needs_padding {
        // chunks_exact leaves fewer than BLOCK_SIZE bytes behind
        blocks.extend(block::pad_iso9797_m2(remainder));
    }
    debug_assert_eq!(blocks.len(), block_count(message.len()));

    let mask = if needs_padding {
        &subkeys.k2
    } else {
        &subkeys.k1
    };
    if let Some(last) = blocks.last_mut() {
        *last = block::xor(last, mask);
    }

    trace!(
        len = message.len(),
        blocks = blocks.len(),
        padded = needs_padding,
        "prepared CMAC blocks"
    );
    blocks
}

/// A CMAC session: key, subkeys and the running chaining value.
///
/// Each session owns its state outright. Independent sessions can be used
/// from different threads; calls on one session must be sequential, which
/// `&mut self` enforces.
pub struct CmacSession<C: BlockCipher = Aes128Cbc> {
    cipher: C,
    key: Block,
    chaining_value: Block,
    subkeys: Option<Subkeys>,
}

impl CmacSession<Aes128Cbc> {
    /// Create a session over software AES-128.
    ///
    /// Subkeys are not derived yet; call [`CmacSession::derive_subkeys`]
    /// before computing tags.
    pub fn new(key: &[u8], initial_chaining_value: &[u8]) -> Result<Self> {
        Self::with_cipher(Aes128Cbc, key, initial_chaining_value)
    }

    /// Create a session and derive its subkeys in one step.
    pub fn initialized(key: &[u8], initial_chaining_value: &[u8]) -> Result<Self> {
        let mut session = Self::new(key, initial_chaining_value)?;
        session.derive_subkeys()?;
        Ok(session)
    }
}

impl<C: BlockCipher> CmacSession<C> {
    /// Create a session over a caller-supplied block cipher.
    ///
    /// Both `key` and `initial_chaining_value` must be exactly 16 bytes.
    pub fn with_cipher(cipher: C, key: &[u8], initial_chaining_value: &[u8]) -> Result<Self> {
        let key = key_from_slice(key)?;
        let chaining_value = chaining_value_from_slice(initial_chaining_value)?;
        Ok(Self {
            cipher,
            key,
            chaining_value,
            subkeys: None,
        })
    }

    /// Derive (or re-derive) K1 and K2 from the session key.
    ///
    /// Idempotent: the key never changes, so neither do the subkeys.
    pub fn derive_subkeys(&mut self) -> Result<&Subkeys> {
        let subkeys = derive_subkeys(&self.cipher, &self.key)?;
        debug!("derived CMAC subkeys");
        Ok(&*self.subkeys.insert(subkeys))
    }

    /// Subkeys, if they have been derived.
    pub fn subkeys(&self) -> Option<&Subkeys> {
        self.subkeys.as_ref()
    }

    /// Current chaining value (last cipher output, or the initial value).
    pub fn chaining_value(&self) -> &Block {
        &self.chaining_value
    }

    /// Overwrite the chaining value.
    pub fn set_chaining_value(&mut self, value: &[u8]) -> Result<()> {
        self.chaining_value = chaining_value_from_slice(value)?;
        trace!("chaining value overridden");
        Ok(())
    }

    /// Compute the 8-byte tag of `message` and advance the chaining value.
    ///
    /// On error the chaining value is left untouched.
    pub fn compute_tag(&mut self, message: &[u8]) -> Result<Tag> {
        let subkeys = self.subkeys.as_ref().ok_or(Error::UninitializedSubkeys)?;
        let blocks = prepare_blocks(message, subkeys);

        let mut chain = self.chaining_value;
        for b in &blocks {
            chain = encrypt_block(&self.cipher, &self.key, &block::xor(b, &chain))?;
        }
        self.chaining_value = chain;

        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&chain[..TAG_SIZE]);
        Ok(tag)
    }

    /// Compute the tag of `message` and compare it with `expected`.
    ///
    /// The chaining value advances whether or not the tags match, mirroring
    /// the peer that produced `expected`. Comparison is constant time.
    pub fn verify_tag(&mut self, message: &[u8], expected: &[u8]) -> Result<()> {
        let tag = self.compute_tag(message)?;
        if block::constant_time_eq(&tag, expected) {
            Ok(())
        } else {
            debug!(len = message.len(), "CMAC verification failed");
            Err(Error::TagMismatch)
        }
    }

    /// Encrypt `data` under the session key with the given IV.
    ///
    /// Raw pass-through to the cipher; CMAC state is not touched.
    pub fn encrypt(&self, data: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        Ok(self.cipher.encrypt_cbc(&self.key, iv, data)?)
    }

    /// Decrypt `data` under the session key with the given IV.
    pub fn decrypt(&self, data: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
        Ok(self.cipher.decrypt_cbc(&self.key, iv, data)?)
    }

    /// The underlying block cipher.
    pub fn cipher(&self) -> &C {
        &self.cipher
    }
}

impl<C: BlockCipher> fmt::Debug for CmacSession<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmacSession")
            .field("subkeys_derived", &self.subkeys.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: BlockCipher> Drop for CmacSession<C> {
    fn drop(&mut self) {
        self.key.zeroize();
        self.chaining_value.zeroize();
    }
}
