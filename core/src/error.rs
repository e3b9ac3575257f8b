//! Error types for desfire-core.
//!
//! # Error Categories
//!
//! - **Session setup**: `InvalidKeyLength`, `InvalidChainingValueLength`
//! - **Ordering**: `UninitializedSubkeys`
//! - **Primitive**: `Cipher` (forwarded from the block cipher unchanged)
//! - **Verification**: `TagMismatch`
//!
//! None of these are transient. Nothing in this crate retries.

use crate::cipher::CipherError;

/// Result type alias for desfire-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a CMAC session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Session key is not exactly 16 bytes.
    #[error("invalid key length: got {len} bytes, expected 16")]
    InvalidKeyLength {
        /// Length of the rejected key.
        len: usize,
    },

    /// Chaining value is not exactly 16 bytes.
    #[error("invalid chaining value length: got {len} bytes, expected 16")]
    InvalidChainingValueLength {
        /// Length of the rejected chaining value.
        len: usize,
    },

    /// Tag computation was requested before subkeys were derived.
    #[error("subkeys have not been derived for this session")]
    UninitializedSubkeys,

    /// The block cipher primitive reported a failure.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Received tag does not match the computed one.
    ///
    /// Intentionally carries no detail about which bytes differed.
    #[error("message authentication failed")]
    TagMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = Error::InvalidKeyLength { len: 24 };
        assert_eq!(err.to_string(), "invalid key length: got 24 bytes, expected 16");

        let err = Error::InvalidChainingValueLength { len: 8 };
        assert_eq!(
            err.to_string(),
            "invalid chaining value length: got 8 bytes, expected 16"
        );

        assert_eq!(
            Error::UninitializedSubkeys.to_string(),
            "subkeys have not been derived for this session"
        );
    }

    #[test]
    fn cipher_errors_pass_through_unchanged() {
        let inner = CipherError::UnalignedInput { len: 17 };
        let err: Error = inner.clone().into();
        assert_eq!(err, Error::Cipher(inner.clone()));
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn error_implements_std_error() {
        let err = Error::TagMismatch;
        let _: &dyn std::error::Error = &err;
    }
}
