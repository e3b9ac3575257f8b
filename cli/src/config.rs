//! Configuration for the desfire-mac tool.
//!
//! Session material is read from environment variables (after `.env` is
//! loaded) and may be overridden on the command line. Key bytes are never
//! logged.

use anyhow::{bail, Context, Result};
use desfire_core::{BLOCK_SIZE, KEY_SIZE};
use zeroize::Zeroizing;

/// Environment variable holding the hex session key.
pub const KEY_VAR: &str = "DESFIRE_KEY";

/// Environment variable holding the hex initial chaining value.
pub const IV_VAR: &str = "DESFIRE_IV";

/// Tool configuration
#[derive(Clone, Default)]
pub struct Config {
    /// Session key as hex, if configured
    pub key_hex: Option<Zeroizing<String>>,

    /// Initial chaining value as hex; all zeros when unset
    pub iv_hex: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            key_hex: std::env::var(KEY_VAR).ok().map(Zeroizing::new),
            iv_hex: std::env::var(IV_VAR).ok(),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, key_hex: Option<&str>, iv_hex: Option<&str>) -> Self {
        if let Some(key) = key_hex {
            self.key_hex = Some(Zeroizing::new(key.to_string()));
        }
        if let Some(iv) = iv_hex {
            self.iv_hex = Some(iv.to_string());
        }
        self
    }

    /// Decoded 16-byte session key.
    pub fn session_key(&self) -> Result<Zeroizing<Vec<u8>>> {
        let Some(hex) = self.key_hex.as_ref() else {
            bail!("no session key configured (set {KEY_VAR} or pass --key)");
        };
        let key = Zeroizing::new(parse_hex(hex).context("session key")?);
        if key.len() != KEY_SIZE {
            bail!("session key must be {KEY_SIZE} bytes, got {}", key.len());
        }
        Ok(key)
    }

    /// Decoded 16-byte initial chaining value.
    pub fn initial_chaining_value(&self) -> Result<Vec<u8>> {
        let iv = match self.iv_hex.as_deref() {
            Some(hex) => parse_hex(hex).context("initial chaining value")?,
            None => vec![0u8; BLOCK_SIZE],
        };
        if iv.len() != BLOCK_SIZE {
            bail!("initial chaining value must be {BLOCK_SIZE} bytes, got {}", iv.len());
        }
        Ok(iv)
    }

    /// Whether a session key is available
    pub fn key_configured(&self) -> bool {
        self.key_hex.is_some()
    }
}

/// Decode hex, ignoring whitespace, `:` separators and an optional `0x`.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).with_context(|| format!("invalid hex input {input:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_common_spellings() {
        assert_eq!(parse_hex("6C00").unwrap(), vec![0x6C, 0x00]);
        assert_eq!(parse_hex("6c 00").unwrap(), vec![0x6C, 0x00]);
        assert_eq!(parse_hex("0x6c:00").unwrap(), vec![0x6C, 0x00]);
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn parse_hex_rejects_garbage() {
        assert!(parse_hex("6G").is_err());
        assert!(parse_hex("abc").is_err());
    }

    #[test]
    fn missing_iv_defaults_to_zero() {
        let config = Config::default();
        assert_eq!(config.initial_chaining_value().unwrap(), vec![0u8; 16]);
        assert!(!config.key_configured());
        assert!(config.session_key().is_err());
    }

    #[test]
    fn overrides_replace_environment_values() {
        let config = Config {
            key_hex: Some(Zeroizing::new("00".repeat(16))),
            iv_hex: Some("11".repeat(16)),
        }
        .with_overrides(Some("32019BE4BC09A5207AC7C63865C202A4"), None);

        assert_eq!(config.session_key().unwrap()[0], 0x32);
        assert_eq!(config.initial_chaining_value().unwrap(), vec![0x11; 16]);
    }

    #[test]
    fn wrong_lengths_are_errors() {
        let config = Config::default().with_overrides(Some("0011"), Some("00"));
        assert!(config.session_key().is_err());
        assert!(config.initial_chaining_value().is_err());
    }
}
