//! Subcommand implementations.
//!
//! Each command returns its output lines so they can be tested without
//! capturing stdout. Intermediate values are hex-dumped at debug level.

use anyhow::{Context, Result};
use desfire_core::{crc, CmacSession, Error, TAG_SIZE};
use tracing::debug;

use crate::config::{parse_hex, Config};

fn open_session(config: &Config) -> Result<CmacSession> {
    let key = config.session_key()?;
    let iv = config.initial_chaining_value()?;
    let session =
        CmacSession::initialized(&key, &iv).context("failed to initialise CMAC session")?;
    debug!(iv = %hex::encode_upper(&iv), "session initialised");
    Ok(session)
}

/// Tag each message in order on one session.
pub fn mac(config: &Config, messages: &[&String]) -> Result<Vec<String>> {
    let mut session = open_session(config)?;
    let mut lines = Vec::with_capacity(messages.len());

    for (index, message) in messages.iter().enumerate() {
        let data = parse_hex(message).with_context(|| format!("message {index}"))?;
        let tag = session.compute_tag(&data)?;
        debug!(
            index,
            len = data.len(),
            chaining_value = %hex::encode_upper(session.chaining_value()),
            "tag computed"
        );
        lines.push(format!("CMAC[{index}] -> {}", hex::encode_upper(tag)));
    }
    Ok(lines)
}

/// Check `tag_hex` against the tag of `message_hex`.
pub fn verify(config: &Config, message_hex: &str, tag_hex: &str) -> Result<String> {
    let mut session = open_session(config)?;
    let message = parse_hex(message_hex).context("message")?;
    let tag = parse_hex(tag_hex).context("tag")?;
    if tag.len() != TAG_SIZE {
        anyhow::bail!("tag must be {TAG_SIZE} bytes, got {}", tag.len());
    }

    match session.verify_tag(&message, &tag) {
        Ok(()) => Ok("OK".to_string()),
        Err(Error::TagMismatch) => anyhow::bail!("tag mismatch"),
        Err(e) => Err(e.into()),
    }
}

/// Print the subkeys derived from the configured key.
pub fn subkeys(config: &Config) -> Result<Vec<String>> {
    let session = open_session(config)?;
    let subkeys = session
        .subkeys()
        .context("subkeys missing after initialisation")?;
    Ok(vec![
        format!("K1 -> {}", hex::encode_upper(subkeys.k1())),
        format!("K2 -> {}", hex::encode_upper(subkeys.k2())),
    ])
}

/// CRC-32 of a hex buffer, most significant byte first.
pub fn crc(data_hex: &str) -> Result<String> {
    let data = parse_hex(data_hex).context("data")?;
    let checksum = crc::compute(&data);
    debug!(len = data.len(), "checksum computed");
    Ok(format!("CRC32 -> {}", hex::encode_upper(checksum)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_KEY: &str = "32 01 9B E4 BC 09 A5 20 7A C7 C6 38 65 C2 02 A4";

    fn golden_config() -> Config {
        Config::default().with_overrides(Some(GOLDEN_KEY), None)
    }

    #[test]
    fn mac_chains_across_messages() {
        let first = "6C00".to_string();
        let lines = mac(&golden_config(), &[&first, &first]).unwrap();
        assert_eq!(
            lines,
            vec![
                "CMAC[0] -> 11D587F696B4E99F".to_string(),
                "CMAC[1] -> D8CDD80F6A6FCFD7".to_string(),
            ]
        );
    }

    #[test]
    fn mac_without_key_fails() {
        let message = "6C00".to_string();
        assert!(mac(&Config::default(), &[&message]).is_err());
    }

    #[test]
    fn verify_reports_match_and_mismatch() {
        assert_eq!(
            verify(&golden_config(), "6C00", "11D587F696B4E99F").unwrap(),
            "OK"
        );
        assert!(verify(&golden_config(), "6C00", "11D587F696B4E99E").is_err());
        assert!(verify(&golden_config(), "6C00", "11D5").is_err());
    }

    #[test]
    fn subkeys_are_printed() {
        let lines = subkeys(&golden_config()).unwrap();
        assert_eq!(lines[0], "K1 -> 9704BC455BBFDD2D7F5C38561E4D8D3E");
        assert_eq!(lines[1], "K2 -> 2E09788AB77FBA5AFEB870AC3C9B1AFB");
    }

    #[test]
    fn crc_is_printed_big_endian() {
        assert_eq!(crc("313233343536373839").unwrap(), "CRC32 -> 89A1897F");
        assert_eq!(crc("").unwrap(), "CRC32 -> 00000000");
    }
}
