//! desfire-mac - DESFire AES CMAC and CRC32 diagnostics
//!
//! Computes the values a reader exchanges with an AES-keyed DESFire card
//! once a session key is established:
//! - 8-byte CMAC tags, chained across a sequence of messages
//! - CMAC subkeys K1/K2
//! - Bit-serial CRC-32 checksums
//!
//! Session material comes from `DESFIRE_KEY` / `DESFIRE_IV` (a `.env` file is
//! honoured) or from `--key` / `--iv`.

mod commands;
mod config;

use anyhow::Result;
use clap::{arg, ArgMatches, Command};
use config::Config;
use tracing::info;

/// Entry point
fn main() -> Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    init_tracing();

    let matches = cli().get_matches();
    let config = Config::from_env().with_overrides(
        matches.get_one::<String>("key").map(String::as_str),
        matches.get_one::<String>("iv").map(String::as_str),
    );
    log_startup_info(&config);

    run(&config, &matches)
}

fn cli() -> Command {
    Command::new("desfire-mac")
        .about("DESFire AES-128 CMAC and CRC32 diagnostics")
        .version(desfire_core::VERSION)
        .arg(arg!(--key <HEX> "Session key, 16 bytes hex [env: DESFIRE_KEY]").required(false))
        .arg(
            arg!(--iv <HEX> "Initial chaining value, 16 bytes hex [env: DESFIRE_IV]")
                .required(false),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("mac")
                .about("Compute tags for messages in order, carrying the chaining value")
                .arg(arg!(<MESSAGE> ... "Hex-encoded messages")),
        )
        .subcommand(
            Command::new("verify")
                .about("Check a received tag against a message")
                .arg(arg!(<MESSAGE> "Hex-encoded message"))
                .arg(arg!(<TAG> "Hex-encoded 8-byte tag")),
        )
        .subcommand(Command::new("subkeys").about("Print the derived subkeys K1 and K2"))
        .subcommand(
            Command::new("crc")
                .about("Compute the big-endian CRC-32 of a buffer")
                .arg(arg!(<DATA> "Hex-encoded data")),
        )
}

fn run(config: &Config, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("mac", sub)) => {
            let messages: Vec<&String> = sub
                .get_many::<String>("MESSAGE")
                .map(Iterator::collect)
                .unwrap_or_default();
            for line in commands::mac(config, &messages)? {
                println!("{line}");
            }
        }
        Some(("verify", sub)) => {
            let message = required(sub, "MESSAGE")?;
            let tag = required(sub, "TAG")?;
            println!("{}", commands::verify(config, message, tag)?);
        }
        Some(("subkeys", _)) => {
            for line in commands::subkeys(config)? {
                println!("{line}");
            }
        }
        Some(("crc", sub)) => {
            println!("{}", commands::crc(required(sub, "DATA")?)?);
        }
        _ => unreachable!("clap enforces a subcommand"),
    }
    Ok(())
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing argument {id}"))
}

/// Initialize tracing with environment-based log levels.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("desfire_cli=info,desfire_core=warn")),
        )
        .init();
}

/// Log startup configuration (no secrets).
fn log_startup_info(config: &Config) {
    info!(
        version = desfire_core::VERSION,
        key_configured = config.key_configured(),
        custom_iv = config.iv_hex.is_some(),
        "Starting desfire-mac"
    );
}
