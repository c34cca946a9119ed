use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::bridge::DEFAULT_BRIDGE_URL;

/// Hash text and sign the digest with a tap-to-sign NFC card.
///
/// Text is UTF-8 encoded and SHA-256 hashed; only the digest is sent to
/// the card.
#[derive(Debug, Parser)]
#[clap(name = "nfc-sign", version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the digest of TEXT (an empty line for empty text).
    Digest { text: String },
    /// Print the digest of every line read from stdin.
    Watch,
    /// Sign TEXT, or all of stdin when TEXT is omitted.
    Sign(SignArgs),
}

#[derive(Debug, clap::Args)]
pub struct SignArgs {
    /// Text to sign. When omitted, stdin is read verbatim, so a trailing
    /// newline from `echo` is part of the signed text.
    pub text: Option<String>,
    #[clap(long, env = "NFC_BRIDGE_URL", default_value = DEFAULT_BRIDGE_URL)]
    pub bridge_url: String,
    /// Give up waiting for the card after this many seconds.
    #[clap(long, env = "NFC_SIGN_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

impl SignArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_defaults() {
        let args = Args::try_parse_from(["nfc-sign", "sign", "hello"]).unwrap();
        match args.command {
            Command::Sign(sign) => {
                assert_eq!(sign.text.as_deref(), Some("hello"));
                assert_eq!(sign.timeout(), None);
            }
            other => panic!("expected sign, got {other:?}"),
        }
    }

    #[test]
    fn sign_with_explicit_bridge_and_timeout() {
        let args = Args::try_parse_from([
            "nfc-sign",
            "sign",
            "--bridge-url",
            "ws://10.0.0.2:9000/ws",
            "--timeout-secs",
            "30",
        ])
        .unwrap();
        match args.command {
            Command::Sign(sign) => {
                assert_eq!(sign.text, None);
                assert_eq!(sign.bridge_url, "ws://10.0.0.2:9000/ws");
                assert_eq!(sign.timeout(), Some(Duration::from_secs(30)));
            }
            other => panic!("expected sign, got {other:?}"),
        }
    }

    #[test]
    fn digest_accepts_empty_text() {
        let args = Args::try_parse_from(["nfc-sign", "digest", ""]).unwrap();
        assert!(matches!(args.command, Command::Digest { text } if text.is_empty()));
    }
}
