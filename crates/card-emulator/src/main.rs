use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nfc_card_emulator::{AppState, SoftwareCard, run};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Local NFC bridge backed by a software card, for development and tests.
#[derive(Parser)]
struct Args {
    #[clap(long, default_value = "127.0.0.1")]
    host: String,
    #[clap(long, default_value = "32868")]
    port: u16,
    #[clap(long, env = "CARD_SEED", default_value = "card-emulator")]
    seed: String,
    /// Delay between a client connecting and the card being presented.
    #[clap(long, env = "CARD_TAP_DELAY_MS", default_value = "0")]
    tap_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let card = SoftwareCard::from_seed(&args.seed).context("creating software card")?;
    let state = AppState {
        card: Arc::new(card),
        tap_delay: Duration::from_millis(args.tap_delay_ms),
    };

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Ctrl+C, shutting down");
                token.cancel();
            }
        });
    }

    run(&args.host, args.port, state, token).await
}
