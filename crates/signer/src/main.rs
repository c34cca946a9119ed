use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use nfc_signer::config::{Args, Command, SignArgs};
use nfc_signer::{BridgeClient, DigestTracker, Session, display_digest};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Digest { text } => println!("{}", display_digest(&text)),
        Command::Watch => watch().await?,
        Command::Sign(sign_args) => sign(sign_args).await?,
    }
    Ok(())
}

async fn watch() -> Result<()> {
    let tracker = DigestTracker::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        tracker.update(line);
        println!("{}", tracker.current());
    }
    Ok(())
}

async fn sign(args: SignArgs) -> Result<()> {
    let text = match &args.text {
        Some(text) => text.clone(),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("reading text from stdin")?;
            text
        }
    };

    let session = Session::new(BridgeClient::new(args.bridge_url.clone()));
    session.set_text(text);
    println!("Text hash: {}", session.display_digest());
    eprintln!("Tap your card on the reader...");

    let result = match args.timeout() {
        Some(limit) => match tokio::time::timeout(limit, session.sign()).await {
            Ok(outcome) => outcome?,
            Err(_) => bail!("gave up waiting for the card after {}s", limit.as_secs()),
        },
        None => session.sign().await?,
    };

    println!("Public key: {}", result.public_key);
    println!("Signature: {}", result.signature_der);
    Ok(())
}
