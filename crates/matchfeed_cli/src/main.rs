//! Matchfeed CLI
//!
//! Interactive client for the matchfeed messaging service.
//!
//! # Commands
//!
//! Read one per line from standard input (or `--input`):
//!
//! - `login <host:port> <user> <pass>` - Connect and authenticate
//! - `join <game>` - Subscribe to a game channel
//! - `exit [<game>]` - Leave a game, or log out when no game is given
//! - `report <file>` - Publish the events of a JSON event file
//! - `summary <game> <user> <file>` - Write a reporter's game summary
//! - `logout` - Close the session

use clap::Parser;
use matchfeed_client::{Client, ClientConfig, DEFAULT_HOST_HEADER};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::EnvFilter;

/// Matchfeed interactive client.
#[derive(Parser)]
#[command(name = "matchfeed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Seconds to wait for the logout receipt
    #[arg(long, default_value = "5")]
    receipt_timeout: u64,

    /// Virtual host sent in CONNECT frames
    #[arg(long, default_value = DEFAULT_HOST_HEADER)]
    host_header: String,

    /// Read commands from this file instead of standard input
    #[arg(short, long)]
    input: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries session notices
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::new()
        .with_receipt_timeout(Duration::from_secs(cli.receipt_timeout))
        .with_host_header(cli.host_header);

    let (mut client, mut notices) = Client::new(config);
    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("{notice}");
        }
    });

    let input: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    client.run(input).await?;

    drop(client);
    printer.await?;
    Ok(())
}
