//! Frigate relay binary.
//!
//! Start the relay with:
//! ```bash
//! FRIGATE_URL=http://frigate:5000 TELEGRAM_BOT_TOKEN=xxx \
//!   TELEGRAM_CHAT_ID=-100123 TELEGRAM_ERROR_CHAT_ID=42 \
//!   cargo run -p frigate-telegram
//! ```

use std::sync::Arc;

use clap::Parser;
use frigate_media::MediaChunker;
use frigate_runtime::{startup_message, Dispatcher, FrigateClient, Notifier, RelayConfig};
use frigate_store::MemoryDedupStore;
use frigate_telegram::{TelegramConfig, TelegramNotifier};
use tracing_subscriber::EnvFilter;

/// Frigate relay - forward camera events to Telegram
#[derive(Parser, Debug)]
#[command(name = "frigate-relay")]
#[command(about = "Forward Frigate NVR events to a Telegram chat")]
struct Args {
    /// Run every enabled loop for one cycle, wait for the tasks and exit
    #[arg(long)]
    once: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "frigate_telegram=info,frigate_runtime=info,frigate_media=info,frigate_store=info,teloxide=warn",
        1 => "frigate_telegram=debug,frigate_runtime=debug,frigate_media=debug,frigate_store=debug,teloxide=info",
        2 => "frigate_telegram=trace,frigate_runtime=trace,frigate_media=trace,frigate_store=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::from_env()?;
    let telegram = TelegramConfig::from_env()?;
    tracing::debug!(config = ?config, telegram = ?telegram, "configuration loaded");

    let notifier = Arc::new(TelegramNotifier::new(&telegram));
    match notifier.get_me().await {
        Ok(username) => tracing::info!(username = %username, "bot initialized"),
        Err(e) => {
            tracing::error!(error = %e, "failed to get bot info");
            return Err(e.into());
        }
    }

    if let Err(e) = notifier.report(&startup_message(&config)).await {
        tracing::warn!(error = %e, "failed to send startup message");
    }

    let chunker = match MediaChunker::new() {
        Ok(chunker) => Some(chunker),
        Err(e) => {
            tracing::warn!(error = %e, "ffmpeg unavailable, oversized clips will not be split");
            None
        }
    };

    let source = Arc::new(FrigateClient::new(&config.frigate_url)?);
    let mut dispatcher = Dispatcher::new(
        config,
        source,
        Arc::new(MemoryDedupStore::new()),
        notifier,
        chunker,
    );

    if args.once {
        for report in dispatcher.run_once().await {
            tracing::info!(
                mode = ?report.mode,
                fetched = report.fetched,
                spawned = report.spawned,
                skipped = report.skipped,
                "cycle finished"
            );
        }
        return Ok(());
    }

    dispatcher.start().await?;
    println!("\nfrigate-relay running, press Ctrl+C to stop\n");

    tokio::signal::ctrl_c().await?;
    dispatcher.shutdown().await?;

    Ok(())
}
