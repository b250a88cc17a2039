//! Telegram delivery for the Frigate relay.
//!
//! This crate provides the `Notifier` the relay runtime sends through, and
//! the `frigate-relay` binary that wires everything together.
//!
//! # Environment Variables
//!
//! Required:
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `TELEGRAM_CHAT_ID`: Chat receiving event notifications
//! - `TELEGRAM_ERROR_CHAT_ID`: Chat receiving error reports
//!
//! Optional:
//! - `TELEGRAM_CAMERA_THREADS`: `Camera=threadId,...` forum thread table
//!
//! # Example
//!
//! ```no_run
//! use frigate_models::OutboundMessage;
//! use frigate_runtime::Notifier;
//! use frigate_telegram::{TelegramConfig, TelegramNotifier};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TelegramConfig::from_env()?;
//!     let notifier = TelegramNotifier::new(&config);
//!
//!     notifier
//!         .deliver(&OutboundMessage::text(0, "<b>hello</b>"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod notifier;

pub use config::TelegramConfig;
pub use error::{Result, TelegramError};
pub use notifier::{plan, TelegramCall, TelegramNotifier, CAPTION_LIMIT};
