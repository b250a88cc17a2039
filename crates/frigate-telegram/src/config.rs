//! Bot credentials and destination chats.

use teloxide::types::ChatId;

use crate::error::{Result, TelegramError};

/// Bot token variable.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Chat receiving event notifications.
pub const CHAT_ENV: &str = "TELEGRAM_CHAT_ID";
/// Chat receiving error reports and the startup message.
pub const ERROR_CHAT_ENV: &str = "TELEGRAM_ERROR_CHAT_ID";

/// Telegram settings.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: String,
    /// Notification chat.
    pub chat_id: ChatId,
    /// Operator chat.
    pub error_chat_id: ChatId,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("error_chat_id", &self.error_chat_id)
            .finish()
    }
}

impl TelegramConfig {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TelegramError::MissingVar(name.to_string()))
        };
        let chat = |name: &str| -> Result<ChatId> {
            let value = required(name)?;
            value
                .parse::<i64>()
                .map(ChatId)
                .map_err(|_| TelegramError::InvalidVar {
                    name: name.to_string(),
                    value,
                })
        };

        Ok(Self {
            token: required(TOKEN_ENV)?,
            chat_id: chat(CHAT_ENV)?,
            error_chat_id: chat(ERROR_CHAT_ENV)?,
        })
    }
}
