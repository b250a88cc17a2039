//! `Notifier` implementation on top of the Telegram Bot API.

use std::path::PathBuf;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    InputFile, InputMedia, InputMediaPhoto, InputMediaVideo, MessageId, ParseMode, ThreadId,
};
use tracing::{debug, info};

use frigate_models::{Attachment, AttachmentKind, OutboundMessage};
use frigate_runtime::{Notifier, RelayError};

use crate::config::TelegramConfig;
use crate::error::Result;

/// Longest caption Telegram accepts on a media message.
pub const CAPTION_LIMIT: usize = 1024;

/// Telegram calls needed to deliver one message, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelegramCall {
    /// `sendMessage`.
    Text(String),
    /// `sendPhoto`.
    Photo { path: PathBuf, caption: Option<String> },
    /// `sendVideo`.
    Video { path: PathBuf, caption: Option<String> },
    /// `sendMediaGroup`; the caption sits on the first item.
    Group(Vec<Attachment>),
}

/// Splits a message into Telegram calls.
///
/// One attachment uses the single-media call since media groups need at
/// least two items. A body too long for a caption goes out as its own
/// text message first.
pub fn plan(message: &OutboundMessage) -> Vec<TelegramCall> {
    let mut attachments = message.attachments.clone();
    let mut sends = Vec::new();

    let Some(first) = attachments.first_mut() else {
        if let Some(ref text) = message.text {
            sends.push(TelegramCall::Text(text.clone()));
        }
        return sends;
    };

    if let Some(ref text) = message.text {
        if text.chars().count() > CAPTION_LIMIT {
            sends.push(TelegramCall::Text(text.clone()));
        } else {
            first.caption = Some(text.clone());
        }
    }

    if attachments.len() == 1 {
        let single = attachments.remove(0);
        sends.push(match single.kind {
            AttachmentKind::Photo => TelegramCall::Photo {
                path: single.path,
                caption: single.caption,
            },
            AttachmentKind::Video => TelegramCall::Video {
                path: single.path,
                caption: single.caption,
            },
        });
    } else {
        sends.push(TelegramCall::Group(attachments));
    }
    sends
}

fn input_media(attachment: &Attachment) -> InputMedia {
    let file = InputFile::file(attachment.path.clone());
    match attachment.kind {
        AttachmentKind::Photo => {
            let mut media = InputMediaPhoto::new(file).parse_mode(ParseMode::Html);
            if let Some(ref caption) = attachment.caption {
                media = media.caption(caption.clone());
            }
            InputMedia::Photo(media)
        }
        AttachmentKind::Video => {
            let mut media = InputMediaVideo::new(file)
                .parse_mode(ParseMode::Html)
                .supports_streaming(true);
            if let Some(ref caption) = attachment.caption {
                media = media.caption(caption.clone());
            }
            InputMedia::Video(media)
        }
    }
}

/// Delivers relay messages with a teloxide `Bot`.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
    error_chat_id: ChatId,
}

impl TelegramNotifier {
    /// Creates a notifier for the configured chats.
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            bot: Bot::new(config.token.clone()),
            chat_id: config.chat_id,
            error_chat_id: config.error_chat_id,
        }
    }

    /// Returns the bot's username, verifying the token.
    pub async fn get_me(&self) -> Result<String> {
        let me = self.bot.get_me().await?;
        Ok(me.username().to_string())
    }

    async fn execute(&self, call: TelegramCall, thread: Option<ThreadId>) -> Result<()> {
        match call {
            TelegramCall::Text(text) => {
                let mut req = self
                    .bot
                    .send_message(self.chat_id, text)
                    .parse_mode(ParseMode::Html);
                if let Some(tid) = thread {
                    req = req.message_thread_id(tid);
                }
                req.await?;
            }
            TelegramCall::Photo { path, caption } => {
                let mut req = self
                    .bot
                    .send_photo(self.chat_id, InputFile::file(path))
                    .parse_mode(ParseMode::Html);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(tid) = thread {
                    req = req.message_thread_id(tid);
                }
                req.await?;
            }
            TelegramCall::Video { path, caption } => {
                let mut req = self
                    .bot
                    .send_video(self.chat_id, InputFile::file(path))
                    .parse_mode(ParseMode::Html)
                    .supports_streaming(true);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(tid) = thread {
                    req = req.message_thread_id(tid);
                }
                req.await?;
            }
            TelegramCall::Group(attachments) => {
                let media: Vec<InputMedia> = attachments.iter().map(input_media).collect();
                let mut req = self.bot.send_media_group(self.chat_id, media);
                if let Some(tid) = thread {
                    req = req.message_thread_id(tid);
                }
                req.await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn deliver(&self, message: &OutboundMessage) -> frigate_runtime::Result<()> {
        let thread = message.thread().map(|tid| ThreadId(MessageId(tid)));
        let calls = plan(message);
        debug!(
            thread_id = message.thread_id,
            calls = calls.len(),
            attachments = message.attachments.len(),
            "sending message"
        );

        for call in calls {
            self.execute(call, thread)
                .await
                .map_err(|e| RelayError::Delivery(e.to_string()))?;
        }
        Ok(())
    }

    async fn report(&self, text: &str) -> frigate_runtime::Result<()> {
        self.bot
            .send_message(self.error_chat_id, text)
            .await
            .map_err(|e| RelayError::Delivery(e.to_string()))?;
        info!(chat_id = %self.error_chat_id, "operator report sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_text_only() {
        let sends = plan(&OutboundMessage::text(3, "<b>New event</b>"));
        assert_eq!(sends, vec![TelegramCall::Text("<b>New event</b>".to_string())]);
    }

    #[test]
    fn test_plan_single_photo_uses_caption() {
        let msg = OutboundMessage::media(
            0,
            Some("body".to_string()),
            vec![Attachment::photo("/tmp/abc123.jpg")],
        );

        assert_eq!(
            plan(&msg),
            vec![TelegramCall::Photo {
                path: PathBuf::from("/tmp/abc123.jpg"),
                caption: Some("body".to_string()),
            }]
        );
    }

    #[test]
    fn test_plan_part_keeps_own_caption() {
        let msg = OutboundMessage::media(
            3,
            None,
            vec![Attachment::video("/tmp/abc123_part2.mp4").with_caption("part 2 of 2")],
        );

        assert_eq!(
            plan(&msg),
            vec![TelegramCall::Video {
                path: PathBuf::from("/tmp/abc123_part2.mp4"),
                caption: Some("part 2 of 2".to_string()),
            }]
        );
    }

    #[test]
    fn test_plan_group_captions_first_item() {
        let msg = OutboundMessage::media(
            3,
            Some("body".to_string()),
            vec![
                Attachment::photo("/tmp/abc123.jpg"),
                Attachment::video("/tmp/abc123.mp4"),
            ],
        );

        let sends = plan(&msg);
        assert_eq!(sends.len(), 1);
        let TelegramCall::Group(ref items) = sends[0] else {
            panic!("expected a media group, got {:?}", sends[0]);
        };
        assert_eq!(items[0].caption.as_deref(), Some("body"));
        assert_eq!(items[1].caption, None);
    }

    #[test]
    fn test_plan_long_body_sent_separately() {
        let body = "x".repeat(CAPTION_LIMIT + 1);
        let msg = OutboundMessage::media(
            0,
            Some(body.clone()),
            vec![Attachment::photo("/tmp/a.jpg"), Attachment::video("/tmp/a.mp4")],
        );

        let sends = plan(&msg);
        assert_eq!(sends.len(), 2);
        assert_eq!(sends[0], TelegramCall::Text(body));
        let TelegramCall::Group(ref items) = sends[1] else {
            panic!("expected a media group");
        };
        assert!(items.iter().all(|a| a.caption.is_none()));
    }

    #[test]
    fn test_plan_empty_message() {
        let msg = OutboundMessage::media(0, None, Vec::new());
        assert!(plan(&msg).is_empty());
    }
}
