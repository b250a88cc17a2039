//! Outbound message payload handed to a notifier.

use std::path::{Path, PathBuf};

/// Media type of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Photo,
    Video,
}

/// A local file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Media type.
    pub kind: AttachmentKind,
    /// Path of the file on the local filesystem.
    pub path: PathBuf,
    /// Per-attachment caption (e.g. "part 1 of 2").
    pub caption: Option<String>,
}

impl Attachment {
    /// Creates a photo attachment.
    pub fn photo(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: AttachmentKind::Photo,
            path: path.into(),
            caption: None,
        }
    }

    /// Creates a video attachment.
    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: AttachmentKind::Video,
            path: path.into(),
            caption: None,
        }
    }

    /// Sets the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Returns the attachment path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A message ready for delivery.
///
/// When attachments are present, `text` is rendered as the caption of the
/// first one; the attachments are delivered together as one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Destination thread inside the chat; 0 means the main thread.
    pub thread_id: i32,
    /// Message body (HTML markup).
    pub text: Option<String>,
    /// Media attachments, in display order.
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    /// A text-only message.
    pub fn text(thread_id: i32, text: impl Into<String>) -> Self {
        Self {
            thread_id,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    /// A message carrying media, with an optional body.
    pub fn media(thread_id: i32, text: Option<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            thread_id,
            text,
            attachments,
        }
    }

    /// True when nothing but text would be delivered.
    pub fn is_text_only(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Thread id, or `None` for the main thread.
    pub fn thread(&self) -> Option<i32> {
        (self.thread_id != 0).then_some(self.thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_thread_is_none() {
        let msg = OutboundMessage::text(0, "hello");
        assert!(msg.is_text_only());
        assert_eq!(msg.thread(), None);

        let msg = OutboundMessage::text(26, "hello");
        assert_eq!(msg.thread(), Some(26));
    }

    #[test]
    fn test_media_message() {
        let msg = OutboundMessage::media(
            3,
            None,
            vec![Attachment::video("/tmp/x_part1.mp4").with_caption("part 1 of 2")],
        );
        assert!(!msg.is_text_only());
        assert_eq!(msg.attachments[0].kind, AttachmentKind::Video);
        assert_eq!(msg.attachments[0].caption.as_deref(), Some("part 1 of 2"));
    }
}
