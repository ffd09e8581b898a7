use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, MessageId};
use tracing::debug;

use super::Messenger;

/// Telegram's hard limit is 4096 characters; leave some headroom.
const MAX_MESSAGE_LEN: usize = 4000;

/// Split long messages for Telegram's 4096 char limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// [`Messenger`] backed by the Telegram Bot API.
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32> {
        let mut last_id = None;
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let sent = self
                .bot
                .send_message(ChatId(chat_id), chunk)
                .await
                .with_context(|| format!("Failed to send message to chat {}", chat_id))?;
            last_id = Some(sent.id.0);
        }
        last_id.context("Nothing was sent")
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .with_context(|| {
                format!("Failed to delete message {} in chat {}", message_id, chat_id)
            })?;
        Ok(())
    }

    async fn file_path(&self, file_id: &str) -> Result<String> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .with_context(|| format!("getFile failed for {}", file_id))?;
        debug!("Resolved file {} to {}", file_id, file.path);
        Ok(file.path)
    }

    async fn download(&self, file_path: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.bot
            .download_file(file_path, &mut buf)
            .await
            .with_context(|| format!("Failed to download {}", file_path))?;
        Ok(buf)
    }
}
