pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

/// The subset of a Telegram `Update` the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookUpdate {
    #[serde(default)]
    pub message: Option<InboundMessage>,
}

/// A message received through the webhook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub from: Option<Sender>,
    #[serde(default)]
    pub chat: Option<Chat>,
    #[serde(default)]
    pub text: Option<String>,
    /// Size variants of a single photo, smallest first.
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    /// Present when the photo is part of an album.
    #[serde(default)]
    pub media_group_id: Option<String>,
}

impl InboundMessage {
    /// Replies go to the sender; `chat.id` is only a fallback for updates
    /// without `from` (channel posts).
    pub fn chat_id(&self) -> Option<i64> {
        self.from
            .as_ref()
            .map(|s| s.id)
            .or_else(|| self.chat.as_ref().map(|c| c.id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: String,
    /// In UTF-16 code units.
    pub offset: usize,
    /// In UTF-16 code units.
    pub length: usize,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `text` to the chat and return the id of the sent message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32>;

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()>;

    /// Resolve a `file_id` to a path usable with [`Messenger::download`].
    async fn file_path(&self, file_id: &str) -> Result<String>;

    async fn download(&self, file_path: &str) -> Result<Vec<u8>>;
}
