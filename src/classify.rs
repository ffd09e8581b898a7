use crate::error::BotError;
use crate::messages;
use crate::platform::{InboundMessage, PhotoSize};

const BOT_COMMAND: &str = "bot_command";

/// What the bot should do with an inbound message.
#[derive(Debug, Clone)]
pub enum Intent {
    Command(String),
    Text(String),
    Photo(Vec<PhotoSize>),
    Error(BotError),
}

impl Intent {
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Command(_) => "command",
            Intent::Text(_) => "text",
            Intent::Photo(_) => "photo",
            Intent::Error(_) => "error",
        }
    }
}

pub fn classify(message: &InboundMessage) -> Intent {
    if let Some(photo) = message.photo.as_ref().filter(|p| !p.is_empty()) {
        if message.media_group_id.is_some() {
            return Intent::Error(BotError::MultiplePhotos);
        }
        return Intent::Photo(photo.clone());
    }

    if let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) {
        let command = message
            .entities
            .iter()
            .find(|e| e.kind == BOT_COMMAND)
            .map(|e| utf16_substring(text, e.offset, e.length));

        return match command {
            Some(token) => Intent::Command(token),
            None => Intent::Text(text.to_string()),
        };
    }

    Intent::Error(BotError::UnsupportedInput)
}

/// Static reply for a command token.
pub fn command_reply(token: &str) -> Result<&'static str, BotError> {
    match token {
        "/start" | "/help" => Ok(messages::START_HELP),
        other => Err(BotError::UnknownCommand(other.to_string())),
    }
}

/// Slice `text` by UTF-16 code units, clamping out-of-range bounds.
fn utf16_substring(text: &str, offset: usize, length: usize) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let start = offset.min(units.len());
    let end = offset.saturating_add(length).min(units.len());
    String::from_utf16_lossy(&units[start..end])
}
