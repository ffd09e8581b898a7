use thiserror::Error;

use crate::messages;

/// Everything that can go wrong while answering a single message.
///
/// Each variant maps to a fixed chat reply via [`BotError::user_message`];
/// the optional detail is only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotError {
    #[error("unsupported input")]
    UnsupportedInput,
    #[error("only one photo supported")]
    MultiplePhotos,
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("failed to resolve file path: {0}")]
    FileResolution(String),
    #[error("failed to download photo: {0}")]
    Download(String),
    #[error("text recognition failed: {0}")]
    Recognition(String),
    #[error("no text recognized on photo")]
    NoTextRecognized,
    #[error("no final answer in completion response")]
    AnswerUnavailable,
    #[error("transport error: {0}")]
    Transport(String),
}

impl BotError {
    pub fn user_message(&self) -> &'static str {
        match self {
            BotError::UnsupportedInput => messages::INCORRECT_INPUT,
            BotError::MultiplePhotos => messages::MULTIPLE_PHOTOS,
            BotError::UnknownCommand(_) => messages::UNKNOWN_COMMAND,
            BotError::FileResolution(_) => messages::PHOTO_PROCESSING_ERROR,
            BotError::Download(_) => messages::PHOTO_DOWNLOAD_ERROR,
            BotError::Recognition(_) => messages::OCR_RECOGNITION_ERROR,
            BotError::NoTextRecognized => messages::NO_TEXT_RECOGNIZED,
            BotError::AnswerUnavailable | BotError::Transport(_) => messages::NO_ANSWER,
        }
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        BotError::Transport(e.to_string())
    }
}
