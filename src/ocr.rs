use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::YandexConfig;
use crate::error::BotError;
use crate::platform::{Messenger, PhotoSize};

const MIME_TYPE: &str = "image/jpeg";
const LANGUAGE_CODES: [&str; 2] = ["ru", "en"];

/// Recognizes text on an image.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// `Ok(None)` when the service answered but found no text field.
    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, BotError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    content: String,
    mime_type: &'a str,
    language_codes: &'a [&'a str],
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    result: RecognizeResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeResult {
    #[serde(default)]
    text_annotation: Option<TextAnnotation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextAnnotation {
    #[serde(default)]
    full_text: Option<String>,
}

impl RecognizeResponse {
    fn full_text(self) -> Option<String> {
        self.result.text_annotation.and_then(|a| a.full_text)
    }
}

/// Yandex Vision OCR client.
pub struct OcrClient {
    client: reqwest::Client,
    config: YandexConfig,
}

impl OcrClient {
    pub fn new(client: reqwest::Client, config: YandexConfig) -> Self {
        Self { client, config }
    }
}

fn build_request(image: &[u8]) -> RecognizeRequest<'static> {
    RecognizeRequest {
        content: STANDARD.encode(image),
        mime_type: MIME_TYPE,
        language_codes: &LANGUAGE_CODES,
    }
}

#[async_trait]
impl TextRecognizer for OcrClient {
    async fn recognize(&self, image: &[u8]) -> Result<Option<String>, BotError> {
        let request = build_request(image);

        debug!("Sending {} bytes to OCR: {}", image.len(), self.config.ocr_url);

        let response = self
            .client
            .post(&self.config.ocr_url)
            .header("Authorization", format!("Api-Key {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BotError::Recognition(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BotError::Recognition(format!(
                "OCR API error ({}): {}",
                status, error_body
            )));
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| BotError::Recognition(e.to_string()))?;
        Ok(parsed.full_text())
    }
}

/// Turns a photo message into the text written on it.
pub struct PhotoProcessor {
    messenger: Arc<dyn Messenger>,
    recognizer: Arc<dyn TextRecognizer>,
}

impl PhotoProcessor {
    pub fn new(messenger: Arc<dyn Messenger>, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            messenger,
            recognizer,
        }
    }

    /// Only the last size variant is used: Telegram lists sizes smallest
    /// first, so the last one is the largest.
    pub async fn text_from_photo(&self, photo: &[PhotoSize]) -> Result<String, BotError> {
        let largest = photo.last().ok_or(BotError::UnsupportedInput)?;
        debug!(
            "Using photo variant {}x{} of {}",
            largest.width,
            largest.height,
            photo.len()
        );

        let file_path = self
            .messenger
            .file_path(&largest.file_id)
            .await
            .map_err(|e| {
                error!("Failed to get file path for {}: {:#}", largest.file_id, e);
                BotError::FileResolution(e.to_string())
            })?;

        let image = self.messenger.download(&file_path).await.map_err(|e| {
            error!("Failed to download image {}: {:#}", file_path, e);
            BotError::Download(e.to_string())
        })?;
        if image.is_empty() {
            return Err(BotError::Download(format!("{} is empty", file_path)));
        }

        let text = self.recognizer.recognize(&image).await?;
        match text {
            Some(text) if !text.is_empty() => {
                info!("Recognized {} chars on photo", text.chars().count());
                Ok(text)
            }
            _ => Err(BotError::NoTextRecognized),
        }
    }
}
