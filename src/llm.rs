use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::YandexConfig;
use crate::error::BotError;
use crate::storage::PromptSource;

const FINAL_STATUS: &str = "ALTERNATIVE_STATUS_FINAL";

/// Produces an answer for a user's question.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String, BotError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    result: CompletionResult,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    message: ChatMessage,
    #[serde(default)]
    status: String,
}

impl CompletionResponse {
    /// Text of the first finished alternative, if it has any.
    fn final_answer(self) -> Option<String> {
        self.result
            .alternatives
            .into_iter()
            .find(|alt| alt.status == FINAL_STATUS)
            .map(|alt| alt.message.text)
            .filter(|text| !text.is_empty())
    }
}

/// YandexGPT foundation model client.
pub struct GptClient {
    client: reqwest::Client,
    config: YandexConfig,
    prompts: Arc<dyn PromptSource>,
}

impl GptClient {
    pub fn new(
        client: reqwest::Client,
        config: YandexConfig,
        prompts: Arc<dyn PromptSource>,
    ) -> Self {
        Self {
            client,
            config,
            prompts,
        }
    }

    fn build_request(&self, system_prompt: String, question: &str) -> CompletionRequest {
        CompletionRequest {
            model_uri: self.config.model_uri(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    text: system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    text: question.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl AnswerGenerator for GptClient {
    async fn answer(&self, question: &str) -> Result<String, BotError> {
        let system_prompt = match self.prompts.system_prompt().await {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Using empty system prompt: {:#}", e);
                String::new()
            }
        };
        let request = self.build_request(system_prompt, question);

        debug!("Sending completion request to {}", self.config.gpt_url);

        let response = self
            .client
            .post(&self.config.gpt_url)
            .header("Authorization", format!("Api-Key {}", self.config.api_key))
            .header("x-folder-id", &self.config.folder_id)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BotError::Transport(format!(
                "YandexGPT API error ({}): {}",
                status, error_body
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        completion.final_answer().ok_or(BotError::AnswerUnavailable)
    }
}
