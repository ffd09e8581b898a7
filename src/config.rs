use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What to do with the text recognized on a photo.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhotoMode {
    /// Treat the recognized text as a question and answer it.
    #[default]
    Answer,
    /// Send the recognized text back as is.
    Text,
}

impl fmt::Display for PhotoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoMode::Answer => write!(f, "answer"),
            PhotoMode::Text => write!(f, "text"),
        }
    }
}

impl FromStr for PhotoMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "answer" => Ok(PhotoMode::Answer),
            "text" => Ok(PhotoMode::Text),
            other => bail!("Unknown photo mode '{}', expected 'answer' or 'text'", other),
        }
    }
}

#[derive(Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct YandexConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub folder_id: String,
    #[serde(default = "default_ocr_url")]
    pub ocr_url: String,
    #[serde(default = "default_gpt_url")]
    pub gpt_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl YandexConfig {
    /// `gpt://<folder>/<model>`, the model URI YandexGPT expects.
    pub fn model_uri(&self) -> String {
        format!("gpt://{}/{}", self.folder_id, self.model)
    }
}

impl Default for YandexConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            folder_id: String::new(),
            ocr_url: default_ocr_url(),
            gpt_url: default_gpt_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl fmt::Debug for YandexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YandexConfig")
            .field("api_key", &redact(&self.api_key))
            .field("folder_id", &self.folder_id)
            .field("ocr_url", &self.ocr_url)
            .field("gpt_url", &self.gpt_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Object storage bucket mounted into the function's filesystem.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: String,
    /// Key of the object holding the LLM system prompt.
    #[serde(default)]
    pub prompt_key: String,
    #[serde(default = "default_mount")]
    pub mount: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prompt_key: String::new(),
            mount: default_mount(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub photo_mode: PhotoMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            photo_mode: PhotoMode::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub yandex: YandexConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_ocr_url() -> String {
    "https://ocr.api.cloud.yandex.net/ocr/v1/recognizeText".to_string()
}

fn default_gpt_url() -> String {
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion".to_string()
}

fn default_model() -> String {
    "yandexgpt-lite".to_string()
}

fn default_temperature() -> f64 {
    0.6
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_mount() -> PathBuf {
    PathBuf::from("/function/storage")
}

fn default_port() -> u16 {
    8080
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then let the process
    /// environment override it. Fails if any required value is missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?,
            ),
            None => None,
        };
        Self::from_sources(content.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources<F>(toml_content: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = match toml_content {
            Some(content) => toml::from_str(content).context("Failed to parse config file")?,
            None => Config::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = get("SERVICE_ACCOUNT_API_KEY") {
            self.yandex.api_key = v;
        }
        if let Some(v) = get("FOLDER_ID") {
            self.yandex.folder_id = v;
        }
        if let Some(v) = get("OCR_API_URL") {
            self.yandex.ocr_url = v;
        }
        if let Some(v) = get("GPT_API_URL") {
            self.yandex.gpt_url = v;
        }
        if let Some(v) = get("GPT_MODEL") {
            self.yandex.model = v;
        }
        if let Some(v) = get("GPT_TEMPERATURE") {
            self.yandex.temperature = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid GPT_TEMPERATURE: {}", v))?;
        }
        if let Some(v) = get("GPT_MAX_TOKENS") {
            self.yandex.max_tokens = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid GPT_MAX_TOKENS: {}", v))?;
        }
        if let Some(v) = get("BUCKET_NAME") {
            self.storage.bucket = v;
        }
        if let Some(v) = get("BUCKET_OBJECT_GPT_INSTRUCTIONS_KEY") {
            self.storage.prompt_key = v;
        }
        if let Some(v) = get("STORAGE_MOUNT") {
            self.storage.mount = PathBuf::from(v);
        }
        if let Some(v) = get("PHOTO_MODE") {
            self.server.photo_mode = v.parse()?;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT: {}", v))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("TELEGRAM_BOT_TOKEN", &self.telegram.bot_token),
            ("SERVICE_ACCOUNT_API_KEY", &self.yandex.api_key),
            ("FOLDER_ID", &self.yandex.folder_id),
            ("BUCKET_NAME", &self.storage.bucket),
            ("BUCKET_OBJECT_GPT_INSTRUCTIONS_KEY", &self.storage.prompt_key),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            bail!("Missing required configuration: {}", missing.join(", "));
        }
        Ok(())
    }
}
