mod classify;
mod config;
mod error;
mod handler;
mod llm;
mod messages;
mod ocr;
mod platform;
mod server;
mod storage;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handler::Handler;
use crate::llm::GptClient;
use crate::ocr::OcrClient;
use crate::platform::telegram::TelegramMessenger;
use crate::storage::BucketPromptStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ocrbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional TOML file; the environment always wins
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("Loading configuration from environment"),
    }
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Model: {}", config.yandex.model_uri());
    info!("  Photo mode: {}", config.server.photo_mode);
    info!(
        "  Prompt object: {}/{}",
        config.storage.bucket, config.storage.prompt_key
    );

    let http = reqwest::Client::new();
    let prompts = Arc::new(BucketPromptStore::new(&config.storage));
    let handler = Arc::new(Handler::new(
        Arc::new(TelegramMessenger::new(&config.telegram.bot_token)),
        Arc::new(OcrClient::new(http.clone(), config.yandex.clone())),
        Arc::new(GptClient::new(http, config.yandex.clone(), prompts)),
        config.server.photo_mode,
    ));

    info!("Bot is starting...");
    server::serve(handler, config.server.port).await
}
