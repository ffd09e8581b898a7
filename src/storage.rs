use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::StorageConfig;

/// Source of the system prompt sent with every completion request.
#[async_trait]
pub trait PromptSource: Send + Sync {
    async fn system_prompt(&self) -> Result<String>;
}

/// Reads one object from a bucket mounted at `<mount>/<bucket>/`.
pub struct BucketPromptStore {
    path: PathBuf,
}

impl BucketPromptStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            path: config.mount.join(&config.bucket).join(&config.prompt_key),
        }
    }
}

#[async_trait]
impl PromptSource for BucketPromptStore {
    /// A missing object yields an empty prompt.
    async fn system_prompt(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                debug!("Loaded system prompt ({} bytes)", content.len());
                Ok(content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("System prompt object not found: {}", self.path.display());
                Ok(String::new())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read system prompt: {}", self.path.display())),
        }
    }
}
