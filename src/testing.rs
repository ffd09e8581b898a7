//! In-memory collaborators for exercising the webhook pipeline.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::error::BotError;
use crate::llm::AnswerGenerator;
use crate::ocr::TextRecognizer;
use crate::platform::Messenger;

/// Records every call; sends fail for texts listed in `fail_texts`.
pub struct FakeMessenger {
    next_id: AtomicI32,
    pub sent: Mutex<Vec<(i64, String)>>,
    pub deleted: Mutex<Vec<(i64, i32)>>,
    pub resolved: Mutex<Vec<String>>,
    fail_texts: Vec<String>,
    fail_delete: bool,
}

impl Default for FakeMessenger {
    fn default() -> Self {
        Self {
            next_id: AtomicI32::new(100),
            sent: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
            fail_texts: Vec::new(),
            fail_delete: false,
        }
    }
}

impl FakeMessenger {
    /// Sending any of `texts` fails.
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            fail_texts: texts.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Default::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i32> {
        if self.fail_texts.iter().any(|t| t == text) {
            bail!("429 Too Many Requests");
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<()> {
        if self.fail_delete {
            bail!("400 Bad Request: message to delete not found");
        }
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn file_path(&self, file_id: &str) -> Result<String> {
        self.resolved.lock().unwrap().push(file_id.to_string());
        Ok(format!("photos/{}.jpg", file_id))
    }

    async fn download(&self, _file_path: &str) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
}

/// Returns a fixed OCR result and counts calls.
pub struct FakeRecognizer {
    pub result: Result<Option<String>, BotError>,
    pub calls: AtomicI32,
}

impl FakeRecognizer {
    pub fn returning(result: Result<Option<String>, BotError>) -> Self {
        Self {
            result,
            calls: AtomicI32::new(0),
        }
    }

    pub fn calls(&self) -> i32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, _image: &[u8]) -> Result<Option<String>, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Returns a fixed answer and records the questions it was asked.
pub struct FakeAnswers {
    pub result: Result<String, BotError>,
    pub questions: Mutex<Vec<String>>,
}

impl FakeAnswers {
    pub fn returning(result: Result<String, BotError>) -> Self {
        Self {
            result,
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerGenerator for FakeAnswers {
    async fn answer(&self, question: &str) -> Result<String, BotError> {
        self.questions.lock().unwrap().push(question.to_string());
        self.result.clone()
    }
}
