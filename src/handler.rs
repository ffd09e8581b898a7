use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::classify::{classify, command_reply, Intent};
use crate::config::PhotoMode;
use crate::llm::AnswerGenerator;
use crate::messages;
use crate::ocr::{PhotoProcessor, TextRecognizer};
use crate::platform::{Messenger, PhotoSize, WebhookUpdate};

/// Status and plain-text body returned for one webhook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    fn failed(e: &anyhow::Error) -> Self {
        Self {
            status: 500,
            body: format!("{}: {:#}", messages::INTERNAL_ERROR, e),
        }
    }
}

/// A "working on it" message that is removed once the real reply is ready.
struct InterimNotice<'a> {
    messenger: &'a dyn Messenger,
    chat_id: i64,
    message_id: Option<i32>,
}

impl<'a> InterimNotice<'a> {
    async fn post(messenger: &'a dyn Messenger, chat_id: i64, text: &str) -> InterimNotice<'a> {
        let message_id = match messenger.send_message(chat_id, text).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to post interim notice to chat {}: {:#}", chat_id, e);
                None
            }
        };
        Self {
            messenger,
            chat_id,
            message_id,
        }
    }

    /// Never fails; a notice that cannot be deleted is only logged.
    async fn dismiss(self) {
        let Some(message_id) = self.message_id else {
            return;
        };
        if let Err(e) = self.messenger.delete_message(self.chat_id, message_id).await {
            warn!(
                "Failed to delete interim notice {} in chat {}: {:#}",
                message_id, self.chat_id, e
            );
        }
    }
}

/// Runs the whole pipeline for one webhook call.
pub struct Handler {
    messenger: Arc<dyn Messenger>,
    photos: PhotoProcessor,
    answers: Arc<dyn AnswerGenerator>,
    photo_mode: PhotoMode,
}

impl Handler {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        recognizer: Arc<dyn TextRecognizer>,
        answers: Arc<dyn AnswerGenerator>,
        photo_mode: PhotoMode,
    ) -> Self {
        Self {
            photos: PhotoProcessor::new(messenger.clone(), recognizer),
            messenger,
            answers,
            photo_mode,
        }
    }

    /// Handle a raw webhook body. Only unexpected failures produce a 500.
    pub async fn handle(&self, body: &str) -> WebhookResponse {
        match self.process(body).await {
            Ok(reply) => WebhookResponse::ok(reply),
            Err(e) => {
                error!("Failed to process update: {:#}", e);
                WebhookResponse::failed(&e)
            }
        }
    }

    async fn process(&self, body: &str) -> Result<&'static str> {
        let update: WebhookUpdate =
            serde_json::from_str(body).context("Malformed webhook body")?;

        let Some(message) = update.message else {
            info!("Update without a message, skipping");
            return Ok(messages::NO_MESSAGE);
        };

        let chat_id = message.chat_id().context("Message has no sender")?;
        let intent = classify(&message);
        info!("Message from chat {} classified as {}", chat_id, intent.kind());

        self.respond(chat_id, intent).await;
        Ok(messages::PROCESSED)
    }

    async fn respond(&self, chat_id: i64, intent: Intent) {
        match intent {
            Intent::Command(token) => {
                let reply = command_reply(&token).unwrap_or_else(|e| {
                    info!("{}", e);
                    e.user_message()
                });
                self.send(chat_id, reply).await
            }
            Intent::Text(question) => self.answer(chat_id, &question).await,
            Intent::Photo(sizes) => self.photo(chat_id, &sizes).await,
            Intent::Error(e) => {
                warn!("Rejected message from chat {}: {}", chat_id, e);
                self.send(chat_id, e.user_message()).await
            }
        }
    }

    async fn answer(&self, chat_id: i64, question: &str) {
        let notice =
            InterimNotice::post(self.messenger.as_ref(), chat_id, messages::ANSWERING_NOTICE).await;
        let result = self.answers.answer(question).await;
        notice.dismiss().await;

        let reply = match result {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error getting answer from GPT: {}", e);
                e.user_message().to_string()
            }
        };
        self.send(chat_id, &reply).await
    }

    async fn photo(&self, chat_id: i64, sizes: &[PhotoSize]) {
        let notice =
            InterimNotice::post(self.messenger.as_ref(), chat_id, messages::RECOGNIZING_NOTICE)
                .await;
        let result = self.photos.text_from_photo(sizes).await;
        notice.dismiss().await;

        match result {
            Ok(text) => match self.photo_mode {
                PhotoMode::Answer => self.answer(chat_id, &text).await,
                PhotoMode::Text => self.send(chat_id, &text).await,
            },
            Err(e) => {
                warn!("Photo processing failed for chat {}: {}", chat_id, e);
                self.send(chat_id, e.user_message()).await
            }
        }
    }

    /// A reply that cannot be delivered (blocked bot, deleted chat) is
    /// logged; the update still counts as processed.
    async fn send(&self, chat_id: i64, text: &str) {
        info!("Sending message to chat {}: {}", chat_id, text);
        if let Err(e) = self.messenger.send_message(chat_id, text).await {
            error!("Failed to send reply to chat {}: {:#}", chat_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::testing::{FakeAnswers, FakeMessenger, FakeRecognizer};

    struct Harness {
        messenger: Arc<FakeMessenger>,
        recognizer: Arc<FakeRecognizer>,
        answers: Arc<FakeAnswers>,
        handler: Handler,
    }

    fn harness_with(
        messenger: FakeMessenger,
        ocr: Result<Option<String>, BotError>,
        answer: Result<String, BotError>,
        photo_mode: PhotoMode,
    ) -> Harness {
        let messenger = Arc::new(messenger);
        let recognizer = Arc::new(FakeRecognizer::returning(ocr));
        let answers = Arc::new(FakeAnswers::returning(answer));
        let handler = Handler::new(
            messenger.clone(),
            recognizer.clone(),
            answers.clone(),
            photo_mode,
        );
        Harness {
            messenger,
            recognizer,
            answers,
            handler,
        }
    }

    fn harness() -> Harness {
        harness_with(
            FakeMessenger::default(),
            Ok(Some("Что такое IaaS?".to_string())),
            Ok("IaaS - это инфраструктура как услуга.".to_string()),
            PhotoMode::Answer,
        )
    }

    const START: &str = r#"{"message": {"from": {"id": 1}, "text": "/start",
        "entities": [{"type": "bot_command", "offset": 0, "length": 6}]}}"#;

    const ALBUM: &str =
        r#"{"message": {"from": {"id": 1}, "photo": [{"file_id": "a"}], "media_group_id": "g1"}}"#;

    const PHOTO: &str = r#"{"message": {"from": {"id": 7},
        "photo": [{"file_id": "small"}, {"file_id": "medium"}, {"file_id": "large"}]}}"#;

    const QUESTION: &str = r#"{"message": {"from": {"id": 5}, "text": "Что такое PaaS?"}}"#;

    #[tokio::test]
    async fn test_start_command_replies_with_help() {
        let h = harness();
        let response = h.handler.handle(START).await;

        assert_eq!(response, WebhookResponse::ok(messages::PROCESSED));
        assert_eq!(
            *h.messenger.sent.lock().unwrap(),
            vec![(1, messages::START_HELP.to_string())]
        );
        assert!(h.answers.questions().is_empty());
    }

    #[tokio::test]
    async fn test_help_command_replies_with_help() {
        let h = harness();
        let body = r#"{"message": {"from": {"id": 1}, "text": "/help",
            "entities": [{"type": "bot_command", "offset": 0, "length": 5}]}}"#;
        h.handler.handle(body).await;
        assert_eq!(h.messenger.texts(), vec![messages::START_HELP.to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let h = harness();
        let body = r#"{"message": {"from": {"id": 1}, "text": "/weather now",
            "entities": [{"type": "bot_command", "offset": 0, "length": 8}]}}"#;
        let response = h.handler.handle(body).await;

        assert_eq!(response.status, 200);
        assert_eq!(h.messenger.texts(), vec![messages::UNKNOWN_COMMAND.to_string()]);
        assert!(h.messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_album_is_rejected_without_ocr() {
        let h = harness();
        let response = h.handler.handle(ALBUM).await;

        assert_eq!(response.status, 200);
        assert_eq!(h.messenger.texts(), vec![messages::MULTIPLE_PHOTOS.to_string()]);
        assert_eq!(h.recognizer.calls(), 0);
        assert!(h.messenger.resolved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_text_question_is_answered() {
        let h = harness();
        let response = h.handler.handle(QUESTION).await;

        assert_eq!(response, WebhookResponse::ok(messages::PROCESSED));
        assert_eq!(h.answers.questions(), vec!["Что такое PaaS?".to_string()]);
        assert_eq!(
            h.messenger.texts(),
            vec![
                messages::ANSWERING_NOTICE.to_string(),
                "IaaS - это инфраструктура как услуга.".to_string(),
            ]
        );
        assert_eq!(*h.messenger.deleted.lock().unwrap(), vec![(5, 100)]);
    }

    #[tokio::test]
    async fn test_missing_answer_uses_fallback() {
        for answer in [
            Err(BotError::AnswerUnavailable),
            Err(BotError::Transport("connection refused".to_string())),
        ] {
            let h = harness_with(
                FakeMessenger::default(),
                Ok(None),
                answer,
                PhotoMode::Answer,
            );
            let response = h.handler.handle(QUESTION).await;

            assert_eq!(response.status, 200);
            assert_eq!(h.answers.questions().len(), 1);
            assert_eq!(
                h.messenger.texts().last().map(String::as_str),
                Some(messages::NO_ANSWER)
            );
        }
    }

    #[tokio::test]
    async fn test_photo_is_recognized_then_answered() {
        let h = harness();
        let response = h.handler.handle(PHOTO).await;

        assert_eq!(response.status, 200);
        assert_eq!(*h.messenger.resolved.lock().unwrap(), vec!["large".to_string()]);
        assert_eq!(h.recognizer.calls(), 1);
        assert_eq!(h.answers.questions(), vec!["Что такое IaaS?".to_string()]);
        assert_eq!(
            h.messenger.texts(),
            vec![
                messages::RECOGNIZING_NOTICE.to_string(),
                messages::ANSWERING_NOTICE.to_string(),
                "IaaS - это инфраструктура как услуга.".to_string(),
            ]
        );
        assert_eq!(*h.messenger.deleted.lock().unwrap(), vec![(7, 100), (7, 101)]);
    }

    #[tokio::test]
    async fn test_photo_text_mode_sends_recognized_text() {
        let h = harness_with(
            FakeMessenger::default(),
            Ok(Some("Что такое IaaS?".to_string())),
            Ok("unused".to_string()),
            PhotoMode::Text,
        );
        h.handler.handle(PHOTO).await;

        assert!(h.answers.questions().is_empty());
        assert_eq!(
            h.messenger.texts(),
            vec![
                messages::RECOGNIZING_NOTICE.to_string(),
                "Что такое IaaS?".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_photo_without_text() {
        let h = harness_with(
            FakeMessenger::default(),
            Ok(Some(String::new())),
            Ok("unused".to_string()),
            PhotoMode::Answer,
        );
        let response = h.handler.handle(PHOTO).await;

        assert_eq!(response.status, 200);
        assert!(h.answers.questions().is_empty());
        assert_eq!(
            h.messenger.texts().last().map(String::as_str),
            Some(messages::NO_TEXT_RECOGNIZED)
        );
        assert_eq!(h.messenger.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ocr_failure_message() {
        let h = harness_with(
            FakeMessenger::default(),
            Err(BotError::Recognition("500".to_string())),
            Ok("unused".to_string()),
            PhotoMode::Answer,
        );
        h.handler.handle(PHOTO).await;
        assert_eq!(
            h.messenger.texts().last().map(String::as_str),
            Some(messages::OCR_RECOGNITION_ERROR)
        );
    }

    #[tokio::test]
    async fn test_delete_failure_is_ignored() {
        let h = harness_with(
            FakeMessenger::failing_delete(),
            Ok(None),
            Ok("ответ".to_string()),
            PhotoMode::Answer,
        );
        let response = h.handler.handle(QUESTION).await;

        assert_eq!(response.status, 200);
        assert_eq!(h.messenger.texts().last().map(String::as_str), Some("ответ"));
    }

    #[tokio::test]
    async fn test_notice_failure_does_not_stop_answer() {
        let h = harness_with(
            FakeMessenger::failing_on(&[messages::ANSWERING_NOTICE]),
            Ok(None),
            Ok("ответ".to_string()),
            PhotoMode::Answer,
        );
        let response = h.handler.handle(QUESTION).await;

        assert_eq!(response.status, 200);
        assert_eq!(h.messenger.texts(), vec!["ответ".to_string()]);
        assert!(h.messenger.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_input() {
        let h = harness();
        let body = r#"{"message": {"from": {"id": 3}, "sticker": {"file_id": "s"}}}"#;
        let response = h.handler.handle(body).await;

        assert_eq!(response.status, 200);
        assert_eq!(h.messenger.texts(), vec![messages::INCORRECT_INPUT.to_string()]);
    }

    #[tokio::test]
    async fn test_update_without_message() {
        let h = harness();
        let response = h.handler.handle(r#"{"update_id": 1}"#).await;

        assert_eq!(response, WebhookResponse::ok(messages::NO_MESSAGE));
        assert!(h.messenger.texts().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_500() {
        let h = harness();
        let response = h.handler.handle("not json").await;

        assert_eq!(response.status, 500);
        assert!(response.body.starts_with(messages::INTERNAL_ERROR));
        assert!(h.messenger.texts().is_empty());
    }

    #[tokio::test]
    async fn test_message_without_sender_is_500() {
        let h = harness();
        let response = h.handler.handle(r#"{"message": {"text": "hi"}}"#).await;

        assert_eq!(response.status, 500);
        assert!(h.messenger.texts().is_empty());
    }

    #[tokio::test]
    async fn test_undeliverable_reply_still_acknowledged() {
        let h = harness_with(
            FakeMessenger::failing_on(&[messages::START_HELP]),
            Ok(None),
            Ok("unused".to_string()),
            PhotoMode::Answer,
        );
        let response = h.handler.handle(START).await;

        assert_eq!(response, WebhookResponse::ok(messages::PROCESSED));
        assert!(h.messenger.texts().is_empty());
    }

    #[tokio::test]
    async fn test_undeliverable_answer_still_acknowledged() {
        let h = harness_with(
            FakeMessenger::failing_on(&["ответ"]),
            Ok(None),
            Ok("ответ".to_string()),
            PhotoMode::Answer,
        );
        let response = h.handler.handle(QUESTION).await;

        assert_eq!(response, WebhookResponse::ok(messages::PROCESSED));
        assert_eq!(h.answers.questions().len(), 1);
        assert_eq!(h.messenger.texts(), vec![messages::ANSWERING_NOTICE.to_string()]);
        assert_eq!(*h.messenger.deleted.lock().unwrap(), vec![(5, 100)]);
    }

    #[tokio::test]
    async fn test_repeated_body_is_handled_twice() {
        let h = harness();
        h.handler.handle(QUESTION).await;
        h.handler.handle(QUESTION).await;

        assert_eq!(h.answers.questions().len(), 2);
        assert_eq!(h.messenger.texts().len(), 4);
        assert_eq!(*h.messenger.deleted.lock().unwrap(), vec![(5, 100), (5, 102)]);
    }
}
