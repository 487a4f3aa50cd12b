//! Follow-up questions about an analyzed document.
//!
//! A [`DocumentSession`] carries the sanitized document text and the conversation so far. It is
//! an explicit value: callers own it and pass it into [`ask`], nothing is kept globally.

use crate::analysis::{ModelOutput, parse_model_text, question_prompt};
use crate::backend::{Backend, BackendRequest};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output cap for answers.
pub const ANSWER_OUTPUT_TOKENS: u32 = 512;

const QUOTA_MESSAGE: &str =
    "Daily API quota exceeded. Please try again tomorrow or upgrade your plan.";

/// Errors raised before a question reaches the backend.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The question was blank.
    #[error("question must not be empty")]
    EmptyQuestion,
    /// The session holds no document text.
    #[error("no document has been analyzed for this session")]
    NoDocument,
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Question asked by the user.
    User,
    /// Answer produced by the backend.
    Assistant,
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who wrote the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

/// Document text plus the conversation about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSession {
    text: String,
    #[serde(default)]
    history: Vec<ChatTurn>,
}

impl DocumentSession {
    /// Start a session over analyzed text with an empty history.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_history(text, Vec::new())
    }

    /// Resume a session from previously recorded turns.
    pub fn with_history(text: impl Into<String>, history: Vec<ChatTurn>) -> Self {
        Self {
            text: text.into(),
            history,
        }
    }

    /// Document text questions are answered from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Turns recorded so far, oldest first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Forget the conversation but keep the document.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn push(&mut self, role: ChatRole, content: String) {
        self.history.push(ChatTurn { role, content });
    }
}

/// Answer `question` from the session's document and record both turns.
///
/// Backend failures do not fail the call; they come back as the assistant's message so the
/// conversation stays consistent.
pub async fn ask(
    backend: &dyn Backend,
    session: &mut DocumentSession,
    question: &str,
) -> Result<ChatTurn, SessionError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(SessionError::EmptyQuestion);
    }
    if session.text.trim().is_empty() {
        return Err(SessionError::NoDocument);
    }

    session.push(ChatRole::User, question.to_string());
    let prompt = question_prompt(&session.text, question);
    let answer = match backend
        .invoke(BackendRequest::new(prompt, ANSWER_OUTPUT_TOKENS))
        .await
    {
        Ok(text) => render_answer(parse_model_text(&text)),
        Err(error) if error.is_quota_exhausted() => {
            tracing::warn!(
                provider = backend.provider(),
                error = %error,
                "Quota exhausted while answering"
            );
            QUOTA_MESSAGE.to_string()
        }
        Err(error) => {
            tracing::warn!(
                provider = backend.provider(),
                error = %error,
                "Failed to answer question"
            );
            format!("Sorry, I encountered an error: {error}")
        }
    };

    session.push(ChatRole::Assistant, answer.clone());
    Ok(ChatTurn {
        role: ChatRole::Assistant,
        content: answer,
    })
}

fn render_answer(output: ModelOutput) -> String {
    match output {
        ModelOutput::Raw(text) => text,
        ModelOutput::Structured(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        }
        ModelOutput::Error(message) => format!("Sorry, I encountered an error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubBackend {
        reply: Mutex<Option<Result<String, BackendError>>>,
        prompts: Mutex<Vec<BackendRequest>>,
    }

    impl StubBackend {
        fn replying(reply: Result<String, BackendError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError> {
            self.prompts.lock().unwrap().push(request);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok("again".into()))
        }

        fn provider(&self) -> &'static str {
            "stub"
        }
    }

    #[tokio::test]
    async fn records_question_and_answer() {
        let backend = StubBackend::replying(Ok("You can cancel anytime.".into()));
        let mut session = DocumentSession::new("Users may cancel at any time.");

        let turn = ask(&backend, &mut session, "  Can I cancel?  ")
            .await
            .expect("answer");

        assert_eq!(turn.content, "You can cancel anytime.");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, ChatRole::User);
        assert_eq!(session.history()[0].content, "Can I cancel?");

        let requests = backend.prompts.lock().unwrap();
        assert_eq!(requests[0].max_output_tokens, ANSWER_OUTPUT_TOKENS);
        assert!(requests[0].prompt.contains("Users may cancel at any time."));
        assert!(requests[0].prompt.contains("Question: Can I cancel?"));
    }

    #[tokio::test]
    async fn quota_exhaustion_becomes_an_assistant_message() {
        let backend = StubBackend::replying(Err(BackendError::QuotaExhausted("429".into())));
        let mut session = DocumentSession::new("Some terms.");

        let turn = ask(&backend, &mut session, "Fees?").await.expect("turn");

        assert_eq!(turn.content, QUOTA_MESSAGE);
        assert_eq!(session.history()[1], turn);
    }

    #[tokio::test]
    async fn other_failures_are_reported_as_apologies() {
        let backend = StubBackend::replying(Err(BackendError::GenerationFailed("boom".into())));
        let mut session = DocumentSession::new("Some terms.");

        let turn = ask(&backend, &mut session, "Fees?").await.expect("turn");
        assert!(turn.content.starts_with("Sorry, I encountered an error:"));
        assert!(turn.content.contains("boom"));
    }

    #[tokio::test]
    async fn structured_answers_are_rendered_as_text() {
        let backend = StubBackend::replying(Ok("{\"answer\": \"yes\"}".into()));
        let mut session = DocumentSession::new("Some terms.");

        let turn = ask(&backend, &mut session, "Refunds?").await.expect("turn");
        assert!(turn.content.contains("\"answer\": \"yes\""));
    }

    #[tokio::test]
    async fn rejects_blank_questions_without_calling_the_backend() {
        let backend = StubBackend::replying(Ok("unused".into()));
        let mut session = DocumentSession::new("Some terms.");

        let err = ask(&backend, &mut session, "   ").await.unwrap_err();
        assert_eq!(err, SessionError::EmptyQuestion);
        assert!(session.history().is_empty());
        assert!(backend.prompts.lock().unwrap().is_empty());

        let mut empty = DocumentSession::default();
        let err = ask(&backend, &mut empty, "Fees?").await.unwrap_err();
        assert_eq!(err, SessionError::NoDocument);
    }

    #[test]
    fn clear_history_keeps_the_document() {
        let mut session = DocumentSession::with_history(
            "Terms.",
            vec![ChatTurn {
                role: ChatRole::User,
                content: "Hi".into(),
            }],
        );
        session.clear_history();
        assert!(session.history().is_empty());
        assert_eq!(session.text(), "Terms.");
    }
}
