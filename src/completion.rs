//! Chat-completion invocation
//!
//! [`ChatBackend`] is the seam between request handling and the provider.
//! [`invoke`] issues exactly one call and joins the returned choices.

use crate::conversation::Conversation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure during a completion call
///
/// Display output is the underlying error text with no prefix, since it may
/// be returned verbatim as a response body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Network failure reaching the provider
    #[error("{0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// Provider answered 2xx with a body that is not a chat completion
    #[error("{0}")]
    MalformedResponse(String),
}

/// Assistant message inside a choice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One completion candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl Choice {
    /// A choice carrying assistant text
    pub fn text(index: u32, content: impl Into<String>) -> Self {
        Self {
            index,
            message: ChoiceMessage {
                role: Some("assistant".to_string()),
                content: Some(content.into()),
            },
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Text content, empty when the provider sent none
    pub fn content(&self) -> &str {
        self.message.content.as_deref().unwrap_or("")
    }
}

/// Provider response to a chat-completion request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletions {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ChatCompletions {
    /// Build a response from plain choice texts, in order
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Choice::text(i as u32, text))
            .collect();
        Self {
            choices,
            ..Self::default()
        }
    }

    /// Every choice's content in returned order, no separator
    pub fn concatenated_text(&self) -> String {
        self.choices.iter().map(Choice::content).collect()
    }

    /// Content of the first choice, or empty
    pub fn first_text(&self) -> String {
        self.choices
            .first()
            .map(|c| c.content().to_string())
            .unwrap_or_default()
    }
}

/// Something that can answer a chat-completion request
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat_completions(
        &self,
        deployment: &str,
        conversation: &Conversation,
    ) -> Result<ChatCompletions, CompletionError>;
}

/// Issue one completion call and concatenate the returned choices
///
/// No retry and no timeout beyond the transport's own.
pub async fn invoke(
    backend: &dyn ChatBackend,
    deployment: &str,
    conversation: &Conversation,
) -> Result<String, CompletionError> {
    tracing::debug!(
        deployment = %deployment,
        message_count = conversation.len(),
        "Invoking chat completion"
    );

    let completions = backend
        .chat_completions(deployment, conversation)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Chat completion failed"))?;

    let text = completions.concatenated_text();
    tracing::debug!(
        choice_count = completions.choices.len(),
        response_length = text.len(),
        "Chat completion succeeded"
    );
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend(Result<ChatCompletions, CompletionError>);

    #[async_trait]
    impl ChatBackend for FixedBackend {
        async fn chat_completions(
            &self,
            _deployment: &str,
            _conversation: &Conversation,
        ) -> Result<ChatCompletions, CompletionError> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_invoke_concatenates_choices_in_order() {
        let backend = FixedBackend(Ok(ChatCompletions::from_texts(["Arr, ", "matey!"])));
        let text = invoke(&backend, "gpt-4o", &Conversation::single_user("hi"))
            .await
            .unwrap();
        assert_eq!(text, "Arr, matey!");
    }

    #[tokio::test]
    async fn test_invoke_with_zero_choices_returns_empty() {
        let backend = FixedBackend(Ok(ChatCompletions::default()));
        let text = invoke(&backend, "gpt-4o", &Conversation::single_user("hi"))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_invoke_propagates_error_text() {
        let backend = FixedBackend(Err(CompletionError::Transport(
            "connection refused".to_string(),
        )));
        let err = invoke(&backend, "gpt-4o", &Conversation::single_user("hi"))
            .await
            .expect_err("backend fails");
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_choice_without_content_contributes_nothing() {
        let completions = ChatCompletions {
            choices: vec![
                Choice::text(0, "a"),
                Choice::default(),
                Choice::text(2, "b"),
            ],
            ..ChatCompletions::default()
        };
        assert_eq!(completions.concatenated_text(), "ab");
        assert_eq!(completions.first_text(), "a");
    }

    #[test]
    fn test_provider_error_displays_message_only() {
        let err = CompletionError::Provider {
            status: 429,
            message: "Rate limit exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn test_deserialize_provider_response() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Ahoy"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": null}, "finish_reason": "content_filter"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let completions: ChatCompletions = serde_json::from_str(json).expect("should parse");
        assert_eq!(completions.choices.len(), 2);
        assert_eq!(completions.concatenated_text(), "Ahoy");
    }
}
