//! Listener-instrumented chat model
//!
//! Backs `/askAILangChain4j`. Unlike the `/askAI` path, the caller's message
//! is sent on its own with no persona preamble, only the first choice is
//! returned, and registered listeners observe each call.

use crate::completion::{ChatBackend, ChatCompletions, CompletionError};
use crate::conversation::Conversation;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-call scratch space shared by a listener's hooks
pub type Attributes = HashMap<String, serde_json::Value>;

/// What is about to be sent
#[derive(Debug, Clone)]
pub struct ChatModelRequest {
    pub deployment: String,
    pub conversation: Conversation,
}

pub struct RequestContext<'a> {
    pub request: &'a ChatModelRequest,
    pub attributes: &'a mut Attributes,
}

pub struct ResponseContext<'a> {
    pub request: &'a ChatModelRequest,
    pub response: &'a ChatCompletions,
    pub attributes: &'a mut Attributes,
}

pub struct ErrorContext<'a> {
    pub request: &'a ChatModelRequest,
    pub error: &'a CompletionError,
    pub attributes: &'a mut Attributes,
}

/// Lifecycle hooks around a chat-model call
///
/// All hooks default to doing nothing.
pub trait ChatModelListener: Send + Sync {
    fn on_request(&self, _context: &mut RequestContext<'_>) {}

    fn on_response(&self, _context: &mut ResponseContext<'_>) {}

    fn on_error(&self, _context: &mut ErrorContext<'_>) {}
}

/// Listener that emits debug events for each hook
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ChatModelListener for LoggingListener {
    fn on_request(&self, context: &mut RequestContext<'_>) {
        tracing::debug!(
            deployment = %context.request.deployment,
            message_count = context.request.conversation.len(),
            "Chat model request"
        );
    }

    fn on_response(&self, context: &mut ResponseContext<'_>) {
        tracing::debug!(
            deployment = %context.request.deployment,
            choice_count = context.response.choices.len(),
            "Chat model response"
        );
    }

    fn on_error(&self, context: &mut ErrorContext<'_>) {
        tracing::debug!(
            deployment = %context.request.deployment,
            error = %context.error,
            "Chat model error"
        );
    }
}

/// Default listener set
pub fn default_listeners() -> Vec<Arc<dyn ChatModelListener>> {
    let listener: Arc<dyn ChatModelListener> = Arc::new(LoggingListener);
    vec![listener]
}

/// A backend bound to one deployment plus its listeners
pub struct ChatModel {
    backend: Box<dyn ChatBackend>,
    deployment: String,
    listeners: Vec<Arc<dyn ChatModelListener>>,
}

impl ChatModel {
    pub fn new(backend: Box<dyn ChatBackend>, deployment: impl Into<String>) -> Self {
        Self {
            backend,
            deployment: deployment.into(),
            listeners: Vec::new(),
        }
    }

    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn ChatModelListener>>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Send `message` alone and return the first choice's text
    pub async fn generate(&self, message: &str) -> Result<String, CompletionError> {
        let request = ChatModelRequest {
            deployment: self.deployment.clone(),
            conversation: Conversation::single_user(message),
        };
        let mut attributes = Attributes::new();

        for listener in &self.listeners {
            listener.on_request(&mut RequestContext {
                request: &request,
                attributes: &mut attributes,
            });
        }

        match self
            .backend
            .chat_completions(&request.deployment, &request.conversation)
            .await
        {
            Ok(response) => {
                for listener in &self.listeners {
                    listener.on_response(&mut ResponseContext {
                        request: &request,
                        response: &response,
                        attributes: &mut attributes,
                    });
                }
                Ok(response.first_text())
            }
            Err(error) => {
                for listener in &self.listeners {
                    listener.on_error(&mut ErrorContext {
                        request: &request,
                        error: &error,
                        attributes: &mut attributes,
                    });
                }
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Message, Role};
    use async_trait::async_trait;
    use std::sync::Mutex;

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

    #[derive(Default)]
    struct RecordingListener {
        events: Mutex<Vec<String>>,
        seen_messages: Mutex<Vec<Message>>,
    }

    impl ChatModelListener for RecordingListener {
        fn on_request(&self, context: &mut RequestContext<'_>) {
            context
                .attributes
                .insert("marker".to_string(), serde_json::json!("set-on-request"));
            self.seen_messages
                .lock()
                .unwrap()
                .extend(context.request.conversation.messages().iter().cloned());
            self.events.lock().unwrap().push("request".to_string());
        }

        fn on_response(&self, context: &mut ResponseContext<'_>) {
            let marker = context.attributes.get("marker").cloned();
            self.events
                .lock()
                .unwrap()
                .push(format!("response:{}", marker.unwrap_or_default()));
        }

        fn on_error(&self, context: &mut ErrorContext<'_>) {
            self.events
                .lock()
                .unwrap()
                .push(format!("error:{}", context.error));
        }
    }

    #[tokio::test]
    async fn test_generate_sends_only_user_message() {
        let listener = Arc::new(RecordingListener::default());
        let model = ChatModel::new(
            Box::new(FixedBackend(Ok(ChatCompletions::from_texts(["Hi"])))),
            "gpt-4o",
        )
        .with_listeners(vec![listener.clone() as Arc<dyn ChatModelListener>]);

        model.generate("raw message").await.unwrap();

        let seen = listener.seen_messages.lock().unwrap();
        assert_eq!(seen.as_slice(), &[Message::new(Role::User, "raw message")]);
    }

    #[tokio::test]
    async fn test_generate_returns_first_choice() {
        let model = ChatModel::new(
            Box::new(FixedBackend(Ok(ChatCompletions::from_texts([
                "first", "second",
            ])))),
            "gpt-4o",
        );
        assert_eq!(model.generate("x").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_generate_with_no_choices_is_empty() {
        let model = ChatModel::new(
            Box::new(FixedBackend(Ok(ChatCompletions::default()))),
            "gpt-4o",
        );
        assert_eq!(model.generate("x").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_listener_hooks_share_attributes() {
        let listener = Arc::new(RecordingListener::default());
        let model = ChatModel::new(
            Box::new(FixedBackend(Ok(ChatCompletions::from_texts(["ok"])))),
            "gpt-4o",
        )
        .with_listeners(vec![
            listener.clone() as Arc<dyn ChatModelListener>,
            Arc::new(LoggingListener),
        ]);

        model.generate("x").await.unwrap();

        let events = listener.events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &["request".to_string(), "response:\"set-on-request\"".to_string()]
        );
    }

    #[tokio::test]
    async fn test_error_hook_fires_and_error_propagates() {
        let listener = Arc::new(RecordingListener::default());
        let model = ChatModel::new(
            Box::new(FixedBackend(Err(CompletionError::Transport(
                "connection refused".to_string(),
            )))),
            "gpt-4o",
        )
        .with_listeners(vec![listener.clone() as Arc<dyn ChatModelListener>]);

        let err = model.generate("x").await.expect_err("backend fails");
        assert_eq!(err.to_string(), "connection refused");

        let events = listener.events.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &["request".to_string(), "error:connection refused".to_string()]
        );
    }
}
