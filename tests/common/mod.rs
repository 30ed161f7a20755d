//! Shared fixtures for integration tests
#![allow(dead_code)]

use askai::client::ClientFactory;
use askai::completion::{ChatBackend, ChatCompletions, CompletionError};
use askai::config::Config;
use askai::conversation::Conversation;
use askai::error::AppResult;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How a stub backend answers
#[derive(Clone)]
pub enum Reply {
    /// One choice holding the last message's content
    EchoLast,
    /// Fixed choice texts
    Choices(Vec<String>),
    /// Transport failure with this message
    Fail(String),
}

/// A backend observed by the test: which instance served which conversation
pub struct StubBackend {
    serial: usize,
    reply: Reply,
    calls: Arc<Mutex<Vec<(usize, Conversation)>>>,
}

#[async_trait]
impl ChatBackend for StubBackend {
    async fn chat_completions(
        &self,
        _deployment: &str,
        conversation: &Conversation,
    ) -> Result<ChatCompletions, CompletionError> {
        self.calls
            .lock()
            .unwrap()
            .push((self.serial, conversation.clone()));

        match &self.reply {
            Reply::EchoLast => Ok(ChatCompletions::from_texts([conversation
                .last_content()
                .unwrap_or_default()
                .to_string()])),
            Reply::Choices(texts) => Ok(ChatCompletions::from_texts(texts.clone())),
            Reply::Fail(message) => Err(CompletionError::Transport(message.clone())),
        }
    }
}

/// Factory that hands out a new numbered [`StubBackend`] per request
pub struct StubFactory {
    reply: Reply,
    created: AtomicUsize,
    calls: Arc<Mutex<Vec<(usize, Conversation)>>>,
}

impl StubFactory {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            created: AtomicUsize::new(0),
            calls: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(usize, Conversation)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClientFactory for StubFactory {
    async fn create(&self) -> AppResult<Box<dyn ChatBackend>> {
        let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(StubBackend {
            serial,
            reply: self.reply.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Configuration with a static key so state construction succeeds
pub fn key_config() -> Config {
    toml::from_str(
        r#"
[server]
host = "127.0.0.1"
port = 8080

[provider]
endpoint = "https://example.openai.azure.com/"

[auth]
api_key = "test-key"
"#,
    )
    .expect("should parse TOML config")
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}
