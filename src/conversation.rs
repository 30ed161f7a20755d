//! Conversation assembly
//!
//! Every `/askAI` request is sent as a fixed persona preamble followed by the
//! caller's message. The preamble is plain data so another persona can be
//! swapped in without touching request handling.

use serde::{Deserialize, Serialize};

/// Message role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message
///
/// Fields are private; a message cannot change once it has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Get the role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Get the content
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// One scripted turn of a persona preamble
pub type PresetTurn = (Role, &'static str);

/// Pirate persona: system instruction plus one scripted user/assistant exchange
pub const PIRATE_PERSONA: &[PresetTurn] = &[
    (
        Role::System,
        "You are a helpful assistant. You will talk like a pirate.",
    ),
    (Role::User, "Can you help me?"),
    (
        Role::Assistant,
        "Of course, me hearty! What can I do for ye?",
    ),
];

/// Ordered message sequence sent to the provider
///
/// Insertion order is the dialogue turn order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// A conversation holding only the caller's message
    pub fn single_user(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(content)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the final message, if any
    pub fn last_content(&self) -> Option<&str> {
        self.messages.last().map(Message::content)
    }
}

/// Builds the per-request conversation from a persona preamble
#[derive(Debug, Clone, Copy)]
pub struct ConversationBuilder {
    preamble: &'static [PresetTurn],
}

impl ConversationBuilder {
    pub fn new(preamble: &'static [PresetTurn]) -> Self {
        Self { preamble }
    }

    /// Preamble turns followed by `user_message`, passed through verbatim
    pub fn build(&self, user_message: &str) -> Conversation {
        let mut conversation = Conversation {
            messages: Vec::with_capacity(self.preamble.len() + 1),
        };
        for (role, content) in self.preamble {
            conversation.push(Message::new(*role, *content));
        }
        conversation.push(Message::user(user_message));
        conversation
    }
}

impl Default for ConversationBuilder {
    fn default() -> Self {
        Self::new(PIRATE_PERSONA)
    }
}
