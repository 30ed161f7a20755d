//! askai - pirate-persona chat endpoint
//!
//! Forwards a caller's message to a hosted chat-completion deployment,
//! authenticating with either a managed-identity token or a static API key,
//! and returns the generated reply as plain text.

pub mod cli;
pub mod client;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod credential;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod orchestration;
pub mod telemetry;
