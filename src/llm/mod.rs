//! Remote chat completion integration
//!
//! # Architecture
//!
//! - **config**: Endpoint, model and sampling parameters
//! - **context**: Conversion of the message log into request messages
//! - **client**: The `ChatCompletionClient` trait the orchestrator depends on
//! - **groq**: OpenAI-compatible HTTP implementation
//! - **prompts**: Greeting, fallback and apology texts
//!
//! # Usage
//!
//! ```rust,ignore
//! use babble_chat::llm::{ChatCompletionClient, ChatMessage, CompletionConfig, GroqClient};
//!
//! let client = GroqClient::new(CompletionConfig::from_env())?;
//! let reply = client
//!     .complete(vec![ChatMessage::user("Tell me about job opportunities")])
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod groq;
pub mod prompts;

// Re-export commonly used types
pub use client::ChatCompletionClient;
pub use config::CompletionConfig;
pub use context::{build_request, ChatMessage, MessageRole};
pub use groq::GroqClient;
pub use prompts::{EMPTY_COMPLETION_REPLY, FALLBACK_REPLY, GREETING};
