//! Request messages for the chat completion service
//!
//! Converts the conversation log into the role/content list the remote model
//! expects.

use crate::messages::{Author, Message};
use serde::{Deserialize, Serialize};

/// Role of a message in the request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant response
    Assistant,
}

impl MessageRole {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl From<Author> for MessageRole {
    fn from(author: Author) -> Self {
        match author {
            Author::User => MessageRole::User,
            Author::Assistant => MessageRole::Assistant,
        }
    }
}

/// A single message in a completion request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.author.into(), message.text.clone())
    }
}

/// Build the request list from a chronological history
pub fn build_request<'a>(
    history: impl IntoIterator<Item = &'a Message>,
    system_prompt: Option<&str>,
) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = system_prompt
        .filter(|p| !p.trim().is_empty())
        .map(ChatMessage::system)
        .into_iter()
        .collect();
    messages.extend(history.into_iter().map(ChatMessage::from));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_build_request_keeps_order() {
        let history = vec![
            Message::assistant("Hello!"),
            Message::user("Tell me about job opportunities"),
        ];

        let request = build_request(&history, None);
        assert_eq!(
            request,
            vec![
                ChatMessage::assistant("Hello!"),
                ChatMessage::user("Tell me about job opportunities"),
            ]
        );
    }

    #[test]
    fn test_build_request_with_system_prompt() {
        let history = vec![Message::user("hi")];
        let request = build_request(&history, Some("Be brief."));

        assert_eq!(request.len(), 2);
        assert_eq!(request[0], ChatMessage::system("Be brief."));

        // Blank prompts are skipped
        assert_eq!(build_request(&history, Some("  ")).len(), 1);
    }
}
