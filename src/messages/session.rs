//! Conversation session: the authoritative message log and playback pointer.

use super::types::{Author, Message};
use crate::{BabbleError, Result};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

/// Append-only message log for one assistant launch.
///
/// Insertion order is chronological order. The playback pointer, when set,
/// always names an Assistant message present in the log.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    /// Generated once when the session starts
    session_id: String,

    /// Messages in chronological order
    messages: Vec<Message>,

    /// Message currently designated for playback
    current_playback: Option<Uuid>,
}

impl ConversationSession {
    /// Create an empty session
    pub fn new() -> Self {
        let session_id = format!("session_{}", Utc::now().timestamp_millis());
        debug!("Starting conversation {}", session_id);

        Self {
            session_id,
            messages: Vec::new(),
            current_playback: None,
        }
    }

    /// Create a session that opens with an assistant greeting
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.append_message(Author::Assistant, greeting);
        session
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append a new message and return it
    pub fn append_message(&mut self, author: Author, text: impl Into<String>) -> &Message {
        let message = Message::new(author, text);
        debug!(
            "Appending {} message {} ({} chars)",
            author,
            message.id,
            message.text.len()
        );
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Point playback at an Assistant message, or clear the pointer
    pub fn set_current_playback(&mut self, message_id: Option<Uuid>) -> Result<()> {
        if let Some(id) = message_id {
            match self.get(id) {
                Some(message) if message.author.is_assistant() => {}
                _ => return Err(BabbleError::InvalidPlaybackTarget(id)),
            }
        }

        self.current_playback = message_id;
        Ok(())
    }

    pub fn current_playback(&self) -> Option<Uuid> {
        self.current_playback
    }

    /// Get the message currently designated for playback
    pub fn current_playback_message(&self) -> Option<&Message> {
        self.current_playback.and_then(|id| self.get(id))
    }

    /// Chronological read-only view of the log.
    ///
    /// The iterator is `Clone`, so callers may walk it more than once.
    pub fn history(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}
