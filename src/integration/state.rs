//! Shared assistant state, commands and events
//!
//! The runtime publishes an immutable [`AssistantSnapshot`] after every
//! processed command. Hosts read it through [`SharedAssistantState`] and use
//! [`AssistantEvent::StateChanged`] as a repaint signal.

use crate::integration::orchestrator::{ChatState, CompletionOutcome};
use crate::messages::Message;
use crate::speech::{CaptureState, PlaybackState, ProviderEvent};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a host needs to render the assistant
#[derive(Clone, Debug, Default)]
pub struct AssistantSnapshot {
    pub session_id: String,
    pub chat: ChatState,
    pub capture: CaptureState,
    pub playback: PlaybackState,
    /// Text the next submit will send
    pub pending_input: String,
    /// Live transcript for display
    pub transcript: String,
    pub transcript_is_final: bool,
    /// Chronological message log
    pub messages: Vec<Message>,
    /// Message designated for playback
    pub current_playback: Option<Uuid>,
    /// Message the voice output is bound to right now
    pub bound_message: Option<Uuid>,
    /// Whether voice controls should be shown
    pub voice_input_available: bool,
    /// Last recoverable problem worth showing the user
    pub notice: Option<String>,
}

impl AssistantSnapshot {
    /// Check if a completion is outstanding
    pub fn is_awaiting(&self) -> bool {
        self.chat.is_awaiting()
    }

    /// Whether the send button should be enabled
    pub fn can_submit(&self) -> bool {
        !self.is_awaiting() && !self.pending_input.trim().is_empty()
    }

    /// Whether message `id` is currently being spoken
    pub fn is_playing(&self, id: Uuid) -> bool {
        self.bound_message == Some(id) && self.playback.is_speaking()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Thread-safe shared assistant state
#[derive(Clone, Default)]
pub struct SharedAssistantState {
    inner: Arc<RwLock<AssistantSnapshot>>,
}

impl SharedAssistantState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: AssistantSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Get a snapshot of current state (no lock held after return)
    pub fn snapshot(&self) -> AssistantSnapshot {
        self.inner.read().clone()
    }

    // === Convenience read methods ===

    pub fn chat_state(&self) -> ChatState {
        self.inner.read().chat
    }

    pub fn capture_state(&self) -> CaptureState {
        self.inner.read().capture
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.inner.read().playback
    }

    pub fn pending_input(&self) -> String {
        self.inner.read().pending_input.clone()
    }

    pub fn message_count(&self) -> usize {
        self.inner.read().messages.len()
    }
}

/// Commands processed by the assistant runtime, in arrival order
#[derive(Clone, Debug)]
pub enum AssistantCommand {
    /// Submit the given text
    Submit(String),
    /// Stop capture, then submit whatever input is pending
    SubmitPending,
    /// Replace the pending input (typing)
    SetInput(String),
    /// Play, pause or switch playback to a message
    ToggleSpeech(Uuid),
    StartListening,
    StopListening,
    /// Callback from a speech provider
    Provider(ProviderEvent),
    /// Result of an outstanding completion request
    CompletionFinished(CompletionOutcome),
    Shutdown,
}

/// Events emitted by the runtime
#[derive(Clone, Debug)]
pub enum AssistantEvent {
    /// A new snapshot was published
    StateChanged,
    /// A recoverable problem the user should see
    Notice(String),
    /// Runtime has stopped
    Shutdown,
}
