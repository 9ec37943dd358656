//! Conversation orchestrator
//!
//! Owns the session, both voice controllers and the completion client, and
//! is the only place where they are coordinated:
//!
//! ```text
//! Ready --submit--> AwaitingCompletion --completion finished--> Ready
//! ```
//!
//! The orchestrator itself never blocks. `submit` hands back a
//! [`CompletionTicket`] that the caller runs on an async executor; the
//! resulting [`CompletionOutcome`] is fed back through `finish_completion`.

use crate::integration::config::AssistantConfig;
use crate::integration::state::AssistantSnapshot;
use crate::llm::client::ChatCompletionClient;
use crate::llm::context::{build_request, ChatMessage};
use crate::llm::prompts::or_apology;
use crate::messages::{Author, ConversationSession};
use crate::speech::commands::CommandAction;
use crate::speech::input::{CaptureState, VoiceInputController};
use crate::speech::output::{PlaybackState, VoiceOutputController};
use crate::speech::provider::{
    PlaybackStatus, ProviderEvent, SpeechRecognizer, SpeechSynthesizer, UtteranceHandle,
};
use crate::utils::perf::LatencyTracker;
use crate::{BabbleError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Conversation lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChatState {
    #[default]
    Ready,
    AwaitingCompletion,
}

impl ChatState {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, ChatState::AwaitingCompletion)
    }
}

impl std::fmt::Display for ChatState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatState::Ready => write!(f, "Ready"),
            ChatState::AwaitingCompletion => write!(f, "AwaitingCompletion"),
        }
    }
}

/// One outstanding completion request
pub struct CompletionTicket {
    pub turn_id: u64,
    pub messages: Vec<ChatMessage>,
    client: Arc<dyn ChatCompletionClient>,
}

impl CompletionTicket {
    /// Run the request. Never fails: errors are carried in the outcome.
    pub async fn run(self) -> CompletionOutcome {
        let start_time = Instant::now();
        let result = self.client.complete(self.messages).await;

        match &result {
            Ok(_) => debug!(
                "Turn {} completed in {}ms",
                self.turn_id,
                start_time.elapsed().as_millis()
            ),
            Err(e) => warn!("Turn {} failed: {}", self.turn_id, e),
        }

        CompletionOutcome {
            turn_id: self.turn_id,
            result,
            elapsed: start_time.elapsed(),
        }
    }
}

impl std::fmt::Debug for CompletionTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTicket")
            .field("turn_id", &self.turn_id)
            .field("messages", &self.messages.len())
            .field("model", &self.client.model_name())
            .finish()
    }
}

/// Terminal event of one turn: a completion or the reason it failed
#[derive(Clone, Debug)]
pub struct CompletionOutcome {
    pub turn_id: u64,
    pub result: Result<String>,
    pub elapsed: Duration,
}

impl CompletionOutcome {
    pub fn succeeded(turn_id: u64, text: impl Into<String>) -> Self {
        Self {
            turn_id,
            result: Ok(text.into()),
            elapsed: Duration::ZERO,
        }
    }

    pub fn failed(turn_id: u64, error: BabbleError) -> Self {
        Self {
            turn_id,
            result: Err(error),
            elapsed: Duration::ZERO,
        }
    }
}

pub struct ChatOrchestrator {
    session: ConversationSession,
    input: VoiceInputController,
    output: VoiceOutputController,
    client: Arc<dyn ChatCompletionClient>,
    state: ChatState,

    /// Turn id of the request in flight, set only while awaiting
    outstanding_turn: Option<u64>,
    next_turn: u64,

    fallback_reply: String,
    auto_speak: bool,
    latency: LatencyTracker,

    /// Last recoverable problem, kept for display
    notice: Option<String>,
    /// Problems not yet delivered to the host
    undelivered_notices: Vec<String>,
}

impl ChatOrchestrator {
    pub fn new(
        config: &AssistantConfig,
        client: Arc<dyn ChatCompletionClient>,
        recognizer: Box<dyn SpeechRecognizer>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Result<Self> {
        config.validate()?;

        let session = match &config.greeting {
            Some(greeting) if !greeting.trim().is_empty() => {
                ConversationSession::with_greeting(greeting.as_str())
            }
            _ => ConversationSession::new(),
        };

        let input = VoiceInputController::new(
            recognizer,
            config.recognition.clone(),
            config.command_matcher()?,
        );
        let output = VoiceOutputController::new(synthesizer, config.voice.clone());

        info!(
            "Conversation {} ready (model {}, {} voice commands)",
            session.session_id(),
            client.model_name(),
            config.commands.len()
        );

        Ok(Self {
            session,
            input,
            output,
            client,
            state: ChatState::Ready,
            outstanding_turn: None,
            next_turn: 1,
            fallback_reply: config.fallback_reply.clone(),
            auto_speak: config.auto_speak,
            latency: LatencyTracker::default(),
            notice: None,
            undelivered_notices: Vec::new(),
        })
    }

    // === Turn lifecycle ===

    /// Submit `text` as the next user message.
    ///
    /// Returns `None` when the text is blank or a completion is already
    /// outstanding. Otherwise capture and playback are stopped, the message
    /// is appended, the input is cleared and the returned ticket must be run
    /// and its outcome passed to [`finish_completion`](Self::finish_completion).
    pub fn submit(&mut self, text: &str) -> Option<CompletionTicket> {
        if self.state.is_awaiting() {
            debug!("Submit ignored, a completion is already outstanding");
            return None;
        }

        if text.trim().is_empty() {
            debug!("Submit ignored, input is blank");
            return None;
        }
        let text = text.to_string();

        // Drain both controllers before the log changes
        self.input.stop_listening();
        self.output.stop();

        self.session.append_message(Author::User, text);
        self.input.reset();

        let turn_id = self.next_turn;
        self.next_turn += 1;
        self.outstanding_turn = Some(turn_id);
        self.state = ChatState::AwaitingCompletion;
        debug!("Chat state -> {} (turn {})", self.state, turn_id);

        Some(CompletionTicket {
            turn_id,
            messages: build_request(self.session.history(), None),
            client: Arc::clone(&self.client),
        })
    }

    /// Stop capture, then submit whatever the pending input holds
    pub fn submit_pending(&mut self) -> Option<CompletionTicket> {
        if self.state.is_awaiting() {
            debug!("Submit ignored, a completion is already outstanding");
            return None;
        }
        self.input.stop_listening();
        let text = self.input.pending_input().to_string();
        self.submit(&text)
    }

    /// Apply the terminal event of a turn.
    ///
    /// Appends the reply (or the fallback text on failure), returns to
    /// Ready and, with auto-speak enabled, starts playback of the reply.
    /// Returns false if the outcome does not belong to the outstanding turn.
    pub fn finish_completion(&mut self, outcome: CompletionOutcome) -> bool {
        if self.outstanding_turn != Some(outcome.turn_id) {
            warn!(
                "Dropping completion for turn {} (outstanding: {:?})",
                outcome.turn_id, self.outstanding_turn
            );
            return false;
        }

        self.latency.record(outcome.elapsed);
        if let Some(average) = self.latency.average() {
            debug!(
                "Completion latency {}ms (average {}ms over {} turns)",
                outcome.elapsed.as_millis(),
                average.as_millis(),
                self.latency.count()
            );
        }

        let reply = match outcome.result {
            Ok(text) => or_apology(Some(text)),
            Err(e) => {
                warn!("Completion failed, using fallback reply: {}", e);
                self.fallback_reply.clone()
            }
        };

        let reply_id = self.session.append_message(Author::Assistant, reply).id;
        self.outstanding_turn = None;
        self.state = ChatState::Ready;
        debug!("Chat state -> {} (turn {})", self.state, outcome.turn_id);

        // The pointer may only leave a message the output has released
        if self
            .output
            .bound_message()
            .is_some_and(|bound| bound != reply_id)
        {
            self.output.stop();
        }

        if let Err(e) = self.session.set_current_playback(Some(reply_id)) {
            warn!("Could not designate reply for playback: {}", e);
        } else if self.auto_speak {
            if let Err(e) = self.speak(reply_id) {
                warn!("Reply stays text-only: {}", e);
            }
        }

        true
    }

    /// Submit and run a turn to completion on the current executor
    pub async fn run_turn(&mut self, text: &str) -> bool {
        match self.submit(text) {
            Some(ticket) => {
                let outcome = ticket.run().await;
                self.finish_completion(outcome)
            }
            None => false,
        }
    }

    // === Playback ===

    /// Play, pause or switch playback to an assistant message.
    ///
    /// The bound message toggles between speaking and paused; any other
    /// assistant message replaces the binding. Allowed in either chat state.
    pub fn toggle_speech(&mut self, message_id: Uuid) -> Result<()> {
        match self.session.get(message_id) {
            Some(message) if message.author.is_assistant() => {}
            _ => {
                warn!("Rejecting playback of message {}", message_id);
                return Err(BabbleError::InvalidPlaybackTarget(message_id));
            }
        }

        if self.output.bound_message() == Some(message_id) {
            match self.output.state() {
                PlaybackState::Speaking => {
                    self.output.pause();
                    return Ok(());
                }
                PlaybackState::Paused => {
                    self.output.resume();
                    return Ok(());
                }
                PlaybackState::Idle => {}
            }
        }

        self.session.set_current_playback(Some(message_id))?;
        self.speak(message_id)
    }

    /// Stop any playback
    pub fn stop_speech(&mut self) {
        self.output.stop();
    }

    fn speak(&mut self, message_id: Uuid) -> Result<()> {
        let text = self
            .session
            .get(message_id)
            .map(|message| message.text.clone())
            .ok_or(BabbleError::InvalidPlaybackTarget(message_id))?;
        self.output.start(message_id, &text)
    }

    // === Voice input ===

    /// Begin capture. Ignored while a completion is outstanding.
    pub fn start_listening(&mut self) -> Result<()> {
        if self.state.is_awaiting() {
            debug!("start_listening ignored while awaiting a completion");
            return Ok(());
        }
        self.input.start_listening()
    }

    pub fn stop_listening(&mut self) {
        self.input.stop_listening();
    }

    /// Replace the pending input. Ignored while a completion is outstanding.
    pub fn set_input_text(&mut self, text: impl Into<String>) {
        if self.state.is_awaiting() {
            debug!("Typed input ignored while awaiting a completion");
            return;
        }
        self.input.set_input_text(text);
    }

    /// Apply a callback from either speech provider.
    ///
    /// A voice "submit" command can start a turn, in which case the ticket
    /// is returned.
    pub fn on_provider_event(&mut self, event: ProviderEvent) -> Option<CompletionTicket> {
        match event {
            ProviderEvent::Transcript { text, is_final } => {
                self.on_transcript_update(&text, is_final)
            }
            ProviderEvent::ListeningChanged(is_listening) => {
                self.input.on_listening_changed(is_listening);
                None
            }
            ProviderEvent::Playback { handle, status } => {
                self.on_playback_status(handle, status);
                None
            }
        }
    }

    /// Feed a transcript update through the input controller and apply any
    /// command it fires
    pub fn on_transcript_update(&mut self, text: &str, is_final: bool) -> Option<CompletionTicket> {
        let fired = self.input.on_transcript_update(text, is_final)?;
        info!("Voice command '{}' fired", fired.matched.pattern);

        match &fired.matched.action {
            CommandAction::FillInput { .. } => {
                if let Some(filled) = fired.matched.action.render(&fired.matched.capture) {
                    self.input.set_input_text(filled);
                }
                None
            }
            CommandAction::Clear => {
                self.input.reset();
                None
            }
            CommandAction::Submit => {
                if fired.input_before.trim().is_empty() {
                    debug!("Voice submit with nothing to send");
                    self.input.reset();
                    return None;
                }
                // Whatever the recognizer flushes on stop is the command itself
                self.input.stop_listening();
                self.submit(&fired.input_before)
            }
        }
    }

    pub fn on_playback_status(&mut self, handle: UtteranceHandle, status: PlaybackStatus) {
        if self.output.on_status(handle, status) {
            debug!("Playback state -> {}", self.output.state());
        }
    }

    // === Notices ===

    /// Record a recoverable failure for the host to show
    pub fn report(&mut self, error: &BabbleError) {
        warn!("{}", error);
        let text = error.user_message();
        self.notice = Some(text.clone());
        self.undelivered_notices.push(text);
    }

    /// Notices recorded since the last call
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.undelivered_notices)
    }

    // === Reads ===

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    pub fn pending_input(&self) -> &str {
        self.input.pending_input()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.input.state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.output.state()
    }

    pub fn bound_message(&self) -> Option<Uuid> {
        self.output.bound_message()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Completion round-trip times of recent turns
    pub fn latency(&self) -> &LatencyTracker {
        &self.latency
    }

    /// Everything a host needs to render, detached from the orchestrator
    pub fn snapshot(&self) -> AssistantSnapshot {
        let transcript = self.input.transcript();
        AssistantSnapshot {
            session_id: self.session.session_id().to_string(),
            chat: self.state,
            capture: self.input.state(),
            playback: self.output.state(),
            pending_input: self.input.pending_input().to_string(),
            transcript: transcript.text().to_string(),
            transcript_is_final: transcript.is_final(),
            messages: self.session.messages().to_vec(),
            current_playback: self.session.current_playback(),
            bound_message: self.output.bound_message(),
            voice_input_available: self.input.capabilities().voice_input_available(),
            notice: self.notice.clone(),
        }
    }
}
