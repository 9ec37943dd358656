//! Voice input controller
//!
//! Owns the capture lifecycle and the pending input text, the single source
//! of truth for what the next submit will send. Transcript updates are fed
//! through the [`CommandMatcher`]; a fired command is handed back to the
//! caller, which applies its action.

use crate::speech::commands::{CommandMatch, CommandMatcher};
use crate::speech::provider::{RecognitionOptions, RecognizerCapabilities, SpeechRecognizer};
use crate::speech::transcript::TranscriptBuffer;
use crate::Result;
use tracing::{debug, info, warn};

/// Capture lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    Listening,
}

impl CaptureState {
    pub fn is_listening(&self) -> bool {
        matches!(self, CaptureState::Listening)
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Listening => write!(f, "Listening"),
        }
    }
}

/// A command fired by a transcript update
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FiredCommand {
    pub matched: CommandMatch,

    /// Pending input as it stood before the triggering transcript arrived
    pub input_before: String,
}

pub struct VoiceInputController {
    recognizer: Box<dyn SpeechRecognizer>,
    options: RecognitionOptions,
    matcher: CommandMatcher,
    state: CaptureState,
    transcript: TranscriptBuffer,
    pending_input: String,

    /// Pattern and transcript of the last fired command, to avoid re-firing
    /// on repeated deliveries of the same text
    last_fired: Option<(String, String)>,
}

impl VoiceInputController {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        options: RecognitionOptions,
        matcher: CommandMatcher,
    ) -> Self {
        Self {
            recognizer,
            options,
            matcher,
            state: CaptureState::Idle,
            transcript: TranscriptBuffer::new(),
            pending_input: String::new(),
            last_fired: None,
        }
    }

    /// Begin continuous recognition.
    ///
    /// No-op while already listening. On `CaptureUnavailable` the controller
    /// stays idle and the error is returned to the caller.
    pub fn start_listening(&mut self) -> Result<()> {
        if self.state.is_listening() {
            debug!("start_listening ignored, already listening");
            return Ok(());
        }

        self.recognizer.capabilities().ensure_available()?;

        self.transcript.clear();
        self.last_fired = None;

        if let Err(e) = self.recognizer.start(&self.options) {
            warn!("Speech capture failed to start: {}", e);
            return Err(e);
        }

        self.state = CaptureState::Listening;
        info!("Listening ({})", self.options.locale);
        Ok(())
    }

    /// Stop recognition. Idempotent; issues no provider calls when idle.
    ///
    /// A trailing transcript returned by the recognizer is flushed into the
    /// pending input before the state changes.
    pub fn stop_listening(&mut self) {
        if !self.state.is_listening() {
            return;
        }

        if let Some(trailing) = self.recognizer.stop() {
            if !trailing.trim().is_empty() {
                debug!("Flushing trailing transcript on stop");
                self.transcript.update(trailing.clone(), true);
                self.pending_input = trailing;
            }
        }

        self.state = CaptureState::Idle;
        info!("Stopped listening");
    }

    /// Apply a transcript callback from the recognizer.
    ///
    /// Updates are dropped while idle, so nothing mutates the pending input
    /// after capture has been stopped.
    pub fn on_transcript_update(&mut self, text: &str, is_final: bool) -> Option<FiredCommand> {
        if !self.state.is_listening() {
            debug!("Dropping transcript update received while idle");
            return None;
        }

        let input_before = std::mem::replace(&mut self.pending_input, text.to_string());
        self.transcript.update(text, is_final);

        let matched = self.matcher.match_transcript(text, is_final)?;

        let key = (matched.pattern.clone(), text.trim().to_lowercase());
        if self.last_fired.as_ref() == Some(&key) {
            debug!("Command '{}' already fired for this transcript", matched.pattern);
            return None;
        }
        self.last_fired = Some(key);

        Some(FiredCommand {
            matched,
            input_before,
        })
    }

    /// The recognizer changed state on its own
    pub fn on_listening_changed(&mut self, is_listening: bool) {
        if !is_listening && self.state.is_listening() {
            warn!("Recognizer stopped unexpectedly");
            self.state = CaptureState::Idle;
        }
    }

    /// Clear pending input and transcript without touching capture state
    pub fn reset(&mut self) {
        self.pending_input.clear();
        self.transcript.clear();
        self.last_fired = None;
    }

    /// Replace the pending input (typing, or a fill-in command)
    pub fn set_input_text(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn transcript(&self) -> &TranscriptBuffer {
        &self.transcript
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state.is_listening()
    }

    pub fn capabilities(&self) -> RecognizerCapabilities {
        self.recognizer.capabilities()
    }
}
