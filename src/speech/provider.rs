//! Contracts for the external speech capture and synthesis providers
//!
//! Acoustic processing lives behind these traits. Providers deliver their
//! callbacks as [`ProviderEvent`]s through a [`ProviderEventSink`], which the
//! runtime serializes into the same queue as UI commands.

use crate::{BabbleError, Result};
use serde::{Deserialize, Serialize};

/// Options passed to the recognizer when capture starts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    /// Keep recognizing across pauses instead of stopping after one phrase
    pub continuous: bool,

    /// BCP-47 locale, e.g. "en-US"
    pub locale: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            continuous: true,
            locale: "en-US".to_string(),
        }
    }
}

/// Microphone permission as reported by the platform
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MicrophoneAccess {
    Granted,
    Denied,
    #[default]
    Unknown,
}

/// What the recognition provider says it can do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecognizerCapabilities {
    pub supports_recognition: bool,
    pub microphone: MicrophoneAccess,
}

impl RecognizerCapabilities {
    /// Capabilities of a provider that cannot capture at all
    pub fn unsupported() -> Self {
        Self {
            supports_recognition: false,
            microphone: MicrophoneAccess::Unknown,
        }
    }

    /// Whether voice controls should be offered to the user.
    ///
    /// An unknown microphone state is optimistic; the first start attempt
    /// will surface a denial.
    pub fn voice_input_available(&self) -> bool {
        self.supports_recognition && self.microphone != MicrophoneAccess::Denied
    }

    /// Turn unavailability into the matching error
    pub fn ensure_available(&self) -> Result<()> {
        if !self.supports_recognition {
            return Err(BabbleError::CaptureUnavailable(
                "speech recognition is not supported on this platform".to_string(),
            ));
        }
        if self.microphone == MicrophoneAccess::Denied {
            return Err(BabbleError::CaptureUnavailable(
                "microphone access was denied".to_string(),
            ));
        }
        Ok(())
    }
}

/// Speech-to-text provider
pub trait SpeechRecognizer: Send {
    fn capabilities(&self) -> RecognizerCapabilities;

    /// Begin recognition. Fails with `CaptureUnavailable` when the
    /// microphone or platform support is missing.
    fn start(&mut self, options: &RecognitionOptions) -> Result<()>;

    /// Stop recognition.
    ///
    /// Returns any trailing transcript that was recognized but not yet
    /// delivered as an event.
    fn stop(&mut self) -> Option<String>;
}

/// Voice parameters handed to the synthesizer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl VoiceSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.1..=10.0).contains(&self.rate) {
            return Err(BabbleError::ConfigError(format!(
                "speech rate {} out of range 0.1..=10",
                self.rate
            )));
        }
        if !(0.0..=2.0).contains(&self.pitch) {
            return Err(BabbleError::ConfigError(format!(
                "speech pitch {} out of range 0..=2",
                self.pitch
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(BabbleError::ConfigError(format!(
                "speech volume {} out of range 0..=1",
                self.volume
            )));
        }
        Ok(())
    }
}

/// Opaque identifier of one utterance issued to the synthesizer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UtteranceHandle(pub u64);

/// Status transitions reported by the synthesizer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    Started,
    Paused,
    /// Finished or cancelled
    Stopped,
}

/// Text-to-speech provider
pub trait SpeechSynthesizer: Send {
    /// Start speaking. Fails with `SynthesisFailed` if the text cannot be spoken.
    fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<UtteranceHandle>;

    fn pause(&mut self, handle: UtteranceHandle);

    fn resume(&mut self, handle: UtteranceHandle);

    fn stop(&mut self, handle: UtteranceHandle);
}

/// Asynchronous callbacks from either provider
#[derive(Clone, Debug, PartialEq)]
pub enum ProviderEvent {
    /// New or revised transcript text
    Transcript { text: String, is_final: bool },

    /// Recognizer started or stopped on its own
    ListeningChanged(bool),

    /// Synthesizer status change for one utterance
    Playback {
        handle: UtteranceHandle,
        status: PlaybackStatus,
    },
}

/// Where providers deliver their events
pub trait ProviderEventSink: Send + Sync {
    fn emit(&self, event: ProviderEvent);
}
