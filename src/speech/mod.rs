//! Speech capture and playback
//!
//! This module provides:
//! - Provider contracts for external recognizers and synthesizers
//! - The voice command grammar and matcher
//! - Controllers for voice input (capture) and voice output (playback)

pub mod commands;
pub mod input;
pub mod null;
pub mod output;
pub mod provider;
pub mod transcript;

// Re-export commonly used types
pub use commands::{default_commands, CommandAction, CommandMatch, CommandMatcher, VoiceCommand};
pub use input::{CaptureState, FiredCommand, VoiceInputController};
pub use null::{MutedSynthesizer, UnsupportedRecognizer};
pub use output::{PlaybackState, VoiceOutputController};
pub use provider::{
    MicrophoneAccess, PlaybackStatus, ProviderEvent, ProviderEventSink, RecognitionOptions,
    RecognizerCapabilities, SpeechRecognizer, SpeechSynthesizer, UtteranceHandle, VoiceSettings,
};
pub use transcript::TranscriptBuffer;
