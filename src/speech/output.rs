//! Voice output controller
//!
//! Speaks exactly one message at a time through the synthesizer.
//!
//! ```text
//! Idle --start--> Speaking --pause--> Paused --resume--> Speaking
//! Speaking | Paused --stop--> Idle
//! ```
//!
//! Starting a different message stops the current binding first, so two
//! utterances never overlap.

use crate::speech::provider::{PlaybackStatus, SpeechSynthesizer, UtteranceHandle, VoiceSettings};
use crate::Result;
use tracing::{debug, warn};
use uuid::Uuid;

/// Playback lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

impl PlaybackState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PlaybackState::Idle)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, PlaybackState::Speaking)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Speaking => write!(f, "Speaking"),
            PlaybackState::Paused => write!(f, "Paused"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Binding {
    message_id: Uuid,
    handle: UtteranceHandle,
}

pub struct VoiceOutputController {
    synthesizer: Box<dyn SpeechSynthesizer>,
    settings: VoiceSettings,
    state: PlaybackState,
    binding: Option<Binding>,
}

impl VoiceOutputController {
    pub fn new(synthesizer: Box<dyn SpeechSynthesizer>, settings: VoiceSettings) -> Self {
        Self {
            synthesizer,
            settings,
            state: PlaybackState::Idle,
            binding: None,
        }
    }

    /// Speak `text` as message `message_id`.
    ///
    /// Already speaking this message: no-op. Paused on it: resumes without
    /// a new `speak` call. Bound to another message: stops that one first.
    /// A synthesizer error leaves the controller idle.
    pub fn start(&mut self, message_id: Uuid, text: &str) -> Result<()> {
        if let Some(binding) = self.binding {
            if binding.message_id == message_id {
                match self.state {
                    PlaybackState::Speaking => return Ok(()),
                    PlaybackState::Paused => {
                        self.resume();
                        return Ok(());
                    }
                    PlaybackState::Idle => {}
                }
            } else {
                self.stop();
            }
        }

        match self.synthesizer.speak(text, &self.settings) {
            Ok(handle) => {
                debug!("Speaking message {} ({:?})", message_id, handle);
                self.binding = Some(Binding { message_id, handle });
                self.state = PlaybackState::Speaking;
                Ok(())
            }
            Err(e) => {
                warn!("Speech synthesis failed for message {}: {}", message_id, e);
                self.binding = None;
                self.state = PlaybackState::Idle;
                Err(e)
            }
        }
    }

    /// Speaking -> Paused; otherwise no-op
    pub fn pause(&mut self) {
        if let (PlaybackState::Speaking, Some(binding)) = (self.state, self.binding) {
            self.synthesizer.pause(binding.handle);
            self.state = PlaybackState::Paused;
            debug!("Paused message {}", binding.message_id);
        }
    }

    /// Paused -> Speaking; otherwise no-op
    pub fn resume(&mut self) {
        if let (PlaybackState::Paused, Some(binding)) = (self.state, self.binding) {
            self.synthesizer.resume(binding.handle);
            self.state = PlaybackState::Speaking;
            debug!("Resumed message {}", binding.message_id);
        }
    }

    /// Drop the binding and return to Idle. Idempotent.
    pub fn stop(&mut self) {
        if let Some(binding) = self.binding.take() {
            self.synthesizer.stop(binding.handle);
            debug!("Stopped message {}", binding.message_id);
        }
        self.state = PlaybackState::Idle;
    }

    /// Apply a status report from the synthesizer.
    ///
    /// Reports for utterances other than the bound one are stale and
    /// ignored. Returns whether the state changed.
    pub fn on_status(&mut self, handle: UtteranceHandle, status: PlaybackStatus) -> bool {
        let Some(binding) = self.binding else {
            return false;
        };
        if binding.handle != handle {
            debug!("Ignoring stale playback status {:?} for {:?}", status, handle);
            return false;
        }

        let next = match status {
            PlaybackStatus::Started => PlaybackState::Speaking,
            PlaybackStatus::Paused => PlaybackState::Paused,
            PlaybackStatus::Stopped => PlaybackState::Idle,
        };
        if next == self.state {
            return false;
        }

        if next.is_idle() {
            debug!("Finished speaking message {}", binding.message_id);
            self.binding = None;
        }
        self.state = next;
        true
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Message currently bound for playback
    pub fn bound_message(&self) -> Option<Uuid> {
        self.binding.map(|b| b.message_id)
    }
}
