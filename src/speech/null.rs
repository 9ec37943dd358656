//! Stand-in providers for hosts without speech support

use crate::speech::provider::{
    PlaybackStatus, ProviderEvent, ProviderEventSink, RecognitionOptions, RecognizerCapabilities,
    SpeechRecognizer, SpeechSynthesizer, UtteranceHandle, VoiceSettings,
};
use crate::{BabbleError, Result};
use tracing::{debug, info};

/// Recognizer for platforms without speech capture. Always unavailable.
#[derive(Debug, Default)]
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn capabilities(&self) -> RecognizerCapabilities {
        RecognizerCapabilities::unsupported()
    }

    fn start(&mut self, _options: &RecognitionOptions) -> Result<()> {
        Err(BabbleError::CaptureUnavailable(
            "no speech recognizer configured".to_string(),
        ))
    }

    fn stop(&mut self) -> Option<String> {
        None
    }
}

/// Synthesizer that produces no audio.
///
/// Each utterance is logged and, when an event sink is attached, reported
/// as started and then finished right away.
#[derive(Default)]
pub struct MutedSynthesizer {
    events: Option<Box<dyn ProviderEventSink>>,
    next_handle: u64,
}

impl MutedSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, sink: impl ProviderEventSink + 'static) -> Self {
        self.events = Some(Box::new(sink));
        self
    }

    fn report(&self, handle: UtteranceHandle, status: PlaybackStatus) {
        if let Some(sink) = &self.events {
            sink.emit(ProviderEvent::Playback { handle, status });
        }
    }
}

impl SpeechSynthesizer for MutedSynthesizer {
    fn speak(&mut self, text: &str, settings: &VoiceSettings) -> Result<UtteranceHandle> {
        if text.trim().is_empty() {
            return Err(BabbleError::SynthesisFailed("nothing to speak".to_string()));
        }

        self.next_handle += 1;
        let handle = UtteranceHandle(self.next_handle);
        info!(
            "(muted) speaking {} chars at rate {:.1}",
            text.len(),
            settings.rate
        );

        self.report(handle, PlaybackStatus::Started);
        self.report(handle, PlaybackStatus::Stopped);
        Ok(handle)
    }

    fn pause(&mut self, handle: UtteranceHandle) {
        debug!("(muted) pause {:?}", handle);
    }

    fn resume(&mut self, handle: UtteranceHandle) {
        debug!("(muted) resume {:?}", handle);
    }

    fn stop(&mut self, handle: UtteranceHandle) {
        debug!("(muted) stop {:?}", handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<ProviderEvent>>>);

    impl ProviderEventSink for Collect {
        fn emit(&self, event: ProviderEvent) {
            self.0.lock().push(event);
        }
    }

    #[test]
    fn test_unsupported_recognizer() {
        let mut recognizer = UnsupportedRecognizer;
        assert!(!recognizer.capabilities().voice_input_available());
        assert!(matches!(
            recognizer.start(&RecognitionOptions::default()),
            Err(BabbleError::CaptureUnavailable(_))
        ));
        assert!(recognizer.stop().is_none());
    }

    #[test]
    fn test_muted_synthesizer_reports_finish() {
        let sink = Collect::default();
        let mut synth = MutedSynthesizer::new().with_events(sink.clone());

        let handle = synth.speak("Hello", &VoiceSettings::default()).unwrap();
        let events = sink.0.lock().clone();

        assert_eq!(
            events,
            vec![
                ProviderEvent::Playback {
                    handle,
                    status: PlaybackStatus::Started
                },
                ProviderEvent::Playback {
                    handle,
                    status: PlaybackStatus::Stopped
                },
            ]
        );
    }

    #[test]
    fn test_muted_synthesizer_rejects_blank_text() {
        let mut synth = MutedSynthesizer::new();
        assert!(matches!(
            synth.speak("  ", &VoiceSettings::default()),
            Err(BabbleError::SynthesisFailed(_))
        ));
    }
}
