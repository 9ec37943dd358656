//! Integration tests for the assistant runtime
//!
//! These drive the threaded runtime through its public handle with scripted
//! speech providers and a fake completion client.

use async_trait::async_trait;
use babble_chat::integration::{
    AssistantConfig, AssistantHandle, AssistantRuntime, AssistantSnapshot, ChatState,
};
use babble_chat::llm::{ChatCompletionClient, ChatMessage, FALLBACK_REPLY, GREETING};
use babble_chat::messages::Author;
use babble_chat::speech::{
    CaptureState, MicrophoneAccess, MutedSynthesizer, PlaybackState, ProviderEvent,
    ProviderEventSink, RecognitionOptions, RecognizerCapabilities, SpeechRecognizer,
    SpeechSynthesizer, UtteranceHandle, VoiceSettings,
};
use babble_chat::{BabbleError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::Semaphore;

const WAIT: Duration = Duration::from_secs(5);

// === Fakes ===

/// Completion client that answers from a script, optionally held at a gate
struct ScriptedClient {
    replies: Mutex<Vec<Result<String>>>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            gate: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl ChatCompletionClient for ScriptedClient {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().push(messages);

        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| BabbleError::CompletionFailed(e.to_string()))?;
            permit.forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut replies = self.replies.lock();
        if replies.is_empty() {
            Ok("Happy to help.".to_string())
        } else {
            replies.remove(0)
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Recognizer whose transcripts are injected through the provider sink
struct ScriptedRecognizer {
    microphone: MicrophoneAccess,
    /// Flushed once, the first time capture stops
    trailing: Option<String>,
}

impl ScriptedRecognizer {
    fn new(microphone: MicrophoneAccess) -> Self {
        Self {
            microphone,
            trailing: None,
        }
    }

    fn with_trailing(mut self, text: &str) -> Self {
        self.trailing = Some(text.to_string());
        self
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn capabilities(&self) -> RecognizerCapabilities {
        RecognizerCapabilities {
            supports_recognition: true,
            microphone: self.microphone,
        }
    }

    fn start(&mut self, _options: &RecognitionOptions) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Option<String> {
        self.trailing.take()
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Utterance {
    Speak(String),
    Stop(UtteranceHandle),
}

/// Synthesizer that records calls and never finishes on its own
struct RecordingSynthesizer {
    log: Arc<Mutex<Vec<Utterance>>>,
    next: u64,
}

impl SpeechSynthesizer for RecordingSynthesizer {
    fn speak(&mut self, text: &str, _settings: &VoiceSettings) -> Result<UtteranceHandle> {
        self.next += 1;
        self.log.lock().push(Utterance::Speak(text.to_string()));
        Ok(UtteranceHandle(self.next))
    }

    fn pause(&mut self, _handle: UtteranceHandle) {}

    fn resume(&mut self, _handle: UtteranceHandle) {}

    fn stop(&mut self, handle: UtteranceHandle) {
        self.log.lock().push(Utterance::Stop(handle));
    }
}

// === Helpers ===

struct Assistant {
    handle: AssistantHandle,
    worker: Option<JoinHandle<()>>,
    utterances: Arc<Mutex<Vec<Utterance>>>,
}

impl Assistant {
    fn start(config: AssistantConfig, client: Arc<ScriptedClient>) -> Self {
        Self::start_with(
            config,
            client,
            ScriptedRecognizer::new(MicrophoneAccess::Granted),
        )
    }

    fn start_with(
        config: AssistantConfig,
        client: Arc<ScriptedClient>,
        recognizer: ScriptedRecognizer,
    ) -> Self {
        let utterances = Arc::new(Mutex::new(Vec::new()));
        let (runtime, handle) = AssistantRuntime::new(config).unwrap();
        let worker = runtime
            .start(
                client,
                Box::new(recognizer),
                Box::new(RecordingSynthesizer {
                    log: Arc::clone(&utterances),
                    next: 0,
                }),
            )
            .unwrap();

        Self {
            handle,
            worker: Some(worker),
            utterances,
        }
    }

    fn hear(&self, text: &str, is_final: bool) {
        self.handle.provider_events().emit(ProviderEvent::Transcript {
            text: text.to_string(),
            is_final,
        });
    }

    fn wait_for(&self, predicate: impl Fn(&AssistantSnapshot) -> bool) -> AssistantSnapshot {
        self.handle
            .wait_for(WAIT, predicate)
            .expect("assistant did not reach the expected state")
    }

    fn wait_for_turns(&self, messages: usize) -> AssistantSnapshot {
        self.wait_for(|s| s.messages.len() == messages && s.chat == ChatState::Ready)
    }
}

impl Drop for Assistant {
    fn drop(&mut self) {
        let _ = self.handle.shutdown();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// === Tests ===

/// A typed submit produces one user message and one reply
#[test]
fn test_submit_produces_user_and_assistant_messages() {
    let client = Arc::new(ScriptedClient::new(vec![Ok(
        "There are 12 open positions.".to_string()
    )]));
    let assistant = Assistant::start(AssistantConfig::default(), Arc::clone(&client));

    assistant
        .handle
        .set_input_text("Tell me about job opportunities")
        .unwrap();
    assistant
        .handle
        .submit("Tell me about job opportunities")
        .unwrap();

    let snapshot = assistant.wait_for_turns(3);
    assert_eq!(snapshot.messages[0].text, GREETING);
    assert_eq!(snapshot.messages[1].author, Author::User);
    assert_eq!(snapshot.messages[1].text, "Tell me about job opportunities");
    assert_eq!(snapshot.messages[2].author, Author::Assistant);
    assert_eq!(snapshot.messages[2].text, "There are 12 open positions.");
    assert_eq!(snapshot.pending_input, "");

    // The request carried the whole conversation
    let requests = client.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].len(), 2);
}

/// "Clear" fires on an interim transcript
#[test]
fn test_interim_clear_command() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let assistant = Assistant::start(AssistantConfig::default(), client);

    assistant.handle.start_listening().unwrap();
    assistant.wait_for(|s| s.capture == CaptureState::Listening);

    assistant.hear("find me senior designers", true);
    assistant.wait_for(|s| s.pending_input == "find me senior designers");

    assistant.hear("Clear", false);
    let snapshot = assistant.wait_for(|s| s.pending_input.is_empty());
    assert_eq!(snapshot.capture, CaptureState::Listening);
    assert_eq!(snapshot.transcript, "");
}

/// A failed completion leaves the fallback reply and returns to Ready
#[test]
fn test_failed_completion_uses_fallback() {
    let client = Arc::new(ScriptedClient::new(vec![Err(
        BabbleError::CompletionFailed("HTTP 503".to_string()),
    )]));
    let assistant = Assistant::start(AssistantConfig::default(), client);

    assistant.handle.submit("Are you there?").unwrap();

    let snapshot = assistant.wait_for_turns(3);
    let reply = &snapshot.messages[2];
    assert_eq!(reply.author, Author::Assistant);
    assert_eq!(reply.text, FALLBACK_REPLY);
    assert_eq!(snapshot.chat, ChatState::Ready);
    assert_eq!(snapshot.current_playback, Some(reply.id));

    // The session continues normally
    assistant.handle.submit("Try again").unwrap();
    let snapshot = assistant.wait_for_turns(5);
    assert_eq!(snapshot.messages[4].text, "Happy to help.");
}

/// Switching playback stops the first message before starting the second
#[test]
fn test_toggle_speech_switches_messages() {
    let client = Arc::new(ScriptedClient::new(vec![Ok("Second reply".to_string())]));
    let assistant = Assistant::start(
        AssistantConfig::default().without_auto_speak(),
        client,
    );

    assistant.handle.submit("hello").unwrap();
    let snapshot = assistant.wait_for_turns(3);
    let first = snapshot.messages[0].id;
    let second = snapshot.messages[2].id;

    assistant.handle.toggle_speech(first).unwrap();
    assistant.wait_for(|s| s.bound_message == Some(first));

    assistant.handle.toggle_speech(second).unwrap();
    let snapshot = assistant.wait_for(|s| s.bound_message == Some(second));
    assert_eq!(snapshot.playback, PlaybackState::Speaking);
    assert_eq!(snapshot.current_playback, Some(second));

    assert_eq!(
        *assistant.utterances.lock(),
        vec![
            Utterance::Speak(GREETING.to_string()),
            Utterance::Stop(UtteranceHandle(1)),
            Utterance::Speak("Second reply".to_string()),
        ]
    );
}

/// Toggling the bound message pauses it, toggling again resumes it
#[test]
fn test_toggle_speech_pause_resume() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let assistant = Assistant::start(AssistantConfig::default(), client);
    let greeting = assistant.handle.snapshot().messages[0].id;

    assistant.handle.toggle_speech(greeting).unwrap();
    assistant.wait_for(|s| s.is_playing(greeting));

    assistant.handle.toggle_speech(greeting).unwrap();
    assistant.wait_for(|s| s.playback == PlaybackState::Paused);

    assistant.handle.toggle_speech(greeting).unwrap();
    assistant.wait_for(|s| s.is_playing(greeting));

    assert_eq!(assistant.utterances.lock().len(), 1);
}

/// Only one completion is ever outstanding; extra submits are dropped
#[test]
fn test_single_outstanding_completion() {
    let gate = Arc::new(Semaphore::new(0));
    let client = Arc::new(ScriptedClient::new(vec![]).gated(Arc::clone(&gate)));
    let assistant = Assistant::start(AssistantConfig::default(), Arc::clone(&client));

    assistant.handle.submit("first question").unwrap();
    assistant.wait_for(|s| s.is_awaiting());

    assistant.handle.submit("second question").unwrap();
    assistant.handle.set_input_text("typed while waiting").unwrap();
    assistant.handle.submit_pending().unwrap();
    let snapshot = assistant.wait_for(|s| s.is_awaiting());
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.pending_input, "");

    gate.add_permits(1);
    let snapshot = assistant.wait_for_turns(3);

    assert_eq!(snapshot.messages[1].text, "first question");
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.max_in_flight.load(Ordering::SeqCst), 1);
}

/// Saying "submit" sends what was dictated before it
#[test]
fn test_voice_submit_sends_dictation() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let assistant = Assistant::start(AssistantConfig::default(), Arc::clone(&client));

    assistant.handle.start_listening().unwrap();
    assistant.hear("what does the role pay", false);
    assistant.hear("what does the role pay", true);
    assistant.hear("submit", false);
    // Repeated delivery of the same command must not submit twice
    assistant.hear("submit", true);

    let snapshot = assistant.wait_for_turns(3);
    assert_eq!(snapshot.messages[1].text, "what does the role pay");
    assert_eq!(snapshot.capture, CaptureState::Idle);
    assert_eq!(snapshot.pending_input, "");
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

/// The command word flushed by the recognizer on stop is never sent
#[test]
fn test_voice_submit_ignores_flushed_command_word() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let assistant = Assistant::start_with(
        AssistantConfig::default(),
        Arc::clone(&client),
        ScriptedRecognizer::new(MicrophoneAccess::Granted).with_trailing("submit"),
    );

    assistant.handle.start_listening().unwrap();
    assistant.hear("what does the role pay", true);
    assistant.hear("submit", false);

    let snapshot = assistant.wait_for_turns(3);
    assert_eq!(snapshot.messages[1].text, "what does the role pay");
    assert_eq!(snapshot.pending_input, "");

    let requests = client.requests.lock();
    assert_eq!(
        requests[0].last(),
        Some(&ChatMessage::user("what does the role pay"))
    );
}

/// A reply arriving while another message plays takes the playback pointer
/// only after that message is stopped
#[test]
fn test_reply_during_playback_keeps_output_consistent() {
    let gate = Arc::new(Semaphore::new(0));
    let client = Arc::new(
        ScriptedClient::new(vec![Ok("Late reply".to_string())]).gated(Arc::clone(&gate)),
    );
    let assistant = Assistant::start(
        AssistantConfig::default().without_auto_speak(),
        client,
    );
    let greeting = assistant.handle.snapshot().messages[0].id;

    assistant.handle.submit("hello").unwrap();
    assistant.wait_for(|s| s.is_awaiting());
    assistant.handle.toggle_speech(greeting).unwrap();
    assistant.wait_for(|s| s.is_playing(greeting));

    gate.add_permits(1);
    let snapshot = assistant.wait_for_turns(3);
    let reply = snapshot.messages[2].id;

    assert_eq!(snapshot.current_playback, Some(reply));
    assert_eq!(snapshot.playback, PlaybackState::Idle);
    assert_eq!(snapshot.bound_message, None);
    assert_eq!(
        *assistant.utterances.lock(),
        vec![
            Utterance::Speak(GREETING.to_string()),
            Utterance::Stop(UtteranceHandle(1)),
        ]
    );
}

/// A fill-in command writes its template into the input
#[test]
fn test_fill_input_command_then_send() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let assistant = Assistant::start(AssistantConfig::default(), client);

    assistant.handle.start_listening().unwrap();
    assistant.hear("I need information about relocation", true);
    assistant.wait_for(|s| s.pending_input == "I need information about relocation");

    assistant.handle.submit_pending().unwrap();
    let snapshot = assistant.wait_for_turns(3);
    assert_eq!(snapshot.messages[1].text, "I need information about relocation");
}

/// Transcripts arriving after capture stopped do not touch the input
#[test]
fn test_late_transcript_is_dropped() {
    let client = Arc::new(ScriptedClient::new(vec![]));
    let assistant = Assistant::start(AssistantConfig::default(), client);

    assistant.handle.set_input_text("typed draft").unwrap();
    assistant.hear("stray words", true);
    assistant.handle.stop_listening().unwrap();
    assistant.handle.submit_pending().unwrap();

    let snapshot = assistant.wait_for_turns(3);
    assert_eq!(snapshot.messages[1].text, "typed draft");
    assert_eq!(snapshot.capture, CaptureState::Idle);
}

/// Denied microphone keeps capture idle and hides voice input
#[test]
fn test_denied_microphone_falls_back_to_text() {
    let (runtime, handle) = AssistantRuntime::new(AssistantConfig::default()).unwrap();
    let worker = runtime
        .start(
            Arc::new(ScriptedClient::new(vec![])),
            Box::new(ScriptedRecognizer::new(MicrophoneAccess::Denied)),
            Box::new(MutedSynthesizer::new()),
        )
        .unwrap();

    assert!(!handle.snapshot().voice_input_available);

    handle.start_listening().unwrap();
    let snapshot = handle
        .wait_for(WAIT, |s| s.notice.is_some())
        .expect("notice expected");
    assert_eq!(snapshot.capture, CaptureState::Idle);

    // Typed input still works
    handle.submit("typing instead").unwrap();
    let snapshot = handle
        .wait_for(WAIT, |s| s.messages.len() == 3 && !s.is_awaiting())
        .expect("turn expected");
    assert_eq!(snapshot.messages[2].author, Author::Assistant);

    handle.shutdown().unwrap();
    worker.join().unwrap();
}

/// Replies are spoken automatically and finish through provider events
#[test]
fn test_auto_speak_with_muted_synthesizer() {
    let (runtime, handle) = AssistantRuntime::new(AssistantConfig::default()).unwrap();
    let synthesizer = MutedSynthesizer::new().with_events(runtime.provider_events());
    let worker = runtime
        .start(
            Arc::new(ScriptedClient::new(vec![])),
            Box::new(ScriptedRecognizer::new(MicrophoneAccess::Granted)),
            Box::new(synthesizer),
        )
        .unwrap();

    handle.submit("hello").unwrap();
    let snapshot = handle
        .wait_for(WAIT, |s| {
            s.messages.len() == 3 && s.playback == PlaybackState::Idle && s.bound_message.is_none()
        })
        .expect("reply should be spoken and finish");

    assert_eq!(snapshot.current_playback, Some(snapshot.messages[2].id));

    handle.shutdown().unwrap();
    worker.join().unwrap();
}
