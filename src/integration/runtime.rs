//! Assistant runtime
//!
//! A dedicated worker thread owns the [`ChatOrchestrator`] and processes
//! one command queue in arrival order: host commands, provider callbacks
//! and completion results alike. Completion requests run on a tokio
//! runtime owned by the worker and post their outcome back to the queue.

use crate::integration::config::AssistantConfig;
use crate::integration::orchestrator::{ChatOrchestrator, CompletionTicket};
use crate::integration::state::{
    AssistantCommand, AssistantEvent, AssistantSnapshot, SharedAssistantState,
};
use crate::llm::client::ChatCompletionClient;
use crate::speech::provider::{
    ProviderEvent, ProviderEventSink, SpeechRecognizer, SpeechSynthesizer,
};
use crate::utils::channels::AssistantChannels;
use crate::{BabbleError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Sink that delivers speech provider callbacks to the runtime queue
#[derive(Clone)]
pub struct ProviderEvents {
    command_tx: Sender<AssistantCommand>,
}

impl ProviderEventSink for ProviderEvents {
    fn emit(&self, event: ProviderEvent) {
        if self.command_tx.send(AssistantCommand::Provider(event)).is_err() {
            debug!("Provider event dropped, runtime has stopped");
        }
    }
}

/// Handle for controlling the assistant from a host
pub struct AssistantHandle {
    command_tx: Sender<AssistantCommand>,
    event_rx: Receiver<AssistantEvent>,
    state: SharedAssistantState,
}

impl AssistantHandle {
    /// Send a command to the runtime
    pub fn send_command(&self, cmd: AssistantCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| BabbleError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(AssistantCommand::Submit(text.into()))
    }

    /// Submit the pending input (send button, or voice submit from the host)
    pub fn submit_pending(&self) -> Result<()> {
        self.send_command(AssistantCommand::SubmitPending)
    }

    pub fn set_input_text(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(AssistantCommand::SetInput(text.into()))
    }

    pub fn toggle_speech(&self, message_id: Uuid) -> Result<()> {
        self.send_command(AssistantCommand::ToggleSpeech(message_id))
    }

    pub fn start_listening(&self) -> Result<()> {
        self.send_command(AssistantCommand::StartListening)
    }

    pub fn stop_listening(&self) -> Result<()> {
        self.send_command(AssistantCommand::StopListening)
    }

    /// Ask the runtime to stop after the commands already queued
    pub fn shutdown(&self) -> Result<()> {
        self.send_command(AssistantCommand::Shutdown)
    }

    /// Try to receive an event from the runtime
    pub fn try_recv_event(&self) -> Option<AssistantEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next event
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<AssistantEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// Consumes events while waiting. Returns `None` on timeout.
    pub fn wait_for(
        &self,
        timeout: Duration,
        predicate: impl Fn(&AssistantSnapshot) -> bool,
    ) -> Option<AssistantSnapshot> {
        let deadline = Instant::now() + timeout;
        loop {
            let snapshot = self.state.snapshot();
            if predicate(&snapshot) {
                return Some(snapshot);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            // Events are only a wake-up signal here
            if let Err(RecvTimeoutError::Disconnected) =
                self.event_rx.recv_timeout(remaining.min(Duration::from_millis(50)))
            {
                let snapshot = self.state.snapshot();
                return predicate(&snapshot).then_some(snapshot);
            }
        }
    }

    /// Shared state published by the runtime
    pub fn state(&self) -> &SharedAssistantState {
        &self.state
    }

    /// Current snapshot
    pub fn snapshot(&self) -> AssistantSnapshot {
        self.state.snapshot()
    }

    /// Sink for speech providers to report their callbacks
    pub fn provider_events(&self) -> ProviderEvents {
        ProviderEvents {
            command_tx: self.command_tx.clone(),
        }
    }
}

impl Drop for AssistantHandle {
    fn drop(&mut self) {
        // The runtime keeps its own sender for completions, so the queue
        // never disconnects on its own
        let _ = self.command_tx.send(AssistantCommand::Shutdown);
    }
}

/// The worker that owns the conversation
pub struct AssistantRuntime {
    config: AssistantConfig,
    command_tx: Sender<AssistantCommand>,
    command_rx: Receiver<AssistantCommand>,
    event_tx: Sender<AssistantEvent>,
    state: SharedAssistantState,
}

impl AssistantRuntime {
    /// Create a runtime and the handle that controls it
    pub fn new(config: AssistantConfig) -> Result<(Self, AssistantHandle)> {
        config.validate()?;

        let channels = AssistantChannels::new(config.event_buffer_size);
        let state = SharedAssistantState::new();

        let handle = AssistantHandle {
            command_tx: channels.command_tx.clone(),
            event_rx: channels.event_rx,
            state: state.clone(),
        };

        let runtime = Self {
            config,
            command_tx: channels.command_tx,
            command_rx: channels.command_rx,
            event_tx: channels.event_tx,
            state,
        };

        Ok((runtime, handle))
    }

    /// Sink for providers constructed before `start`
    pub fn provider_events(&self) -> ProviderEvents {
        ProviderEvents {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Build the orchestrator and start the worker thread.
    ///
    /// The initial snapshot is published before this returns.
    pub fn start(
        self,
        client: Arc<dyn ChatCompletionClient>,
        recognizer: Box<dyn SpeechRecognizer>,
        synthesizer: Box<dyn SpeechSynthesizer>,
    ) -> Result<JoinHandle<()>> {
        let mut orchestrator = ChatOrchestrator::new(&self.config, client, recognizer, synthesizer)?;

        let completions = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("babble-completions")
            .enable_all()
            .build()
            .map_err(|e| {
                BabbleError::ConfigError(format!("Failed to create async runtime: {}", e))
            })?;

        self.state.publish(orchestrator.snapshot());

        let Self {
            command_tx,
            command_rx,
            event_tx,
            state,
            ..
        } = self;

        let handle = thread::Builder::new()
            .name("babble-assistant".to_string())
            .spawn(move || {
                info!("Assistant runtime started");

                loop {
                    let command = match command_rx.recv() {
                        Ok(command) => command,
                        Err(_) => {
                            warn!("Command channel disconnected");
                            break;
                        }
                    };

                    if let AssistantCommand::Shutdown = command {
                        info!("Assistant shutdown requested");
                        break;
                    }

                    if let Some(ticket) = handle_command(&mut orchestrator, command) {
                        spawn_completion(&completions, ticket, command_tx.clone());
                    }

                    for notice in orchestrator.take_notices() {
                        emit(&event_tx, AssistantEvent::Notice(notice));
                    }
                    state.publish(orchestrator.snapshot());
                    emit(&event_tx, AssistantEvent::StateChanged);
                }

                // Outstanding requests are abandoned, their results have
                // nowhere to go
                completions.shutdown_background();
                orchestrator.stop_listening();
                orchestrator.stop_speech();
                state.publish(orchestrator.snapshot());
                emit(&event_tx, AssistantEvent::Shutdown);
                info!("Assistant runtime stopped");
            })?;

        Ok(handle)
    }
}

/// Apply one command to the orchestrator
fn handle_command(
    orchestrator: &mut ChatOrchestrator,
    command: AssistantCommand,
) -> Option<CompletionTicket> {
    match command {
        AssistantCommand::Submit(text) => orchestrator.submit(&text),
        AssistantCommand::SubmitPending => orchestrator.submit_pending(),
        AssistantCommand::SetInput(text) => {
            orchestrator.set_input_text(text);
            None
        }
        AssistantCommand::ToggleSpeech(message_id) => {
            if let Err(e) = orchestrator.toggle_speech(message_id) {
                route_error(orchestrator, "Toggle speech", e);
            }
            None
        }
        AssistantCommand::StartListening => {
            if let Err(e) = orchestrator.start_listening() {
                route_error(orchestrator, "Start listening", e);
            }
            None
        }
        AssistantCommand::StopListening => {
            orchestrator.stop_listening();
            None
        }
        AssistantCommand::Provider(event) => orchestrator.on_provider_event(event),
        AssistantCommand::CompletionFinished(outcome) => {
            orchestrator.finish_completion(outcome);
            None
        }
        AssistantCommand::Shutdown => None,
    }
}

/// Decide whether a failed command becomes a user-facing notice.
///
/// Unrecoverable errors always do. Of the recoverable ones only a missing
/// microphone does, since the host has to switch to typed input; playback
/// problems leave the reply readable as text and are only logged.
fn route_error(orchestrator: &mut ChatOrchestrator, context: &str, error: BabbleError) {
    if !error.is_recoverable() {
        error!("{} failed: {}", context, error);
        orchestrator.report(&error);
        return;
    }

    match error {
        BabbleError::CaptureUnavailable(_) => orchestrator.report(&error),
        _ => warn!("{} failed: {}", context, error),
    }
}

fn spawn_completion(
    completions: &Runtime,
    ticket: CompletionTicket,
    command_tx: Sender<AssistantCommand>,
) {
    debug!("Dispatching completion for turn {}", ticket.turn_id);
    completions.spawn(async move {
        let outcome = ticket.run().await;
        if command_tx
            .send(AssistantCommand::CompletionFinished(outcome))
            .is_err()
        {
            debug!("Completion finished after runtime stopped");
        }
    });
}

fn emit(event_tx: &Sender<AssistantEvent>, event: AssistantEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!("Event channel full, dropping event"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}
