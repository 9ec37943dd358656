//! End-to-end integration module
//!
//! Connects the conversation log, voice input, voice output and the
//! completion client behind one state machine, and runs it on a worker
//! thread the host talks to through an [`AssistantHandle`].

pub mod config;
pub mod orchestrator;
pub mod runtime;
pub mod state;

pub use config::AssistantConfig;
pub use orchestrator::{ChatOrchestrator, ChatState, CompletionOutcome, CompletionTicket};
pub use runtime::{AssistantHandle, AssistantRuntime, ProviderEvents};
pub use state::{AssistantCommand, AssistantEvent, AssistantSnapshot, SharedAssistantState};
