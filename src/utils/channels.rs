//! Channels between the host and the assistant runtime

use crate::integration::state::{AssistantCommand, AssistantEvent};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// Command and event queues of one assistant
pub struct AssistantChannels {
    /// Host commands, provider callbacks and completion results.
    ///
    /// Unbounded: providers may report from inside the runtime thread
    /// itself, which must never block on its own queue.
    pub command_tx: Sender<AssistantCommand>,
    pub command_rx: Receiver<AssistantCommand>,

    /// Notifications for the host, dropped when the host falls behind
    pub event_tx: Sender<AssistantEvent>,
    pub event_rx: Receiver<AssistantEvent>,
}

impl AssistantChannels {
    /// Create channels with the given event buffer size
    pub fn new(event_buffer_size: usize) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = bounded(event_buffer_size);

        Self {
            command_tx,
            command_rx,
            event_tx,
            event_rx,
        }
    }
}

impl Default for AssistantChannels {
    fn default() -> Self {
        Self::new(100)
    }
}
