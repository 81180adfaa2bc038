use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::batch::state::StatusMessage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    StatusChanged {
        status: StatusMessage,
    },
    PairStarted {
        generation: u64,
        name: String,
    },
    PairCompleted {
        generation: u64,
        name: String,
        width: u32,
        height: u32,
    },
    PairFailed {
        generation: u64,
        name: String,
        reason: String,
    },
    RunFinished {
        generation: u64,
        status: StatusMessage,
    },
}

/// Fan-out of batch lifecycle events. Sending never fails: with no
/// subscribers the event is simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BatchEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
