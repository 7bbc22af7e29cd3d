//! Event bus for status change notifications
//!
//! Observers subscribe and receive named events whenever a status field
//! mutates. Delivery is eventually-consistent snapshots over a broadcast
//! channel; a slow observer lags, it never blocks the driver.

use crate::tristate::TriState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Events to buffer per subscriber before the oldest are dropped.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Named change notifications published by the status store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "data")]
pub enum UpdateEvent {
    StateChanged(String),
    StateOutcomeChanged(TriState),
    SelectingChanged(bool),
    DnsValidChanged(TriState),
    HashValidChanged(TriState),
    ValidGitianSigsChanged(u32),
    MinValidGitianSigsChanged(u32),
    ProcessedGitianSigsChanged(u32),
    TotalGitianSigsChanged(u32),
    VersionChanged(String),
    Message(String),
    DownloadStarted,
    DownloadProgress { received: u64, total: Option<u64> },
    DownloadFinished(bool),
    ValidUpdateReady(PathBuf),
}

/// Broadcast fan-out for [`UpdateEvent`].
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UpdateEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event. A send with no live subscribers is not an error.
    pub fn publish(&self, event: UpdateEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
