//! Catalog event broadcasting.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring buffer of recent events, so a transport that attaches late can
//! still show what happened.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::broadcast;

use mediadex_common::ShowId;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

/// Something the ingestion core wants the outside world to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    /// A file settled in a watched folder and was queued for scanning.
    Discovered { path: PathBuf },
    /// A scan pass finished and added at least one file.
    ScanComplete { added_count: usize },
    /// A background failure worth surfacing.
    Error { message: String },
    /// A duplicate show was folded into the show owning its external id.
    ShowsMerged { surviving: ShowId, removed: ShowId },
}

/// A timestamped event as stored in the ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampedEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: CatalogEvent,
}

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    recent: RwLock<VecDeque<StampedEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given broadcast buffer size.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Send an event to every subscriber and record it.
    pub fn emit(&self, event: CatalogEvent) {
        tracing::debug!(?event, "Emitting catalog event");

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(StampedEvent {
                timestamp: Utc::now(),
                event: event.clone(),
            });
        }

        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// The `n` most recent events, newest first.
    pub fn recent_events(&self, n: usize) -> Vec<StampedEvent> {
        self.recent.read().iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
