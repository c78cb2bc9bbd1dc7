#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Event bus for cycle and activity observability.
//!
//! The bus provides a typed event enum, sequential identifiers, and support
//! for replaying recent events when subscribers reconnect (e.g. SSE clients
//! supplying `Last-Event-ID`). Internally it uses `tokio::broadcast` with a
//! bounded buffer; when the channel overflows, the oldest events are dropped.

pub mod error;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::error;
use uuid::Uuid;

pub use error::{EventBusError, EventBusResult};

/// Identifier assigned to each event emitted by the bus.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Typed domain events surfaced by the automation core.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A scan or apply-now cycle started for an instance.
    CycleStarted {
        /// Instance the cycle is running against.
        instance_id: String,
        /// Activity run identifier assigned to the cycle.
        activity_id: Uuid,
    },
    /// A cycle finished and produced an activity run.
    CycleCompleted {
        /// Instance the cycle ran against.
        instance_id: String,
        /// Activity run identifier the cycle produced.
        activity_id: Uuid,
        /// Number of torrents that matched at least one rule.
        torrents_matched: u32,
        /// Number of actions applied (excludes no-ops and dry-run records).
        actions_applied: u32,
    },
    /// A cycle aborted before completing.
    CycleFailed {
        /// Instance the cycle was running against.
        instance_id: String,
        /// Human-readable failure detail.
        reason: String,
    },
    /// An individual action was applied, skipped, or failed.
    ActivityRecorded {
        /// Instance the action was applied against.
        instance_id: String,
        /// Torrent hash the action targeted.
        hash: String,
        /// Action kind label, e.g. `"delete"`.
        action: &'static str,
        /// Outcome label, e.g. `"success"`, `"failed"`, `"dry_run"`.
        outcome: &'static str,
    },
    /// The hardlink index for an instance was invalidated, forcing a rebuild.
    HardlinkIndexInvalidated {
        /// Instance whose hardlink index was invalidated.
        instance_id: String,
    },
    /// System health status changed (degraded or restored components).
    HealthChanged {
        /// Components currently considered degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator for SSE consumers and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CycleStarted { .. } => "cycle_started",
            Self::CycleCompleted { .. } => "cycle_completed",
            Self::CycleFailed { .. } => "cycle_failed",
            Self::ActivityRecorded { .. } => "activity_recorded",
            Self::HardlinkIndexInvalidated { .. } => "hardlink_index_invalidated",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<std::sync::atomic::AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a new bus with the provided broadcast capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(std::sync::atomic::AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default in-memory buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to the bus, assigning it a sequential identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };

        {
            let mut buffer = self.lock_buffer();
            if buffer.len() == self.replay_capacity {
                buffer.pop_front();
            }
            buffer.push_back(envelope.clone());
        }

        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe to the bus, replaying any buffered events newer than `since_id`.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let mut backlog = VecDeque::new();
        if let Some(since) = since_id {
            let buffer = self.lock_buffer();
            for item in &*buffer {
                if item.id > since {
                    backlog.push_back(item.clone());
                }
            }
        }

        let receiver = self.sender.subscribe();
        EventStream { backlog, receiver }
    }

    /// Return a snapshot of buffered events newer than the supplied identifier.
    ///
    /// # Panics
    ///
    /// Panics if the replay buffer mutex has been poisoned.
    #[must_use]
    pub fn backlog_since(&self, since_id: EventId) -> Vec<EventEnvelope> {
        let buffer = self.lock_buffer();
        buffer.iter().filter(|item| item.id > since_id).cloned().collect()
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        match self.buffer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("event buffer mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream wrapper that yields events either from the replay backlog or from
/// the live broadcast channel.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event, respecting the replay backlog first.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => self.receiver.recv().await.ok(),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_cover_all_variants() {
        let id = Uuid::nil();
        assert_eq!(
            Event::CycleStarted { instance_id: "main".into(), activity_id: id }.kind(),
            "cycle_started"
        );
        assert_eq!(
            Event::HealthChanged { degraded: vec!["hardlink_index".into()] }.kind(),
            "health_changed"
        );
    }

    #[tokio::test]
    async fn publish_then_subscribe_replays_backlog() {
        let bus = EventBus::with_capacity(8);
        let first = bus.publish(Event::HardlinkIndexInvalidated {
            instance_id: "main".into(),
        });

        let mut stream = bus.subscribe(Some(first - 1));
        let envelope = stream.next().await.expect("replayed event");
        assert_eq!(envelope.id, first);
    }

    #[test]
    fn overflow_drops_oldest_buffered_event() {
        let bus = EventBus::with_capacity(2);
        bus.publish(Event::HardlinkIndexInvalidated { instance_id: "a".into() });
        bus.publish(Event::HardlinkIndexInvalidated { instance_id: "b".into() });
        let third = bus.publish(Event::HardlinkIndexInvalidated { instance_id: "c".into() });

        let backlog = bus.backlog_since(0);
        assert_eq!(backlog.len(), 2);
        assert_eq!(backlog.last().unwrap().id, third);
    }
}
