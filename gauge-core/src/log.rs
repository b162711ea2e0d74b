//! Event log abstraction for lifecycle events.

use std::sync::{RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::EventEnvelope;
use crate::ids::{EventId, SessionId};

/// Append-only storage for lifecycle events.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append an event to the log.
    async fn append(&self, event: EventEnvelope) -> Result<EventId>;

    /// Read all events recorded for a session.
    async fn read_session(&self, session_id: &SessionId) -> Result<Vec<EventEnvelope>>;

    /// Read events emitted in a time range (inclusive).
    async fn read_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope>>;

    /// Subscribe to events as they are appended.
    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope>;
}

/// In-memory implementation for tests and the CLI.
#[derive(Debug)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<EventEnvelope>>,
    tx: broadcast::Sender<EventEnvelope>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self {
            events: RwLock::new(Vec::new()),
            tx,
        }
    }

    /// Copy of every stored event, in append order.
    pub fn all(&self) -> Vec<EventEnvelope> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<EventEnvelope>> {
        self.events.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: EventEnvelope) -> Result<EventId> {
        let event_id = event.event_id;
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        // No subscribers is fine
        let _ = self.tx.send(event);
        Ok(event_id)
    }

    async fn read_session(&self, session_id: &SessionId) -> Result<Vec<EventEnvelope>> {
        Ok(self
            .read()
            .iter()
            .filter(|e| e.context.session_id.as_ref() == Some(session_id))
            .cloned()
            .collect())
    }

    async fn read_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EventEnvelope>> {
        Ok(self
            .read()
            .iter()
            .filter(|e| e.emitted_at >= start && e.emitted_at <= end)
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }
}
