//! Fire-and-forget event emission.
//!
//! The `EventEmitter` queues events for a background writer task so the code
//! that emits them never waits on the log. If the write fails, the error is
//! logged and the emitting operation's outcome is unaffected.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, trace};

use crate::context::RequestContext;
use crate::events::{EngineEvent, EventEnvelope};
use crate::log::EventLog;
use crate::strategy::AssessmentStrategy;

/// Messages sent to the background writer task.
#[derive(Debug)]
enum WriterMessage {
    Event(Box<EventEnvelope>),
    Shutdown,
}

/// Cloneable handle that queues lifecycle events for persistence.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    writer_tx: mpsc::UnboundedSender<WriterMessage>,
    broadcast_tx: broadcast::Sender<EventEnvelope>,
}

impl EventEmitter {
    /// Create an emitter writing to `log`.
    ///
    /// Spawns the writer task, so this must be called inside a tokio runtime.
    #[must_use]
    pub fn new(log: Arc<dyn EventLog>) -> Self {
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(1024);

        let task_broadcast_tx = broadcast_tx.clone();
        tokio::spawn(async move {
            Self::writer_task(log, writer_rx, task_broadcast_tx).await;
        });

        Self {
            writer_tx,
            broadcast_tx,
        }
    }

    async fn writer_task(
        log: Arc<dyn EventLog>,
        mut rx: mpsc::UnboundedReceiver<WriterMessage>,
        broadcast_tx: broadcast::Sender<EventEnvelope>,
    ) {
        debug!("Event writer task started");

        while let Some(msg) = rx.recv().await {
            match msg {
                WriterMessage::Event(event) => {
                    trace!(kind = event.event.kind(), strategy = %event.strategy, "Writing event");

                    if let Err(e) = log.append((*event).clone()).await {
                        error!(error = %e, kind = event.event.kind(), "Failed to write event to log");
                    }

                    let _ = broadcast_tx.send(*event);
                }
                WriterMessage::Shutdown => {
                    debug!("Event writer task received shutdown signal");
                    break;
                }
            }
        }

        debug!("Event writer task stopped");
    }

    /// Queue an event. Never blocks and never fails the caller.
    pub fn emit(&self, strategy: AssessmentStrategy, context: &RequestContext, event: EngineEvent) {
        let envelope = EventEnvelope::new(strategy, context.clone(), event);
        if let Err(e) = self
            .writer_tx
            .send(WriterMessage::Event(Box::new(envelope)))
        {
            error!(error = %e, "Failed to queue event - writer channel closed");
        }
    }

    /// Subscribe to events after they have been handed to the log.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.broadcast_tx.subscribe()
    }

    /// Ask the writer to stop once queued events are written.
    pub fn shutdown(&self) {
        let _ = self.writer_tx.send(WriterMessage::Shutdown);
    }
}
