//! Fan-out of [`ScoringSignal`]s to isolated worker tasks.
//!
//! Every worker gets its own task and unbounded queue, so a slow or failing
//! worker does not hold back the others or the caller. Errors and panics are
//! logged and counted, then the worker moves on to the next signal.
//!
//! On shutdown each worker drains the signals already queued before it stops.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, trace};

use crate::signal::ScoringSignal;
use crate::workers::SideEffectWorker;

/// Counters reported by a worker when it stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub name: &'static str,
    pub processed: u64,
    pub failed: u64,
}

struct WorkerHandle {
    name: &'static str,
    tx: mpsc::UnboundedSender<Arc<ScoringSignal>>,
    join: JoinHandle<WorkerStats>,
}

/// Dispatches signals to side-effect workers.
pub struct SideEffectDispatcher {
    workers: Vec<WorkerHandle>,
    shutdown: CancellationToken,
}

impl SideEffectDispatcher {
    /// Spawn one task per worker. Must be called inside a tokio runtime.
    pub fn start(workers: Vec<Arc<dyn SideEffectWorker>>) -> Self {
        let shutdown = CancellationToken::new();
        let workers = workers
            .into_iter()
            .map(|worker| {
                let (tx, rx) = mpsc::unbounded_channel();
                let name = worker.name();
                let join = tokio::spawn(worker_loop(worker, rx, shutdown.clone()));
                WorkerHandle { name, tx, join }
            })
            .collect::<Vec<_>>();
        info!(workers = workers.len(), "Side-effect dispatcher started");
        Self { workers, shutdown }
    }

    /// Hand a signal to every worker. Never blocks.
    pub fn dispatch(&self, signal: ScoringSignal) {
        let signal = Arc::new(signal);
        for worker in &self.workers {
            if worker.tx.send(Arc::clone(&signal)).is_err() {
                error!(worker = worker.name, "Worker queue closed, signal dropped");
            }
        }
        trace!(result_id = %signal.result.id, "Signal dispatched");
    }

    pub fn worker_names(&self) -> Vec<&'static str> {
        self.workers.iter().map(|w| w.name).collect()
    }

    /// Stop every worker after its queue is drained and collect their counters.
    pub async fn shutdown(self) -> Vec<WorkerStats> {
        self.shutdown.cancel();
        let mut stats = Vec::with_capacity(self.workers.len());
        for worker in self.workers {
            drop(worker.tx);
            match worker.join.await {
                Ok(s) => stats.push(s),
                Err(e) => {
                    error!(worker = worker.name, error = %e, "Worker task panicked");
                    stats.push(WorkerStats {
                        name: worker.name,
                        ..WorkerStats::default()
                    });
                }
            }
        }
        info!("Side-effect dispatcher stopped");
        stats
    }
}

impl std::fmt::Debug for SideEffectDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SideEffectDispatcher")
            .field("workers", &self.worker_names())
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish()
    }
}

async fn worker_loop(
    worker: Arc<dyn SideEffectWorker>,
    mut rx: mpsc::UnboundedReceiver<Arc<ScoringSignal>>,
    shutdown: CancellationToken,
) -> WorkerStats {
    let mut stats = WorkerStats {
        name: worker.name(),
        ..WorkerStats::default()
    };
    debug!(worker = stats.name, "Worker started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                while let Ok(signal) = rx.try_recv() {
                    run_one(&worker, signal, &mut stats).await;
                }
                debug!(worker = stats.name, "Worker received shutdown signal");
                break;
            }

            signal = rx.recv() => {
                match signal {
                    Some(signal) => run_one(&worker, signal, &mut stats).await,
                    None => break,
                }
            }
        }
    }

    debug!(
        worker = stats.name,
        processed = stats.processed,
        failed = stats.failed,
        "Worker stopped"
    );
    stats
}

/// Run one signal on its own task so a panicking worker only fails that signal.
async fn run_one(
    worker: &Arc<dyn SideEffectWorker>,
    signal: Arc<ScoringSignal>,
    stats: &mut WorkerStats,
) {
    let result_id = signal.result.id;
    let task = {
        let worker = Arc::clone(worker);
        let span = signal.context.span("side_effect");
        tokio::spawn(async move { worker.handle(&signal).instrument(span).await })
    };

    match task.await {
        Ok(Ok(())) => stats.processed += 1,
        Ok(Err(e)) => {
            stats.failed += 1;
            error!(
                worker = stats.name,
                result_id = %result_id,
                error = %e,
                error_type = e.error_type(),
                "Side effect failed"
            );
        }
        Err(e) => {
            stats.failed += 1;
            error!(
                worker = stats.name,
                result_id = %result_id,
                error = %e,
                panicked = e.is_panic(),
                "Side effect task aborted"
            );
        }
    }
}
