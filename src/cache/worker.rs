//! Background refresh worker.
//!
//! One tokio task per cache. It wakes on the interval ticker or on an
//! explicit refresh request, runs the cycle on the blocking pool (loaders
//! do blocking I/O) and exits on the stop signal once the current cycle
//! is done.

use crate::cache::Shared;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Requests an immediate refresh from a running worker.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl RefreshHandle {
    /// Ask for a refresh. Returns `false` once the worker has stopped.
    pub fn request(&self) -> bool {
        self.tx.send(()).is_ok()
    }
}

pub(crate) struct WorkerHandle {
    stop: broadcast::Sender<()>,
    trigger: mpsc::UnboundedSender<()>,
    task: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle {
            tx: self.trigger.clone(),
        }
    }

    pub(crate) fn stop(&self) {
        let _ = self.stop.send(());
    }

    pub(crate) fn take_task(&mut self) -> Option<JoinHandle<()>> {
        self.task.take()
    }
}

pub(crate) fn spawn(runtime: &Handle, shared: Arc<Shared>, interval: Duration) -> WorkerHandle {
    let (stop, stop_rx) = broadcast::channel(1);
    let (trigger, trigger_rx) = mpsc::unbounded_channel();
    let task = runtime.spawn(run(shared, interval, stop_rx, trigger_rx));

    WorkerHandle {
        stop,
        trigger,
        task: Some(task),
    }
}

async fn run(
    shared: Arc<Shared>,
    interval: Duration,
    mut stop: broadcast::Receiver<()>,
    mut trigger: mpsc::UnboundedReceiver<()>,
) {
    tracing::info!(
        interval_ms = interval.as_millis() as u64,
        loader = %shared.loader.describe(),
        "Refresh worker starting"
    );

    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(()) = trigger.recv() => {
                tracing::debug!("Refresh requested");
            }
            _ = stop.recv() => {
                tracing::info!("Refresh worker received stop signal, exiting loop");
                break;
            }
        }

        let cycle = shared.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || cycle.refresh()).await {
            tracing::error!(error = %e, "Refresh cycle aborted");
        }

        if shared.is_closed() {
            break;
        }
    }

    shared.release_loader();
}
