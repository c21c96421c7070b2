// src/ingest/scheduler.rs
//! Background task that keeps the cache warm.
//!
//! Stopped -> Waiting(initial delay) -> Running loop. Both waits are
//! cancelable; a refresh already in flight runs to completion.
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long `stop()` waits for the worker before giving up on it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Anything the scheduler can drive.
#[async_trait]
pub trait Refreshable: Send + Sync + 'static {
    async fn refresh(&self) -> anyhow::Result<()>;
}

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct RefreshScheduler<T: Refreshable> {
    target: Arc<T>,
    interval: Duration,
    initial_delay: Duration,
    worker: Mutex<Option<Worker>>,
}

impl<T: Refreshable> RefreshScheduler<T> {
    /// A zero `interval` leaves the scheduler disabled.
    pub fn new(target: Arc<T>, interval: Duration, initial_delay: Duration) -> Self {
        Self {
            target,
            interval,
            initial_delay,
            worker: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Spawn the worker. Returns `false` when disabled or already running.
    pub fn start(&self) -> bool {
        if self.interval.is_zero() {
            tracing::info!("refresh scheduler disabled (interval is zero)");
            return false;
        }
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            Arc::clone(&self.target),
            self.interval,
            self.initial_delay,
            stop_rx,
        ));
        *slot = Some(Worker { stop_tx, handle });
        tracing::info!(interval_secs = self.interval.as_secs(), "refresh scheduler started");
        true
    }

    /// Signal the worker and wait (bounded) for it to exit. Idempotent.
    pub async fn stop(&self) {
        let worker = self.lock().take();
        let Some(Worker { stop_tx, handle }) = worker else {
            return;
        };
        let _ = stop_tx.send(true);
        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(_) => tracing::info!("refresh scheduler stopped"),
            Err(_) => tracing::warn!(
                timeout_secs = STOP_TIMEOUT.as_secs(),
                "refresh scheduler did not exit in time"
            ),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `true` when the wait was cut short by a stop signal.
async fn cancelled_during(wait: Duration, stop_rx: &mut watch::Receiver<bool>) -> bool {
    if *stop_rx.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(wait) => false,
        // A dropped sender also means stop.
        _ = stop_rx.changed() => true,
    }
}

async fn run<T: Refreshable>(
    target: Arc<T>,
    interval: Duration,
    initial_delay: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    if !initial_delay.is_zero() && cancelled_during(initial_delay, &mut stop_rx).await {
        return;
    }
    loop {
        if cancelled_during(interval, &mut stop_rx).await {
            return;
        }

        // Own task, so a panicking refresh cannot take the loop down.
        let t = Arc::clone(&target);
        match tokio::spawn(async move { t.refresh().await }).await {
            Ok(Ok(())) => tracing::debug!("scheduled refresh completed"),
            Ok(Err(e)) => tracing::error!(error = %format!("{e:#}"), "scheduled refresh failed"),
            Err(e) => tracing::error!(error = %e, "scheduled refresh task aborted"),
        }
    }
}
