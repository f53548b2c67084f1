//! Guarded repeating tasks

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Work done on every tick of a [`Poller`]
#[async_trait]
pub trait PollTask: Send + Sync {
    fn name(&self) -> &str;

    /// One cycle; failures are handled inside the task
    async fn tick(&self);
}

struct Active {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs a [`PollTask`] every `period` while started.
///
/// The first tick comes one period after start. At most one schedule is ever
/// active: a second start is a no-op. Cancellation is only observed between
/// ticks, so a tick in flight completes.
pub struct Poller {
    period: Duration,
    task: Arc<dyn PollTask>,
    active: Mutex<Option<Active>>,
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("name", &self.task.name())
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Poller {
    pub fn new(period: Duration, task: Arc<dyn PollTask>) -> Self {
        Self {
            period,
            task,
            active: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Start the schedule. Returns false if it was already running.
    pub fn start(&self) -> bool {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if active.as_ref().is_some_and(|a| !a.handle.is_finished()) {
            tracing::debug!("Poller '{}' already running", self.task.name());
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(
            Arc::clone(&self.task),
            Instant::now() + self.period,
            self.period,
            cancel.clone(),
        ));
        *active = Some(Active { cancel, handle });
        tracing::info!(
            "Poller '{}' started (every {:?})",
            self.task.name(),
            self.period
        );
        true
    }

    /// Stop the schedule. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let taken = match self.active.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match taken {
            Some(active) => {
                active.cancel.cancel();
                tracing::info!("Poller '{}' stopped", self.task.name());
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        match self.active.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|a| !a.handle.is_finished()),
            Err(poisoned) => poisoned
                .into_inner()
                .as_ref()
                .is_some_and(|a| !a.handle.is_finished()),
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    task: Arc<dyn PollTask>,
    first: Instant,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticks = interval_at(first, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticks.tick() => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Polling loop for '{}' cancelled", task.name());
                break;
            }
        }

        tracing::debug!("Poll '{}'", task.name());
        task.tick().await;
    }
}
