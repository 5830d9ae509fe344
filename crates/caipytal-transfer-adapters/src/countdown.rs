//! Grace-period countdown on the tokio timer.
//!
//! One task per started countdown, aborted on cancel. Ticks carry the
//! generation of the countdown that produced them so a tick already sitting in
//! the channel when the countdown was cancelled can be told apart from a live
//! one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use caipytal_transfer_core::{CountdownPort, PortError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct TokioCountdown {
    inner: Arc<CountdownInner>,
}

#[derive(Debug)]
struct CountdownInner {
    period: Duration,
    sender: mpsc::UnboundedSender<CountdownTick>,
    generation: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TokioCountdown {
    pub fn new(period: Duration) -> (Self, mpsc::UnboundedReceiver<CountdownTick>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let countdown = Self {
            inner: Arc::new(CountdownInner {
                period,
                sender,
                generation: AtomicU64::new(0),
                task: Mutex::new(None),
            }),
        };
        (countdown, receiver)
    }

    /// True only for ticks of the countdown currently running.
    pub fn accepts(&self, tick: CountdownTick) -> bool {
        self.is_running() && tick.generation == self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .map(|g| g.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    fn lock_task(&self) -> Result<std::sync::MutexGuard<'_, Option<JoinHandle<()>>>, PortError> {
        self.inner
            .task
            .lock()
            .map_err(|e| PortError::Transport(format!("countdown lock poisoned: {e}")))
    }
}

impl CountdownPort for TokioCountdown {
    fn start_countdown(&self) -> Result<(), PortError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PortError::Transport(format!("countdown needs a tokio runtime: {e}")))?;
        let mut task = self.lock_task()?;
        if let Some(previous) = task.take() {
            previous.abort();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sender = self.inner.sender.clone();
        let period = self.inner.period;
        *task = Some(runtime.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(CountdownTick { generation }).is_err() {
                    break;
                }
            }
        }));
        tracing::debug!(generation, period_ms = period.as_millis() as u64, "countdown started");
        Ok(())
    }

    fn cancel_countdown(&self) -> Result<(), PortError> {
        let mut task = self.lock_task()?;
        let stale = self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = task.take() {
            handle.abort();
            tracing::debug!(generation = stale, "countdown cancelled");
        }
        Ok(())
    }
}
