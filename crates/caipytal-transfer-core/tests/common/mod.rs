#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use caipytal_transfer_core::{
    CancelReason, ClockPort, CommitPort, CommitReceipt, CountdownPort, DraftField, PortError,
    TransferDraft, TransferEvent, TransferNotifier, TransferOrchestrator, TransferPayload,
};

#[derive(Debug, Default)]
pub struct TestClock {
    ticks: AtomicU64,
}

impl ClockPort for TestClock {
    fn now(&self) -> Result<DateTime<Utc>, PortError> {
        let base = Utc
            .with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
            .single()
            .ok_or_else(|| PortError::Transport("bad fixture time".to_owned()))?;
        let offset = self.ticks.fetch_add(1, Ordering::SeqCst) as i64;
        Ok(base + chrono::Duration::milliseconds(offset))
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).expect("fixture date")
}

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pub finalized: Arc<Mutex<Vec<TransferDraft>>>,
    pub cancelled: Arc<Mutex<Vec<CancelReason>>>,
}

impl RecordingNotifier {
    pub fn finalized_count(&self) -> usize {
        self.finalized.lock().expect("finalized lock").len()
    }

    pub fn cancelled_reasons(&self) -> Vec<CancelReason> {
        self.cancelled.lock().expect("cancelled lock").clone()
    }
}

impl TransferNotifier for RecordingNotifier {
    fn transfer_finalized(&self, draft: &TransferDraft) {
        self.finalized
            .lock()
            .expect("finalized lock")
            .push(draft.clone());
    }

    fn transfer_cancelled(&self, reason: CancelReason) {
        self.cancelled.lock().expect("cancelled lock").push(reason);
    }
}

/// Counts start/cancel calls; ticks are delivered by hand in these tests.
#[derive(Debug, Clone, Default)]
pub struct ManualCountdown {
    pub started: Arc<AtomicU32>,
    pub cancelled: Arc<AtomicU32>,
}

impl ManualCountdown {
    pub fn running(&self) -> bool {
        self.started.load(Ordering::SeqCst) > self.cancelled.load(Ordering::SeqCst)
    }
}

impl CountdownPort for ManualCountdown {
    fn start_countdown(&self) -> Result<(), PortError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel_countdown(&self) -> Result<(), PortError> {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails the first `failures` commits, then acknowledges.
#[derive(Debug, Default)]
pub struct ScriptedCommit {
    failures: AtomicU32,
    pub received: Mutex<Vec<TransferPayload>>,
}

impl ScriptedCommit {
    pub fn failing(failures: u32) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            received: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommitPort for ScriptedCommit {
    async fn commit(&self, payload: &TransferPayload) -> Result<CommitReceipt, PortError> {
        self.received
            .lock()
            .expect("received lock")
            .push(payload.clone());
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PortError::Transport("connection reset".to_owned()));
        }
        Ok(CommitReceipt {
            confirmation_id: Some("wire-0001".to_owned()),
        })
    }
}

pub type TestOrchestrator =
    TransferOrchestrator<ScriptedCommit, RecordingNotifier, ManualCountdown, TestClock>;

pub fn new_orchestrator(
    commit: ScriptedCommit,
) -> (TestOrchestrator, RecordingNotifier, ManualCountdown) {
    let notifier = RecordingNotifier::default();
    let countdown = ManualCountdown::default();
    let orch = TransferOrchestrator::new(
        commit,
        notifier.clone(),
        countdown.clone(),
        TestClock::default(),
    )
    .expect("open orchestrator");
    (orch, notifier, countdown)
}

pub fn edit(field: DraftField, value: &str) -> TransferEvent {
    TransferEvent::Edit {
        field,
        value: value.to_owned(),
    }
}

pub fn fill_valid_draft(orch: &mut TestOrchestrator) {
    for (field, value) in [
        (DraftField::Amount, "100"),
        (DraftField::BeneficiaryIban, "FR7630006000011234567890189"),
        (DraftField::BeneficiaryName, "Jean Dupont"),
        (DraftField::Reference, "Loyer octobre"),
    ] {
        orch.handle(edit(field, value)).expect("edit field");
    }
}

/// Drives a fresh orchestrator to `GracePeriod` through the inline commit path.
pub async fn drive_to_grace_period(orch: &mut TestOrchestrator) {
    fill_valid_draft(orch);
    orch.handle(TransferEvent::Submit).expect("submit");
    orch.handle_and_commit(TransferEvent::Confirm)
        .await
        .expect("confirm and commit");
}

/// Countdown whose start and/or cancel calls fail.
#[derive(Debug, Clone, Default)]
pub struct BrokenCountdown {
    pub fail_start: bool,
    pub fail_cancel: bool,
    pub cancel_attempts: Arc<AtomicU32>,
}

impl CountdownPort for BrokenCountdown {
    fn start_countdown(&self) -> Result<(), PortError> {
        if self.fail_start {
            return Err(PortError::Transport("timer unavailable".to_owned()));
        }
        Ok(())
    }

    fn cancel_countdown(&self) -> Result<(), PortError> {
        self.cancel_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_cancel {
            return Err(PortError::Transport("countdown lock poisoned".to_owned()));
        }
        Ok(())
    }
}

/// Answers the first `working_calls` reads, then fails.
#[derive(Debug, Default)]
pub struct FlakyClock {
    pub working_calls: u64,
    calls: AtomicU64,
    inner: TestClock,
}

impl FlakyClock {
    pub fn failing_after(working_calls: u64) -> Self {
        Self {
            working_calls,
            ..Self::default()
        }
    }
}

impl ClockPort for FlakyClock {
    fn now(&self) -> Result<DateTime<Utc>, PortError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.working_calls {
            return Err(PortError::Transport("clock unavailable".to_owned()));
        }
        self.inner.now()
    }
}
