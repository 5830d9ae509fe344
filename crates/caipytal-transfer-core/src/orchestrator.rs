use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{CancelReason, TransferPayload, TransitionLogRecord};
use crate::error::{FlowError, TransitionError};
use crate::ports::{ClockPort, CommitPort, CommitReceipt, CountdownPort, PortError, TransferNotifier};
use crate::reducer::{reduce, TransferEffect, TransferEvent, TransferState};
use crate::state_machine::TransferStep;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub step: TransferStep,
    pub transition: Option<TransitionLogRecord>,
    /// Set when the event moved the flow into `Committing`. The caller runs
    /// the commit and feeds the outcome back with [`TransferOrchestrator::complete_commit`].
    pub pending_commit: Option<TransferPayload>,
}

/// Owns one transfer flow and routes reducer effects to the ports.
pub struct TransferOrchestrator<C, N, T, K>
where
    C: CommitPort,
    N: TransferNotifier,
    T: CountdownPort,
    K: ClockPort,
{
    pub commit: Arc<C>,
    pub notifier: N,
    pub countdown: T,
    pub clock: K,
    state: TransferState,
    flow_id: String,
    cycle: u32,
    log: Vec<TransitionLogRecord>,
}

impl<C, N, T, K> TransferOrchestrator<C, N, T, K>
where
    C: CommitPort,
    N: TransferNotifier,
    T: CountdownPort,
    K: ClockPort,
{
    pub fn new(commit: C, notifier: N, countdown: T, clock: K) -> Result<Self, FlowError> {
        Self::with_shared_commit(Arc::new(commit), notifier, countdown, clock)
    }

    pub fn with_shared_commit(
        commit: Arc<C>,
        notifier: N,
        countdown: T,
        clock: K,
    ) -> Result<Self, FlowError> {
        let now = clock.now()?;
        let state = TransferState::open(now.date_naive());
        let flow_id = format!("transfer-{}", now.timestamp_millis());
        tracing::info!(%flow_id, "transfer form opened");
        Ok(Self {
            commit,
            notifier,
            countdown,
            clock,
            state,
            flow_id,
            cycle: 0,
            log: Vec::new(),
        })
    }

    pub fn state(&self) -> &TransferState {
        &self.state
    }

    pub fn step(&self) -> TransferStep {
        self.state.step
    }

    pub fn flow_id(&self) -> String {
        if self.cycle == 0 {
            self.flow_id.clone()
        } else {
            format!("{}-r{}", self.flow_id, self.cycle)
        }
    }

    pub fn transition_log(&self) -> &[TransitionLogRecord] {
        &self.log
    }

    pub fn handle(&mut self, event: TransferEvent) -> Result<CommandResult, FlowError> {
        if event == TransferEvent::Tick && self.state.step != TransferStep::GracePeriod {
            if !self.state.step.is_terminal() {
                tracing::warn!(step = ?self.state.step, "stray countdown tick dropped");
            }
            return Ok(self.unchanged());
        }

        let command = event.name();
        let reduction = reduce(&self.state, event)?;
        let Some(transition) = reduction.transition else {
            return Ok(self.unchanged());
        };

        let recorded_at = self.clock.now()?;
        let state_before = self.state.step;
        self.state = reduction.state;
        if state_before != self.state.step {
            tracing::info!(
                flow_id = %self.flow_id(),
                from = ?transition.from,
                to = ?transition.to,
                reason = transition.reason,
                "transfer step changed"
            );
        }

        // Every effect runs even if an earlier one failed; the first countdown
        // start failure is returned once the transition is logged.
        let mut pending_commit = None;
        let mut failed: Option<PortError> = None;
        let mut dispatched = Vec::with_capacity(reduction.effects.len());
        for effect in reduction.effects {
            dispatched.push(effect.name());
            match effect {
                TransferEffect::StartCommit(payload) => pending_commit = Some(payload),
                TransferEffect::StartCountdown => {
                    if let Err(e) = self.countdown.start_countdown() {
                        tracing::error!(
                            flow_id = %self.flow_id(),
                            error = %e,
                            "countdown start failed"
                        );
                        failed.get_or_insert(e);
                    }
                }
                // Ticks outside the grace period are dropped, so a countdown
                // that fails to stop cannot move the flow.
                TransferEffect::StopCountdown => {
                    if let Err(e) = self.countdown.cancel_countdown() {
                        tracing::warn!(
                            flow_id = %self.flow_id(),
                            error = %e,
                            "countdown cancel failed"
                        );
                    }
                }
                TransferEffect::Finalize(draft) => self.notifier.transfer_finalized(&draft),
                TransferEffect::NotifyCancelled(reason) => {
                    self.notifier.transfer_cancelled(reason)
                }
            }
        }

        let side_effect = (!dispatched.is_empty()).then(|| dispatched.join(","));
        let rec = self.record(
            command,
            state_before,
            self.state.step,
            side_effect,
            recorded_at,
        );
        if let Some(e) = failed {
            return Err(e.into());
        }
        Ok(CommandResult {
            step: self.state.step,
            transition: Some(rec),
            pending_commit,
        })
    }

    /// Feeds a commit outcome back into the flow. A result arriving after the
    /// flow was closed is absorbed by the terminal step.
    pub fn complete_commit(
        &mut self,
        outcome: Result<CommitReceipt, PortError>,
    ) -> Result<CommandResult, FlowError> {
        let event = match outcome {
            Ok(receipt) => {
                tracing::info!(
                    flow_id = %self.flow_id(),
                    confirmation_id = receipt.confirmation_id.as_deref().unwrap_or("-"),
                    "transfer commit acknowledged"
                );
                TransferEvent::CommitSucceeded
            }
            Err(e) => TransferEvent::CommitFailed {
                reason: e.to_string(),
            },
        };
        self.handle(event)
    }

    /// Handles `event` and, when it starts a commit, awaits the commit port
    /// inline. Close cannot interleave with the commit on this path; use
    /// `handle` plus `complete_commit` for that.
    pub async fn handle_and_commit(
        &mut self,
        event: TransferEvent,
    ) -> Result<CommandResult, FlowError> {
        let result = self.handle(event)?;
        match result.pending_commit {
            Some(payload) => {
                let commit = Arc::clone(&self.commit);
                let outcome = commit.commit(&payload).await;
                self.complete_commit(outcome)
            }
            None => Ok(result),
        }
    }

    /// Starts a new editing cycle with the draft kept from an undone flow.
    /// The grace counter is back at its full value on the next commit.
    pub fn reopen(&mut self) -> Result<CommandResult, FlowError> {
        if self.state.step != TransferStep::Cancelled
            || self.state.cancel_reason != Some(CancelReason::Undone)
        {
            return Err(TransitionError::NothingToReopen.into());
        }
        let recorded_at = self.clock.now()?;
        let state_before = self.state.step;
        self.state = TransferState::reopen(self.state.draft.clone(), recorded_at.date_naive());
        self.cycle += 1;
        tracing::info!(flow_id = %self.flow_id(), "transfer reopened after undo");
        let rec = self.record("reopen", state_before, self.state.step, None, recorded_at);
        Ok(CommandResult {
            step: self.state.step,
            transition: Some(rec),
            pending_commit: None,
        })
    }

    fn unchanged(&self) -> CommandResult {
        CommandResult {
            step: self.state.step,
            transition: None,
            pending_commit: None,
        }
    }

    fn record(
        &mut self,
        command: &str,
        state_before: TransferStep,
        state_after: TransferStep,
        side_effect: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> TransitionLogRecord {
        let next_seq = self.log.last().map(|x| x.event_seq + 1).unwrap_or(1);
        let rec = TransitionLogRecord {
            event_seq: next_seq,
            flow_id: self.flow_id(),
            command: command.to_owned(),
            state_before: format!("{state_before:?}"),
            state_after: format!("{state_after:?}"),
            side_effect,
            recorded_at,
        };
        self.log.push(rec.clone());
        rec
    }
}
