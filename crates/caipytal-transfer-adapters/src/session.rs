//! Async driver for one transfer flow.
//!
//! The orchestrator is synchronous; this wires it to the tokio countdown and
//! runs commits on their own task so the user can still close the form while
//! a commit is in flight.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use caipytal_transfer_core::{
    CommandResult, CommitPort, CommitReceipt, FlowError, PortError, TransferEvent,
    TransferOrchestrator, TransferPayload, TransferState, TransferStep,
};

use crate::clock::SystemClockAdapter;
use crate::config::TransferAdapterConfig;
use crate::countdown::{CountdownTick, TokioCountdown};
use crate::notifier::{ChannelNotifier, FlowNotification};

pub type SessionOrchestrator<C> =
    TransferOrchestrator<C, ChannelNotifier, TokioCountdown, SystemClockAdapter>;

type CommitOutcome = Result<CommitReceipt, PortError>;

pub struct TransferSession<C>
where
    C: CommitPort + 'static,
{
    orchestrator: SessionOrchestrator<C>,
    ticks: mpsc::UnboundedReceiver<CountdownTick>,
    commit_tx: mpsc::UnboundedSender<CommitOutcome>,
    commit_rx: mpsc::UnboundedReceiver<CommitOutcome>,
    commit_task: Option<JoinHandle<()>>,
}

impl<C> TransferSession<C>
where
    C: CommitPort + 'static,
{
    pub fn new(
        commit: C,
        cfg: &TransferAdapterConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FlowNotification>), FlowError> {
        let (countdown, ticks) = TokioCountdown::new(cfg.tick_interval());
        let (notifier, notifications) = ChannelNotifier::new();
        let orchestrator = TransferOrchestrator::with_shared_commit(
            Arc::new(commit),
            notifier,
            countdown,
            SystemClockAdapter,
        )?;
        let (commit_tx, commit_rx) = mpsc::unbounded_channel();
        Ok((
            Self {
                orchestrator,
                ticks,
                commit_tx,
                commit_rx,
                commit_task: None,
            },
            notifications,
        ))
    }

    pub fn state(&self) -> &TransferState {
        self.orchestrator.state()
    }

    pub fn orchestrator(&self) -> &SessionOrchestrator<C> {
        &self.orchestrator
    }

    pub fn dispatch(&mut self, event: TransferEvent) -> Result<CommandResult, FlowError> {
        let result = self.orchestrator.handle(event)?;
        if let Some(payload) = result.pending_commit.clone() {
            self.spawn_commit(payload);
        }
        self.drop_commit_if_terminal();
        Ok(result)
    }

    pub fn reopen(&mut self) -> Result<CommandResult, FlowError> {
        self.orchestrator.reopen()
    }

    /// Waits for the next countdown tick or commit outcome and applies it.
    /// Returns `None` once the flow is terminal or nothing can arrive.
    pub async fn next_signal(&mut self) -> Result<Option<CommandResult>, FlowError> {
        loop {
            if self.orchestrator.step().is_terminal() || !self.awaiting_signal() {
                return Ok(None);
            }
            tokio::select! {
                Some(tick) = self.ticks.recv() => {
                    if let Some(result) = self.apply_tick(tick)? {
                        return Ok(Some(result));
                    }
                }
                Some(outcome) = self.commit_rx.recv() => {
                    self.commit_task = None;
                    return self.orchestrator.complete_commit(outcome).map(Some);
                }
                else => return Ok(None),
            }
        }
    }

    /// Applies user commands and timer/commit signals until the flow is
    /// terminal. Rejected commands are logged and skipped. If the command
    /// channel closes first, waits out any pending commit or grace period and
    /// returns the state reached.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<TransferEvent>,
    ) -> Result<TransferState, FlowError> {
        let mut commands_open = true;
        loop {
            if self.orchestrator.step().is_terminal() {
                break;
            }
            if !commands_open && !self.awaiting_signal() {
                break;
            }
            tokio::select! {
                Some(tick) = self.ticks.recv() => {
                    self.apply_tick(tick)?;
                }
                Some(outcome) = self.commit_rx.recv() => {
                    self.commit_task = None;
                    self.orchestrator.complete_commit(outcome)?;
                }
                command = commands.recv(), if commands_open => match command {
                    Some(event) => self.apply_command(event)?,
                    None => commands_open = false,
                },
                else => break,
            }
        }
        Ok(self.state().clone())
    }

    /// A rejected command leaves the flow as it was; only port failures
    /// stop the loop.
    fn apply_command(&mut self, event: TransferEvent) -> Result<(), FlowError> {
        let command = event.name();
        match self.dispatch(event) {
            Ok(_) => Ok(()),
            Err(FlowError::Transition(e)) => {
                tracing::warn!(
                    command,
                    step = ?self.orchestrator.step(),
                    error = %e,
                    "transfer command rejected"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn awaiting_signal(&self) -> bool {
        matches!(
            self.orchestrator.step(),
            TransferStep::Committing | TransferStep::GracePeriod
        )
    }

    fn apply_tick(&mut self, tick: CountdownTick) -> Result<Option<CommandResult>, FlowError> {
        if !self.orchestrator.countdown.accepts(tick) {
            tracing::warn!(generation = tick.generation, "stale countdown tick rejected");
            return Ok(None);
        }
        self.orchestrator.handle(TransferEvent::Tick).map(Some)
    }

    fn spawn_commit(&mut self, payload: TransferPayload) {
        let commit = Arc::clone(&self.orchestrator.commit);
        let tx = self.commit_tx.clone();
        self.commit_task = Some(tokio::spawn(async move {
            let outcome = commit.commit(&payload).await;
            if tx.send(outcome).is_err() {
                tracing::debug!("commit outcome dropped: session gone");
            }
        }));
    }

    fn drop_commit_if_terminal(&mut self) {
        if self.orchestrator.step().is_terminal() {
            if let Some(task) = self.commit_task.take() {
                task.abort();
                tracing::info!("in-flight commit abandoned: flow closed");
            }
        }
    }
}
