use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStep {
    Editing,
    Reviewing,
    Committing,
    GracePeriod,
    Finalized,
    Cancelled,
}

impl TransferStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStep::Finalized | TransferStep::Cancelled)
    }

    /// 1-based progress step shown by the form: details, review, processing.
    pub fn progress_index(&self) -> u8 {
        match self {
            TransferStep::Editing => 1,
            TransferStep::Reviewing | TransferStep::Committing => 2,
            TransferStep::GracePeriod | TransferStep::Finalized | TransferStep::Cancelled => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    Edit,
    SubmitValid,
    SubmitInvalid,
    Back,
    Confirm,
    CommitAck,
    CommitFail,
    Tick,
    GraceElapsed,
    Undo,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: TransferStep,
    pub to: TransferStep,
    pub reason: &'static str,
}

/// Step graph only; data changes live in the reducer.
///
/// Terminal steps are not handled here: callers check `is_terminal` first and
/// treat any action there as a no-op.
pub fn step_transition(
    step: TransferStep,
    action: TransferAction,
) -> Result<(TransferStep, StateTransition), TransitionError> {
    use TransferAction as A;
    use TransferStep as S;

    let (to, reason) = match (step, action) {
        (S::Editing, A::Edit) => (S::Editing, "field_edited"),
        (S::Editing, A::SubmitValid) => (S::Reviewing, "draft_valid"),
        (S::Editing, A::SubmitInvalid) => (S::Editing, "draft_invalid"),
        (S::Reviewing, A::Back) => (S::Editing, "back_to_edit"),
        (S::Reviewing, A::Confirm) => (S::Committing, "confirmed"),
        (S::Committing, A::CommitAck) => (S::GracePeriod, "commit_acknowledged"),
        (S::Committing, A::CommitFail) => (S::Reviewing, "commit_failed"),
        (S::GracePeriod, A::Tick) => (S::GracePeriod, "grace_tick"),
        (S::GracePeriod, A::GraceElapsed) => (S::Finalized, "grace_elapsed"),
        (S::GracePeriod, A::Undo) => (S::Cancelled, "undone"),
        (S::GracePeriod, A::Close) => return Err(TransitionError::CloseDuringGracePeriod),
        (S::Editing | S::Reviewing | S::Committing, A::Close) => (S::Cancelled, "closed"),
        (from, action) => return Err(TransitionError::Illegal { from, action }),
    };

    Ok((
        to,
        StateTransition {
            from: step,
            to,
            reason,
        },
    ))
}
