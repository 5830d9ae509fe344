//! Pure reducer: `(TransferState, TransferEvent) -> (TransferState, Vec<TransferEffect>)`.
//!
//! Nothing here touches a clock, a timer or the network. The countdown and
//! the commit call are described as effects and left to the caller.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{CancelReason, DraftField, TransferDraft, TransferPayload, GRACE_PERIOD_SECONDS};
use crate::error::TransitionError;
use crate::state_machine::{step_transition, StateTransition, TransferAction, TransferStep};
use crate::validation::{validate_draft, ValidationErrors};

/// Shown after a failed commit; the underlying reason only goes to the logs.
pub const COMMIT_FAILED_MESSAGE: &str = "transfer could not be submitted, please retry";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferState {
    pub step: TransferStep,
    pub draft: TransferDraft,
    pub remaining_grace_seconds: u32,
    pub validation_errors: ValidationErrors,
    pub commit_error: Option<String>,
    pub cancel_reason: Option<CancelReason>,
    pub opened_on: NaiveDate,
}

impl TransferState {
    /// Fresh form opened on `today`.
    pub fn open(today: NaiveDate) -> Self {
        Self {
            step: TransferStep::Editing,
            draft: TransferDraft::empty(today),
            remaining_grace_seconds: GRACE_PERIOD_SECONDS,
            validation_errors: ValidationErrors::default(),
            commit_error: None,
            cancel_reason: None,
            opened_on: today,
        }
    }

    /// New editing cycle seeded with a draft kept from an undone flow.
    pub fn reopen(draft: TransferDraft, today: NaiveDate) -> Self {
        let validation_errors = validate_draft(&draft, today);
        Self {
            draft,
            validation_errors,
            ..Self::open(today)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Edit { field: DraftField, value: String },
    Submit,
    Back,
    Confirm,
    CommitSucceeded,
    CommitFailed { reason: String },
    Tick,
    Undo,
    Close,
}

impl TransferEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TransferEvent::Edit { .. } => "edit",
            TransferEvent::Submit => "submit",
            TransferEvent::Back => "back",
            TransferEvent::Confirm => "confirm",
            TransferEvent::CommitSucceeded => "commit_succeeded",
            TransferEvent::CommitFailed { .. } => "commit_failed",
            TransferEvent::Tick => "tick",
            TransferEvent::Undo => "undo",
            TransferEvent::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEffect {
    StartCommit(TransferPayload),
    /// The machine has entered `GracePeriod`.
    StartCountdown,
    /// The machine has left `GracePeriod`.
    StopCountdown,
    Finalize(TransferDraft),
    NotifyCancelled(CancelReason),
}

impl TransferEffect {
    pub fn name(&self) -> &'static str {
        match self {
            TransferEffect::StartCommit(_) => "start_commit",
            TransferEffect::StartCountdown => "start_countdown",
            TransferEffect::StopCountdown => "stop_countdown",
            TransferEffect::Finalize(_) => "finalize",
            TransferEffect::NotifyCancelled(_) => "notify_cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub state: TransferState,
    pub effects: Vec<TransferEffect>,
    /// `None` when the event was absorbed by a terminal step.
    pub transition: Option<StateTransition>,
}

pub fn reduce(state: &TransferState, event: TransferEvent) -> Result<Reduction, TransitionError> {
    if state.step.is_terminal() {
        tracing::debug!(step = ?state.step, event = event.name(), "event ignored in terminal step");
        return Ok(Reduction {
            state: state.clone(),
            effects: Vec::new(),
            transition: None,
        });
    }

    let submit_errors = match event {
        TransferEvent::Submit | TransferEvent::Confirm => {
            Some(validate_draft(&state.draft, state.opened_on))
        }
        _ => None,
    };

    let action = match &event {
        TransferEvent::Edit { .. } => TransferAction::Edit,
        TransferEvent::Submit => match &submit_errors {
            Some(errors) if errors.is_empty() => TransferAction::SubmitValid,
            _ => TransferAction::SubmitInvalid,
        },
        TransferEvent::Back => TransferAction::Back,
        TransferEvent::Confirm => TransferAction::Confirm,
        TransferEvent::CommitSucceeded => TransferAction::CommitAck,
        TransferEvent::CommitFailed { .. } => TransferAction::CommitFail,
        TransferEvent::Tick if state.remaining_grace_seconds <= 1 => TransferAction::GraceElapsed,
        TransferEvent::Tick => TransferAction::Tick,
        TransferEvent::Undo => TransferAction::Undo,
        TransferEvent::Close => TransferAction::Close,
    };

    let (to, transition) = step_transition(state.step, action)?;
    let mut next = state.clone();
    let mut effects = Vec::new();

    match event {
        TransferEvent::Edit { field, value } => {
            next.draft.set_field(field, &value)?;
            next.validation_errors = validate_draft(&next.draft, next.opened_on);
        }
        TransferEvent::Submit => {
            next.validation_errors = submit_errors.unwrap_or_default();
        }
        TransferEvent::Back => {
            next.commit_error = None;
        }
        TransferEvent::Confirm => {
            let errors = submit_errors.unwrap_or_default();
            if !errors.is_empty() {
                return Err(TransitionError::InvalidDraft(errors));
            }
            let payload = TransferPayload::from_draft(&next.draft)
                .ok_or_else(|| TransitionError::InvalidDraft(errors.clone()))?;
            next.commit_error = None;
            effects.push(TransferEffect::StartCommit(payload));
        }
        TransferEvent::CommitSucceeded => {
            next.remaining_grace_seconds = GRACE_PERIOD_SECONDS;
            effects.push(TransferEffect::StartCountdown);
        }
        TransferEvent::CommitFailed { reason } => {
            tracing::warn!(%reason, "transfer commit failed, back to review");
            next.commit_error = Some(COMMIT_FAILED_MESSAGE.to_owned());
        }
        TransferEvent::Tick => {
            next.remaining_grace_seconds = next.remaining_grace_seconds.saturating_sub(1);
            if to == TransferStep::Finalized {
                effects.push(TransferEffect::StopCountdown);
                effects.push(TransferEffect::Finalize(next.draft.clone()));
            }
        }
        TransferEvent::Undo => {
            next.cancel_reason = Some(CancelReason::Undone);
            effects.push(TransferEffect::StopCountdown);
            effects.push(TransferEffect::NotifyCancelled(CancelReason::Undone));
        }
        TransferEvent::Close => {
            next.draft = TransferDraft::empty(next.opened_on);
            next.validation_errors = ValidationErrors::default();
            next.commit_error = None;
            next.cancel_reason = Some(CancelReason::Closed);
            effects.push(TransferEffect::NotifyCancelled(CancelReason::Closed));
        }
    }

    next.step = to;
    Ok(Reduction {
        state: next,
        effects,
        transition: Some(transition),
    })
}
