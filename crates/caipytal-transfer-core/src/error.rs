use thiserror::Error;

use crate::domain::DraftEditError;
use crate::ports::PortError;
use crate::state_machine::{TransferAction, TransferStep};
use crate::validation::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("illegal transfer transition: {action:?} in {from:?}")]
    Illegal {
        from: TransferStep,
        action: TransferAction,
    },
    #[error("transfer cannot be closed during the grace period")]
    CloseDuringGracePeriod,
    #[error("draft is not committable: {0:?}")]
    InvalidDraft(ValidationErrors),
    #[error(transparent)]
    Edit(#[from] DraftEditError),
    #[error("nothing to reopen: flow was not undone")]
    NothingToReopen,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Port(#[from] PortError),
}
