pub mod domain;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod reducer;
pub mod state_machine;
pub mod validation;

pub use domain::{
    CancelReason, DraftEditError, DraftField, TransferDraft, TransferPayload, TransitionLogRecord,
    GRACE_PERIOD_SECONDS,
};
pub use error::{FlowError, TransitionError};
pub use orchestrator::{CommandResult, TransferOrchestrator};
pub use ports::{ClockPort, CommitPort, CommitReceipt, CountdownPort, PortError, TransferNotifier};
pub use reducer::{
    reduce, Reduction, TransferEffect, TransferEvent, TransferState, COMMIT_FAILED_MESSAGE,
};
pub use state_machine::{step_transition, StateTransition, TransferAction, TransferStep};
pub use validation::{is_valid_iban, validate_draft, FieldError, ValidationErrors};
