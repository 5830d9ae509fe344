use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CancelReason, TransferDraft, TransferPayload};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("commit rejected: {0}")]
    Rejected(String),
    #[error("timed out after {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReceipt {
    pub confirmation_id: Option<String>,
}

/// Backend that accepts a confirmed transfer. Must not treat the transfer as
/// final; finalization happens after the grace period on the client side.
#[async_trait]
pub trait CommitPort: Send + Sync {
    async fn commit(&self, payload: &TransferPayload) -> Result<CommitReceipt, PortError>;
}

pub trait TransferNotifier {
    /// Called exactly once per flow that reaches `Finalized`.
    fn transfer_finalized(&self, draft: &TransferDraft);
    fn transfer_cancelled(&self, reason: CancelReason);
}

pub trait CountdownPort {
    fn start_countdown(&self) -> Result<(), PortError>;
    fn cancel_countdown(&self) -> Result<(), PortError>;
}

pub trait ClockPort {
    fn now(&self) -> Result<DateTime<Utc>, PortError>;

    fn today(&self) -> Result<NaiveDate, PortError> {
        Ok(self.now()?.date_naive())
    }
}
