use tokio::sync::mpsc;

use caipytal_transfer_core::{CancelReason, TransferDraft, TransferNotifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowNotification {
    Finalized(TransferDraft),
    Cancelled(CancelReason),
}

/// Forwards flow callbacks to whoever holds the receiver.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<FlowNotification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FlowNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, notification: FlowNotification) {
        if self.sender.send(notification).is_err() {
            tracing::debug!("flow notification dropped: receiver gone");
        }
    }
}

impl TransferNotifier for ChannelNotifier {
    fn transfer_finalized(&self, draft: &TransferDraft) {
        tracing::info!(
            amount = %draft.amount,
            beneficiary = %draft.beneficiary_name,
            execution_date = %draft.execution_date,
            "transfer finalized"
        );
        self.send(FlowNotification::Finalized(draft.clone()));
    }

    fn transfer_cancelled(&self, reason: CancelReason) {
        tracing::info!(?reason, "transfer cancelled");
        self.send(FlowNotification::Cancelled(reason));
    }
}
