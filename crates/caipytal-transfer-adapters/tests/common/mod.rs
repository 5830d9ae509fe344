#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::mpsc;

use caipytal_transfer_adapters::{FlowNotification, TransferAdapterConfig};
use caipytal_transfer_core::{DraftField, TransferEvent};

pub fn test_config() -> TransferAdapterConfig {
    TransferAdapterConfig {
        tick_interval_ms: 1_000,
        simulated_commit_delay_ms: 1_500,
        ..TransferAdapterConfig::default()
    }
}

pub fn edit(field: DraftField, value: &str) -> TransferEvent {
    TransferEvent::Edit {
        field,
        value: value.to_owned(),
    }
}

pub fn valid_draft_events() -> Vec<TransferEvent> {
    vec![
        edit(DraftField::Amount, "100"),
        edit(DraftField::BeneficiaryIban, "FR76 3000 6000 0112 3456 7890 189"),
        edit(DraftField::BeneficiaryName, "Jean Dupont"),
        edit(DraftField::Reference, "Facture 2026-114"),
    ]
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<FlowNotification>) -> Vec<FlowNotification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn finalized_count(notifications: &[FlowNotification]) -> usize {
    notifications
        .iter()
        .filter(|n| matches!(n, FlowNotification::Finalized(_)))
        .count()
}

/// Long enough for every pending timer in these tests to fire.
pub const SETTLE: Duration = Duration::from_secs(30);
