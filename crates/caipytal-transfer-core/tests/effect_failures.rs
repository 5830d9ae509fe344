mod common;

use caipytal_transfer_core::{
    DraftField, FlowError, PortError, TransferEvent, TransferOrchestrator, TransferStep,
    GRACE_PERIOD_SECONDS,
};
use common::{
    edit, BrokenCountdown, FlakyClock, RecordingNotifier, ScriptedCommit, TestClock,
};

fn valid_edits() -> Vec<TransferEvent> {
    vec![
        edit(DraftField::Amount, "100"),
        edit(DraftField::BeneficiaryIban, "FR7630006000011234567890189"),
        edit(DraftField::BeneficiaryName, "Jean Dupont"),
    ]
}

#[tokio::test]
async fn failing_countdown_cancel_still_finalizes_once() {
    let notifier = RecordingNotifier::default();
    let countdown = BrokenCountdown {
        fail_cancel: true,
        ..BrokenCountdown::default()
    };
    let mut orch = TransferOrchestrator::new(
        ScriptedCommit::default(),
        notifier.clone(),
        countdown.clone(),
        TestClock::default(),
    )
    .expect("open orchestrator");

    for event in valid_edits() {
        orch.handle(event).expect("edit");
    }
    orch.handle(TransferEvent::Submit).expect("submit");
    orch.handle_and_commit(TransferEvent::Confirm)
        .await
        .expect("confirm");

    for _ in 0..(GRACE_PERIOD_SECONDS + 8) {
        orch.handle(TransferEvent::Tick)
            .expect("cancel failure does not fail the tick");
    }

    assert_eq!(orch.step(), TransferStep::Finalized);
    assert_eq!(notifier.finalized_count(), 1);
    assert_eq!(
        countdown
            .cancel_attempts
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    let last = orch.transition_log().last().expect("log entry");
    assert_eq!(last.state_after, "Finalized");
    assert_eq!(last.side_effect.as_deref(), Some("stop_countdown,finalize"));
}

#[tokio::test]
async fn failing_countdown_cancel_still_notifies_undo() {
    let notifier = RecordingNotifier::default();
    let countdown = BrokenCountdown {
        fail_cancel: true,
        ..BrokenCountdown::default()
    };
    let mut orch = TransferOrchestrator::new(
        ScriptedCommit::default(),
        notifier.clone(),
        countdown,
        TestClock::default(),
    )
    .expect("open orchestrator");

    for event in valid_edits() {
        orch.handle(event).expect("edit");
    }
    orch.handle(TransferEvent::Submit).expect("submit");
    orch.handle_and_commit(TransferEvent::Confirm)
        .await
        .expect("confirm");
    orch.handle(TransferEvent::Undo).expect("undo");

    assert_eq!(orch.step(), TransferStep::Cancelled);
    assert_eq!(notifier.cancelled_reasons().len(), 1);
}

#[tokio::test]
async fn failing_countdown_start_is_reported_and_logged() {
    let countdown = BrokenCountdown {
        fail_start: true,
        ..BrokenCountdown::default()
    };
    let mut orch = TransferOrchestrator::new(
        ScriptedCommit::default(),
        RecordingNotifier::default(),
        countdown,
        TestClock::default(),
    )
    .expect("open orchestrator");

    for event in valid_edits() {
        orch.handle(event).expect("edit");
    }
    orch.handle(TransferEvent::Submit).expect("submit");
    let err = orch
        .handle_and_commit(TransferEvent::Confirm)
        .await
        .expect_err("timer start failure surfaces");
    assert!(matches!(err, FlowError::Port(PortError::Transport(_))));

    assert_eq!(orch.step(), TransferStep::GracePeriod);
    let last = orch.transition_log().last().expect("log entry");
    assert_eq!(last.command, "commit_succeeded");
    assert_eq!(last.side_effect.as_deref(), Some("start_countdown"));

    orch.handle(TransferEvent::Undo).expect("undo still possible");
    assert_eq!(orch.step(), TransferStep::Cancelled);
}

#[test]
fn clock_failure_leaves_flow_untouched() {
    // One read to open the form, one for the first edit.
    let mut orch = TransferOrchestrator::new(
        ScriptedCommit::default(),
        RecordingNotifier::default(),
        BrokenCountdown::default(),
        FlakyClock::failing_after(2),
    )
    .expect("open orchestrator");

    orch.handle(edit(DraftField::Amount, "100")).expect("edit");
    let err = orch
        .handle(edit(DraftField::BeneficiaryName, "Jean Dupont"))
        .expect_err("clock down");
    assert!(matches!(err, FlowError::Port(_)));

    assert_eq!(orch.state().draft.amount, "100");
    assert!(orch.state().draft.beneficiary_name.is_empty());
    assert_eq!(orch.transition_log().len(), 1);
}
