//! Caipytal: runs one delayed-commit wire transfer from the command line.
//!
//! Every state change is printed to stdout as a JSON line; logs go to stderr.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use eyre::{bail, Result};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use caipytal_transfer_adapters::{
    FlowNotification, HttpCommitAdapter, SimulatedCommitAdapter, TransferAdapterConfig,
    TransferSession,
};
use caipytal_transfer_core::{CommitPort, DraftField, TransferEvent, TransferStep};

#[derive(Parser)]
#[command(name = "caipytal")]
#[command(about = "Wire transfers with a grace-period undo window", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill, review, confirm and commit one transfer
    Transfer(TransferArgs),
}

#[derive(Args)]
struct TransferArgs {
    /// Amount as typed, e.g. 125.50
    #[arg(long)]
    amount: String,
    /// Beneficiary IBAN; spaces are allowed
    #[arg(long)]
    iban: String,
    /// Beneficiary name
    #[arg(long)]
    name: String,
    #[arg(long)]
    reference: Option<String>,
    /// Execution date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    execution_date: Option<String>,
    /// Press undo this many seconds after confirming
    #[arg(long, value_name = "SECS")]
    undo_after: Option<u64>,
    /// POST commits here instead of simulating them
    #[arg(long, env = "CAIPYTAL_COMMIT_ENDPOINT", value_name = "URL")]
    commit_endpoint: Option<String>,
    #[arg(long, env = "CAIPYTAL_COMMIT_TIMEOUT_MS", default_value_t = 15_000)]
    commit_timeout_ms: u64,
    /// Delay of the simulated commit
    #[arg(long, env = "CAIPYTAL_COMMIT_DELAY_MS", default_value_t = 1_500)]
    commit_delay_ms: u64,
    #[arg(long, env = "CAIPYTAL_TICK_INTERVAL_MS", default_value_t = 1_000)]
    tick_interval_ms: u64,
    /// Simulate a backend that rejects every commit
    #[arg(long, conflicts_with = "commit_endpoint")]
    fail_commit: bool,
}

impl TransferArgs {
    fn adapter_config(&self) -> TransferAdapterConfig {
        TransferAdapterConfig {
            tick_interval_ms: self.tick_interval_ms,
            simulated_commit_delay_ms: self.commit_delay_ms,
            commit_endpoint: self.commit_endpoint.clone(),
            commit_timeout_ms: self.commit_timeout_ms,
        }
    }

    fn edits(&self) -> Vec<TransferEvent> {
        let mut fields = vec![
            (DraftField::Amount, self.amount.clone()),
            (DraftField::BeneficiaryIban, self.iban.clone()),
            (DraftField::BeneficiaryName, self.name.clone()),
        ];
        if let Some(reference) = &self.reference {
            fields.push((DraftField::Reference, reference.clone()));
        }
        if let Some(date) = &self.execution_date {
            fields.push((DraftField::ExecutionDate, date.clone()));
        }
        fields
            .into_iter()
            .map(|(field, value)| TransferEvent::Edit { field, value })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Transfer(args) => {
            let cfg = args.adapter_config();
            if cfg.commit_endpoint.is_some() {
                let commit = HttpCommitAdapter::with_config(&cfg)?;
                tracing::info!(endpoint = commit.endpoint(), "committing over http");
                run_transfer(commit, &cfg, &args).await
            } else if args.fail_commit {
                run_transfer(
                    SimulatedCommitAdapter::failing(&cfg, "simulated backend rejection"),
                    &cfg,
                    &args,
                )
                .await
            } else {
                run_transfer(SimulatedCommitAdapter::with_config(&cfg), &cfg, &args).await
            }
        }
    }
}

async fn run_transfer<C>(
    commit: C,
    cfg: &TransferAdapterConfig,
    args: &TransferArgs,
) -> Result<()>
where
    C: CommitPort + 'static,
{
    let (mut session, mut notifications) = TransferSession::new(commit, cfg)?;
    tracing::info!(flow_id = %session.orchestrator().flow_id(), "starting transfer");

    for event in args.edits() {
        let name = event.name();
        session.dispatch(event)?;
        print_state(name, &session)?;
    }

    session.dispatch(TransferEvent::Submit)?;
    print_state("submit", &session)?;
    if session.state().step != TransferStep::Reviewing {
        bail!(
            "transfer draft is invalid: {}",
            serde_json::to_string(&session.state().validation_errors)?
        );
    }

    session.dispatch(TransferEvent::Confirm)?;
    print_state("confirm", &session)?;

    let mut undo_at = args
        .undo_after
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    loop {
        tokio::select! {
            signal = session.next_signal() => match signal? {
                Some(result) => {
                    let name = result
                        .transition
                        .as_ref()
                        .map(|t| t.command.clone())
                        .unwrap_or_else(|| "signal".to_owned());
                    print_state(&name, &session)?;
                }
                None => break,
            },
            _ = sleep_until(undo_at.unwrap_or_else(Instant::now)), if undo_at.is_some() => {
                undo_at = None;
                if session.state().step == TransferStep::GracePeriod {
                    session.dispatch(TransferEvent::Undo)?;
                    print_state("undo", &session)?;
                } else {
                    tracing::warn!(
                        step = ?session.state().step,
                        "undo window not open, undo skipped"
                    );
                }
            }
        }
    }

    drain_notifications(&mut notifications)?;

    let state = session.state();
    match state.step {
        TransferStep::Finalized | TransferStep::Cancelled => Ok(()),
        _ => match &state.commit_error {
            Some(message) => bail!("{message}"),
            None => bail!("transfer stopped in {:?}", state.step),
        },
    }
}

fn print_state<C>(event: &str, session: &TransferSession<C>) -> Result<()>
where
    C: CommitPort + 'static,
{
    let line = json!({ "event": event, "state": session.state() });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

fn drain_notifications(rx: &mut mpsc::UnboundedReceiver<FlowNotification>) -> Result<()> {
    while let Ok(notification) = rx.try_recv() {
        let line = match notification {
            FlowNotification::Finalized(draft) => {
                json!({ "notification": "finalized", "draft": draft })
            }
            FlowNotification::Cancelled(reason) => {
                json!({ "notification": "cancelled", "reason": reason })
            }
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(())
}
