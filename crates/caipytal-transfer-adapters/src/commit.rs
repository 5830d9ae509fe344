use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use caipytal_transfer_core::{CommitPort, CommitReceipt, PortError, TransferPayload};

use crate::config::TransferAdapterConfig;

/// Stand-in for the transfer backend: waits a fixed delay, then answers.
#[derive(Debug, Default)]
pub struct SimulatedCommitAdapter {
    delay: Duration,
    fail_with: Option<String>,
    issued: AtomicU64,
}

impl SimulatedCommitAdapter {
    pub fn with_config(cfg: &TransferAdapterConfig) -> Self {
        Self {
            delay: cfg.simulated_commit_delay(),
            ..Self::default()
        }
    }

    /// Every commit is rejected with `reason` after the delay.
    pub fn failing(cfg: &TransferAdapterConfig, reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::with_config(cfg)
        }
    }
}

#[async_trait]
impl CommitPort for SimulatedCommitAdapter {
    async fn commit(&self, payload: &TransferPayload) -> Result<CommitReceipt, PortError> {
        tracing::debug!(
            amount = %payload.amount,
            delay_ms = self.delay.as_millis() as u64,
            "simulating transfer commit"
        );
        tokio::time::sleep(self.delay).await;
        if let Some(reason) = &self.fail_with {
            return Err(PortError::Rejected(reason.clone()));
        }
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CommitReceipt {
            confirmation_id: Some(format!("sim-{seq:06}")),
        })
    }
}

/// POSTs the payload as JSON. Any 2xx is an acknowledgement; the body may
/// carry a `transferId` (or `id`) used as confirmation id.
#[derive(Debug, Clone)]
pub struct HttpCommitAdapter {
    client: reqwest::Client,
    endpoint: String,
    timeout_ms: u64,
}

impl HttpCommitAdapter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Transport(format!("http client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    pub fn with_config(cfg: &TransferAdapterConfig) -> Result<Self, PortError> {
        let endpoint = cfg
            .commit_endpoint
            .clone()
            .ok_or(PortError::NotImplemented("commit endpoint not configured"))?;
        Self::new(endpoint, cfg.commit_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CommitPort for HttpCommitAdapter {
    async fn commit(&self, payload: &TransferPayload) -> Result<CommitReceipt, PortError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PortError::Timeout(self.timeout_ms)
                } else {
                    PortError::Transport(format!("commit request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Transport(format!("commit response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Rejected(format!("{status}: {body}")));
        }

        let confirmation_id = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
            v.get("transferId")
                .or_else(|| v.get("id"))
                .and_then(|id| id.as_str())
                .map(str::to_owned)
        });
        Ok(CommitReceipt { confirmation_id })
    }
}
