use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransferAdapterConfig {
    pub tick_interval_ms: u64,
    pub simulated_commit_delay_ms: u64,
    /// When set, commits are POSTed here instead of simulated.
    pub commit_endpoint: Option<String>,
    pub commit_timeout_ms: u64,
}

impl TransferAdapterConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn simulated_commit_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_commit_delay_ms)
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

impl Default for TransferAdapterConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            simulated_commit_delay_ms: 1_500,
            commit_endpoint: None,
            commit_timeout_ms: 15_000,
        }
    }
}
