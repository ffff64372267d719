use backoff::ExponentialBackoff;
use solana_sdk::commitment_config::CommitmentConfig;
use std::time::Duration;

/// Configuration for the ledger RPC client
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// HTTP(S) endpoint of the ledger JSON-RPC service
    pub url: String,

    /// Per-request HTTP timeout
    pub timeout: Duration,

    /// Default commitment for state queries
    pub commitment: CommitmentConfig,

    /// Maximum number of HTTP requests per RPC call while rate limited (429)
    pub max_rate_limit_attempts: usize,

    /// Delay schedule between rate-limited attempts
    pub rate_limit_backoff: ExponentialBackoff,

    /// Poll interval used by `sleep_until`
    pub clock_poll_interval: Duration,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8899".to_string(),
            timeout: Duration::from_secs(30),
            commitment: CommitmentConfig::confirmed(),
            max_rate_limit_attempts: 5,
            rate_limit_backoff: ExponentialBackoff {
                current_interval: Duration::from_millis(500),
                initial_interval: Duration::from_millis(500),
                randomization_factor: 0.0,
                multiplier: 2.0,
                max_interval: Duration::from_secs(30),
                max_elapsed_time: None,
                ..Default::default()
            },
            clock_poll_interval: Duration::from_millis(100),
        }
    }
}
