use solana_sdk::{commitment_config::CommitmentConfig, packet::PACKET_DATA_SIZE};
use std::time::Duration;

/// Configuration for packing and submitting transactions
#[derive(Debug, Clone)]
pub struct TxBatchConfig {
    /// Maximum serialized transaction size in bytes
    pub max_transaction_size_bytes: usize,

    /// Commitment a transaction must reach before `submit` returns
    pub confirmation_commitment: CommitmentConfig,

    /// Delay between signature status polls
    pub poll_interval: Duration,

    /// Commitment used when fetching the logs of a failed transaction
    pub log_commitment: CommitmentConfig,

    /// Whether to skip preflight checks (simulation before sending)
    pub skip_preflight: bool,

    /// Maximum number of transactions `submit_all` keeps in flight
    pub max_parallel_sends: usize,
}

impl Default for TxBatchConfig {
    fn default() -> Self {
        Self {
            max_transaction_size_bytes: PACKET_DATA_SIZE,
            confirmation_commitment: CommitmentConfig::confirmed(),
            poll_interval: Duration::from_millis(250),
            log_commitment: CommitmentConfig::confirmed(),
            skip_preflight: false,
            max_parallel_sends: 4,
        }
    }
}
