//! Scripted ledger for exercising the submission pipeline without a network.
#![allow(dead_code)]

use async_trait::async_trait;
use hedgehog_batch_tx::{
    BatchTxClient, ErrorRegistry, IdlErrorCode, LatestBlockhash, LedgerRpc, RpcError,
    SignatureStatus, TxBatchConfig,
};
use hedgehog_rpc::{ConfirmationStatus, RpcNumber, RpcResult};
use serde_json::{json, Value};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::{
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, Once,
    },
    time::Duration,
};

pub const PREFLIGHT_FAILURE: i64 = -32002;

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Ledger double that replays a script of signature statuses
pub struct MockLedger {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
    block_height: AtomicU64,
    statuses: Mutex<Vec<Option<SignatureStatus>>>,
    status_polls: AtomicUsize,
    send_error: Mutex<Option<RpcError>>,
    logs: Mutex<Option<Vec<String>>>,
    sent: Mutex<Vec<Transaction>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 150,
            block_height: AtomicU64::new(100),
            statuses: Mutex::new(vec![status(ConfirmationStatus::Confirmed, None)]),
            status_polls: AtomicUsize::new(0),
            send_error: Mutex::new(None),
            logs: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl MockLedger {
    /// Statuses returned by successive polls; the last one repeats
    pub fn with_statuses(self, statuses: Vec<Option<SignatureStatus>>) -> Self {
        *self.statuses.lock().unwrap() = statuses;
        self
    }

    /// Reject the next `send_transaction` call with `err`
    pub fn with_send_error(self, err: RpcError) -> Self {
        *self.send_error.lock().unwrap() = Some(err);
        self
    }

    /// Logs returned for any landed transaction
    pub fn with_logs(self, logs: Vec<String>) -> Self {
        *self.logs.lock().unwrap() = Some(logs);
        self
    }

    pub fn with_last_valid_block_height(mut self, height: u64) -> Self {
        self.last_valid_block_height = height;
        self
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn status_polls(&self) -> usize {
        self.status_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn get_latest_blockhash(
        &self,
        _commitment: CommitmentConfig,
    ) -> RpcResult<LatestBlockhash> {
        Ok(LatestBlockhash {
            blockhash: self.blockhash,
            last_valid_block_height: self.last_valid_block_height,
        })
    }

    async fn get_block_height(&self, _commitment: CommitmentConfig) -> RpcResult<u64> {
        Ok(self.block_height.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_transaction(
        &self,
        wire_transaction: &[u8],
        _skip_preflight: bool,
        _preflight_commitment: CommitmentConfig,
    ) -> RpcResult<Signature> {
        if let Some(err) = self.send_error.lock().unwrap().take() {
            return Err(err);
        }

        let transaction: Transaction = bincode::deserialize(wire_transaction)
            .map_err(|err| RpcError::InvalidResponse(err.to_string()))?;
        transaction
            .verify()
            .map_err(|err| RpcError::InvalidResponse(err.to_string()))?;

        let signature = transaction.signatures[0];
        self.sent.lock().unwrap().push(transaction);
        Ok(signature)
    }

    async fn get_signature_status(
        &self,
        _signature: &Signature,
    ) -> RpcResult<Option<SignatureStatus>> {
        let poll = self.status_polls.fetch_add(1, Ordering::SeqCst);
        let statuses = self.statuses.lock().unwrap();
        Ok(statuses
            .get(poll)
            .or_else(|| statuses.last())
            .cloned()
            .flatten())
    }

    async fn get_transaction_logs(
        &self,
        _signature: &Signature,
        _commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<String>>> {
        Ok(self.logs.lock().unwrap().clone())
    }
}

pub fn status(confirmation: ConfirmationStatus, err: Option<Value>) -> Option<SignatureStatus> {
    Some(SignatureStatus {
        slot: RpcNumber::from(4242u64),
        confirmations: Some(1),
        err,
        confirmation_status: Some(confirmation),
    })
}

/// `InstructionError` object for a custom program error
pub fn custom_error(code: u32) -> Value {
    json!({"InstructionError": [0, {"Custom": code}]})
}

/// Logs of a top-level program failing with `code`
pub fn failure_logs(program: &Pubkey, code: u32) -> Vec<String> {
    vec![
        format!("Program {} invoke [1]", program),
        "Program log: Instruction: PlaceBet".to_string(),
        format!("Program {} consumed 5120 of 200000 compute units", program),
        format!(
            "Program {} failed: custom program error: {:#x}",
            program, code
        ),
    ]
}

/// The error a preflight simulation failure comes back as
pub fn preflight_error(logs: Vec<String>) -> RpcError {
    RpcError::Response {
        code: PREFLIGHT_FAILURE,
        message: "Transaction simulation failed: Error processing Instruction 0".to_string(),
        data: Some(json!({
            "err": custom_error(6003),
            "logs": logs,
            "accounts": null,
            "unitsConsumed": 5120,
        })),
    }
}

/// Registry with the escrow program's error table
pub fn escrow_registry(program: Pubkey) -> Arc<ErrorRegistry> {
    let registry = ErrorRegistry::with_builtin_programs();
    registry
        .register(
            program,
            vec![
                IdlErrorCode::new(6000, "MarketClosed", Some("Market is closed for betting")),
                IdlErrorCode::new(6003, "FeeTooHigh", None),
            ],
        )
        .unwrap();
    Arc::new(registry)
}

/// Client polling every 10ms against `ledger`
pub fn test_client(
    ledger: Arc<MockLedger>,
    payer: Keypair,
    registry: Arc<ErrorRegistry>,
) -> BatchTxClient<MockLedger> {
    init_logging();
    let config = TxBatchConfig {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    };
    BatchTxClient::with_config(ledger, payer, registry, config)
}
