use crate::{
    types::ConfirmedTransaction, EpochInfo, LatestBlockhash, RpcAccount, RpcConfig, RpcError,
    RpcNumber, RpcResponse, RpcResult, SignatureStatus,
};
use backoff::backoff::Backoff;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{
    header::{CONTENT_TYPE, RETRY_AFTER},
    StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use solana_client::rpc_request::RpcRequest;
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
};
use std::{
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Longest server-provided `Retry-After` we are willing to honour
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// JSON-RPC client for the ledger endpoint
///
/// Rate-limited requests are retried internally; every other failure is
/// returned to the caller as an [`RpcError`].
pub struct RpcClient {
    http: reqwest::Client,
    config: RpcConfig,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url` with default configuration
    pub fn new(url: impl Into<String>) -> RpcResult<Self> {
        Self::with_config(RpcConfig::new(url))
    }

    /// Create a client with custom configuration
    pub fn with_config(config: RpcConfig) -> RpcResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config,
            request_id: AtomicU64::new(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.config.commitment
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Issue `request` and decode its `result` member into `T`
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: RpcRequest,
        params: Value,
    ) -> RpcResult<T> {
        let result = self.send_raw(request, params).await?;
        serde_json::from_value(result).map_err(|source| RpcError::UnexpectedResult {
            method: request.to_string(),
            source,
        })
    }

    /// Issue `request` and return its validated, undecoded `result` member
    pub async fn send_raw(&self, request: RpcRequest, params: Value) -> RpcResult<Value> {
        let request_id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = request.build_request_json(request_id, params).to_string();

        let text = self.post_with_retry(body).await?;
        let json: Value = serde_json::from_str(&text)?;
        parse_envelope(json)
    }

    async fn post_with_retry(&self, body: String) -> RpcResult<String> {
        let mut backoff = self.config.rate_limit_backoff.clone();
        backoff.reset();

        let mut attempts = 0;
        loop {
            attempts += 1;
            let response = self
                .http
                .post(&self.config.url)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .filter(|secs| *secs < MAX_RETRY_AFTER_SECS)
                    .map(Duration::from_secs);
                let text = response.text().await?;

                if attempts >= self.config.max_rate_limit_attempts {
                    warn!("Rate limited {} times, giving up", attempts);
                    return Err(RpcError::RateLimited {
                        attempts,
                        body: text,
                    });
                }

                let Some(delay) = retry_after.or_else(|| backoff.next_backoff()) else {
                    return Err(RpcError::RateLimited {
                        attempts,
                        body: text,
                    });
                };

                debug!(
                    "Too many requests: {} attempts left, pausing for {:?}",
                    self.config.max_rate_limit_attempts - attempts,
                    delay
                );
                sleep(delay).await;
                continue;
            }

            let text = response.text().await?;
            if !status.is_success() {
                return Err(RpcError::Status { status, body: text });
            }
            return Ok(text);
        }
    }

    // ================================================================================================
    // Account Queries
    // ================================================================================================

    /// Fetch the balance in lamports for `pubkey`, with the slot it was observed at
    pub async fn get_balance_with_context(
        &self,
        pubkey: &Pubkey,
        commitment: CommitmentConfig,
    ) -> RpcResult<RpcResponse<RpcNumber>> {
        self.send(
            RpcRequest::GetBalance,
            json!([pubkey.to_string(), commitment]),
        )
        .await
    }

    /// Fetch the balance in lamports for `pubkey`
    pub async fn get_balance(
        &self,
        pubkey: &Pubkey,
        commitment: CommitmentConfig,
    ) -> RpcResult<RpcNumber> {
        Ok(self.get_balance_with_context(pubkey, commitment).await?.value)
    }

    /// Fetch account state; `None` if the account does not exist
    pub async fn get_account_info(
        &self,
        pubkey: &Pubkey,
        commitment: CommitmentConfig,
    ) -> RpcResult<Option<RpcAccount>> {
        let response: RpcResponse<Option<RpcAccount>> = self
            .send(
                RpcRequest::GetAccountInfo,
                json!([
                    pubkey.to_string(),
                    {"encoding": "base64", "commitment": commitment.commitment}
                ]),
            )
            .await?;
        Ok(response.value)
    }

    // ================================================================================================
    // Transactions
    // ================================================================================================

    pub async fn get_latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> RpcResult<LatestBlockhash> {
        let response: RpcResponse<LatestBlockhash> = self
            .send(RpcRequest::GetLatestBlockhash, json!([commitment]))
            .await?;
        Ok(response.value)
    }

    pub async fn get_block_height(&self, commitment: CommitmentConfig) -> RpcResult<u64> {
        self.send(RpcRequest::GetBlockHeight, json!([commitment]))
            .await
    }

    /// Submit a serialized transaction, returning the signature the ledger assigned
    pub async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        skip_preflight: bool,
        preflight_commitment: CommitmentConfig,
    ) -> RpcResult<Signature> {
        let signature: String = self
            .send(
                RpcRequest::SendTransaction,
                json!([
                    STANDARD.encode(wire_transaction),
                    {
                        "encoding": "base64",
                        "skipPreflight": skip_preflight,
                        "preflightCommitment": preflight_commitment.commitment,
                    }
                ]),
            )
            .await?;

        Signature::from_str(&signature).map_err(|err| {
            RpcError::InvalidResponse(format!("invalid signature {}: {}", signature, err))
        })
    }

    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<SignatureStatus>> {
        let response: RpcResponse<Vec<Option<SignatureStatus>>> = self
            .send(
                RpcRequest::GetSignatureStatuses,
                json!([[signature.to_string()], {"searchTransactionHistory": false}]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    /// Fetch the execution log of a landed transaction
    pub async fn get_transaction_logs(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<String>>> {
        let transaction: Option<ConfirmedTransaction> = self
            .send(
                RpcRequest::GetTransaction,
                json!([
                    signature.to_string(),
                    {
                        "encoding": "json",
                        "commitment": commitment.commitment,
                        "maxSupportedTransactionVersion": 0,
                    }
                ]),
            )
            .await?;
        Ok(transaction
            .and_then(|tx| tx.meta)
            .and_then(|meta| meta.log_messages))
    }

    // ================================================================================================
    // Chain Clock
    // ================================================================================================

    pub async fn get_epoch_info(&self, commitment: CommitmentConfig) -> RpcResult<EpochInfo> {
        self.send(RpcRequest::GetEpochInfo, json!([commitment])).await
    }

    pub async fn get_block_time(&self, slot: u64) -> RpcResult<Option<i64>> {
        self.send(RpcRequest::GetBlockTime, json!([slot])).await
    }

    /// Best-effort current on-chain unix timestamp
    pub async fn block_timestamp(&self) -> RpcResult<i64> {
        let epoch_info = self.get_epoch_info(self.commitment()).await?;
        let slot = epoch_info.absolute_slot + 1;
        self.get_block_time(slot)
            .await?
            .ok_or(RpcError::BlockTimeUnavailable(slot))
    }

    /// Wait until the on-chain clock reaches `timestamp`
    pub async fn sleep_until(&self, timestamp: i64, timeout: Duration) -> RpcResult<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            sleep(self.config.clock_poll_interval).await;

            match self.block_timestamp().await {
                Ok(now) if timestamp <= now => return Ok(()),
                Ok(_) | Err(RpcError::BlockTimeUnavailable(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Err(RpcError::ClockTimeout { target: timestamp })
    }
}

/// Validate a JSON-RPC 2.0 response envelope and extract its `result`
fn parse_envelope(mut json: Value) -> RpcResult<Value> {
    if json.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(RpcError::InvalidResponse(format!(
            "missing jsonrpc version: {}",
            json
        )));
    }

    if let Some(error) = json.get("error") {
        let message = error.get("message").and_then(Value::as_str);
        let code = error
            .get("code")
            .and_then(|code| serde_json::from_value::<i64>(code.clone()).ok());
        return match (code, message) {
            (Some(code), Some(message)) => Err(RpcError::Response {
                code,
                message: message.to_string(),
                data: error.get("data").cloned(),
            }),
            _ => Err(RpcError::InvalidResponse(format!(
                "malformed error object: {}",
                error
            ))),
        };
    }

    match json.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(RpcError::InvalidResponse(format!(
            "neither result nor error: {}",
            json
        ))),
    }
}
