//! Ledger calls the submission pipeline depends on

use async_trait::async_trait;
use hedgehog_rpc::{LatestBlockhash, RpcClient, RpcResult, SignatureStatus};
use solana_sdk::{commitment_config::CommitmentConfig, signature::Signature};

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn get_latest_blockhash(&self, commitment: CommitmentConfig)
        -> RpcResult<LatestBlockhash>;

    async fn get_block_height(&self, commitment: CommitmentConfig) -> RpcResult<u64>;

    /// Submit a wire-encoded transaction
    ///
    /// A preflight rejection is reported as an error carrying the simulation
    /// logs (see [`hedgehog_rpc::RpcError::transaction_logs`]).
    async fn send_transaction(
        &self,
        wire_transaction: &[u8],
        skip_preflight: bool,
        preflight_commitment: CommitmentConfig,
    ) -> RpcResult<Signature>;

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<SignatureStatus>>;

    async fn get_transaction_logs(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<String>>>;
}

#[async_trait]
impl LedgerRpc for RpcClient {
    async fn get_latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> RpcResult<LatestBlockhash> {
        RpcClient::get_latest_blockhash(self, commitment).await
    }

    async fn get_block_height(&self, commitment: CommitmentConfig) -> RpcResult<u64> {
        RpcClient::get_block_height(self, commitment).await
    }

    async fn send_transaction(
        &self,
        wire_transaction: &[u8],
        skip_preflight: bool,
        preflight_commitment: CommitmentConfig,
    ) -> RpcResult<Signature> {
        self.send_raw_transaction(wire_transaction, skip_preflight, preflight_commitment)
            .await
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> RpcResult<Option<SignatureStatus>> {
        RpcClient::get_signature_status(self, signature).await
    }

    async fn get_transaction_logs(
        &self,
        signature: &Signature,
        commitment: CommitmentConfig,
    ) -> RpcResult<Option<Vec<String>>> {
        RpcClient::get_transaction_logs(self, signature, commitment).await
    }
}
