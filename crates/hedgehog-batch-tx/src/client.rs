use crate::{
    packer::{pack_instructions, pack_instructions_with_blockhash, refresh_signature_slots},
    signer::{missing_signers, required_signers, sign_transaction, sign_transactions},
    translator::translate_logs,
    ErrorRegistry, InstructionGroup, LedgerRpc, TxBatchConfig, TxError, TxResult,
};
use futures::{stream, StreamExt, TryStreamExt};
use hedgehog_rpc::{LatestBlockhash, RpcClient};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// What [`BatchTxClient::send`] builds its transaction from
#[derive(Debug, Clone)]
pub enum SendPayload {
    /// Compiled into a single transaction paid for by the client payer
    Instructions(Vec<Instruction>),
    /// Sent with its compiled fee payer and a fresh blockhash
    Transaction(Transaction),
}

impl From<Vec<Instruction>> for SendPayload {
    fn from(instructions: Vec<Instruction>) -> Self {
        SendPayload::Instructions(instructions)
    }
}

impl From<Transaction> for SendPayload {
    fn from(transaction: Transaction) -> Self {
        SendPayload::Transaction(transaction)
    }
}

/// Packs, signs and submits transactions, translating failures through the registry
pub struct BatchTxClient<R: LedgerRpc = RpcClient> {
    rpc: Arc<R>,
    payer: Keypair,
    registry: Arc<ErrorRegistry>,
    config: TxBatchConfig,
}

impl<R: LedgerRpc> BatchTxClient<R> {
    /// Create a new client with default configuration
    pub fn new(rpc: Arc<R>, payer: Keypair, registry: Arc<ErrorRegistry>) -> Self {
        Self::with_config(rpc, payer, registry, TxBatchConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(
        rpc: Arc<R>,
        payer: Keypair,
        registry: Arc<ErrorRegistry>,
        config: TxBatchConfig,
    ) -> Self {
        Self {
            rpc,
            payer,
            registry,
            config,
        }
    }

    /// Get the payer's public key
    pub fn payer_pubkey(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn registry(&self) -> &Arc<ErrorRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &TxBatchConfig {
        &self.config
    }

    // ================================================================================================
    // Packing & Signing
    // ================================================================================================

    /// Pack `groups` into unsigned transactions paid for by the client payer
    pub fn pack<G: Into<InstructionGroup>>(
        &self,
        groups: impl IntoIterator<Item = G>,
    ) -> TxResult<Vec<Transaction>> {
        Ok(pack_instructions(
            groups,
            &self.payer.pubkey(),
            self.config.max_transaction_size_bytes,
        )?)
    }

    /// Sign each transaction with the subset of `signers` it requires
    pub fn sign(
        &self,
        transactions: Vec<Transaction>,
        signers: &[&dyn Signer],
    ) -> TxResult<Vec<Transaction>> {
        Ok(sign_transactions(transactions, signers)?)
    }

    // ================================================================================================
    // Submission
    // ================================================================================================

    /// Submit one transaction and wait for it to reach the configured commitment
    ///
    /// A transaction without a blockhash gets the latest one. The payer signs
    /// if the message requires it; every other signature must already be in
    /// place.
    ///
    /// Polling gives up once the latest blockhash fetched here expires. For a
    /// transaction that already carries an older blockhash, pass its expiry to
    /// [`submit_with_blockhash`](Self::submit_with_blockhash) instead.
    pub async fn submit(&self, transaction: Transaction) -> TxResult<Signature> {
        let latest = self.latest_blockhash().await?;
        self.submit_with_blockhash(transaction, latest).await
    }

    /// Build a transaction from `payload`, sign it with the payer and `signers`, and submit it
    pub async fn send(
        &self,
        payload: impl Into<SendPayload>,
        signers: &[&dyn Signer],
    ) -> TxResult<Signature> {
        let latest = self.latest_blockhash().await?;

        let mut transaction = match payload.into() {
            SendPayload::Instructions(instructions) => {
                Transaction::new_unsigned(Message::new_with_blockhash(
                    &instructions,
                    Some(&self.payer.pubkey()),
                    &latest.blockhash,
                ))
            }
            SendPayload::Transaction(mut transaction) => {
                stamp_blockhash(&mut transaction, latest.blockhash);
                transaction
            }
        };

        let mut all_signers: Vec<&dyn Signer> = vec![&self.payer];
        all_signers.extend_from_slice(signers);
        sign_transaction(&mut transaction, &all_signers)?;

        self.submit_with_blockhash(transaction, latest).await
    }

    /// Pack, sign and submit `groups` one transaction at a time
    ///
    /// Each transaction is confirmed before the next is sent, so the packed
    /// order is also the execution order.
    pub async fn send_packed<G: Into<InstructionGroup>>(
        &self,
        groups: impl IntoIterator<Item = G>,
        signers: &[&dyn Signer],
    ) -> TxResult<Vec<Signature>> {
        let groups: Vec<InstructionGroup> = groups.into_iter().map(Into::into).collect();
        if groups.is_empty() {
            return Err(TxError::NoInstructions);
        }

        let latest = self.latest_blockhash().await?;
        let transactions = pack_instructions_with_blockhash(
            groups,
            &self.payer.pubkey(),
            self.config.max_transaction_size_bytes,
            &latest.blockhash,
        )?;
        let transactions = self.sign(transactions, signers)?;

        let total = transactions.len();
        let mut signatures = Vec::with_capacity(total);
        for (index, transaction) in transactions.into_iter().enumerate() {
            info!("Submitting transaction {} of {}", index + 1, total);
            signatures.push(self.submit_with_blockhash(transaction, latest).await?);
        }

        info!("Successfully sent all {} transactions", signatures.len());
        Ok(signatures)
    }

    /// Submit independent transactions concurrently, keeping at most
    /// `max_parallel_sends` in flight
    ///
    /// No ordering between the transactions is guaranteed. Signatures are
    /// returned in input order.
    pub async fn submit_all(&self, transactions: Vec<Transaction>) -> TxResult<Vec<Signature>> {
        stream::iter(transactions)
            .map(|transaction| self.submit(transaction))
            .buffered(self.config.max_parallel_sends.max(1))
            .try_collect::<Vec<_>>()
            .await
    }

    async fn latest_blockhash(&self) -> TxResult<LatestBlockhash> {
        Ok(self
            .rpc
            .get_latest_blockhash(self.config.confirmation_commitment)
            .await?)
    }

    /// Submit `transaction`, stamping `latest.blockhash` if it has none, and
    /// poll until `latest.last_valid_block_height` is passed
    pub async fn submit_with_blockhash(
        &self,
        mut transaction: Transaction,
        latest: LatestBlockhash,
    ) -> TxResult<Signature> {
        if transaction.message.recent_blockhash == Hash::default() {
            stamp_blockhash(&mut transaction, latest.blockhash);
        }
        refresh_signature_slots(&mut transaction);

        let payer = self.payer.pubkey();
        if required_signers(&transaction.message).contains(&payer) {
            sign_transaction(&mut transaction, &[&self.payer])?;
        }

        let missing = missing_signers(&transaction);
        if !missing.is_empty() {
            return Err(TxError::MissingSignatures(missing));
        }

        let wire_transaction = bincode::serialize(&transaction)?;
        let local_signature = transaction.signatures.first().copied().unwrap_or_default();
        debug!(
            "Sending transaction {} ({} bytes)",
            local_signature,
            wire_transaction.len()
        );

        let signature = match self
            .rpc
            .send_transaction(
                &wire_transaction,
                self.config.skip_preflight,
                self.config.confirmation_commitment,
            )
            .await
        {
            Ok(signature) => signature,
            Err(err) => {
                warn!("Transaction {} rejected: {}", local_signature, err);
                return Err(match err.transaction_logs() {
                    Some(logs) => translate_logs(err.to_string(), logs, &self.registry),
                    None => err.into(),
                });
            }
        };

        self.confirm(signature, latest.last_valid_block_height)
            .await
    }

    /// Poll until `signature` reaches the configured commitment or its blockhash expires
    async fn confirm(
        &self,
        signature: Signature,
        last_valid_block_height: u64,
    ) -> TxResult<Signature> {
        let commitment = self.config.confirmation_commitment;

        loop {
            if let Some(result) = self.poll_status(signature).await? {
                return result;
            }

            let block_height = self.rpc.get_block_height(commitment).await?;
            if block_height > last_valid_block_height {
                // It may have landed since the last poll
                if let Some(result) = self.poll_status(signature).await? {
                    return result;
                }
                return Err(TxError::ConfirmationTimeout {
                    signature,
                    message: format!(
                        "block height {} exceeded last valid block height {}",
                        block_height, last_valid_block_height
                    ),
                });
            }

            sleep(self.config.poll_interval).await;
        }
    }

    /// One status poll; `None` while the configured commitment is not reached
    async fn poll_status(&self, signature: Signature) -> TxResult<Option<TxResult<Signature>>> {
        let status = match self.rpc.get_signature_status(&signature).await? {
            Some(status) if status.satisfies(self.config.confirmation_commitment.commitment) => {
                status
            }
            status => {
                debug!("Transaction {} status: {:?}", signature, status);
                return Ok(None);
            }
        };

        Ok(Some(match status.err {
            None => {
                info!("Transaction {} confirmed", signature);
                Ok(signature)
            }
            Some(err) => {
                warn!("Transaction {} failed: {}", signature, err);
                Err(self.failed_transaction(signature, err.to_string()).await)
            }
        }))
    }

    /// Translate the logs of a transaction that landed with an error
    async fn failed_transaction(&self, signature: Signature, err: String) -> TxError {
        let message = format!("Transaction {} failed: {}", signature, err);
        match self
            .rpc
            .get_transaction_logs(&signature, self.config.log_commitment)
            .await
        {
            Ok(Some(logs)) => translate_logs(message, logs, &self.registry),
            Ok(None) => TxError::ConfirmationTimeout { signature, message },
            Err(err) => err.into(),
        }
    }
}

/// Point `transaction` at `blockhash`, clearing signatures made over the old one
fn stamp_blockhash(transaction: &mut Transaction, blockhash: Hash) {
    if transaction.message.recent_blockhash != blockhash {
        transaction.message.recent_blockhash = blockhash;
        transaction
            .signatures
            .iter_mut()
            .for_each(|signature| *signature = Signature::default());
    }
}
