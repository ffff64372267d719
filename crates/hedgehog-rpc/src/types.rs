/*!
# RPC Data Types

Typed views of the ledger's JSON-RPC results. Addresses, hashes and
signatures arrive as base58 strings and are parsed into the SDK types here.
*/

use crate::RpcNumber;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;
use solana_sdk::{commitment_config::CommitmentLevel, hash::Hash, pubkey::Pubkey};
use std::{fmt::Display, str::FromStr};

fn from_base58<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let s = String::deserialize(deserializer)?;
    T::from_str(&s).map_err(de::Error::custom)
}

/// Extra contextual information returned alongside a value
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcContext {
    pub slot: RpcNumber,
}

/// RPC response with extra contextual information
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcResponse<T> {
    pub context: RpcContext,
    pub value: T,
}

/// Freshness token and the last block height at which it is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    #[serde(deserialize_with = "from_base58")]
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// Account state as returned by `getAccountInfo` with base64 encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcAccount {
    pub lamports: RpcNumber,
    pub owner: Pubkey,
    pub data: Vec<u8>,
    pub executable: bool,
    pub rent_epoch: RpcNumber,
    pub space: Option<RpcNumber>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiAccount {
    lamports: RpcNumber,
    #[serde(deserialize_with = "from_base58")]
    owner: Pubkey,
    data: (String, String),
    executable: bool,
    rent_epoch: RpcNumber,
    space: Option<RpcNumber>,
}

impl<'de> Deserialize<'de> for RpcAccount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ui = UiAccount::deserialize(deserializer)?;
        let (encoded, encoding) = ui.data;
        if encoding != "base64" {
            return Err(de::Error::custom(format!(
                "unsupported account data encoding: {}",
                encoding
            )));
        }
        let data = STANDARD.decode(encoded).map_err(de::Error::custom)?;

        Ok(RpcAccount {
            lamports: ui.lamports,
            owner: ui.owner,
            data,
            executable: ui.executable,
            rent_epoch: ui.rent_epoch,
            space: ui.space,
        })
    }
}

/// Cluster confirmation level reached by a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationStatus {
    /// Whether this status meets the requested commitment level.
    pub fn satisfies(&self, commitment: CommitmentLevel) -> bool {
        let required = match commitment {
            CommitmentLevel::Processed => ConfirmationStatus::Processed,
            CommitmentLevel::Confirmed => ConfirmationStatus::Confirmed,
            CommitmentLevel::Finalized => ConfirmationStatus::Finalized,
        };
        *self >= required
    }
}

/// One entry of a `getSignatureStatuses` result
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: RpcNumber,
    pub confirmations: Option<u64>,
    /// Transaction error object; `None` when the transaction succeeded
    pub err: Option<Value>,
    pub confirmation_status: Option<ConfirmationStatus>,
}

impl SignatureStatus {
    pub fn satisfies(&self, commitment: CommitmentLevel) -> bool {
        match self.confirmation_status {
            Some(status) => status.satisfies(commitment),
            // Older nodes omit the status; rooted transactions have no confirmation count
            None => self.confirmations.is_none(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransactionMeta {
    pub log_messages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConfirmedTransaction {
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochInfo {
    pub epoch: u64,
    pub slot_index: u64,
    pub slots_in_epoch: u64,
    pub absolute_slot: u64,
    pub block_height: u64,
    pub transaction_count: Option<u64>,
}
