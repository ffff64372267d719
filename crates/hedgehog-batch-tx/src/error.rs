use hedgehog_rpc::RpcError;
use nonempty::NonEmpty;
use solana_sdk::{pubkey::Pubkey, signature::Signature, signer::SignerError};
use std::fmt;
use thiserror::Error;

pub type TxResult<T> = Result<T, TxError>;

/// Errors that can occur while packing instructions into transactions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PackingError {
    #[error("Instruction group {group_index} is empty")]
    EmptyGroup { group_index: usize },

    #[error("Instruction group {group_index} needs {size} bytes on its own (budget: {budget})")]
    GroupTooLarge {
        group_index: usize,
        size: usize,
        budget: usize,
    },
}

/// Where an Anchor program raised its error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorOrigin {
    Source { file: String, line: u32 },
    Account(String),
}

/// Values an Anchor `require_*` check compared before failing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparedValues {
    Pubkeys { left: Pubkey, right: Pubkey },
    Values { left: String, right: String },
}

/// A failed transaction whose logs could not be resolved to a known error code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SendTransactionError {
    pub message: String,
    pub logs: Vec<String>,
    /// Programs active at the point of failure, outermost first
    pub program_stack: NonEmpty<Pubkey>,
}

impl SendTransactionError {
    /// The innermost program active when the transaction failed
    pub fn program(&self) -> &Pubkey {
        self.program_stack.last()
    }
}

/// A failed transaction resolved to a specific program and error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramError {
    pub code: u32,
    /// Symbolic name of the code, when the registry or framework knows it
    pub name: Option<String>,
    pub message: String,
    pub logs: Vec<String>,
    pub program_stack: NonEmpty<Pubkey>,
    pub origin: Option<ErrorOrigin>,
    pub compared_values: Option<ComparedValues>,
}

impl ProgramError {
    pub fn program(&self) -> &Pubkey {
        self.program_stack.last()
    }
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (program {}, code {})",
            self.message,
            self.program(),
            self.code
        )
    }
}

impl std::error::Error for ProgramError {}

/// Errors surfaced by the submission pipeline
///
/// Callers are expected to branch on the variant: [`TxError::Program`] is an
/// expected business-rule violation, [`TxError::SendTransaction`] an
/// unexpected or environmental failure.
#[derive(Error, Debug)]
pub enum TxError {
    #[error("Transaction packing failed: {0}")]
    Packing(#[from] PackingError),

    #[error("Transaction {signature} was not confirmed: {message}")]
    ConfirmationTimeout {
        signature: Signature,
        message: String,
    },

    #[error("{0}")]
    SendTransaction(SendTransactionError),

    #[error("{0}")]
    Program(ProgramError),

    #[error("Failed to identify the failing program: {message}")]
    MissingProgram { message: String, logs: Vec<String> },

    #[error("Transaction is missing signatures for {0:?}")]
    MissingSignatures(Vec<Pubkey>),

    #[error("No instructions provided")]
    NoInstructions,

    #[error("RPC client error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Failed to sign transaction: {0}")]
    Signing(#[from] SignerError),

    #[error("Failed to serialize transaction: {0}")]
    Serialization(#[from] bincode::Error),
}

impl TxError {
    /// Raw program logs carried by the error, if the ledger returned any
    pub fn logs(&self) -> Option<&[String]> {
        match self {
            TxError::SendTransaction(err) => Some(&err.logs),
            TxError::Program(err) => Some(&err.logs),
            TxError::MissingProgram { logs, .. } => Some(logs),
            _ => None,
        }
    }

    /// The innermost program active at the point of failure
    pub fn program(&self) -> Option<&Pubkey> {
        match self {
            TxError::SendTransaction(err) => Some(err.program()),
            TxError::Program(err) => Some(err.program()),
            _ => None,
        }
    }

    pub fn program_error(&self) -> Option<&ProgramError> {
        match self {
            TxError::Program(err) => Some(err),
            _ => None,
        }
    }

    /// Whether resubmitting with a fresh blockhash may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TxError::ConfirmationTimeout { .. } => true,
            TxError::Rpc(err) => err.is_rate_limited(),
            _ => false,
        }
    }
}

/// Errors raised while populating the error registry
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Errors for program {0} are already registered")]
    AlreadyRegistered(Pubkey),

    #[error("Invalid IDL: {0}")]
    InvalidIdl(#[from] serde_json::Error),
}
