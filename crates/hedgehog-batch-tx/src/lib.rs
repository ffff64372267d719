/*!
# Hedgehog Batch Transaction Client

Packs instructions into size-bounded transactions, signs them, submits them
through the [`hedgehog_rpc`] client and turns failures into typed errors.

## Quick Start

```rust,no_run
use hedgehog_batch_tx::{BatchTxClient, ErrorRegistry, RpcClient, TxError};
use solana_sdk::{instruction::Instruction, signature::Keypair};
use std::sync::Arc;

# async fn example() -> Result<(), Box<dyn std::error::Error>> {
let registry = Arc::new(ErrorRegistry::with_builtin_programs());
let rpc = Arc::new(RpcClient::new("https://api.devnet.solana.com")?);
let client = BatchTxClient::new(rpc, Keypair::new(), registry);

let instructions: Vec<Instruction> = vec![/* your instructions */];

match client.send_packed(instructions, &[]).await {
    Ok(signatures) => println!("Sent {} transactions", signatures.len()),
    Err(TxError::Program(err)) => println!("Rejected by {}: {}", err.program(), err.message),
    Err(err) => return Err(err.into()),
}
# Ok(())
# }
```

## Error Translation

Register the error table of each program before submitting to it. A
`custom program error` in the logs of a failed transaction then comes back
as [`TxError::Program`] with the code, its name and message.

```rust
# use hedgehog_batch_tx::ErrorRegistry;
# use solana_sdk::pubkey::Pubkey;
let registry = ErrorRegistry::new();
registry
    .register_idl_json(
        Pubkey::new_unique(),
        r#"{"errors": [{"code": 6003, "name": "FeeTooHigh"}]}"#,
    )
    .unwrap();
```

## Custom Configuration

```rust
# use hedgehog_batch_tx::{BatchTxClient, ErrorRegistry, RpcClient, TxBatchConfig};
# use solana_sdk::signature::Keypair;
# use std::{sync::Arc, time::Duration};
# fn example() -> Result<(), Box<dyn std::error::Error>> {
let rpc = Arc::new(RpcClient::new("https://api.devnet.solana.com")?);
let config = TxBatchConfig {
    poll_interval: Duration::from_millis(500),
    skip_preflight: true,
    ..Default::default()
};

let client = BatchTxClient::with_config(rpc, Keypair::new(), Arc::new(ErrorRegistry::new()), config);
# Ok(())
# }
```
*/

mod anchor_errors;
mod client;
mod config;
mod error;
mod packer;
mod registry;
mod rpc;
mod signer;
mod translator;

pub use anchor_errors::lang_error;
pub use client::{BatchTxClient, SendPayload};
pub use config::TxBatchConfig;
pub use error::{
    ComparedValues, ErrorOrigin, PackingError, ProgramError, RegistryError, SendTransactionError,
    TxError, TxResult,
};
pub use packer::{
    pack_instructions, pack_instructions_with_blockhash, refresh_signature_slots, short_vec_len,
    transaction_size, InstructionGroup,
};
pub use registry::{parse_error_codes, ErrorEntry, ErrorRegistry, IdlErrorCode, ProgramErrors};
pub use rpc::LedgerRpc;
pub use signer::{missing_signers, required_signers, sign_transaction, sign_transactions};
pub use translator::{parse_error_code, program_stack, translate_logs};

// Re-export the RPC client this crate submits through
pub use hedgehog_rpc::{LatestBlockhash, RpcClient, RpcConfig, RpcError, SignatureStatus};
