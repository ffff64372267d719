/*!
# Hedgehog RPC Client

JSON-RPC access to the ledger for the Hedgehog transaction layer.

## Why not the stock client?

- **Rate limits**: public endpoints answer bursts with HTTP 429. Those responses
  are retried with exponential backoff and never reach the caller unless the
  retry budget is exhausted.
- **Lossless numbers**: balances, slots and rent epochs are decoded into
  [`RpcNumber`] straight from the JSON literal, never through `f64`.
- **Strict envelopes**: every response must be a JSON-RPC 2.0 envelope with
  either a `result` or an `error`; anything else is a decode failure.

## Quick Start

```rust,no_run
use hedgehog_rpc::{RpcClient, RpcConfig};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

# async fn example() -> Result<(), hedgehog_rpc::RpcError> {
let client = RpcClient::with_config(RpcConfig {
    max_rate_limit_attempts: 8,
    ..RpcConfig::new("https://api.devnet.solana.com")
})?;

let balance = client
    .get_balance(&Pubkey::new_unique(), CommitmentConfig::confirmed())
    .await?;
println!("balance: {} lamports", balance);
# Ok(())
# }
```
*/

mod client;
mod config;
mod error;
mod number;
mod types;

pub use client::RpcClient;
pub use config::RpcConfig;
pub use error::{RpcError, RpcResult};
pub use number::RpcNumber;
pub use types::{
    ConfirmationStatus, EpochInfo, LatestBlockhash, RpcAccount, RpcContext, RpcResponse,
    SignatureStatus,
};

// Re-export the request vocabulary for callers issuing raw requests
pub use solana_client::rpc_request::RpcRequest;
