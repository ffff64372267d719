use reqwest::StatusCode;
use serde_json::Value;
use solana_client::rpc_custom_error::JSON_RPC_SERVER_ERROR_SEND_TRANSACTION_PREFLIGHT_FAILURE;
use thiserror::Error;

pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur while talking to the ledger RPC endpoint
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Rate limited after {attempts} attempts: {body}")]
    RateLimited { attempts: usize, body: String },

    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid JSON-RPC response: {0}")]
    InvalidResponse(String),

    #[error("RPC response error {code}: {message}")]
    Response {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Unexpected result for {method}: {source}")]
    UnexpectedResult {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Block time unavailable for slot {0}")]
    BlockTimeUnavailable(u64),

    #[error("Timed out waiting for on-chain clock to reach {target}")]
    ClockTimeout { target: i64 },
}

impl RpcError {
    /// Program logs attached to a preflight (simulation) rejection, if any.
    pub fn transaction_logs(&self) -> Option<Vec<String>> {
        match self {
            RpcError::Response {
                code,
                data: Some(data),
                ..
            } if *code == JSON_RPC_SERVER_ERROR_SEND_TRANSACTION_PREFLIGHT_FAILURE => {
                serde_json::from_value(data.get("logs")?.clone()).ok()
            }
            _ => None,
        }
    }

    /// Whether the endpoint kept answering 429 until the retry budget ran out.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RpcError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preflight_logs_extracted() {
        let err = RpcError::Response {
            code: JSON_RPC_SERVER_ERROR_SEND_TRANSACTION_PREFLIGHT_FAILURE,
            message: "Transaction simulation failed".to_string(),
            data: Some(json!({
                "err": {"InstructionError": [0, {"Custom": 1}]},
                "logs": ["Program 11111111111111111111111111111111 invoke [1]"],
            })),
        };

        assert_eq!(
            err.transaction_logs(),
            Some(vec![
                "Program 11111111111111111111111111111111 invoke [1]".to_string()
            ])
        );
    }

    #[test]
    fn test_logs_ignored_for_other_codes() {
        let err = RpcError::Response {
            code: -32602,
            message: "Invalid params".to_string(),
            data: Some(json!({"logs": ["ignored"]})),
        };
        assert_eq!(err.transaction_logs(), None);

        let err = RpcError::Response {
            code: JSON_RPC_SERVER_ERROR_SEND_TRANSACTION_PREFLIGHT_FAILURE,
            message: "Transaction simulation failed".to_string(),
            data: Some(json!({"logs": null})),
        };
        assert_eq!(err.transaction_logs(), None);
    }
}
