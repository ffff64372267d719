/*!
# Log Translator

Turns the execution log of a failed transaction into a [`TxError`].

Resolution order:

1. An Anchor error envelope (`Program log: AnchorError ...`) is returned as a
   [`ProgramError`] as-is, including where it was raised and any compared
   values logged after it.
2. The program invocation stack is rebuilt from the `invoke` / `success`
   markers up to the first `failed` marker. An empty stack means the logs
   cannot be attributed to any program.
3. The first `custom program error` code is resolved against the registered
   table of the innermost program, then against the Anchor framework codes.

Anything that does not resolve falls back to [`SendTransactionError`], which
keeps the raw logs and the stack.
*/

use crate::{
    anchor_errors::lang_error, ComparedValues, ErrorOrigin, ErrorRegistry, ProgramError,
    SendTransactionError, TxError,
};
use lazy_static::lazy_static;
use nonempty::NonEmpty;
use regex::Regex;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::debug;

lazy_static! {
    static ref INVOKE: Regex = Regex::new(r"^Program (\w+) invoke").unwrap();
    static ref SUCCESS: Regex = Regex::new(r"^Program (\w+) success").unwrap();
    static ref FAILED: Regex = Regex::new(r"^Program (\w+) failed: ").unwrap();
    static ref CUSTOM_ERROR: Regex =
        Regex::new(r"^Program \w+ failed: custom program error: (.*)$").unwrap();
    static ref ANCHOR_ERROR: Regex = Regex::new(concat!(
        r"^Program log: AnchorError ",
        r"(?:occurred|thrown in (?P<file>[^:]+):(?P<line>\d+)|caused by account: (?P<account>\S+))\. ",
        r"Error Code: (?P<name>\w+)\. ",
        r"Error Number: (?P<number>\d+)\. ",
        r"Error Message: (?P<message>.*)\.$",
    ))
    .unwrap();
    static ref LOGGED_VALUE: Regex =
        Regex::new(r"^Program log: (?:Left: |Right: )?(.*)$").unwrap();
}

/// Translate the logs of a failed transaction
///
/// `message` is the ledger's own description of the failure and is kept on
/// the fallback variants.
pub fn translate_logs(
    message: impl Into<String>,
    logs: Vec<String>,
    registry: &ErrorRegistry,
) -> TxError {
    let message = message.into();

    let envelope = logs
        .iter()
        .enumerate()
        .find_map(|(index, line)| AnchorEnvelope::parse(line).map(|envelope| (index, envelope)));
    if let Some((index, envelope)) = envelope {
        return match program_stack(&logs[..index]) {
            Some(program_stack) => {
                let compared_values = compared_values(&logs[index + 1..]);
                TxError::Program(ProgramError {
                    code: envelope.code,
                    name: Some(envelope.name),
                    message: envelope.message,
                    logs,
                    program_stack,
                    origin: envelope.origin,
                    compared_values,
                })
            }
            None => TxError::MissingProgram { message, logs },
        };
    }

    let Some(program_stack) = program_stack(&logs) else {
        debug!("No program invocation found in {} log lines", logs.len());
        return TxError::MissingProgram { message, logs };
    };

    let code = logs
        .iter()
        .find_map(|line| CUSTOM_ERROR.captures(line))
        .map(|caps| caps[1].trim().to_string());

    let Some(code) = code else {
        return send_transaction_error(message, logs, program_stack);
    };

    let Some(code) = parse_error_code(&code) else {
        debug!("Unparsable custom program error code: {}", code);
        return send_transaction_error(message, logs, program_stack);
    };

    let program = *program_stack.last();
    let Some(table) = registry.program_errors(&program) else {
        debug!("No error table registered for program {}", program);
        return send_transaction_error(message, logs, program_stack);
    };

    let (name, resolved) = match table.get(code) {
        Some(entry) => (entry.name.clone(), entry.message.clone()),
        None => match lang_error(code) {
            Some((name, text)) => (name.to_string(), text.to_string()),
            None => {
                debug!("Unknown error code {} for program {}", code, program);
                return send_transaction_error(message, logs, program_stack);
            }
        },
    };

    TxError::Program(ProgramError {
        code,
        name: Some(name),
        message: resolved,
        logs,
        program_stack,
        origin: None,
        compared_values: None,
    })
}

/// Rebuild the invocation stack up to the first failure, outermost first
///
/// Returns `None` when no program was active at that point.
pub fn program_stack(logs: &[String]) -> Option<NonEmpty<Pubkey>> {
    let mut stack = Vec::new();
    for line in logs {
        if let Some(caps) = INVOKE.captures(line) {
            match Pubkey::from_str(&caps[1]) {
                Ok(program) => stack.push(program),
                Err(_) => debug!("Ignoring invoke of malformed program id: {}", line),
            }
        } else if SUCCESS.is_match(line) {
            stack.pop();
        } else if FAILED.is_match(line) {
            break;
        }
    }
    NonEmpty::from_vec(stack)
}

/// Parse a custom error code, either `0x`-prefixed hex or decimal
pub fn parse_error_code(value: &str) -> Option<u32> {
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn send_transaction_error(
    message: String,
    logs: Vec<String>,
    program_stack: NonEmpty<Pubkey>,
) -> TxError {
    TxError::SendTransaction(SendTransactionError {
        message,
        logs,
        program_stack,
    })
}

/// The structured error line Anchor programs log before failing
struct AnchorEnvelope {
    code: u32,
    name: String,
    message: String,
    origin: Option<ErrorOrigin>,
}

impl AnchorEnvelope {
    fn parse(line: &str) -> Option<Self> {
        let caps = ANCHOR_ERROR.captures(line)?;

        let origin = match (caps.name("file"), caps.name("line"), caps.name("account")) {
            (Some(file), Some(line), _) => Some(ErrorOrigin::Source {
                file: file.as_str().to_string(),
                line: line.as_str().parse().ok()?,
            }),
            (_, _, Some(account)) => Some(ErrorOrigin::Account(account.as_str().to_string())),
            _ => None,
        };

        Some(Self {
            code: caps["number"].parse().ok()?,
            name: caps["name"].to_string(),
            message: caps["message"].to_string(),
            origin,
        })
    }
}

/// Values logged by a failed `require_*` check right after the envelope
fn compared_values(following: &[String]) -> Option<ComparedValues> {
    let logged = |index: usize| -> Option<&str> {
        let line = following.get(index)?;
        LOGGED_VALUE
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|value| value.as_str())
    };

    match following.first()?.as_str() {
        "Program log: Left:" => {
            if following.get(2).map(String::as_str) != Some("Program log: Right:") {
                return None;
            }
            let left = Pubkey::from_str(logged(1)?).ok()?;
            let right = Pubkey::from_str(logged(3)?).ok()?;
            Some(ComparedValues::Pubkeys { left, right })
        }
        line if line.starts_with("Program log: Left: ") => {
            if !following.get(1)?.starts_with("Program log: Right: ") {
                return None;
            }
            Some(ComparedValues::Values {
                left: logged(0)?.to_string(),
                right: logged(1)?.to_string(),
            })
        }
        _ => None,
    }
}
