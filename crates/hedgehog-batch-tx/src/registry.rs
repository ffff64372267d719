/*!
# Program Error Registry

Maps a program address to the table of custom error codes it declares, so
that `custom program error: 0x1773` in a transaction log can be turned back
into `FeeTooHigh`.

## Lifetime

Build the registry once at startup, wrap it in an `Arc` and hand it to the
[`BatchTxClient`](crate::BatchTxClient). Lookups take a shared lock and can run from any
number of in-flight submissions. Registering a program twice is a
programming error and is rejected, even when both payloads are identical.

```rust
use hedgehog_batch_tx::{ErrorRegistry, IdlErrorCode};
use solana_sdk::pubkey::Pubkey;

let registry = ErrorRegistry::with_builtin_programs();
let escrow = Pubkey::new_unique();
registry
    .register(escrow, [IdlErrorCode::new(6003, "FeeTooHigh", None)])
    .expect("first registration");

let again = registry.register(escrow, [IdlErrorCode::new(6003, "FeeTooHigh", None)]);
assert!(again.is_err());
assert_eq!(registry.lookup(&escrow, 6003).unwrap().message, "FeeTooHigh");
```
*/

use crate::RegistryError;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, system_instruction::SystemError, system_program};
use spl_associated_token_account::error::AssociatedTokenAccountError;
use spl_token::error::TokenError;
use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Debug, Display},
    sync::{Arc, PoisonError, RwLock},
};
use tracing::debug;

/// One entry of an IDL `errors` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdlErrorCode {
    pub code: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl IdlErrorCode {
    pub fn new(code: u32, name: impl Into<String>, msg: Option<&str>) -> Self {
        Self {
            code,
            name: name.into(),
            msg: msg.map(str::to_string),
        }
    }
}

/// Resolved error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub name: String,
    /// The declared message, or the name when none was declared
    pub message: String,
}

/// Error table of a single program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramErrors {
    entries: HashMap<u32, ErrorEntry>,
}

impl ProgramErrors {
    pub fn get(&self, code: u32) -> Option<&ErrorEntry> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<IdlErrorCode> for ProgramErrors {
    fn from_iter<I: IntoIterator<Item = IdlErrorCode>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .map(|IdlErrorCode { code, name, msg }| {
                let message = msg.unwrap_or_else(|| name.clone());
                (code, ErrorEntry { name, message })
            })
            .collect();
        Self { entries }
    }
}

#[derive(Deserialize)]
struct IdlErrors {
    #[serde(default)]
    errors: Vec<IdlErrorCode>,
}

/// Process-wide table of program error codes
#[derive(Debug, Default)]
pub struct ErrorRegistry {
    programs: RwLock<HashMap<Pubkey, Arc<ProgramErrors>>>,
}

impl ErrorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the System, SPL Token and
    /// Associated Token Account programs
    pub fn with_builtin_programs() -> Self {
        let registry = Self::new();
        {
            let mut programs = registry.programs_mut();
            programs.insert(system_program::id(), Arc::new(enum_errors::<SystemError>()));
            programs.insert(spl_token::id(), Arc::new(enum_errors::<TokenError>()));
            programs.insert(
                spl_associated_token_account::id(),
                Arc::new(enum_errors::<AssociatedTokenAccountError>()),
            );
        }
        registry
    }

    /// Register the error table of `program`
    ///
    /// Fails if `program` already has a table.
    pub fn register(
        &self,
        program: Pubkey,
        errors: impl IntoIterator<Item = IdlErrorCode>,
    ) -> Result<(), RegistryError> {
        let mut programs = self.programs_mut();
        if programs.contains_key(&program) {
            return Err(RegistryError::AlreadyRegistered(program));
        }

        let table: ProgramErrors = errors.into_iter().collect();
        debug!("Registered {} error codes for {}", table.len(), program);
        programs.insert(program, Arc::new(table));
        Ok(())
    }

    /// Register the `errors` array of an Anchor IDL document
    pub fn register_idl_json(&self, program: Pubkey, idl: &str) -> Result<(), RegistryError> {
        let IdlErrors { errors } = serde_json::from_str(idl)?;
        self.register(program, errors)
    }

    pub fn contains(&self, program: &Pubkey) -> bool {
        self.programs().contains_key(program)
    }

    /// The error table of `program`, if registered
    pub fn program_errors(&self, program: &Pubkey) -> Option<Arc<ProgramErrors>> {
        self.programs().get(program).cloned()
    }

    pub fn lookup(&self, program: &Pubkey, code: u32) -> Option<ErrorEntry> {
        self.programs().get(program)?.get(code).cloned()
    }

    /// Number of registered programs
    pub fn len(&self) -> usize {
        self.programs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs().is_empty()
    }

    fn programs(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<Pubkey, Arc<ProgramErrors>>> {
        self.programs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn programs_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<Pubkey, Arc<ProgramErrors>>> {
        self.programs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Build a table from a native program's error enum by walking its codes from zero
fn enum_errors<E: FromPrimitive + Debug + Display>() -> ProgramErrors {
    (0u32..)
        .map_while(|code| E::from_u32(code).map(|err| (code, err)))
        .map(|(code, err)| IdlErrorCode {
            code,
            name: format!("{:?}", err),
            msg: Some(err.to_string()),
        })
        .collect()
}

/// Map error names to their codes, e.g. to assert on `codes["FeeTooHigh"]` in tests
pub fn parse_error_codes(errors: &[IdlErrorCode]) -> BTreeMap<String, u32> {
    errors
        .iter()
        .map(|err| (err.name.clone(), err.code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const ESCROW_IDL: &str = r#"{
        "version": "0.1.0",
        "name": "hh_escrow",
        "instructions": [],
        "errors": [
            {"code": 6000, "name": "InvalidOutcome", "msg": "Outcome is not valid for this market"},
            {"code": 6003, "name": "FeeTooHigh"}
        ]
    }"#;

    #[test]
    fn test_message_falls_back_to_name() {
        let registry = ErrorRegistry::new();
        let program = Pubkey::new_unique();
        registry.register_idl_json(program, ESCROW_IDL).unwrap();

        let entry = registry.lookup(&program, 6000).unwrap();
        assert_eq!(entry.name, "InvalidOutcome");
        assert_eq!(entry.message, "Outcome is not valid for this market");

        let entry = registry.lookup(&program, 6003).unwrap();
        assert_eq!(entry.message, "FeeTooHigh");

        assert!(registry.lookup(&program, 6001).is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = ErrorRegistry::new();
        let program = Pubkey::new_unique();
        let errors = vec![IdlErrorCode::new(6003, "FeeTooHigh", None)];

        registry.register(program, errors.clone()).unwrap();
        let err = registry.register(program, errors).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(p) if p == program));

        // Still the original table
        assert_eq!(registry.program_errors(&program).unwrap().len(), 1);
    }

    #[test]
    fn test_builtin_programs() {
        let registry = ErrorRegistry::with_builtin_programs();
        assert_eq!(registry.len(), 3);

        let entry = registry.lookup(&system_program::id(), 0).unwrap();
        assert_eq!(entry.name, "AccountAlreadyInUse");

        let entry = registry.lookup(&spl_token::id(), 1).unwrap();
        assert_eq!(entry.name, "InsufficientFunds");
        assert_eq!(entry.message, "Insufficient funds");

        let entry = registry
            .lookup(&spl_associated_token_account::id(), 0)
            .unwrap();
        assert_eq!(entry.name, "InvalidOwner");
        assert_eq!(
            entry.message,
            "Associated token account owner does not match address derivation"
        );

        let again = registry.register(
            spl_token::id(),
            vec![IdlErrorCode::new(0, "NotRentExempt", None)],
        );
        assert!(again.is_err());
    }

    #[test]
    fn test_idl_without_errors() {
        let registry = ErrorRegistry::new();
        let program = Pubkey::new_unique();
        registry
            .register_idl_json(program, r#"{"name": "noop"}"#)
            .unwrap();
        assert!(registry.contains(&program));
        assert!(registry.program_errors(&program).unwrap().is_empty());

        assert!(matches!(
            registry.register_idl_json(Pubkey::new_unique(), "not json"),
            Err(RegistryError::InvalidIdl(_))
        ));
    }

    #[test]
    fn test_concurrent_reads() {
        let registry = Arc::new(ErrorRegistry::new());
        let program = Pubkey::new_unique();
        registry.register_idl_json(program, ESCROW_IDL).unwrap();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.lookup(&program, 6003).map(|e| e.name))
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap().as_deref(), Some("FeeTooHigh"));
        }
    }

    #[test]
    fn test_parse_error_codes() {
        let IdlErrors { errors } = serde_json::from_str(ESCROW_IDL).unwrap();
        let codes = parse_error_codes(&errors);
        assert_eq!(codes["InvalidOutcome"], 6000);
        assert_eq!(codes["FeeTooHigh"], 6003);
    }
}
