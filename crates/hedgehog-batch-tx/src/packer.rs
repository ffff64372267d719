/*!
# Instruction Packer

Greedy, order-preserving packing of instruction groups into transactions
that fit the packet budget.

A group is never split. Groups are appended to the current transaction
while the compiled transaction still fits, and a new transaction is started
when it doesn't. A group that does not fit even on its own is an error.

Sizes are exact: the compact signature count, 64 bytes per required
signature and the serialized message. Candidates are measured without
compiling them, so a group referencing more accounts than a message can
index is reported as too large rather than aborting the pack.
*/

use crate::PackingError;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Signature, SIGNATURE_BYTES},
    transaction::Transaction,
};
use std::collections::HashMap;
use tracing::debug;

/// Account keys a legacy message can index with its one-byte indices
const MAX_ACCOUNT_KEYS: usize = u8::MAX as usize + 1;

/// Instructions that must land in the same transaction, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionGroup(Vec<Instruction>);

impl InstructionGroup {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self(instructions)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.0
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Instruction> for InstructionGroup {
    fn from(instruction: Instruction) -> Self {
        Self(vec![instruction])
    }
}

impl From<Vec<Instruction>> for InstructionGroup {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self(instructions)
    }
}

/// Length of `len` in the ledger's compact-u16 encoding (7 bits per byte)
pub fn short_vec_len(len: usize) -> usize {
    let mut bytes = 1;
    let mut rem = len >> 7;
    while rem != 0 {
        bytes += 1;
        rem >>= 7;
    }
    bytes
}

/// Wire size of a transaction carrying `message`, with every signature slot filled
pub fn transaction_size(message: &Message) -> usize {
    let signatures = message.header.num_required_signatures as usize;
    short_vec_len(signatures) + signatures * SIGNATURE_BYTES + message.serialize().len()
}

/// Shape of the message `instructions` would compile to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MessageLayout {
    account_keys: usize,
    required_signatures: usize,
    readonly_signed: usize,
    readonly_unsigned: usize,
    /// Wire size of the signed transaction
    size: usize,
}

impl MessageLayout {
    fn of(instructions: &[Instruction], fee_payer: &Pubkey) -> Self {
        // (signer, writable) per unique key, merged across every reference
        let mut keys: HashMap<Pubkey, (bool, bool)> = HashMap::new();
        keys.insert(*fee_payer, (true, true));
        for ix in instructions {
            keys.entry(ix.program_id).or_insert((false, false));
            for meta in &ix.accounts {
                let flags = keys.entry(meta.pubkey).or_insert((false, false));
                flags.0 |= meta.is_signer;
                flags.1 |= meta.is_writable;
            }
        }

        let count = |signer: bool, writable: Option<bool>| {
            keys.values()
                .filter(|(s, w)| *s == signer && writable.map_or(true, |writable| *w == writable))
                .count()
        };
        let account_keys = keys.len();
        let required_signatures = count(true, None);

        let instructions_len: usize = instructions
            .iter()
            .map(|ix| {
                1 + short_vec_len(ix.accounts.len())
                    + ix.accounts.len()
                    + short_vec_len(ix.data.len())
                    + ix.data.len()
            })
            .sum();
        // header, keys, blockhash, instructions
        let message_len = 3
            + short_vec_len(account_keys)
            + account_keys * 32
            + 32
            + short_vec_len(instructions.len())
            + instructions_len;

        Self {
            account_keys,
            required_signatures,
            readonly_signed: count(true, Some(false)),
            readonly_unsigned: count(false, Some(false)),
            size: short_vec_len(required_signatures)
                + required_signatures * SIGNATURE_BYTES
                + message_len,
        }
    }

    /// Whether every account index and header count fits in a byte
    fn compiles(&self) -> bool {
        let byte = u8::MAX as usize;
        self.account_keys <= MAX_ACCOUNT_KEYS
            && self.required_signatures <= byte
            && self.readonly_signed <= byte
            && self.readonly_unsigned <= byte
    }

    fn fits(&self, budget: usize) -> bool {
        self.compiles() && self.size <= budget
    }
}

/// Pack `groups` into unsigned transactions with a placeholder blockhash
pub fn pack_instructions<G: Into<InstructionGroup>>(
    groups: impl IntoIterator<Item = G>,
    fee_payer: &Pubkey,
    budget: usize,
) -> Result<Vec<Transaction>, PackingError> {
    pack_instructions_with_blockhash(groups, fee_payer, budget, &Hash::default())
}

/// Pack `groups` into unsigned transactions referencing `blockhash`
pub fn pack_instructions_with_blockhash<G: Into<InstructionGroup>>(
    groups: impl IntoIterator<Item = G>,
    fee_payer: &Pubkey,
    budget: usize,
    blockhash: &Hash,
) -> Result<Vec<Transaction>, PackingError> {
    let seal = |instructions: &[Instruction]| {
        let message = Message::new_with_blockhash(instructions, Some(fee_payer), blockhash);
        Transaction::new_unsigned(message)
    };

    let mut transactions = Vec::new();
    let mut current: Vec<Instruction> = Vec::new();

    for (group_index, group) in groups.into_iter().map(Into::into).enumerate() {
        if group.is_empty() {
            return Err(PackingError::EmptyGroup { group_index });
        }

        let mut candidate = current.clone();
        candidate.extend_from_slice(group.instructions());
        if MessageLayout::of(&candidate, fee_payer).fits(budget) {
            current = candidate;
            continue;
        }

        let alone = MessageLayout::of(group.instructions(), fee_payer);
        if !alone.fits(budget) {
            debug!(
                "Group {} needs {} bytes and {} account keys",
                group_index, alone.size, alone.account_keys
            );
            return Err(PackingError::GroupTooLarge {
                group_index,
                size: alone.size,
                budget,
            });
        }

        // The group fits alone, so `current` cannot be empty here
        debug!(
            "Sealing transaction {} with {} instructions",
            transactions.len(),
            current.len()
        );
        transactions.push(seal(&current));
        current = group.into_instructions();
    }

    if !current.is_empty() {
        transactions.push(seal(&current));
    }

    debug!("Packed instructions into {} transactions", transactions.len());
    Ok(transactions)
}

/// Resize the signature list to the message's signer count
///
/// Existing signatures are left untouched when the count already matches.
/// Returns whether the slots were reset.
pub fn refresh_signature_slots(transaction: &mut Transaction) -> bool {
    let required = transaction.message.header.num_required_signatures as usize;
    if transaction.signatures.len() == required {
        return false;
    }
    transaction.signatures = vec![Signature::default(); required];
    true
}
