//! Attach the signatures a transaction actually needs.
//!
//! Signers whose key the message does not require are skipped rather than
//! rejected, so one signer set can be applied to a whole packed batch. Slots
//! nobody could fill stay at the default signature until submission checks
//! them.

use crate::packer::refresh_signature_slots;
use solana_sdk::{
    message::Message,
    pubkey::Pubkey,
    signature::Signature,
    signer::{Signer, SignerError},
    transaction::Transaction,
};

/// Accounts whose signature the message requires, fee payer first
pub fn required_signers(message: &Message) -> &[Pubkey] {
    let required = (message.header.num_required_signatures as usize).min(message.account_keys.len());
    &message.account_keys[..required]
}

/// Sign `transaction` with every signer it requires, returning how many signed
pub fn sign_transaction(
    transaction: &mut Transaction,
    signers: &[&dyn Signer],
) -> Result<usize, SignerError> {
    refresh_signature_slots(transaction);

    let required = required_signers(&transaction.message);
    let mut applicable: Vec<&dyn Signer> = Vec::new();
    for &signer in signers {
        let pubkey = signer.pubkey();
        if required.contains(&pubkey) && !applicable.iter().any(|s| s.pubkey() == pubkey) {
            applicable.push(signer);
        }
    }

    if applicable.is_empty() {
        return Ok(0);
    }

    let blockhash = transaction.message.recent_blockhash;
    transaction.try_partial_sign(&applicable, blockhash)?;
    Ok(applicable.len())
}

/// Sign each transaction with the subset of `signers` it requires
pub fn sign_transactions(
    mut transactions: Vec<Transaction>,
    signers: &[&dyn Signer],
) -> Result<Vec<Transaction>, SignerError> {
    for transaction in &mut transactions {
        sign_transaction(transaction, signers)?;
    }
    Ok(transactions)
}

/// Required signers whose slot is still unsigned
pub fn missing_signers(transaction: &Transaction) -> Vec<Pubkey> {
    required_signers(&transaction.message)
        .iter()
        .enumerate()
        .filter(|(index, _)| {
            transaction
                .signatures
                .get(*index)
                .map_or(true, |signature| *signature == Signature::default())
        })
        .map(|(_, pubkey)| *pubkey)
        .collect()
}
