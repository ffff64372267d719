mod common;

use common::{status, test_client, MockLedger};
use hedgehog_batch_tx::{BatchTxClient, ErrorRegistry, TxBatchConfig};
use hedgehog_rpc::ConfirmationStatus;
use solana_sdk::{
    commitment_config::CommitmentConfig, message::Message, pubkey::Pubkey, signature::Keypair,
    signer::Signer, system_instruction, transaction::Transaction,
};
use std::{sync::Arc, time::Duration};
use tokio_test::assert_ok;

/// Test submit of an unsigned transaction → confirmed signature
///
/// The pipeline stamps the latest blockhash, adds the payer signature and
/// polls until the status reaches the configured commitment.
#[tokio::test(start_paused = true)]
async fn test_submit_confirms_transaction() {
    println!("🧪 Testing submit waits for confirmation...");

    let ledger = Arc::new(MockLedger::default().with_statuses(vec![
        None,
        status(ConfirmationStatus::Processed, None),
        status(ConfirmationStatus::Confirmed, None),
    ]));
    let payer = Keypair::new();
    let payer_pubkey = payer.pubkey();
    let client = test_client(ledger.clone(), payer, Arc::new(ErrorRegistry::new()));

    // 1. Unsigned transaction without a blockhash
    let ix = system_instruction::transfer(&payer_pubkey, &Pubkey::new_unique(), 1_000);
    let tx = Transaction::new_unsigned(Message::new(&[ix], Some(&payer_pubkey)));

    // 2. Submit
    let signature = assert_ok!(client.submit(tx).await);

    // 3. The ledger saw one fully signed transaction on the latest blockhash
    let sent = ledger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message.recent_blockhash, ledger.blockhash);
    assert_eq!(sent[0].signatures[0], signature);
    assert_eq!(ledger.status_polls(), 3, "Should poll until confirmed");

    println!("✅ Transaction confirmed after {} polls", ledger.status_polls());
}

/// Test submit with finalized commitment → confirmed status is not enough
#[tokio::test(start_paused = true)]
async fn test_submit_waits_for_configured_commitment() {
    println!("🧪 Testing submit honours finalized commitment...");

    let ledger = Arc::new(MockLedger::default().with_statuses(vec![
        status(ConfirmationStatus::Confirmed, None),
        status(ConfirmationStatus::Confirmed, None),
        status(ConfirmationStatus::Finalized, None),
    ]));
    let payer = Keypair::new();
    let payer_pubkey = payer.pubkey();
    let config = TxBatchConfig {
        confirmation_commitment: CommitmentConfig::finalized(),
        poll_interval: Duration::from_millis(400),
        ..Default::default()
    };
    let client = BatchTxClient::with_config(
        ledger.clone(),
        payer,
        Arc::new(ErrorRegistry::new()),
        config,
    );

    let ix = system_instruction::transfer(&payer_pubkey, &Pubkey::new_unique(), 1);
    assert_ok!(client.send(vec![ix], &[]).await);
    assert_eq!(ledger.status_polls(), 3);

    println!("✅ Finalized commitment respected");
}
