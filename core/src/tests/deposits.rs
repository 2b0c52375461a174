use num_bigint::BigUint;
use std::sync::Arc;
use std::time::Duration;

use obscura_account::Address;
use obscura_commitment::{Commitment, commit, derive_nullifier};

use super::mock::MockChain;
use super::{RECIPIENT, contract, manager};
use crate::chain::abi::{deposit_log, encode_deposit, encode_withdraw};
use crate::error::{ErrorKind, MixerError};
use crate::ledger::{DepositStatus, LocalLedger};
use crate::units::pow10;

fn setup() -> (Arc<MockChain>, LocalLedger) {
    (Arc::new(MockChain::new()), LocalLedger::in_memory())
}

#[tokio::test]
async fn deposit_persists_and_confirms() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);

    let commitment = mixer.deposit("0.1", RECIPIENT).await.unwrap();

    let record = ledger.get_deposit(&commitment).unwrap().unwrap();
    assert_eq!(record.status, DepositStatus::Confirmed);
    assert_eq!(record.amount, "0.1");
    assert_eq!(record.recipient, Address::parse(RECIPIENT).unwrap());
    assert_eq!(commit(&record.recipient, &record.secret), commitment);

    let sent = chain.submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, contract());
    assert_eq!(sent[0].data, encode_deposit(&commitment));
    assert_eq!(sent[0].value, pow10(17));
}

#[tokio::test]
async fn deposit_at_minimum_is_accepted() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    assert!(mixer.deposit("0.001", RECIPIENT).await.is_ok());
}

#[tokio::test]
async fn deposit_one_wei_below_minimum_is_rejected() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);

    let err = mixer
        .deposit("0.000999999999999999", RECIPIENT)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(ledger.list_deposits().unwrap().is_empty());
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn deposit_rejects_bad_input_before_side_effects() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);

    assert_eq!(
        mixer.deposit("", RECIPIENT).await.unwrap_err(),
        MixerError::Validation("Amount is required".into())
    );
    assert_eq!(mixer.deposit("abc", RECIPIENT).await.unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(
        mixer.deposit("0.5", "0xAbcd00000000000000000000000000000000123").await.unwrap_err().kind(),
        ErrorKind::Encoding
    );
    // bad checksum
    assert_eq!(
        mixer.deposit("0.5", "0xABcd000000000000000000000000000000001234").await.unwrap_err().kind(),
        ErrorKind::Encoding
    );

    assert!(ledger.list_deposits().unwrap().is_empty());
    assert!(chain.submissions().is_empty());
}

#[tokio::test]
async fn deposit_without_wallet_persists_nothing() {
    let chain = Arc::new(MockChain::without_signer());
    let ledger = LocalLedger::in_memory();
    let mixer = manager(&chain, &ledger);

    let err = mixer.deposit("0.1", RECIPIENT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WalletUnavailable);
    assert!(ledger.list_deposits().unwrap().is_empty());
}

#[tokio::test]
async fn failed_broadcast_leaves_pending_record_for_retry() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    chain.set_fail_submit(true);

    let err = mixer.deposit("0.1", RECIPIENT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OnChain);

    let records = ledger.list_deposits().unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.status, DepositStatus::Pending);
    assert!(err.to_string().contains(&record.commitment.to_string()));
    // the secret survived and still opens the commitment
    assert_eq!(commit(&record.recipient, &record.secret), record.commitment);

    chain.set_fail_submit(false);
    let status = mixer.retry_deposit(&record.commitment).await.unwrap();
    assert_eq!(status, DepositStatus::Confirmed);
    assert_eq!(chain.submissions().len(), 1);
    assert_eq!(chain.submissions()[0].value, pow10(17));
    assert_eq!(
        ledger.get_deposit(&record.commitment).unwrap().unwrap().status,
        DepositStatus::Confirmed
    );
}

#[tokio::test]
async fn reverted_deposit_stays_pending() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    chain.set_revert(true);

    let err = mixer.deposit("0.1", RECIPIENT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OnChain);
    assert_eq!(ledger.pending_deposits().unwrap().len(), 1);
}

#[tokio::test]
async fn retry_adopts_existing_chain_event() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    chain.set_revert(true);
    mixer.deposit("0.1", RECIPIENT).await.unwrap_err();
    let commitment = ledger.pending_deposits().unwrap()[0].commitment;

    // the transaction actually landed
    chain.set_revert(false);
    chain.push_event(deposit_log(contract(), commitment, 0));

    let before = chain.submissions().len();
    assert_eq!(mixer.retry_deposit(&commitment).await.unwrap(), DepositStatus::Confirmed);
    assert_eq!(chain.submissions().len(), before, "no rebroadcast");
}

#[tokio::test]
async fn retry_rejects_confirmed_and_unknown() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    let commitment = mixer.deposit("0.1", RECIPIENT).await.unwrap();

    assert_eq!(
        mixer.retry_deposit(&commitment).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        mixer.retry_deposit(&Commitment([9; 32])).await.unwrap_err().kind(),
        ErrorKind::Persistence
    );
}

#[tokio::test]
async fn withdraw_spends_and_deletes_record() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    let commitment = mixer.deposit("0.1", RECIPIENT).await.unwrap();
    let record = ledger.get_deposit(&commitment).unwrap().unwrap();

    mixer.withdraw(&commitment).await.unwrap();

    let sent = chain.submissions();
    assert_eq!(sent.len(), 2);
    let nullifier = derive_nullifier(&record.secret, &record.recipient);
    assert_eq!(sent[1].data, encode_withdraw(&nullifier, &record.recipient));
    assert_eq!(sent[1].value, BigUint::default());
    assert!(ledger.get_deposit(&commitment).unwrap().is_none());
    assert_eq!(mixer.lock_count(), 0);
}

#[tokio::test]
async fn withdraw_unknown_commitment_leaves_ledger_unchanged() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    mixer.deposit("0.1", RECIPIENT).await.unwrap();
    let before = ledger.list_deposits().unwrap();

    let err = mixer.withdraw(&Commitment([0xee; 32])).await.unwrap_err();
    assert_eq!(
        err,
        MixerError::Persistence("Invalid commitment or deposit data not found".into())
    );
    assert_eq!(ledger.list_deposits().unwrap(), before);
    assert_eq!(chain.submissions().len(), 1);
}

#[tokio::test]
async fn failed_withdraw_keeps_record() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    let commitment = mixer.deposit("0.1", RECIPIENT).await.unwrap();
    let before = ledger.get_deposit(&commitment).unwrap();

    chain.set_revert(true);
    let err = mixer.withdraw(&commitment).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OnChain);
    assert_eq!(ledger.get_deposit(&commitment).unwrap(), before);
}

#[tokio::test]
async fn pending_deposit_can_be_withdrawn() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    chain.set_revert(true);
    mixer.deposit("0.1", RECIPIENT).await.unwrap_err();
    let commitment = ledger.pending_deposits().unwrap()[0].commitment;

    chain.set_revert(false);
    mixer.withdraw(&commitment).await.unwrap();
    assert!(ledger.list_deposits().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_withdraws_submit_once() {
    let (chain, ledger) = setup();
    let mixer = manager(&chain, &ledger);
    let commitment = mixer.deposit("0.1", RECIPIENT).await.unwrap();
    chain.set_submit_delay(Duration::from_millis(50));

    let (a, b) = tokio::join!(mixer.withdraw(&commitment), mixer.withdraw(&commitment));

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let loser = if a.is_ok() { b } else { a };
    assert_eq!(loser.unwrap_err().kind(), ErrorKind::Persistence);
    // one deposit + exactly one withdrawal
    assert_eq!(chain.submissions().len(), 2);
    assert_eq!(mixer.lock_count(), 0);
}

#[tokio::test]
async fn withdraw_without_wallet_keeps_record() {
    let (chain, ledger) = setup();
    let commitment = manager(&chain, &ledger).deposit("0.1", RECIPIENT).await.unwrap();

    let walletless = Arc::new(MockChain::without_signer());
    let err = manager(&walletless, &ledger).withdraw(&commitment).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WalletUnavailable);
    assert!(ledger.get_deposit(&commitment).unwrap().is_some());
}
