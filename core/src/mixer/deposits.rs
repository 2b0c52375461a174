//! Deposit Lifecycle
//!
//! ```text
//! deposit()            confirmed receipt / reconciler      withdraw()
//!   ──► Pending ─────────────────────────────► Confirmed ─────────► (deleted)
//!          │                                                   ▲
//!          └───────────────────── withdraw() ──────────────────┘
//! ```
//!
//! The Pending record, secret included, is written before anything is
//! broadcast. A failed broadcast leaves it Pending for `retry_deposit` or the
//! reconciler.

use dashmap::DashMap;
use log::{info, warn};
use num_bigint::BigUint;
use std::sync::Arc;
use tokio::sync::Mutex;

use obscura_account::Address;
use obscura_commitment::{Commitment, derive_nullifier, generate_commitment_for};

use crate::chain::abi::{self, DEPOSIT_EVENT_SIGNATURE, decode_deposit_event};
use crate::chain::{ChainClient, EventFilter, TxHash, TxReceipt, TxRequest, require_signer};
use crate::error::{MixerError, MixerResult};
use crate::ledger::{DepositRecord, DepositStatus, LocalLedger};
use crate::now_millis;
use crate::units::{format_units, parse_units, validate_amount};

use super::MixerSettings;

pub const DEPOSIT_NOT_FOUND: &str = "Invalid commitment or deposit data not found";

pub struct DepositLifecycleManager<C> {
    chain: Arc<C>,
    ledger: LocalLedger,
    settings: MixerSettings,
    /// One lock per commitment with an operation in flight
    locks: DashMap<Commitment, Arc<Mutex<()>>>,
}

impl<C: ChainClient> DepositLifecycleManager<C> {
    pub fn new(chain: Arc<C>, ledger: LocalLedger, settings: MixerSettings) -> Self {
        Self {
            chain,
            ledger,
            settings,
            locks: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &LocalLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &MixerSettings {
        &self.settings
    }

    /// Create a commitment for `recipient`, persist it, then fund it on chain.
    ///
    /// Returns the commitment once the deposit transaction is confirmed. If the
    /// broadcast or receipt fails the error names the commitment, whose record
    /// stays Pending.
    pub async fn deposit(&self, amount: &str, recipient: &str) -> MixerResult<Commitment> {
        validate_amount(amount)?;
        let value = parse_units(amount, self.settings.native_decimals)?;
        if value < self.settings.min_deposit {
            return Err(MixerError::Validation(format!(
                "Minimum deposit amount is {} ETH",
                format_units(&self.settings.min_deposit, self.settings.native_decimals)
            )));
        }

        let recipient = Address::parse(recipient)?;
        require_signer(self.chain.as_ref())?;

        let (commitment, secret) = generate_commitment_for(&recipient)?;
        let record = DepositRecord::pending(
            commitment,
            secret,
            recipient,
            format_units(&value, self.settings.native_decimals),
            now_millis(),
        );
        self.ledger.put_deposit(&record)?;
        info!("Deposit {} of {} persisted as pending", commitment, record.amount);

        match self.send_deposit(&commitment, value).await {
            Ok(receipt) => {
                self.ledger.mark_confirmed(&commitment)?;
                info!(
                    "Deposit {} confirmed in {}",
                    commitment, receipt.transaction_hash
                );
                Ok(commitment)
            }
            Err(e) => {
                warn!("Deposit {} left pending: {}", commitment, e);
                Err(left_pending(&commitment, e))
            }
        }
    }

    /// Spend the deposit behind `commitment`, paying out to its stored
    /// recipient. The record is deleted once the withdrawal is confirmed.
    pub async fn withdraw(&self, commitment: &Commitment) -> MixerResult<TxHash> {
        let lock = self.lock_for(commitment);
        let result = {
            let _guard = lock.lock().await;
            self.withdraw_locked(commitment).await
        };
        drop(lock);
        self.release(commitment);
        result
    }

    async fn withdraw_locked(&self, commitment: &Commitment) -> MixerResult<TxHash> {
        let record = self
            .ledger
            .get_deposit(commitment)?
            .ok_or_else(|| MixerError::Persistence(DEPOSIT_NOT_FOUND.into()))?;
        require_signer(self.chain.as_ref())?;

        if record.is_pending() {
            warn!("Withdrawing {} before its deposit was confirmed", commitment);
        }

        let nullifier = derive_nullifier(&record.secret, &record.recipient);
        info!(
            "Withdrawing {} to {} (nullifier {})",
            commitment, record.recipient, nullifier
        );

        let receipt = self
            .send(TxRequest {
                to: self.settings.contract,
                data: abi::encode_withdraw(&nullifier, &record.recipient),
                value: BigUint::default(),
                gas_limit: None,
            })
            .await?;

        self.ledger.delete_deposit(commitment)?;
        info!(
            "Withdrawal of {} confirmed in {}",
            commitment, receipt.transaction_hash
        );
        Ok(receipt.transaction_hash)
    }

    /// Bring a Pending deposit to Confirmed: adopt an existing on-chain
    /// deposit event if there is one, otherwise broadcast again.
    pub async fn retry_deposit(&self, commitment: &Commitment) -> MixerResult<DepositStatus> {
        let lock = self.lock_for(commitment);
        let result = {
            let _guard = lock.lock().await;
            self.retry_locked(commitment).await
        };
        drop(lock);
        self.release(commitment);
        result
    }

    async fn retry_locked(&self, commitment: &Commitment) -> MixerResult<DepositStatus> {
        let record = self
            .ledger
            .get_deposit(commitment)?
            .ok_or_else(|| MixerError::Persistence(DEPOSIT_NOT_FOUND.into()))?;
        if record.status == DepositStatus::Confirmed {
            return Err(MixerError::Validation(format!(
                "Deposit {} is already confirmed",
                commitment
            )));
        }
        require_signer(self.chain.as_ref())?;

        let filter = EventFilter {
            indexed: vec![commitment.0],
            from_block: self.settings.from_block,
        };
        let events = self
            .chain
            .query_events(&self.settings.contract, DEPOSIT_EVENT_SIGNATURE, &filter)
            .await?;
        let on_chain = events
            .iter()
            .filter(|e| e.address == self.settings.contract)
            .filter_map(|e| decode_deposit_event(e).ok())
            .any(|e| e.commitment == *commitment);

        if on_chain {
            self.ledger.mark_confirmed(commitment)?;
            info!("Deposit {} found on chain, marked confirmed", commitment);
            return Ok(DepositStatus::Confirmed);
        }

        let value = parse_units(&record.amount, self.settings.native_decimals)?;
        info!("Re-broadcasting deposit {}", commitment);
        match self.send_deposit(commitment, value).await {
            Ok(_) => {
                self.ledger.mark_confirmed(commitment)?;
                Ok(DepositStatus::Confirmed)
            }
            Err(e) => Err(left_pending(commitment, e)),
        }
    }

    pub fn list_deposits(&self) -> MixerResult<Vec<DepositRecord>> {
        self.ledger.list_deposits()
    }

    async fn send_deposit(&self, commitment: &Commitment, value: BigUint) -> MixerResult<TxReceipt> {
        self.send(TxRequest {
            to: self.settings.contract,
            data: abi::encode_deposit(commitment),
            value,
            gas_limit: None,
        })
        .await
    }

    async fn send(&self, tx: TxRequest) -> MixerResult<TxReceipt> {
        let handle = self.chain.submit_transaction(&tx).await?;
        let receipt = self.chain.wait_for_receipt(&handle).await?;
        if !receipt.success {
            return Err(MixerError::OnChain(format!(
                "transaction {} reverted",
                receipt.transaction_hash
            )));
        }
        Ok(receipt)
    }

    fn lock_for(&self, commitment: &Commitment) -> Arc<Mutex<()>> {
        self.locks.entry(*commitment).or_default().clone()
    }

    fn release(&self, commitment: &Commitment) {
        self.locks
            .remove_if(commitment, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

fn left_pending(commitment: &Commitment, err: MixerError) -> MixerError {
    match err {
        MixerError::OnChain(msg) => {
            MixerError::OnChain(format!("deposit {} left pending: {}", commitment, msg))
        }
        other => other,
    }
}
