//! Chain access
//!
//! The core never talks to a node directly; it goes through [`ChainClient`].
//! [`rpc::JsonRpcChainClient`] is the production implementation, tests use an
//! in-memory mock.

pub mod abi;
pub mod rpc;
mod types;

use std::future::Future;
use thiserror::Error;

use obscura_account::Address;

use crate::error::MixerError;

pub use abi::DepositEvent;
pub use rpc::{JsonRpcChainClient, RpcConfig};
pub use types::{ChainEvent, EventFilter, TxHandle, TxHash, TxReceipt, TxRequest};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("no signer attached")]
    NoSigner,

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("timed out waiting for receipt of {0}")]
    Timeout(TxHash),

    #[error("could not decode chain data: {0}")]
    Decode(String),
}

impl From<ChainError> for MixerError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::NoSigner => MixerError::WalletUnavailable(err.to_string()),
            other => MixerError::OnChain(other.to_string()),
        }
    }
}

/// Submits transactions and reads logs on behalf of the connected signer.
///
/// `wait_for_receipt` resolves once the transaction has at least one
/// confirmation.
pub trait ChainClient: Send + Sync {
    /// The account that signs submitted transactions, if one is attached.
    fn signer_address(&self) -> Option<Address>;

    fn submit_transaction(
        &self,
        tx: &TxRequest,
    ) -> impl Future<Output = Result<TxHandle, ChainError>> + Send;

    fn wait_for_receipt(
        &self,
        handle: &TxHandle,
    ) -> impl Future<Output = Result<TxReceipt, ChainError>> + Send;

    /// Logs emitted by `contract` for `event_signature`, e.g.
    /// `"Deposit(bytes32,uint32,uint256)"`.
    fn query_events(
        &self,
        contract: &Address,
        event_signature: &str,
        filter: &EventFilter,
    ) -> impl Future<Output = Result<Vec<ChainEvent>, ChainError>> + Send;
}

/// The attached signer, or `WalletUnavailable`.
pub fn require_signer<C: ChainClient>(chain: &C) -> Result<Address, MixerError> {
    chain
        .signer_address()
        .ok_or_else(|| MixerError::WalletUnavailable("connect a wallet first".into()))
}
