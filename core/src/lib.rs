//! Obscura core
//!
//! Local-state side of a commitment/nullifier mixer plus a swap quote and
//! execution pipeline. The chain and the price aggregator are reached through
//! the [`chain::ChainClient`] and [`swap::PriceAggregator`] traits; everything
//! persistent goes through an explicitly opened [`ledger::LocalLedger`].

pub mod chain;
pub mod error;
pub mod ledger;
pub mod mixer;
pub mod swap;
pub mod units;

pub use chain::{ChainClient, ChainError, JsonRpcChainClient};
pub use error::{ErrorKind, MixerError, MixerResult};
pub use ledger::{DepositRecord, DepositStatus, LocalLedger, SwapRecord, SwapStatus};
pub use mixer::{
    DepositLifecycleManager, EventReconciler, LedgerSummary, MixerSettings, ReconcileReport,
    summarize,
};
pub use swap::{
    PriceAggregator, QuoteDebouncer, QuoteOutcome, SwapExecutor, SwapQuote, SwapQuoteAggregator,
    SwapSettings, ZeroExClient, ZeroExConfig,
};

#[cfg(test)]
mod tests;

/// Milliseconds since the Unix epoch, the timestamp unit of every record.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
