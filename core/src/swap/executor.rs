use log::{error, info};
use std::sync::Arc;

use crate::chain::{ChainClient, TxHash, require_signer};
use crate::error::{MixerError, MixerResult};
use crate::ledger::{LocalLedger, RECORD_SCHEMA_VERSION, SwapRecord, SwapStatus};
use crate::now_millis;

use super::quote::SwapQuote;

/// Submits a quote's transaction exactly as the aggregator built it.
pub struct SwapExecutor<C> {
    chain: Arc<C>,
    ledger: LocalLedger,
}

impl<C: ChainClient> SwapExecutor<C> {
    pub fn new(chain: Arc<C>, ledger: LocalLedger) -> Self {
        Self { chain, ledger }
    }

    /// The quote's age is not checked; callers decide whether it is fresh.
    pub async fn execute(&self, quote: &SwapQuote) -> MixerResult<TxHash> {
        require_signer(self.chain.as_ref())?;

        let tx = quote.tx_payload.to_request();
        info!(
            "Executing swap {} {} -> {} via {}",
            quote.sell_amount, quote.sell_token, quote.buy_token, tx.to
        );

        let handle = self.chain.submit_transaction(&tx).await?;
        let receipt = self.chain.wait_for_receipt(&handle).await?;
        if !receipt.success {
            return Err(MixerError::OnChain(format!(
                "swap transaction {} reverted",
                receipt.transaction_hash
            )));
        }

        let record = SwapRecord {
            schema_version: RECORD_SCHEMA_VERSION,
            transaction_hash: receipt.transaction_hash,
            timestamp: now_millis(),
            from_token: quote.sell_token.clone(),
            to_token: quote.buy_token.clone(),
            from_amount: quote.sell_amount.clone(),
            to_amount: quote.expected_output.clone(),
            status: SwapStatus::Completed,
        };
        if let Err(e) = self.ledger.put_swap(&record) {
            error!(
                "Swap {} succeeded but could not be recorded: {}",
                receipt.transaction_hash, e
            );
            return Err(e);
        }

        info!("Swap confirmed in {}", receipt.transaction_hash);
        Ok(receipt.transaction_hash)
    }
}
