//! Quote debouncing for rapidly changing input.
//!
//! Every `request` supersedes the previous one: the older request's token is
//! cancelled and its generation retired. A request only fetches after a quiet
//! interval with no newer request, and a result whose generation is no longer
//! current is dropped even if it arrives.

use log::debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::chain::ChainClient;
use crate::error::MixerResult;

use super::aggregator::PriceAggregator;
use super::quote::{SwapQuote, SwapQuoteAggregator};

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Ready(SwapQuote),
    /// A newer request replaced this one; its result was discarded
    Superseded,
}

struct DebounceState {
    generation: u64,
    cancel: CancellationToken,
    latest: Option<SwapQuote>,
}

pub struct QuoteDebouncer<A, C> {
    quotes: Arc<SwapQuoteAggregator<A, C>>,
    quiet: Duration,
    state: Mutex<DebounceState>,
}

impl<A: PriceAggregator, C: ChainClient> QuoteDebouncer<A, C> {
    pub fn new(quotes: Arc<SwapQuoteAggregator<A, C>>, quiet: Duration) -> Self {
        Self {
            quotes,
            quiet,
            state: Mutex::new(DebounceState {
                generation: 0,
                cancel: CancellationToken::new(),
                latest: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask for a quote for the current input.
    ///
    /// Resolves to `Superseded` if another request arrives before this one
    /// completes. Errors are only reported for the current request.
    pub async fn request(
        &self,
        sell_token: &str,
        buy_token: &str,
        sell_amount: &str,
    ) -> MixerResult<QuoteOutcome> {
        let (generation, cancel) = {
            let mut state = self.state();
            state.cancel.cancel();
            state.generation += 1;
            state.cancel = CancellationToken::new();
            (state.generation, state.cancel.clone())
        };

        tokio::select! {
            _ = cancel.cancelled() => return Ok(QuoteOutcome::Superseded),
            _ = sleep(self.quiet) => {}
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Quote request {} superseded in flight", generation);
                return Ok(QuoteOutcome::Superseded);
            }
            result = self.quotes.get_quote(sell_token, buy_token, sell_amount) => result,
        };

        let mut state = self.state();
        if state.generation != generation {
            debug!("Discarding stale quote from request {}", generation);
            return Ok(QuoteOutcome::Superseded);
        }
        let quote = result?;
        state.latest = Some(quote.clone());
        Ok(QuoteOutcome::Ready(quote))
    }

    /// Drop whatever request is pending, e.g. when the input is cleared.
    pub fn cancel(&self) {
        let mut state = self.state();
        state.cancel.cancel();
        state.generation += 1;
    }

    /// The most recent quote that was allowed to complete.
    pub fn latest(&self) -> Option<SwapQuote> {
        self.state().latest.clone()
    }
}
