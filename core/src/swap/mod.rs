pub mod aggregator;
pub mod debounce;
pub mod executor;
pub mod quote;
pub mod tokens;

pub use aggregator::{
    AggregatorQuote, GasEstimate, PriceAggregator, QuoteRequest, ZeroExClient, ZeroExConfig,
};
pub use debounce::{QuoteDebouncer, QuoteOutcome};
pub use executor::SwapExecutor;
pub use quote::{SwapQuote, SwapQuoteAggregator, SwapSettings, TxPayload};
pub use tokens::{TokenAddress, TokenInfo, lookup_token, supported_symbols};
