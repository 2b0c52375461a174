//! Price Aggregator Client
//!
//! Fetches firm quotes from the 0x Swap API:
//!
//! ```text
//! GET {api_url}/swap/v1/quote?sellToken=..&buyToken=..&sellAmount=..&takerAddress=..
//!     0x-api-key: <key>
//! ```

use log::debug;
use num_bigint::BigUint;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use obscura_account::Address;
use obscura_config::SwapConfig;

use crate::error::{MixerError, MixerResult};

use super::tokens::TokenAddress;

/// What the caller wants priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub sell_token: TokenAddress,
    pub buy_token: TokenAddress,
    /// In the sell token's smallest unit
    pub sell_amount: BigUint,
    pub taker: Address,
}

/// 0x reports gas either as a JSON number or a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GasEstimate {
    Number(u64),
    Text(String),
}

impl GasEstimate {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            GasEstimate::Number(n) => Some(*n),
            GasEstimate::Text(s) => match s.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            },
        }
    }
}

/// The aggregator's answer. `to`/`data`/`value` form the transaction that
/// enforces the guaranteed price and are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorQuote {
    pub price: String,
    pub guaranteed_price: String,
    pub buy_amount: String,
    pub to: Address,
    pub data: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub estimated_gas: Option<GasEstimate>,
}

pub trait PriceAggregator: Send + Sync {
    fn fetch_quote(
        &self,
        request: &QuoteRequest,
    ) -> impl Future<Output = MixerResult<AggregatorQuote>> + Send;
}

// ============================================================================
// 0x Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct ZeroExConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Fraction, 0.01 = 1%
    pub slippage_percentage: f64,
    pub request_timeout: Duration,
}

impl Default for ZeroExConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.0x.org".to_string(),
            api_key: None,
            slippage_percentage: 0.01,
            request_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&SwapConfig> for ZeroExConfig {
    fn from(swap: &SwapConfig) -> Self {
        Self {
            api_url: swap.api_url.trim_end_matches('/').to_string(),
            api_key: swap.api_key.clone().filter(|k| !k.is_empty()),
            slippage_percentage: swap.slippage_percentage,
            request_timeout: Duration::from_secs(swap.request_timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    reason: Option<String>,
}

pub struct ZeroExClient {
    config: ZeroExConfig,
    client: reqwest::Client,
}

impl ZeroExClient {
    pub fn new(config: ZeroExConfig) -> MixerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MixerError::Configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl PriceAggregator for ZeroExClient {
    async fn fetch_quote(&self, request: &QuoteRequest) -> MixerResult<AggregatorQuote> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| MixerError::Configuration("0x API key is not configured".into()))?;

        let url = format!("{}/swap/v1/quote", self.config.api_url);
        let query = [
            ("sellToken", request.sell_token.to_string()),
            ("buyToken", request.buy_token.to_string()),
            ("sellAmount", request.sell_amount.to_string()),
            ("takerAddress", request.taker.to_string()),
            ("slippagePercentage", self.config.slippage_percentage.to_string()),
        ];
        debug!("Requesting quote: {:?}", query);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .header("0x-api-key", api_key)
            .send()
            .await
            .map_err(|e| MixerError::Quote(format!("Price aggregator unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MixerError::Quote(error_reason(status.as_u16(), &body)));
        }

        response
            .json()
            .await
            .map_err(|e| MixerError::Quote(format!("Failed to parse quote: {}", e)))
    }
}

/// Prefer the API's `reason`, fall back to status and raw body.
fn error_reason(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { reason: Some(reason) }) => reason,
        _ => format!("Price aggregator returned {}: {}", status, body),
    }
}
