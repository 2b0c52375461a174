//! Swap Quotes
//!
//! Turns a user's `(sell, buy, amount)` into a priced, slippage-bounded
//! quote. Every check that can fail locally runs before the aggregator is
//! contacted.

use log::info;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::Serialize;
use std::sync::Arc;

use obscura_account::Address;
use obscura_config::ObscuraConfig;

use crate::chain::{ChainClient, TxRequest, require_signer};
use crate::error::{MixerError, MixerResult};
use crate::now_millis;
use crate::units::{format_units, parse_decimal, parse_units, pow10, validate_amount};

use super::aggregator::{AggregatorQuote, PriceAggregator, QuoteRequest};
use super::tokens::{TokenInfo, lookup_token};

/// Precision used to compare any amount against the dust threshold.
const DUST_DECIMALS: u8 = 18;

/// The aggregator's transaction, decoded but otherwise as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxPayload {
    pub to: Address,
    #[serde(serialize_with = "hex_bytes")]
    pub data: Vec<u8>,
    #[serde(serialize_with = "decimal")]
    pub value: BigUint,
    pub gas_limit: Option<u64>,
}

impl TxPayload {
    pub fn to_request(&self) -> TxRequest {
        TxRequest {
            to: self.to,
            data: self.data.clone(),
            value: self.value.clone(),
            gas_limit: self.gas_limit,
        }
    }
}

fn hex_bytes<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

fn decimal<S: serde::Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub sell_token: String,
    pub buy_token: String,
    /// As entered, in sell-token units
    pub sell_amount: String,
    pub expected_output: String,
    pub minimum_received: String,
    pub price: String,
    pub guaranteed_price: String,
    pub price_impact_percent: f64,
    pub tx_payload: TxPayload,
    /// Not re-checked before execution
    pub quoted_at: i64,
}

impl SwapQuote {
    pub fn price_impact_display(&self) -> String {
        format!("{:.2}%", self.price_impact_percent)
    }
}

#[derive(Debug, Clone)]
pub struct SwapSettings {
    /// Token table key, e.g. "11155111"
    pub network: String,
    pub dust_threshold: BigUint,
    pub gas_buffer: f64,
}

impl SwapSettings {
    pub fn new(network: &str, dust_threshold: &str, gas_buffer: f64) -> MixerResult<Self> {
        let dust_threshold = parse_units(dust_threshold, DUST_DECIMALS).map_err(|e| {
            MixerError::Configuration(format!("invalid dust_threshold {}: {}", dust_threshold, e))
        })?;
        Ok(Self {
            network: network.to_string(),
            dust_threshold,
            gas_buffer,
        })
    }

    pub fn from_config(config: &ObscuraConfig) -> MixerResult<Self> {
        Self::new(
            &config.network.chain_id,
            &config.swap.dust_threshold,
            config.swap.gas_buffer,
        )
    }
}

pub struct SwapQuoteAggregator<A, C> {
    aggregator: Arc<A>,
    chain: Arc<C>,
    settings: SwapSettings,
}

impl<A: PriceAggregator, C: ChainClient> SwapQuoteAggregator<A, C> {
    pub fn new(aggregator: Arc<A>, chain: Arc<C>, settings: SwapSettings) -> Self {
        Self {
            aggregator,
            chain,
            settings,
        }
    }

    pub async fn get_quote(
        &self,
        sell_token: &str,
        buy_token: &str,
        sell_amount: &str,
    ) -> MixerResult<SwapQuote> {
        validate_amount(sell_amount)?;
        if parse_units(sell_amount, DUST_DECIMALS)? < self.settings.dust_threshold {
            return Err(MixerError::Validation(format!(
                "Amount is below the minimum of {}",
                format_units(&self.settings.dust_threshold, DUST_DECIMALS)
            )));
        }
        if sell_token.trim().eq_ignore_ascii_case(buy_token.trim()) {
            return Err(MixerError::Validation("Cannot swap a token for itself".into()));
        }

        let sell = lookup_token(sell_token, &self.settings.network)?;
        let buy = lookup_token(buy_token, &self.settings.network)?;
        let taker = require_signer(self.chain.as_ref())?;
        let sell_units = parse_units(sell_amount, sell.decimals)?;

        let request = QuoteRequest {
            sell_token: sell.address,
            buy_token: buy.address,
            sell_amount: sell_units.clone(),
            taker,
        };
        let raw = self.aggregator.fetch_quote(&request).await?;
        let quote = build_quote(
            &sell,
            &buy,
            sell_amount.trim(),
            &sell_units,
            raw,
            self.settings.gas_buffer,
        )?;

        info!(
            "Quote {} {} -> {} {} (impact {})",
            quote.sell_amount,
            sell.symbol,
            quote.expected_output,
            buy.symbol,
            quote.price_impact_display()
        );
        Ok(quote)
    }
}

fn bad_quote(field: &str, value: &str) -> MixerError {
    MixerError::Quote(format!("aggregator returned invalid {}: {}", field, value))
}

fn build_quote(
    sell: &TokenInfo,
    buy: &TokenInfo,
    sell_amount: &str,
    sell_units: &BigUint,
    raw: AggregatorQuote,
    gas_buffer: f64,
) -> MixerResult<SwapQuote> {
    let buy_amount = BigUint::parse_bytes(raw.buy_amount.as_bytes(), 10)
        .ok_or_else(|| bad_quote("buyAmount", &raw.buy_amount))?;

    // minimum = sellAmount * guaranteedPrice, in buy-token units
    let (gp_mantissa, gp_scale) = parse_decimal(&raw.guaranteed_price)
        .ok_or_else(|| bad_quote("guaranteedPrice", &raw.guaranteed_price))?;
    let minimum = sell_units * gp_mantissa * pow10(buy.decimals as usize)
        / (pow10(sell.decimals as usize) * pow10(gp_scale));

    let price: f64 = raw
        .price
        .parse()
        .map_err(|_| bad_quote("price", &raw.price))?;
    let guaranteed: f64 = raw
        .guaranteed_price
        .parse()
        .map_err(|_| bad_quote("guaranteedPrice", &raw.guaranteed_price))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(bad_quote("price", &raw.price));
    }
    if !guaranteed.is_finite() {
        return Err(bad_quote("guaranteedPrice", &raw.guaranteed_price));
    }
    let price_impact_percent = (1.0 - guaranteed / price) * 100.0;

    let data = hex::decode(raw.data.strip_prefix("0x").unwrap_or(&raw.data))
        .map_err(|_| bad_quote("data", &raw.data))?;
    let value = match raw.value.as_deref() {
        Some(v) if !v.is_empty() => {
            BigUint::parse_bytes(v.as_bytes(), 10).ok_or_else(|| bad_quote("value", v))?
        }
        _ => BigUint::zero(),
    };
    let gas_limit = match &raw.estimated_gas {
        Some(gas) => {
            let estimate = gas
                .as_u64()
                .ok_or_else(|| bad_quote("estimatedGas", &format!("{:?}", gas)))?;
            Some((estimate as f64 * gas_buffer).ceil() as u64)
        }
        None => None,
    };

    Ok(SwapQuote {
        sell_token: sell.symbol.to_string(),
        buy_token: buy.symbol.to_string(),
        sell_amount: sell_amount.to_string(),
        expected_output: format_units(&buy_amount, buy.decimals),
        minimum_received: format_units(&minimum, buy.decimals),
        price: raw.price,
        guaranteed_price: raw.guaranteed_price,
        price_impact_percent,
        tx_payload: TxPayload {
            to: raw.to,
            data,
            value,
            gas_limit,
        },
        quoted_at: now_millis(),
    })
}
