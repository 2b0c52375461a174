//! JSON-RPC Chain Client
//!
//! Talks to an Ethereum-compatible node over HTTP. Signing is left to the node
//! (`eth_sendTransaction`), so the signer is an account the node manages:
//! either the configured `from_address` or the first entry of `eth_accounts`.

use log::{debug, info, warn};
use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{sleep, timeout};

use obscura_account::Address;
use obscura_config::NetworkConfig;

use super::{ChainClient, ChainError, ChainEvent, EventFilter, TxHandle, TxHash, TxReceipt, TxRequest};
use super::abi::event_topic;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Node URL (e.g., "http://127.0.0.1:8545")
    pub rpc_url: String,
    /// Signing account; `None` falls back to `eth_accounts`
    pub from_address: Option<Address>,
    /// Lower bound for `eth_getLogs`
    pub deployment_block: Option<u64>,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            from_address: None,
            deployment_block: None,
            receipt_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RpcConfig {
    pub fn from_network(network: &NetworkConfig) -> anyhow::Result<Self> {
        let from_address = network
            .from_address
            .as_deref()
            .map(Address::parse)
            .transpose()?;

        Ok(Self {
            rpc_url: network.rpc_url.clone(),
            from_address,
            deployment_block: network.deployment_block,
            receipt_timeout: Duration::from_secs(network.receipt_timeout_secs),
            poll_interval: Duration::from_millis(network.receipt_poll_ms),
            ..Self::default()
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    #[serde(default)]
    transaction_hash: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    removed: bool,
}

// ============================================================================
// Client
// ============================================================================

pub struct JsonRpcChainClient {
    config: RpcConfig,
    client: reqwest::Client,
    signer: Option<Address>,
    next_id: AtomicU64,
}

impl JsonRpcChainClient {
    /// Build the HTTP client and resolve the signing account.
    ///
    /// An unreachable node is not an error here; the client simply has no
    /// signer and write operations fail with `WalletUnavailable`.
    pub async fn connect(config: RpcConfig) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::Rpc(format!("Failed to create HTTP client: {}", e)))?;

        let mut this = Self {
            signer: config.from_address,
            config,
            client,
            next_id: AtomicU64::new(1),
        };

        if this.signer.is_none() {
            match this.call::<Vec<String>>("eth_accounts", json!([])).await {
                Ok(accounts) => {
                    this.signer = accounts.first().and_then(|a| Address::parse(a).ok());
                }
                Err(e) => warn!("eth_accounts failed, continuing without a signer: {}", e),
            }
        }

        match this.signer {
            Some(signer) => info!("Connected to {} as {}", this.config.rpc_url, signer),
            None => warn!("Connected to {} without a signer", this.config.rpc_url),
        }

        Ok(this)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("{} failed: {}", method, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChainError::Rpc(format!("{} returned {}: {}", method, status, body)));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(ChainError::Rpc(format!("{} ({}): {}", method, err.code, err.message)));
        }

        serde_json::from_value(body.result.unwrap_or(Value::Null))
            .map_err(|e| ChainError::Decode(format!("{} result: {}", method, e)))
    }
}

impl ChainClient for JsonRpcChainClient {
    fn signer_address(&self) -> Option<Address> {
        self.signer
    }

    async fn submit_transaction(&self, tx: &TxRequest) -> Result<TxHandle, ChainError> {
        let from = self.signer.ok_or(ChainError::NoSigner)?;
        let params = json!([transaction_object(&from, tx)]);

        let hash: String = self.call("eth_sendTransaction", params).await?;
        let hash = parse_tx_hash(&hash)?;
        debug!("Broadcast {} to {}", hash, tx.to);
        Ok(TxHandle { hash })
    }

    async fn wait_for_receipt(&self, handle: &TxHandle) -> Result<TxReceipt, ChainError> {
        let hash = handle.hash;
        let poll = async {
            loop {
                let receipt: Option<RpcReceipt> = self
                    .call("eth_getTransactionReceipt", json!([hash.to_hex()]))
                    .await?;
                if let Some(receipt) = receipt {
                    return Ok::<_, ChainError>(receipt);
                }
                sleep(self.config.poll_interval).await;
            }
        };

        let receipt = timeout(self.config.receipt_timeout, poll)
            .await
            .map_err(|_| ChainError::Timeout(hash))??;

        Ok(TxReceipt {
            transaction_hash: parse_tx_hash(&receipt.transaction_hash)?,
            success: receipt.status.as_deref() == Some("0x1"),
            block_number: receipt.block_number.as_deref().map(parse_quantity).transpose()?,
        })
    }

    async fn query_events(
        &self,
        contract: &Address,
        event_signature: &str,
        filter: &EventFilter,
    ) -> Result<Vec<ChainEvent>, ChainError> {
        let params = json!([logs_filter(
            contract,
            event_signature,
            filter,
            self.config.deployment_block
        )]);

        let logs: Vec<RpcLog> = self.call("eth_getLogs", params).await?;
        Ok(convert_logs(logs))
    }
}

// ============================================================================
// Encoding Helpers
// ============================================================================

fn quantity(value: &BigUint) -> String {
    format!("0x{}", value.to_str_radix(16))
}

fn transaction_object(from: &Address, tx: &TxRequest) -> Value {
    let mut object = json!({
        "from": from.to_hex(),
        "to": tx.to.to_hex(),
        "data": format!("0x{}", hex::encode(&tx.data)),
        "value": quantity(&tx.value),
    });
    if let Some(gas) = tx.gas_limit {
        object["gas"] = json!(format!("0x{:x}", gas));
    }
    object
}

fn logs_filter(
    contract: &Address,
    event_signature: &str,
    filter: &EventFilter,
    deployment_block: Option<u64>,
) -> Value {
    let mut topics = vec![json!(format!("0x{}", hex::encode(event_topic(event_signature))))];
    if !filter.indexed.is_empty() {
        let alternatives: Vec<String> = filter
            .indexed
            .iter()
            .map(|t| format!("0x{}", hex::encode(t)))
            .collect();
        topics.push(json!(alternatives));
    }

    let from_block = match filter.from_block.or(deployment_block) {
        Some(block) => format!("0x{:x}", block),
        None => "earliest".to_string(),
    };

    json!({
        "address": contract.to_hex(),
        "topics": topics,
        "fromBlock": from_block,
        "toBlock": "latest",
    })
}

fn parse_quantity(text: &str) -> Result<u64, ChainError> {
    let body = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(body, 16).map_err(|e| ChainError::Decode(format!("quantity {}: {}", text, e)))
}

fn parse_tx_hash(text: &str) -> Result<TxHash, ChainError> {
    text.parse().map_err(ChainError::Decode)
}

fn parse_word(text: &str) -> Result<[u8; 32], ChainError> {
    let body = text.strip_prefix("0x").unwrap_or(text);
    let mut word = [0u8; 32];
    hex::decode_to_slice(body, &mut word)
        .map_err(|e| ChainError::Decode(format!("topic {}: {}", text, e)))?;
    Ok(word)
}

/// Drops removed logs, and skips any log that does not convert.
fn convert_logs(logs: Vec<RpcLog>) -> Vec<ChainEvent> {
    logs.into_iter()
        .filter(|log| !log.removed)
        .filter_map(|log| match convert_log(log) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Skipping unparseable log: {}", e);
                None
            }
        })
        .collect()
}

fn convert_log(log: RpcLog) -> Result<ChainEvent, ChainError> {
    let data_hex = log.data.strip_prefix("0x").unwrap_or(&log.data);
    Ok(ChainEvent {
        address: Address::parse(&log.address)
            .map_err(|e| ChainError::Decode(format!("log address: {}", e)))?,
        topics: log
            .topics
            .iter()
            .map(|t| parse_word(t))
            .collect::<Result<_, _>>()?,
        data: hex::decode(data_hex).map_err(|e| ChainError::Decode(format!("log data: {}", e)))?,
        transaction_hash: log.transaction_hash.as_deref().map(parse_tx_hash).transpose()?,
        block_number: log.block_number.as_deref().map(parse_quantity).transpose()?,
    })
}
