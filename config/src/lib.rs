//! Obscura Configuration
//!
//! Shared configuration crate for the Obscura core and CLI.
//!
//! Handles loading configuration from:
//! 1. OBSCURA_CONFIG env var (explicit path)
//! 2. ./obscura.toml (current directory)
//! 3. ~/.obscura/obscura.toml (user home)
//!
//! Environment variables take precedence over TOML config. The loaded value is
//! handed to components explicitly; there is no process-wide instance.

use anyhow::{Context, Result, bail};
use obscura_account::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "obscura.toml";
const CONFIG_DIR_NAME: &str = ".obscura";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_CHAIN_ID: &str = "11155111";
const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_RECEIPT_POLL_MS: u64 = 1000;

const DEFAULT_DB_PATH: &str = "./obscura-db";

const DEFAULT_MIN_DEPOSIT: &str = "0.001";
const DEFAULT_NATIVE_DECIMALS: u8 = 18;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 30;

const DEFAULT_0X_API_URL: &str = "https://api.0x.org";
const DEFAULT_SLIPPAGE: f64 = 0.01;
const DEFAULT_DUST_THRESHOLD: &str = "0.000001";
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_GAS_BUFFER: f64 = 1.5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObscuraConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub swap: SwapConfig,
}

/// Chain connection and ledger contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network identifier, used to select the token table ("1", "11155111")
    #[serde(default = "default_chain_id")]
    pub chain_id: String,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Ledger (mixer) contract address; empty until deployed
    #[serde(default)]
    pub mixer_contract: String,
    /// Signing account; falls back to the node's first `eth_accounts` entry
    #[serde(default)]
    pub from_address: Option<String>,
    /// Lower bound for deposit event queries
    #[serde(default)]
    pub deployment_block: Option<u64>,
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
    #[serde(default = "default_receipt_poll")]
    pub receipt_poll_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID.into(),
            rpc_url: DEFAULT_RPC_URL.into(),
            mixer_contract: String::new(),
            from_address: None,
            deployment_block: None,
            receipt_timeout_secs: DEFAULT_RECEIPT_TIMEOUT_SECS,
            receipt_poll_ms: DEFAULT_RECEIPT_POLL_MS,
        }
    }
}

fn default_chain_id() -> String {
    DEFAULT_CHAIN_ID.into()
}
fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.into()
}
fn default_receipt_timeout() -> u64 {
    DEFAULT_RECEIPT_TIMEOUT_SECS
}
fn default_receipt_poll() -> u64 {
    DEFAULT_RECEIPT_POLL_MS
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.into(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

/// Deposit / withdraw settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Smallest accepted deposit, in native units
    #[serde(default = "default_min_deposit")]
    pub min_deposit: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            min_deposit: DEFAULT_MIN_DEPOSIT.into(),
            native_decimals: DEFAULT_NATIVE_DECIMALS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
        }
    }
}

fn default_min_deposit() -> String {
    DEFAULT_MIN_DEPOSIT.into()
}
fn default_native_decimals() -> u8 {
    DEFAULT_NATIVE_DECIMALS
}
fn default_reconcile_interval() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_SECS
}

/// Swap aggregator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Fraction, 0.01 = 1%
    #[serde(default = "default_slippage")]
    pub slippage_percentage: f64,
    #[serde(default = "default_dust_threshold")]
    pub dust_threshold: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Multiplier applied to the aggregator's gas estimate
    #[serde(default = "default_gas_buffer")]
    pub gas_buffer: f64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_0X_API_URL.into(),
            api_key: None,
            slippage_percentage: DEFAULT_SLIPPAGE,
            dust_threshold: DEFAULT_DUST_THRESHOLD.into(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            gas_buffer: DEFAULT_GAS_BUFFER,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_0X_API_URL.into()
}
fn default_slippage() -> f64 {
    DEFAULT_SLIPPAGE
}
fn default_dust_threshold() -> String {
    DEFAULT_DUST_THRESHOLD.into()
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_gas_buffer() -> f64 {
    DEFAULT_GAS_BUFFER
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

// ============================================================================
// Env Helpers
// ============================================================================

/// Set String from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set Option<String> from env var if present
fn env_option_string(key: &str, field: &mut Option<String>) {
    if let Ok(v) = env::var(key) {
        *field = Some(v);
    }
}

/// Set T from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Plain non-negative decimal, e.g. "0.001" or "12"
fn is_plain_decimal(s: &str) -> bool {
    let mut parts = s.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let frac = parts.next().unwrap_or_default();
    (!whole.is_empty() || !frac.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

// ============================================================================
// Implementation
// ============================================================================

impl ObscuraConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::read_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check OBSCURA_CONFIG env var
        if let Ok(path) = env::var("OBSCURA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            log::warn!("OBSCURA_CONFIG points to {}, which does not exist", path.display());
        }

        // 2. Check ./obscura.toml
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.obscura/obscura.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        // Network
        env_string("OBSCURA_CHAIN_ID", &mut self.network.chain_id);
        env_string("OBSCURA_RPC_URL", &mut self.network.rpc_url);
        env_string("OBSCURA_MIXER_CONTRACT", &mut self.network.mixer_contract);
        env_option_string("OBSCURA_FROM_ADDRESS", &mut self.network.from_address);

        // Database
        env_string("OBSCURA_DB_PATH", &mut self.database.path);

        // Mixer
        env_string("OBSCURA_MIN_DEPOSIT", &mut self.mixer.min_deposit);
        env_parse(
            "OBSCURA_RECONCILE_INTERVAL",
            &mut self.mixer.reconcile_interval_secs,
        );

        // Swap
        env_string("OBSCURA_0X_API_URL", &mut self.swap.api_url);
        env_option_string("OBSCURA_0X_API_KEY", &mut self.swap.api_key);
        env_parse("OBSCURA_DEBOUNCE_MS", &mut self.swap.debounce_ms);
    }

    /// Check values that would otherwise only fail deep inside an operation.
    pub fn validate(&self) -> Result<()> {
        if !self.network.mixer_contract.is_empty() {
            Address::parse(&self.network.mixer_contract)
                .with_context(|| format!("Invalid mixer_contract: {}", self.network.mixer_contract))?;
        }
        if let Some(from) = &self.network.from_address {
            Address::parse(from).with_context(|| format!("Invalid from_address: {}", from))?;
        }
        if !is_plain_decimal(&self.mixer.min_deposit) {
            bail!("Invalid min_deposit: {}", self.mixer.min_deposit);
        }
        if !is_plain_decimal(&self.swap.dust_threshold) {
            bail!("Invalid dust_threshold: {}", self.swap.dust_threshold);
        }
        if !(0.0..1.0).contains(&self.swap.slippage_percentage) {
            bail!(
                "slippage_percentage must be in [0, 1), got {}",
                self.swap.slippage_percentage
            );
        }
        if self.swap.gas_buffer < 1.0 {
            bail!("gas_buffer must be at least 1.0, got {}", self.swap.gas_buffer);
        }
        if self.network.receipt_poll_ms == 0 {
            bail!("receipt_poll_ms must be greater than 0");
        }
        Ok(())
    }

    /// The ledger contract address, required for deposit, withdraw and reconcile.
    pub fn mixer_contract(&self) -> Result<Address> {
        if self.network.mixer_contract.is_empty() {
            bail!("network.mixer_contract is not set (or OBSCURA_MIXER_CONTRACT)");
        }
        Address::parse(&self.network.mixer_contract)
            .with_context(|| format!("Invalid mixer_contract: {}", self.network.mixer_contract))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.network.mixer_contract = "0x0000000000000000000000000000000000000000".into();
        sample.swap.api_key = Some("your-0x-api-key".into());
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
