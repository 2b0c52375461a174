pub mod deposits;
pub mod reconciler;
pub mod summary;

use num_bigint::BigUint;

use obscura_account::Address;
use obscura_config::ObscuraConfig;

use crate::error::{MixerError, MixerResult};
use crate::units::parse_units;

pub use deposits::DepositLifecycleManager;
pub use reconciler::{EventReconciler, ReconcileReport};
pub use summary::{LedgerSummary, summarize};

/// Contract and amount rules shared by the deposit manager and reconciler.
#[derive(Debug, Clone)]
pub struct MixerSettings {
    pub contract: Address,
    /// Smallest accepted deposit in wei
    pub min_deposit: BigUint,
    pub native_decimals: u8,
    /// Lower bound for deposit event queries
    pub from_block: Option<u64>,
}

impl MixerSettings {
    pub fn new(contract: Address, min_deposit: &str, native_decimals: u8) -> MixerResult<Self> {
        let min_deposit = parse_units(min_deposit, native_decimals).map_err(|e| {
            MixerError::Configuration(format!("invalid min_deposit {}: {}", min_deposit, e))
        })?;
        Ok(Self {
            contract,
            min_deposit,
            native_decimals,
            from_block: None,
        })
    }

    pub fn from_config(config: &ObscuraConfig) -> MixerResult<Self> {
        let contract = config
            .mixer_contract()
            .map_err(|e| MixerError::Configuration(format!("{:#}", e)))?;
        let mut settings = Self::new(
            contract,
            &config.mixer.min_deposit,
            config.mixer.native_decimals,
        )?;
        settings.from_block = config.network.deployment_block;
        Ok(settings)
    }
}
