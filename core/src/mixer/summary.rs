use num_bigint::BigUint;
use serde::Serialize;

use crate::error::{MixerError, MixerResult};
use crate::ledger::{DepositStatus, LocalLedger};
use crate::units::{format_units, parse_units};

/// Dashboard totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub deposits: usize,
    pub pending: usize,
    pub confirmed: usize,
    /// Sum of confirmed deposits, native units
    pub total_confirmed: String,
    pub swaps: usize,
}

pub fn summarize(ledger: &LocalLedger, native_decimals: u8) -> MixerResult<LedgerSummary> {
    let deposits = ledger.list_deposits()?;
    let swaps = ledger.list_swaps()?;

    let mut total = BigUint::default();
    let mut confirmed = 0;
    for record in deposits.iter().filter(|r| r.status == DepositStatus::Confirmed) {
        confirmed += 1;
        total += parse_units(&record.amount, native_decimals).map_err(|e| {
            MixerError::Persistence(format!("deposit {} amount: {}", record.commitment, e))
        })?;
    }

    Ok(LedgerSummary {
        deposits: deposits.len(),
        pending: deposits.len() - confirmed,
        confirmed,
        total_confirmed: format_units(&total, native_decimals),
        swaps: swaps.len(),
    })
}
