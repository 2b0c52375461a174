use serde::{Deserialize, Serialize};

use obscura_account::Address;
use obscura_commitment::{Commitment, Secret};

use crate::chain::TxHash;
use crate::units::parse_decimal;

/// Bumped whenever the persisted layout changes.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// Persisted locally, not yet seen on chain
    Pending,
    Confirmed,
}

/// A deposit we can still withdraw. Deleted, not tagged, once withdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRecord {
    pub schema_version: u32,
    pub commitment: Commitment,
    pub secret: Secret,
    pub recipient: Address,
    /// Native units, decimal string
    pub amount: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub status: DepositStatus,
}

impl DepositRecord {
    pub fn pending(
        commitment: Commitment,
        secret: Secret,
        recipient: Address,
        amount: String,
        timestamp: i64,
    ) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            commitment,
            secret,
            recipient,
            amount,
            timestamp,
            status: DepositStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DepositStatus::Pending
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.schema_version != RECORD_SCHEMA_VERSION {
            return Err(format!(
                "schema version {} (expected {})",
                self.schema_version, RECORD_SCHEMA_VERSION
            ));
        }
        if parse_decimal(&self.amount).is_none() {
            return Err(format!("amount {:?} is not a decimal", self.amount));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Completed,
}

/// An executed swap, keyed by its transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRecord {
    pub schema_version: u32,
    pub transaction_hash: TxHash,
    pub timestamp: i64,
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    /// Expected output at quote time
    pub to_amount: String,
    pub status: SwapStatus,
}

impl SwapRecord {
    pub(crate) fn check(&self) -> Result<(), String> {
        if self.schema_version != RECORD_SCHEMA_VERSION {
            return Err(format!(
                "schema version {} (expected {})",
                self.schema_version, RECORD_SCHEMA_VERSION
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deposit_record_json_layout() {
        let record = DepositRecord::pending(
            Commitment([1; 32]),
            Secret::from_bytes([2; 32]),
            Address::from_bytes([3; 20]),
            "0.1".into(),
            1_700_000_000_000,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["schemaVersion"], 1);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["secret"], format!("0x{}", "02".repeat(32)));
        assert_eq!(value["commitment"], format!("0x{}", "01".repeat(32)));
        assert_eq!(value["amount"], "0.1");
    }

    #[test]
    fn record_missing_secret_fails_to_load() {
        let value = json!({
            "schemaVersion": 1,
            "commitment": format!("0x{}", "01".repeat(32)),
            "recipient": "0x0303030303030303030303030303030303030303",
            "amount": "0.1",
            "timestamp": 1,
            "status": "pending",
        });
        assert!(serde_json::from_value::<DepositRecord>(value).is_err());
    }

    #[test]
    fn unknown_schema_version_fails_check() {
        let mut record = DepositRecord::pending(
            Commitment([1; 32]),
            Secret::from_bytes([2; 32]),
            Address::ZERO,
            "1".into(),
            0,
        );
        record.schema_version = 2;
        assert!(record.check().is_err());
    }
}
