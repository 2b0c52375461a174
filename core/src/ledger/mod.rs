//! Local Ledger
//!
//! Durable store for deposit and swap records, passed explicitly to every
//! component that needs it.
//!
//! ```text
//! deposit:<commitment>  -> DepositRecord (JSON)
//! swap:<txHash>         -> SwapRecord (JSON)
//! ```
//!
//! Records are validated on load; anything unparseable surfaces as
//! `MixerError::Persistence` naming the offending key.

pub mod kv;
pub mod memory;
pub mod records;
pub mod rocks;

use log::{debug, info};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};

use obscura_commitment::Commitment;

use crate::chain::TxHash;
use crate::error::{MixerError, MixerResult};

pub use kv::KvStore;
pub use memory::MemoryStore;
pub use records::{DepositRecord, DepositStatus, RECORD_SCHEMA_VERSION, SwapRecord, SwapStatus};
pub use rocks::RocksDbStore;

const DEPOSIT_PREFIX: &str = "deposit:";
const SWAP_PREFIX: &str = "swap:";

fn deposit_key(commitment: &Commitment) -> String {
    format!("{}{}", DEPOSIT_PREFIX, commitment)
}

fn swap_key(hash: &TxHash) -> String {
    format!("{}{}", SWAP_PREFIX, hash)
}

#[derive(Clone)]
pub struct LocalLedger {
    store: Arc<dyn KvStore>,
    /// Serializes read-modify-write on deposit records
    write_lock: Arc<Mutex<()>>,
}

impl LocalLedger {
    /// Open (or create) the RocksDB-backed ledger at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> MixerResult<Self> {
        let path = path.as_ref();
        let store = RocksDbStore::open(path).map_err(MixerError::persistence)?;
        info!("Opened local ledger at {}", path.display());
        Ok(Self::with_store(Arc::new(store)))
    }

    /// A ledger that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Flush outstanding writes. Clones of this ledger remain usable.
    pub fn close(self) -> MixerResult<()> {
        self.store.flush().map_err(MixerError::persistence)?;
        debug!("Local ledger flushed");
        Ok(())
    }

    fn lock(&self) -> MixerResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| MixerError::Persistence("ledger write lock poisoned".into()))
    }

    // ------------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------------

    /// Insert or overwrite a deposit record. Synced to disk: a Pending record
    /// holds the only copy of its secret.
    pub fn put_deposit(&self, record: &DepositRecord) -> MixerResult<()> {
        let _guard = self.lock()?;
        let key = deposit_key(&record.commitment);
        let bytes = encode(&key, record)?;
        self.store.put_sync(&key, &bytes).map_err(MixerError::persistence)
    }

    pub fn get_deposit(&self, commitment: &Commitment) -> MixerResult<Option<DepositRecord>> {
        let key = deposit_key(commitment);
        match self.store.get(&key).map_err(MixerError::persistence)? {
            Some(bytes) => decode_deposit(&key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Pending -> Confirmed. Returns `false` if the record is missing or
    /// already confirmed; never demotes.
    pub fn mark_confirmed(&self, commitment: &Commitment) -> MixerResult<bool> {
        let _guard = self.lock()?;
        let Some(mut record) = self.get_deposit(commitment)? else {
            return Ok(false);
        };
        if record.status == DepositStatus::Confirmed {
            return Ok(false);
        }
        record.status = DepositStatus::Confirmed;
        self.write(&deposit_key(commitment), &record)?;
        Ok(true)
    }

    pub fn delete_deposit(&self, commitment: &Commitment) -> MixerResult<()> {
        let _guard = self.lock()?;
        self.store
            .delete(&deposit_key(commitment))
            .map_err(MixerError::persistence)
    }

    /// Every deposit, newest first. Fails on the first corrupt record.
    pub fn list_deposits(&self) -> MixerResult<Vec<DepositRecord>> {
        let mut records = Vec::new();
        for (key, bytes) in self.scan(DEPOSIT_PREFIX)? {
            records.push(decode_deposit(&key, &bytes)?);
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub fn pending_deposits(&self) -> MixerResult<Vec<DepositRecord>> {
        Ok(self
            .list_deposits()?
            .into_iter()
            .filter(DepositRecord::is_pending)
            .collect())
    }

    // ------------------------------------------------------------------------
    // Swaps
    // ------------------------------------------------------------------------

    pub fn put_swap(&self, record: &SwapRecord) -> MixerResult<()> {
        self.write(&swap_key(&record.transaction_hash), record)
    }

    pub fn get_swap(&self, hash: &TxHash) -> MixerResult<Option<SwapRecord>> {
        let key = swap_key(hash);
        match self.store.get(&key).map_err(MixerError::persistence)? {
            Some(bytes) => {
                let record: SwapRecord = decode(&key, &bytes)?;
                record.check().map_err(|e| corrupt(&key, e))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Every swap, newest first.
    pub fn list_swaps(&self) -> MixerResult<Vec<SwapRecord>> {
        let mut records = Vec::new();
        for (key, bytes) in self.scan(SWAP_PREFIX)? {
            let record: SwapRecord = decode(&key, &bytes)?;
            record.check().map_err(|e| corrupt(&key, e))?;
            records.push(record);
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn write<T: Serialize>(&self, key: &str, value: &T) -> MixerResult<()> {
        let bytes = encode(key, value)?;
        self.store.put(key, &bytes).map_err(MixerError::persistence)
    }

    fn scan(&self, prefix: &str) -> MixerResult<Vec<(String, Vec<u8>)>> {
        self.store.scan_prefix(prefix).map_err(MixerError::persistence)
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> MixerResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| MixerError::Persistence(format!("encoding {}: {}", key, e)))
}

/// A deposit must validate and sit under the key derived from its commitment.
fn decode_deposit(key: &str, bytes: &[u8]) -> MixerResult<DepositRecord> {
    let record: DepositRecord = decode(key, bytes)?;
    record.check().map_err(|e| corrupt(key, e))?;
    if deposit_key(&record.commitment) != key {
        return Err(corrupt(key, "commitment does not match key"));
    }
    Ok(record)
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> MixerResult<T> {
    serde_json::from_slice(bytes).map_err(|e| corrupt(key, e))
}

fn corrupt(key: &str, reason: impl std::fmt::Display) -> MixerError {
    MixerError::Persistence(format!("corrupt record {}: {}", key, reason))
}
