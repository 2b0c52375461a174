use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteOptions};
use std::path::Path;
use std::sync::Arc;

use super::kv::KvStore;

const CF_RECORDS: &str = "records";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![ColumnFamilyDescriptor::new(CF_RECORDS, Options::default())];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for RocksDbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.db.cf_handle(CF_RECORDS).context("records CF missing")?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.db.cf_handle(CF_RECORDS).context("records CF missing")?;
        self.db.put_cf(cf, key.as_bytes(), value)?;
        Ok(())
    }

    fn put_sync(&self, key: &str, value: &[u8]) -> Result<()> {
        let cf = self.db.cf_handle(CF_RECORDS).context("records CF missing")?;
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        self.db.put_cf_opt(cf, key.as_bytes(), value, &opts)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let cf = self.db.cf_handle(CF_RECORDS).context("records CF missing")?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let cf = self.db.cf_handle(CF_RECORDS).context("records CF missing")?;

        let mut entries = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), Direction::Forward),
        );

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.to_vec()).context("non-utf8 record key")?;
            entries.push((key, value.to_vec()));
        }

        Ok(entries)
    }

    fn flush(&self) -> Result<()> {
        let cf = self.db.cf_handle(CF_RECORDS).context("records CF missing")?;
        self.db.flush_cf(cf).context("Failed to flush records")?;
        Ok(())
    }
}
