use anyhow::Result;

/// Byte-level key-value backend behind [`super::LocalLedger`]; decouples the
/// record logic from the db.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite.
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Like `put`, but durable against an OS crash before returning.
    fn put_sync(&self, key: &str, value: &[u8]) -> Result<()> {
        self.put(key, value)
    }

    /// Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Make every acknowledged write durable.
    fn flush(&self) -> Result<()>;
}
