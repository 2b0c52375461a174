use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::kv::KvStore;

/// In-process store for tests and dry runs. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.read().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| anyhow!("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| anyhow!("memory store poisoned"))?;
        entries.remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let entries = self.entries.read().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_stops_at_prefix_boundary() {
        let store = MemoryStore::new();
        store.put("deposit:a", b"1").unwrap();
        store.put("deposit:b", b"2").unwrap();
        store.put("swap:a", b"3").unwrap();
        store.put("deposiz", b"4").unwrap();

        let deposits = store.scan_prefix("deposit:").unwrap();
        assert_eq!(deposits.len(), 2);
        assert_eq!(deposits[0].0, "deposit:a");
        assert_eq!(store.scan_prefix("swap:").unwrap().len(), 1);
    }

    #[test]
    fn delete_missing_is_ok() {
        let store = MemoryStore::new();
        store.delete("nothing").unwrap();
        assert!(store.get("nothing").unwrap().is_none());
    }
}
