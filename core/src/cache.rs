use std::{
    collections::BTreeMap,
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use alloy::primitives::Address;
use eyre::Result;
use thiserror::Error;
use tracing::{debug, warn};

use dealer_common::types::SlotCandidate;
use dealer_common::utils::address_to_hex_string;

/// Token address -> last (layout, slot) that forged its balance.
///
/// Only an optimisation: a cold cache still converges, just with more probes.
pub trait SlotCache: Send + Sync + 'static {
    fn get(&self, token: Address) -> Option<SlotCandidate>;
    fn put(&mut self, token: Address, candidate: SlotCandidate);
    fn flush(&self) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("slot cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("slot cache is not valid json: {0}")]
    Format(#[from] serde_json::Error),
}

type Entries = BTreeMap<String, SlotCandidate>;

fn cache_key(token: &Address) -> String {
    address_to_hex_string(token)
}

/// Cache persisted as a json object keyed by lowercase token address:
///
/// ```json
/// { "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48": { "type": "solidity", "slot": 9 } }
/// ```
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
    entries: Entries,
}

impl FileCache {
    /// Reads `path` if it holds a valid cache, otherwise starts empty.
    pub fn load(path: PathBuf) -> Self {
        let entries = match read_entries(&path) {
            Ok(entries) => entries,
            Err(CacheError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                debug!(target: "dealer::cache", path = %path.display(), "no slot cache yet");
                Entries::new()
            }
            Err(err) => {
                warn!(target: "dealer::cache", path = %path.display(), error = %err, "ignoring unreadable slot cache");
                Entries::new()
            }
        };

        FileCache { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_entries(path: &Path) -> Result<Entries, CacheError> {
    let raw = fs::read_to_string(path)?;
    let entries: Entries = serde_json::from_str(&raw)?;

    Ok(entries
        .into_iter()
        .map(|(token, candidate)| (token.to_lowercase(), candidate))
        .collect())
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut f = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    f.write_all(serde_json::to_string_pretty(entries)?.as_bytes())?;

    Ok(())
}

impl SlotCache for FileCache {
    fn get(&self, token: Address) -> Option<SlotCandidate> {
        self.entries.get(&cache_key(&token)).copied()
    }

    fn put(&mut self, token: Address, candidate: SlotCandidate) {
        self.entries.insert(cache_key(&token), candidate);
    }

    fn flush(&self) -> Result<()> {
        write_entries(&self.path, &self.entries)?;
        Ok(())
    }
}

/// Process-lifetime cache; `flush` is a no-op.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Entries,
}

impl SlotCache for MemoryCache {
    fn get(&self, token: Address) -> Option<SlotCandidate> {
        self.entries.get(&cache_key(&token)).copied()
    }

    fn put(&mut self, token: Address, candidate: SlotCandidate) {
        self.entries.insert(cache_key(&token), candidate);
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use tempfile::tempdir;

    use dealer_common::types::StorageLayout;

    use super::*;

    const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
    const CRV: Address = address!("d533a949740bb3306d119cc777fa900ba034cd52");

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let cache = FileCache::load(dir.path().join("slots.json"));

        assert!(cache.is_empty());
        assert_eq!(cache.get(USDC), None);
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(FileCache::load(path).is_empty());
    }

    #[test]
    fn test_flush_creates_parent_and_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("dealer").join("slots.json");

        let mut cache = FileCache::load(path.clone());
        cache.put(USDC, SlotCandidate::new(StorageLayout::Solidity, 9));
        cache.put(CRV, SlotCandidate::new(StorageLayout::Vyper, 3));
        cache.flush().unwrap();

        let reloaded = FileCache::load(path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get(USDC),
            Some(SlotCandidate::new(StorageLayout::Solidity, 9))
        );
        assert_eq!(reloaded.get(CRV), Some(SlotCandidate::new(StorageLayout::Vyper, 3)));
    }

    #[test]
    fn test_file_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");

        let mut cache = FileCache::load(path.clone());
        cache.put(USDC, SlotCandidate::new(StorageLayout::Solidity, 9));
        cache.flush().unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48": { "type": "solidity", "slot": 9 }
            })
        );
    }

    #[test]
    fn test_checksummed_keys_are_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("slots.json");
        fs::write(
            &path,
            r#"{ "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48": { "type": "solidity", "slot": 9 } }"#,
        )
        .unwrap();

        let cache = FileCache::load(path);
        assert_eq!(cache.get(USDC), Some(SlotCandidate::new(StorageLayout::Solidity, 9)));
    }

    #[test]
    fn test_flush_to_unwritable_path_fails() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut cache = FileCache::load(blocker.join("slots.json"));
        cache.put(USDC, SlotCandidate::new(StorageLayout::Solidity, 9));

        assert!(cache.flush().is_err());
    }

    #[test]
    fn test_memory_cache() {
        let mut cache = MemoryCache::default();
        assert_eq!(cache.get(USDC), None);

        cache.put(USDC, SlotCandidate::new(StorageLayout::Solidity, 9));
        assert_eq!(cache.get(USDC), Some(SlotCandidate::new(StorageLayout::Solidity, 9)));
        assert!(cache.flush().is_ok());
    }
}
