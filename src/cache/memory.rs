use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::{validate_key, FallbackCache};
use crate::error::CacheResult;

/// In-process cache, lost when the process exits
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FallbackCache for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Vec<Value>> {
        validate_key(key)?;
        Ok(self.entries.read().get(key).cloned().unwrap_or_default())
    }

    fn put(&self, key: &str, records: &[Value]) -> CacheResult<()> {
        validate_key(key)?;
        self.entries.write().insert(key.to_string(), records.to_vec());
        Ok(())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
