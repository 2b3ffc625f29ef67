//! Local fallback cache
//!
//! Holds the last known collection per entity kind so a client started with an
//! empty server snapshot still shows something. Records are stored as plain
//! JSON values; [`load_records`] and [`store_records`] convert to and from the
//! typed records.

mod jsonl;
mod memory;

pub use jsonl::JsonlCache;
pub use memory::MemoryCache;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{CacheError, CacheResult};

/// Key/value store of record lists. Last writer wins.
pub trait FallbackCache: Send + Sync {
    /// Records stored under `key`, empty when nothing was stored
    fn get(&self, key: &str) -> CacheResult<Vec<Value>>;

    /// Replace everything stored under `key`
    fn put(&self, key: &str, records: &[Value]) -> CacheResult<()>;

    /// Keys with stored records, sorted
    fn keys(&self) -> CacheResult<Vec<String>>;
}

/// Cache keys are file-name safe: lowercase ascii, digits, `-` and `_`
pub fn validate_key(key: &str) -> CacheResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

/// Load typed records, skipping entries that no longer decode
pub fn load_records<T: DeserializeOwned>(
    cache: &dyn FallbackCache,
    key: &str,
) -> CacheResult<Vec<T>> {
    let values = cache.get(key)?;
    let mut records = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value(value) {
            Ok(record) => records.push(record),
            Err(error) => warn!(key = %key, error = %error, "skipping undecodable cached record"),
        }
    }
    Ok(records)
}

pub fn store_records<T: Serialize>(
    cache: &dyn FallbackCache,
    key: &str,
    records: &[T],
) -> CacheResult<()> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    cache.put(key, &values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Budget;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("budget-requests").is_ok());
        assert!(validate_key("budgets_2024").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc").is_err());
        assert!(validate_key("Budgets").is_err());
    }

    #[test]
    fn test_load_skips_bad_records() {
        let cache = MemoryCache::new();
        cache
            .put(
                "budgets",
                &[
                    serde_json::to_value(Budget::new("b1", "Travel", Decimal::new(1000, 0))).unwrap(),
                    json!({"unexpected": true}),
                ],
            )
            .unwrap();

        let budgets: Vec<Budget> = load_records(&cache, "budgets").unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].id, "b1");
    }

    #[test]
    fn test_store_then_load_typed() {
        let cache = MemoryCache::new();
        let budgets = vec![
            Budget::new("b2", "Hardware", Decimal::new(500, 0)),
            Budget::new("b1", "Travel", Decimal::new(1000, 0)),
        ];
        store_records(&cache, "budgets", &budgets).unwrap();

        let loaded: Vec<Budget> = load_records(&cache, "budgets").unwrap();
        assert_eq!(loaded, budgets);
    }
}
