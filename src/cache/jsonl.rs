//! File-backed cache: one `<key>.jsonl` file per key, one record per line

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::{validate_key, FallbackCache};
use crate::error::CacheResult;
use crate::utils::{atomic_write_with, cleanup_temp_files};

const EXTENSION: &str = "jsonl";

pub struct JsonlCache {
    dir: PathBuf,
}

impl JsonlCache {
    /// Open (and create if needed) a cache rooted at `dir`.
    /// Leftovers of interrupted writes are removed.
    pub fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let cleaned = cleanup_temp_files(&dir)?;
        if cleaned > 0 {
            debug!(dir = %dir.display(), cleaned, "removed stale cache temp files");
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{EXTENSION}"))
    }
}

impl FallbackCache for JsonlCache {
    fn get(&self, key: &str) -> CacheResult<Vec<Value>> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)?;
        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(value) => records.push(value),
                Err(error) => {
                    warn!(key = %key, line = index + 1, error = %error, "skipping corrupt cache line")
                }
            }
        }
        Ok(records)
    }

    fn put(&self, key: &str, records: &[Value]) -> CacheResult<()> {
        validate_key(key)?;

        let mut lines = Vec::with_capacity(records.len());
        for record in records {
            lines.push(serde_json::to_string(record)?);
        }

        atomic_write_with(self.path_for(key), |w| {
            for line in &lines {
                writeln!(w, "{line}")?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == EXTENSION).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
