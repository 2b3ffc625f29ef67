//! Atomic file writes
//!
//! Content goes to a sibling `.tmp` file, is synced, then renamed over the
//! destination. Readers see either the old file or the new one.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Atomically replace `path` with whatever `write_fn` writes
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let written = File::create(&temp_path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        write_fn(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    });

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written
}

/// Remove `.tmp` leftovers of interrupted writes. Returns how many were removed.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    if !dir.exists() {
        return Ok(0);
    }

    let mut cleaned = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("budgets.jsonl");

        atomic_write_with(&path, |w| {
            writeln!(w, "{{\"id\":\"b1\"}}")?;
            writeln!(w, "{{\"id\":\"b2\"}}")
        })
        .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"id\":\"b1\"}\n{\"id\":\"b2\"}\n"
        );
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_failed_write_keeps_previous_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invoices.jsonl");
        fs::write(&path, "old\n").unwrap();

        let result = atomic_write_with(&path, |w| {
            writeln!(w, "partial")?;
            Err(io::Error::new(io::ErrorKind::Other, "boom"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_cleanup_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("budgets.tmp"), "x").unwrap();
        fs::write(temp_dir.path().join("budgets.jsonl"), "x").unwrap();

        assert_eq!(cleanup_temp_files(temp_dir.path()).unwrap(), 1);
        assert!(temp_dir.path().join("budgets.jsonl").exists());
        assert_eq!(cleanup_temp_files(temp_dir.path().join("missing")).unwrap(), 0);
    }
}
