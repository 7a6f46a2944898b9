//! JSON snapshot files.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use relink_core::traits::RepoResult;
use relink_core::{Record, RepositoryError};

/// Every table of a store: `{ "<model>": [records...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    tables: BTreeMap<String, Vec<Record>>,
}

impl Snapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables by name.
    pub fn tables(&self) -> &BTreeMap<String, Vec<Record>> {
        &self.tables
    }

    /// Records of one table; empty if absent.
    pub fn table(&self, name: &str) -> &[Record] {
        self.tables.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a table.
    pub fn insert(&mut self, name: impl Into<String>, records: Vec<Record>) {
        self.tables.insert(name.into(), records);
    }

    /// Read a snapshot file under a shared lock.
    #[instrument]
    pub fn load(path: &Path) -> RepoResult<Self> {
        let lock = open_lock(path)?;
        lock.lock_shared()?;

        let content = fs::read_to_string(path);
        lock.unlock()?;

        let snapshot: Self = serde_json::from_str(&content?).map_err(|e| RepositoryError::Backend {
            message: format!("invalid snapshot {}: {}", path.display(), e),
        })?;

        debug!(tables = snapshot.tables.len(), "Loaded snapshot");

        Ok(snapshot)
    }

    /// Write a snapshot file under an exclusive lock.
    ///
    /// The content goes to a temporary file first and is renamed into
    /// place, so readers never see a partial snapshot.
    #[instrument(skip(self))]
    pub fn save(&self, path: &Path) -> RepoResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| RepositoryError::Backend {
            message: e.to_string(),
        })?;

        let lock = open_lock(path)?;
        lock.lock_exclusive()?;

        let temp_path = path.with_extension("tmp");
        let written = fs::write(&temp_path, &content).and_then(|_| fs::rename(&temp_path, path));
        lock.unlock()?;
        written?;

        debug!(tables = self.tables.len(), "Saved snapshot");

        Ok(())
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn open_lock(path: &Path) -> RepoResult<fs::File> {
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path(path))?;
    Ok(lock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "post",
            vec![Record::from_value(json!({"id": 1, "title": "t"})).unwrap()],
        );
        snapshot.save(&path).unwrap();

        assert!(dir.path().join("data.json.lock").exists());
        assert!(!dir.path().join("data.tmp").exists());

        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.table("post").len(), 1);
        assert!(loaded.table("person").is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = Snapshot::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RepositoryError::Io(_)));
    }

    #[test]
    fn malformed_file_is_backend_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            Snapshot::load(&path),
            Err(RepositoryError::Backend { .. })
        ));
    }
}
