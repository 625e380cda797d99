//! JSON-file backed completion store
//!
//! The whole map is kept in memory and rewritten on every change. Writes go
//! to a sibling temp file that is then renamed over the real one, so a crash
//! mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use super::CompletionStore;
use crate::error::StoreError;

#[derive(Debug)]
pub struct FileCompletionStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, bool>>,
}

impl FileCompletionStore {
    /// Open the store at `path`, creating an empty one if the file is absent
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };
        info!("Opened completion store {:?} with {} record(s)", path, records.len());

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the next write goes to, `<file name>.tmp`
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist(&self, records: &BTreeMap<String, bool>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        let content = serde_json::to_vec_pretty(records)?;
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!("Persisted {} completion record(s) to {:?}", records.len(), self.path);
        Ok(())
    }
}

impl CompletionStore for FileCompletionStore {
    fn is_complete(&self, public_address: &str) -> bool {
        match self.records.lock() {
            Ok(records) => records.get(public_address).copied().unwrap_or(false),
            Err(_) => {
                warn!("Completion store lock poisoned, treating {} as incomplete", public_address);
                false
            }
        }
    }

    fn mark_complete(&self, public_address: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        if records.get(public_address).copied().unwrap_or(false) {
            return Ok(());
        }

        let mut updated = records.clone();
        updated.insert(public_address.to_string(), true);
        self.persist(&updated)?;
        *records = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("migration").join("completed.json");

        let store = FileCompletionStore::open(&path).unwrap();
        assert!(!store.is_complete("GABC"));
        store.mark_complete("GABC").unwrap();
        assert!(store.is_complete("GABC"));
        drop(store);

        let reopened = FileCompletionStore::open(&path).unwrap();
        assert!(reopened.is_complete("GABC"));
        assert!(!reopened.is_complete("GXYZ"));
    }

    #[test]
    fn test_explicit_false_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed.json");
        fs::write(&path, r#"{"GABC": false}"#).unwrap();

        let store = FileCompletionStore::open(&path).unwrap();
        assert!(!store.is_complete("GABC"));
        store.mark_complete("GABC").unwrap();
        assert!(FileCompletionStore::open(&path).unwrap().is_complete("GABC"));
    }

    #[test]
    fn test_sibling_stores_use_separate_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let json = FileCompletionStore::open(dir.path().join("done.json")).unwrap();
        let toml = FileCompletionStore::open(dir.path().join("done.toml")).unwrap();

        assert_eq!(json.tmp_path(), dir.path().join("done.json.tmp"));
        assert_ne!(json.tmp_path(), toml.tmp_path());

        json.mark_complete("GABC").unwrap();
        toml.mark_complete("GXYZ").unwrap();
        assert!(!json.tmp_path().exists());
        assert!(FileCompletionStore::open(dir.path().join("done.json")).unwrap().is_complete("GABC"));
        assert!(!FileCompletionStore::open(dir.path().join("done.json")).unwrap().is_complete("GXYZ"));
        assert!(FileCompletionStore::open(dir.path().join("done.toml")).unwrap().is_complete("GXYZ"));
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("completed.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(FileCompletionStore::open(&path), Err(StoreError::Codec(_))));
    }
}
