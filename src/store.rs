//! Persisted build state: user preferences and the last build failure.
//!
//! A single JSON document under the build directory holds two things: a
//! preferences map (at most one value per key) and an optional failure
//! record. The store is read-modify-written sequentially
//! by one workflow run; every mutation saves immediately so a crash never
//! leaves an in-memory-only record.

use crate::error::StoreError;
use crate::models::BuildFailureRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    preferences: BTreeMap<String, String>,
    #[serde(default)]
    failure: Option<BuildFailureRecord>,
}

/// File-backed state store. Opened at startup, mutated in place, no locking
/// (single sequential writer).
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: StoreState,
}

impl StateStore {
    /// Open the store, creating an empty one when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(StoreError::IoError(e)),
        };
        Ok(StateStore { path, state })
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Look up a stored preference.
    pub fn preference(&self, key: &str) -> Option<&str> {
        self.state.preferences.get(key).map(String::as_str)
    }

    /// Idempotent get-or-prompt-and-store: returns the stored answer when
    /// present, otherwise obtains one from `ask`, normalizes it to
    /// uppercase, persists it and returns it. The prompt runs at most once
    /// per key for the lifetime of the store file.
    pub fn get_or_insert_preference<F>(&mut self, key: &str, ask: F) -> crate::error::Result<String>
    where
        F: FnOnce() -> crate::error::Result<String>,
    {
        if let Some(existing) = self.state.preferences.get(key) {
            return Ok(existing.clone());
        }
        let answer = ask()?.trim().to_uppercase();
        self.state
            .preferences
            .insert(key.to_string(), answer.clone());
        self.save()?;
        Ok(answer)
    }

    /// Peek at the recorded failure without consuming it.
    pub fn failure(&self) -> Option<&BuildFailureRecord> {
        self.state.failure.as_ref()
    }

    /// Persist a failure record for the next run.
    pub fn record_failure(&mut self, record: BuildFailureRecord) -> Result<(), StoreError> {
        self.state.failure = Some(record);
        self.save()
    }

    /// Remove and return the recorded failure. The deletion is persisted
    /// before the record is handed back, so a consumed record is never
    /// offered twice.
    pub fn take_failure(&mut self) -> Result<Option<BuildFailureRecord>, StoreError> {
        let record = self.state.failure.take();
        if record.is_some() {
            self.save()?;
        }
        Ok(record)
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureReason;
    use tempfile::TempDir;

    fn record() -> BuildFailureRecord {
        BuildFailureRecord {
            reason: FailureReason::CompileError,
            file_name: "  CC  drivers/video/msm/mdss.o".to_string(),
            kernel_version: "-Neutron-r3".to_string(),
            timestamp: "Tue 04 Aug 09:10".to_string(),
        }
    }

    #[test]
    fn test_open_missing_file_yields_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::open(temp.path().join("state.json")).unwrap();
        assert!(store.failure().is_none());
        assert!(store.preference("ToolchainVariant").is_none());
    }

    #[test]
    fn test_preference_prompts_only_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        let mut store = StateStore::open(&path).unwrap();

        let first = store
            .get_or_insert_preference("ToolchainVariant", || Ok("y".to_string()))
            .unwrap();
        assert_eq!(first, "Y");

        // Second call must reuse the stored answer without invoking the prompt.
        let second = store
            .get_or_insert_preference("ToolchainVariant", || {
                panic!("prompt must not run for a stored key")
            })
            .unwrap();
        assert_eq!(second, "Y");
    }

    #[test]
    fn test_preference_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        {
            let mut store = StateStore::open(&path).unwrap();
            store
                .get_or_insert_preference("ToolchainVariant", || Ok("n".to_string()))
                .unwrap();
        }
        let mut reopened = StateStore::open(&path).unwrap();
        let answer = reopened
            .get_or_insert_preference("ToolchainVariant", || {
                panic!("prompt must not run on a second run against the same store")
            })
            .unwrap();
        assert_eq!(answer, "N");
    }

    #[test]
    fn test_failure_record_cleared_on_consumption() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        {
            let mut store = StateStore::open(&path).unwrap();
            store.record_failure(record()).unwrap();
        }

        let mut reopened = StateStore::open(&path).unwrap();
        let taken = reopened.take_failure().unwrap();
        assert_eq!(taken, Some(record()));
        assert!(reopened.failure().is_none());

        // The deletion must already be on disk, not just in memory.
        let again = StateStore::open(&path).unwrap();
        assert!(again.failure().is_none());
    }

    #[test]
    fn test_take_failure_on_empty_store_is_none() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::open(temp.path().join("state.json")).unwrap();
        assert_eq!(store.take_failure().unwrap(), None);
    }
}
