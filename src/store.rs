//! Persistent key-value state shared by the checker, `status` and the
//! download command.
//!
//! The whole store is one JSON object on disk. Writes merge the given keys
//! into the current object and replace the file by renaming a uniquely named
//! temp file over it, so concurrent writers resolve as last-write-wins and
//! readers never see a half-written file.

use crate::error::StoreError;
use crate::model::UpdateState;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const LAST_UPDATE_CHECK: &str = "lastUpdateCheck";
pub const REMOTE_VERSION: &str = "remoteVersion";
pub const HAS_UPDATE: &str = "hasUpdate";
pub const CHANGELOG: &str = "changelog";
pub const UPDATE_DISMISSED: &str = "updateDismissed";
pub const DISMISSED_VERSION: &str = "dismissedVersion";
pub const DOWNLOAD_CONCURRENCY: &str = "downloadConcurrency";

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("at-toolkit")
            .join("state.json")
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.read_all()?.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub fn set<'a, I>(&self, entries: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut all = self.read_all()?;
        for (key, value) in entries {
            all.insert(key.to_string(), value);
        }
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&serde_json::to_vec_pretty(&all)?)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        tracing::debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    pub fn update_state(&self) -> Result<UpdateState, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.read_all()?))?)
    }
}
