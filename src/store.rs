//! Small persisted key-value store: one JSON object of string values on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    /// Set `key`, rewriting the whole file. Parent directories are created.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());

        let write_err = |source| Error::StoreWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(&entries).map_err(|err| {
            Error::StoreMalformed {
                path: self.path.clone(),
                details: err.to_string(),
            }
        })?;
        fs_err::write(&self.path, content).map_err(write_err)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs_err::read_to_string(&self.path).map_err(|source| Error::StoreRead {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|err| Error::StoreMalformed {
            path: self.path.clone(),
            details: err.to_string(),
        })
    }
}
