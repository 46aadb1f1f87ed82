//! Progression persistence
//!
//! The session talks to a small store trait; the file-backed store keeps
//! progression as JSON, the null store backs ephemeral runs and tests.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::progression::ProgressionData;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to access {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("progression data at {path} is corrupt")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait ProgressionStore {
    fn load(&self) -> Result<ProgressionData, PersistError>;
    fn save(&self, data: &ProgressionData) -> Result<(), PersistError>;
}

/// JSON file store. A missing file loads as fresh data; loaded data is
/// normalized before use.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

impl ProgressionStore for JsonFileStore {
    fn load(&self) -> Result<ProgressionData, PersistError> {
        if !self.path.exists() {
            return Ok(ProgressionData::default());
        }
        let text = fs::read_to_string(&self.path).map_err(|source| PersistError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let mut data: ProgressionData =
            serde_json::from_str(&text).map_err(|source| PersistError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })?;
        data.normalize();
        Ok(data)
    }

    fn save(&self, data: &ProgressionData) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(data).map_err(|source| PersistError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|source| PersistError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}

/// Store that remembers nothing.
pub struct NullStore;

impl ProgressionStore for NullStore {
    fn load(&self) -> Result<ProgressionData, PersistError> {
        Ok(ProgressionData::default())
    }

    fn save(&self, _data: &ProgressionData) -> Result<(), PersistError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeKey;

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("progress.json"));
        let mut data = ProgressionData {
            total_earned: 12,
            ..Default::default()
        };
        data.allocate(1, AttributeKey::Attack).unwrap();
        store.save(&data).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.total_earned, 12);
        assert_eq!(loaded.points_in(1, AttributeKey::Attack), 1);
    }

    #[test]
    fn missing_file_loads_fresh_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope.json"));
        let data = store.load().unwrap();
        assert_eq!(data.total_earned, 0);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(store.load(), Err(PersistError::Corrupt { .. })));
    }

    #[test]
    fn loaded_data_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(
            &path,
            r#"{"total_earned": 9999, "allocated": {"1": {"attack": 40}}}"#,
        )
        .unwrap();
        let store = JsonFileStore::new(path);
        let data = store.load().unwrap();
        assert_eq!(data.total_earned, 300);
        assert_eq!(data.points_in(1, AttributeKey::Attack), 10);
    }
}
