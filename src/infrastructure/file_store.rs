// TOML file backed key/value state
use crate::application::state_store::{StateStore, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStateStore {
    /// Open the state file. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => parse_state(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed to read state file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        tracing::debug!("Loaded {} state entries from {}", values.len(), path.display());

        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let contents =
            toml::to_string(values).map_err(|e| StoreError::Encoding(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // replace in one step so a crash never leaves a truncated file
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Non-string values are dropped so they read as unset.
fn parse_state(contents: &str) -> Result<BTreeMap<String, String>, toml::de::Error> {
    let table: toml::Table = toml::from_str(contents)?;
    Ok(table
        .into_iter()
        .filter_map(|(key, value)| value.as_str().map(|v| (key, v.to_string())))
        .collect())
}

impl StateStore for FileStateStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn save(&self, entries: &[(String, String)]) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Encoding("state lock poisoned".to_string()))?;
        for (key, value) in entries {
            values.insert(key.clone(), value.clone());
        }
        self.write(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path().join("signals.toml"));
        assert_eq!(store.load("power.last_value"), None);
    }

    #[test]
    fn test_save_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("signals.toml");

        let store = FileStateStore::open(&path);
        store
            .save(&[
                ("motor.last_value".to_string(), "R".to_string()),
                (
                    "motor.on_since".to_string(),
                    "2025-05-06T08:00:00+00:00".to_string(),
                ),
            ])
            .unwrap();
        store
            .save(&[("power.last_value".to_string(), "0".to_string())])
            .unwrap();

        let reopened = FileStateStore::open(&path);
        assert_eq!(reopened.load("motor.last_value").as_deref(), Some("R"));
        assert_eq!(
            reopened.load("motor.on_since").as_deref(),
            Some("2025-05-06T08:00:00+00:00")
        );
        assert_eq!(reopened.load("power.last_value").as_deref(), Some("0"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_invalid_contents_read_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.toml");

        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(FileStateStore::open(&path).load("power.last_value"), None);

        fs::write(&path, "\"power.last_value\" = 1\n\"motor.last_value\" = \"S\"\n").unwrap();
        let store = FileStateStore::open(&path);
        assert_eq!(store.load("power.last_value"), None);
        assert_eq!(store.load("motor.last_value").as_deref(), Some("S"));
    }
}
