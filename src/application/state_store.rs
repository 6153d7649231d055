// Persisted key/value state that outlives a single run
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file encoding: {0}")]
    Encoding(String),
}

pub trait StateStore: Send + Sync {
    /// Read failures surface as `None`.
    fn load(&self, key: &str) -> Option<String>;

    /// Write all entries as one update.
    fn save(&self, entries: &[(String, String)]) -> Result<(), StoreError>;
}
