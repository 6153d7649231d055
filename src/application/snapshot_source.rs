// Source trait for the upstream controller document
use crate::domain::signal::Signal;
use crate::domain::snapshot::RawSnapshot;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("malformed snapshot body: {0}")]
    Decode(String),
}

/// Single-field correction sent upstream after a fail-safe revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBack {
    PowerOff,
    WifiOff,
}

impl WriteBack {
    pub fn signal(&self) -> Signal {
        match self {
            WriteBack::PowerOff => Signal::Power,
            WriteBack::WifiOff => Signal::Wifi,
        }
    }

    /// Top-level field of the upstream document this request changes.
    pub fn field(&self) -> &'static str {
        match self {
            WriteBack::PowerOff => "power",
            WriteBack::WifiOff => "wificonnect",
        }
    }

    pub fn value(&self) -> &'static str {
        self.signal().off_value()
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current upstream document.
    async fn fetch(&self) -> Result<RawSnapshot, FetchError>;

    /// Patch exactly one field of the upstream document.
    async fn write_back(&self, request: WriteBack) -> Result<(), FetchError>;
}
