// Dashboard domain model
use super::device::{DeviceStatus, device_name};
use super::signal::{Signal, SignalState};
use super::snapshot::Snapshot;
use super::summary::Summary;
use super::timestamp::Timestamp;
use chrono::{DateTime, FixedOffset};

#[derive(Debug, Clone)]
pub struct DeviceCard {
    pub index: usize,
    pub name: String,
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalView {
    pub on: bool,
    pub since: Option<Timestamp>,
}

impl SignalView {
    pub fn tracked(signal: Signal, state: &SignalState) -> Self {
        Self {
            on: state.value().is_some_and(|v| signal.is_on(v)),
            since: state.since().map(Timestamp::instant),
        }
    }

    pub fn untracked(on: bool) -> Self {
        Self { on, since: None }
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub generated_at: Timestamp,
    /// When the applied snapshot was fetched.
    pub updated_at: Option<Timestamp>,
    /// Sequence number of the applied fetch, 0 before the first one.
    pub sequence: u64,
    pub loaded: bool,
    pub error: Option<String>,
    pub auto_refresh: bool,
    pub summary: Summary,
    pub devices: Vec<DeviceCard>,
    pub power: SignalView,
    pub wifi: SignalView,
    pub motor: SignalView,
}

impl Dashboard {
    pub fn new(
        now: DateTime<FixedOffset>,
        snapshot: Option<&Snapshot>,
        names: &[String],
        power: &SignalState,
        motor: &SignalState,
        error: Option<String>,
        auto_refresh: bool,
    ) -> Self {
        let devices = snapshot
            .map(|s| {
                s.devices
                    .iter()
                    .enumerate()
                    .map(|(index, status)| DeviceCard {
                        index,
                        name: device_name(names, index),
                        status: status.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            generated_at: Timestamp::instant(now),
            updated_at: snapshot.map(|s| Timestamp::instant(s.fetched_at)),
            sequence: snapshot.map(|s| s.sequence).unwrap_or(0),
            loaded: snapshot.is_some(),
            error,
            auto_refresh,
            summary: snapshot.map(Snapshot::summary).unwrap_or_default(),
            devices,
            power: SignalView::tracked(Signal::Power, power),
            wifi: SignalView::untracked(snapshot.is_some_and(Snapshot::wifi_on)),
            motor: SignalView::tracked(Signal::Motor, motor),
        }
    }
}
