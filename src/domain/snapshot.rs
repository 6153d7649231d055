// Snapshot aggregate - one applied poll of the upstream document
use super::device::{DeviceRecord, DeviceStatus, normalize};
use super::signal::Signal;
use super::summary::{Summary, summarize};
use super::timestamp::TimestampEncoding;
use chrono::{DateTime, FixedOffset};

/// Upstream document after boundary validation, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSnapshot {
    pub devices: Vec<DeviceRecord>,
    pub power: String,
    pub wifi: String,
    /// Absent when the controller did not report a motor state.
    pub motor: Option<String>,
}

impl Default for RawSnapshot {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            power: Signal::Power.off_value().to_string(),
            wifi: Signal::Wifi.off_value().to_string(),
            motor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub sequence: u64,
    pub fetched_at: DateTime<FixedOffset>,
    pub devices: Vec<DeviceStatus>,
    pub power: String,
    pub wifi: String,
    pub motor: Option<String>,
}

impl Snapshot {
    pub fn build(
        raw: RawSnapshot,
        sequence: u64,
        encoding: TimestampEncoding,
        fetched_at: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            sequence,
            fetched_at,
            devices: normalize(&raw.devices, encoding, &fetched_at),
            power: raw.power,
            wifi: raw.wifi,
            motor: raw.motor,
        }
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.devices)
    }

    pub fn power_on(&self) -> bool {
        Signal::Power.is_on(&self.power)
    }

    pub fn wifi_on(&self) -> bool {
        Signal::Wifi.is_on(&self.wifi)
    }

    pub fn motor_running(&self) -> bool {
        self.motor.as_deref().is_some_and(|m| Signal::Motor.is_on(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::StatusCode;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_build_normalizes_devices_and_flags() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 6, 9, 0, 0)
            .unwrap();
        let raw = RawSnapshot {
            devices: vec![
                DeviceRecord::from_json(&json!({ "a": "0", "ftime": "0800", "etime": "0000" })),
                DeviceRecord::from_json(&json!({ "b": "1", "ftime": "0000", "etime": "0830" })),
            ],
            power: "1".to_string(),
            wifi: "0".to_string(),
            motor: Some("R".to_string()),
        };

        let snapshot = Snapshot::build(raw, 7, TimestampEncoding::Clock, now);
        assert_eq!(snapshot.sequence, 7);
        assert_eq!(snapshot.devices[0].code, StatusCode::Full);
        assert_eq!(snapshot.devices[1].code, StatusCode::Empty);
        assert!(snapshot.power_on());
        assert!(!snapshot.wifi_on());
        assert!(snapshot.motor_running());
        assert_eq!(snapshot.summary().running, 1);
    }

    #[test]
    fn test_default_raw_snapshot_is_all_off() {
        let raw = RawSnapshot::default();
        assert_eq!(raw.power, "0");
        assert_eq!(raw.wifi, "0");
        assert!(raw.motor.is_none());
    }
}
