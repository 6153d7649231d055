// Device snapshot normalizer - raw sensor records to stable per-device statuses
use super::timestamp::{Timestamp, TimestampEncoding, duration_between};
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

pub const FULL_TIME_KEY: &str = "ftime";
pub const EMPTY_TIME_KEY: &str = "etime";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Full,
    /// Tank drained, i.e. the slot is in use.
    Empty,
    Error,
}

impl StatusCode {
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(0) => StatusCode::Full,
            Ok(1) => StatusCode::Empty,
            _ => StatusCode::Error,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusCode::Full => "FULL",
            StatusCode::Empty => "EMPTY",
            StatusCode::Error => "ERROR",
        }
    }
}

/// One entry of the upstream `sdevice` list, validated at the boundary.
///
/// The status key carries no stable name across firmware versions, so it is
/// the single key left once the two timestamp keys are excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRecord {
    Reading {
        #[allow(dead_code)]
        status_key: String,
        status_raw: String,
        full_raw: Option<String>,
        empty_raw: Option<String>,
    },
    /// Not an object, no status key, several candidate keys, or a non-scalar status.
    Malformed {
        full_raw: Option<String>,
        empty_raw: Option<String>,
    },
}

impl DeviceRecord {
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return DeviceRecord::Malformed {
                full_raw: None,
                empty_raw: None,
            };
        };

        let full_raw = object.get(FULL_TIME_KEY).and_then(scalar_string);
        let empty_raw = object.get(EMPTY_TIME_KEY).and_then(scalar_string);

        let mut candidates = object
            .iter()
            .filter(|(key, _)| key.as_str() != FULL_TIME_KEY && key.as_str() != EMPTY_TIME_KEY);

        match (candidates.next(), candidates.next()) {
            (Some((key, value)), None) => match scalar_string(value) {
                Some(status_raw) => DeviceRecord::Reading {
                    status_key: key.clone(),
                    status_raw,
                    full_raw,
                    empty_raw,
                },
                None => DeviceRecord::Malformed { full_raw, empty_raw },
            },
            _ => DeviceRecord::Malformed { full_raw, empty_raw },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceRecord::Reading { status_raw, .. } => StatusCode::from_raw(status_raw),
            DeviceRecord::Malformed { .. } => StatusCode::Error,
        }
    }

    pub fn full_raw(&self) -> Option<&str> {
        match self {
            DeviceRecord::Reading { full_raw, .. } | DeviceRecord::Malformed { full_raw, .. } => {
                full_raw.as_deref()
            }
        }
    }

    pub fn empty_raw(&self) -> Option<&str> {
        match self {
            DeviceRecord::Reading { empty_raw, .. } | DeviceRecord::Malformed { empty_raw, .. } => {
                empty_raw.as_deref()
            }
        }
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    pub code: StatusCode,
    pub empty_at: Option<Timestamp>,
    pub full_at: Option<Timestamp>,
}

impl DeviceStatus {
    pub fn from_record(
        record: &DeviceRecord,
        encoding: TimestampEncoding,
        anchor: &DateTime<FixedOffset>,
    ) -> Self {
        Self {
            code: record.status_code(),
            empty_at: encoding.parse(record.empty_raw(), anchor),
            full_at: encoding.parse(record.full_raw(), anchor),
        }
    }

    /// Time the tank took to drain, from the last full reading to the last empty one.
    pub fn run_time(&self) -> Option<String> {
        duration_between(self.full_at.as_ref()?, self.empty_at.as_ref()?)
    }
}

pub fn normalize(
    records: &[DeviceRecord],
    encoding: TimestampEncoding,
    anchor: &DateTime<FixedOffset>,
) -> Vec<DeviceStatus> {
    records
        .iter()
        .map(|record| DeviceStatus::from_record(record, encoding, anchor))
        .collect()
}

/// Friendly name for a device slot; slots are identified by position.
pub fn device_name(names: &[String], index: usize) -> String {
    names
        .get(index)
        .cloned()
        .unwrap_or_else(|| format!("Device {}", index + 1))
}
