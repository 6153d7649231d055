// HTTP snapshot source - reads and patches the upstream JSON document
use crate::application::snapshot_source::{FetchError, SnapshotSource, WriteBack};
use crate::domain::device::DeviceRecord;
use crate::domain::signal::Signal;
use crate::domain::snapshot::RawSnapshot;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Upper bound on slot indices accepted from an object-shaped device list.
const MAX_DEVICE_SLOTS: usize = 1024;

#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct SnapshotPayload {
    #[serde(default)]
    sdevice: Value,
    #[serde(default)]
    power: Option<Value>,
    #[serde(default)]
    wificonnect: Option<Value>,
    #[serde(default)]
    motor_st: Option<Value>,
}

impl HttpSnapshotSource {
    pub fn new(url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<RawSnapshot, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        parse_payload(&body)
    }

    async fn write_back(&self, request: WriteBack) -> Result<(), FetchError> {
        tracing::info!("Writing back {}={}", request.field(), request.value());

        let response = self
            .client
            .patch(&self.url)
            .json(&write_back_body(request))
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Decode the upstream document. A `null` body means nothing has been written yet.
pub fn parse_payload(body: &str) -> Result<RawSnapshot, FetchError> {
    let payload: Option<SnapshotPayload> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let Some(payload) = payload else {
        return Ok(RawSnapshot::default());
    };

    let devices = device_list(payload.sdevice)?
        .iter()
        .map(DeviceRecord::from_json)
        .collect();

    Ok(RawSnapshot {
        devices,
        power: flag(payload.power).unwrap_or_else(|| Signal::Power.off_value().to_string()),
        wifi: flag(payload.wificonnect).unwrap_or_else(|| Signal::Wifi.off_value().to_string()),
        motor: flag(payload.motor_st),
    })
}

/// Slot list in position order. Sparse lists may arrive as objects keyed by
/// index; missing slots are kept as nulls so positions stay stable.
fn device_list(value: Value) -> Result<Vec<Value>, FetchError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(map) => {
            let indexed: Vec<(usize, Value)> = map
                .into_iter()
                .filter_map(|(key, value)| key.parse::<usize>().ok().map(|i| (i, value)))
                .filter(|(index, _)| *index < MAX_DEVICE_SLOTS)
                .collect();
            let len = indexed.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
            let mut slots = vec![Value::Null; len];
            for (index, value) in indexed {
                slots[index] = value;
            }
            Ok(slots)
        }
        other => Err(FetchError::Decode(format!(
            "sdevice is neither a list nor an object: {}",
            other
        ))),
    }
}

fn flag(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
        _ => None,
    }
}

pub fn write_back_body(request: WriteBack) -> Value {
    let mut body = Map::new();
    body.insert(
        request.field().to_string(),
        Value::String(request.value().to_string()),
    );
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::StatusCode;
    use serde_json::json;

    #[test]
    fn test_parse_payload() {
        let body = r#"{
            "sdevice": [
                {"etime": "0000", "ftime": "0715", "s1": "0"},
                {"etime": "0830", "ftime": "0000", "s2": "1"},
                {"etime": "0000", "ftime": "0000", "s3": "7"}
            ],
            "power": "1",
            "wificonnect": "0",
            "motor_st": "R"
        }"#;

        let raw = parse_payload(body).unwrap();
        assert_eq!(raw.devices.len(), 3);
        assert_eq!(raw.devices[1].status_code(), StatusCode::Empty);
        assert_eq!(raw.devices[2].status_code(), StatusCode::Error);
        assert_eq!(raw.power, "1");
        assert_eq!(raw.wifi, "0");
        assert_eq!(raw.motor.as_deref(), Some("R"));
    }

    #[test]
    fn test_parse_payload_defaults_and_null_body() {
        assert_eq!(parse_payload("null").unwrap(), RawSnapshot::default());

        let raw = parse_payload(r#"{"power": 1}"#).unwrap();
        assert!(raw.devices.is_empty());
        assert_eq!(raw.power, "1");
        assert_eq!(raw.wifi, "0");
        assert_eq!(raw.motor, None);
    }

    #[test]
    fn test_parse_payload_sparse_device_object() {
        let raw = parse_payload(r#"{"sdevice": {"0": {"a": "0"}, "2": {"c": "1"}}}"#).unwrap();
        assert_eq!(raw.devices.len(), 3);
        assert_eq!(raw.devices[0].status_code(), StatusCode::Full);
        assert_eq!(raw.devices[1].status_code(), StatusCode::Error);
        assert_eq!(raw.devices[2].status_code(), StatusCode::Empty);
    }

    #[test]
    fn test_parse_payload_rejects_malformed_body() {
        assert!(matches!(parse_payload("<html>"), Err(FetchError::Decode(_))));
        assert!(matches!(
            parse_payload(r#"{"sdevice": "broken"}"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_write_back_body_has_one_field() {
        assert_eq!(write_back_body(WriteBack::PowerOff), json!({ "power": "0" }));
        assert_eq!(write_back_body(WriteBack::WifiOff), json!({ "wificonnect": "0" }));
    }
}
