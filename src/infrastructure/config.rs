use crate::application::monitor_service::MonitorSettings;
use crate::domain::timestamp::TimestampEncoding;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub source: SourceSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub revert: RevertSettings,
    #[serde(default)]
    pub state: StateSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub devices: DeviceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    pub url: String,
    pub auth_token: Option<String>,
    #[serde(default = "default_encoding")]
    pub timestamp_encoding: TimestampEncoding,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingSettings {
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
            auto_refresh: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RevertSettings {
    pub power_timeout_secs: u64,
    pub wifi_timeout_secs: u64,
    pub check_interval_secs: u64,
}

impl Default for RevertSettings {
    fn default() -> Self {
        Self {
            power_timeout_secs: 300,
            wifi_timeout_secs: 300,
            check_interval_secs: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StateSettings {
    pub path: String,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            path: "state/signals.toml".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DeviceSettings {
    /// Friendly names by slot position.
    pub names: Vec<String>,
}

fn default_encoding() -> TimestampEncoding {
    TimestampEncoding::Clock
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl MonitorConfig {
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            encoding: self.source.timestamp_encoding,
            device_names: self.devices.names.clone(),
            refresh_interval: Duration::from_secs(self.polling.refresh_interval_secs.max(1)),
            power_timeout: Duration::from_secs(self.revert.power_timeout_secs),
            wifi_timeout: Duration::from_secs(self.revert.wifi_timeout_secs),
            check_interval: Duration::from_secs(self.revert.check_interval_secs.max(1)),
        }
    }

    pub fn source_url(&self) -> String {
        prepare_url(&self.source.url, self.source.auth_token.as_deref())
    }
}

pub fn load_monitor_config() -> anyhow::Result<MonitorConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor"))
        .add_source(
            config::Environment::with_prefix("TANK_MONITOR")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Append the database auth token as a query parameter.
pub fn prepare_url(url: &str, auth_token: Option<&str>) -> String {
    match auth_token.filter(|t| !t.is_empty()) {
        Some(token) => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}auth={}", url, separator, urlencoding::encode(token))
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> MonitorConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_prepare_url() {
        let url = "https://tanks.example.com/uid/motor.json";
        assert_eq!(prepare_url(url, None), url);
        assert_eq!(prepare_url(url, Some("")), url);
        assert_eq!(
            prepare_url(url, Some("a b/c")),
            "https://tanks.example.com/uid/motor.json?auth=a%20b%2Fc"
        );
        assert_eq!(
            prepare_url("https://x/y.json?print=silent", Some("t")),
            "https://x/y.json?print=silent&auth=t"
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [source]
            url = "https://tanks.example.com/uid/motor.json"
            "#,
        );

        assert_eq!(config.source.timestamp_encoding, TimestampEncoding::Clock);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert!(!config.polling.auto_refresh);

        let settings = config.monitor_settings();
        assert_eq!(settings.refresh_interval, Duration::from_secs(5));
        assert_eq!(settings.power_timeout, Duration::from_secs(300));
        assert_eq!(settings.wifi_timeout, Duration::from_secs(300));
        assert!(settings.device_names.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [source]
            url = "https://tanks.example.com/uid/motor.json"
            auth_token = "secret"
            timestamp_encoding = "instant"

            [polling]
            refresh_interval_secs = 10
            auto_refresh = true

            [revert]
            power_timeout_secs = 60

            [devices]
            names = ["Canteen", "Office"]
            "#,
        );

        assert_eq!(config.source.timestamp_encoding, TimestampEncoding::Instant);
        assert_eq!(
            config.source_url(),
            "https://tanks.example.com/uid/motor.json?auth=secret"
        );

        let settings = config.monitor_settings();
        assert_eq!(settings.refresh_interval, Duration::from_secs(10));
        assert_eq!(settings.power_timeout, Duration::from_secs(60));
        assert_eq!(settings.wifi_timeout, Duration::from_secs(300));
        assert_eq!(settings.device_names, vec!["Canteen", "Office"]);
    }
}
