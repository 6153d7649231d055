// Mapper to convert the domain dashboard to its JSON shape
use crate::domain::dashboard::{Dashboard, DeviceCard, SignalView};
use crate::domain::summary::Summary;
use crate::domain::timestamp::{self, Timestamp};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardDto {
    pub current_time: String,
    pub last_updated: Option<String>,
    pub sequence: u64,
    pub loaded: bool,
    pub error: Option<String>,
    pub auto_refresh: bool,
    pub summary: SummaryDto,
    pub power: SignalDto,
    pub wifi: SignalDto,
    pub motor: SignalDto,
    pub devices: Vec<DeviceCardDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryDto {
    pub total: usize,
    pub running: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalDto {
    pub on: bool,
    pub label: &'static str,
    pub since: Option<String>,
    /// Uptime while on, downtime while off.
    pub elapsed: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCardDto {
    pub index: usize,
    pub name: String,
    pub status: &'static str,
    pub empty_at: Option<String>,
    pub full_at: Option<String>,
    pub run_time: Option<String>,
}

pub fn dashboard_to_dto(dashboard: &Dashboard) -> DashboardDto {
    let now = dashboard.generated_at;

    DashboardDto {
        current_time: timestamp::format(Some(&now)),
        last_updated: dashboard.updated_at.as_ref().map(ToString::to_string),
        sequence: dashboard.sequence,
        loaded: dashboard.loaded,
        error: dashboard.error.clone(),
        auto_refresh: dashboard.auto_refresh,
        summary: summary_to_dto(&dashboard.summary),
        power: signal_to_dto(&dashboard.power, &now),
        wifi: signal_to_dto(&dashboard.wifi, &now),
        motor: signal_to_dto(&dashboard.motor, &now),
        devices: dashboard.devices.iter().map(card_to_dto).collect(),
    }
}

fn summary_to_dto(summary: &Summary) -> SummaryDto {
    SummaryDto {
        total: summary.total,
        running: summary.running,
        errors: summary.errors,
    }
}

fn signal_to_dto(signal: &SignalView, now: &Timestamp) -> SignalDto {
    SignalDto {
        on: signal.on,
        label: if signal.on { "ON" } else { "OFF" },
        since: signal.since.as_ref().map(ToString::to_string),
        elapsed: timestamp::duration_since(signal.since.as_ref(), &now.at()),
    }
}

fn card_to_dto(card: &DeviceCard) -> DeviceCardDto {
    DeviceCardDto {
        index: card.index,
        name: card.name.clone(),
        status: card.status.code.label(),
        empty_at: card.status.empty_at.as_ref().map(ToString::to_string),
        full_at: card.status.full_at.as_ref().map(ToString::to_string),
        run_time: card.status.run_time(),
    }
}
