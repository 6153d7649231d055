// Monitor service - Poll orchestration, signal transitions and fail-safe reverts
use crate::application::clock::Clock;
use crate::application::signal_tracker::SignalTracker;
use crate::application::snapshot_source::{FetchError, SnapshotSource, WriteBack};
use crate::application::state_store::StateStore;
use crate::domain::dashboard::Dashboard;
use crate::domain::signal::{RevertTimer, Signal};
use crate::domain::snapshot::{RawSnapshot, Snapshot};
use crate::domain::timestamp::TimestampEncoding;
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::MissedTickBehavior;

const UPDATE_CHANNEL_SIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub encoding: TimestampEncoding,
    pub device_names: Vec<String>,
    pub refresh_interval: Duration,
    pub power_timeout: Duration,
    pub wifi_timeout: Duration,
    pub check_interval: Duration,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Failed to load data: {0}")]
    FetchFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied(u64),
    /// A newer fetch was already applied; this completion was dropped.
    Stale(u64),
}

struct MonitorState {
    applied: u64,
    snapshot: Option<Snapshot>,
    error: Option<MonitorError>,
    power: SignalTracker,
    motor: SignalTracker,
    power_revert: RevertTimer,
    wifi_revert: RevertTimer,
}

pub struct MonitorService {
    source: Arc<dyn SnapshotSource>,
    clock: Arc<dyn Clock>,
    settings: MonitorSettings,
    issued: AtomicU64,
    state: Mutex<MonitorState>,
    auto_refresh: watch::Sender<bool>,
    updates: broadcast::Sender<Dashboard>,
}

impl MonitorService {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        settings: MonitorSettings,
        auto_refresh: bool,
    ) -> Self {
        let state = MonitorState {
            applied: 0,
            snapshot: None,
            error: None,
            power: SignalTracker::load(Signal::Power, store.clone()),
            motor: SignalTracker::load(Signal::Motor, store),
            power_revert: RevertTimer::new(settings.power_timeout),
            wifi_revert: RevertTimer::new(settings.wifi_timeout),
        };
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        let (auto_refresh, _) = watch::channel(auto_refresh);

        Self {
            source,
            clock,
            settings,
            issued: AtomicU64::new(0),
            state: Mutex::new(state),
            auto_refresh,
            updates,
        }
    }

    /// Reserve the sequence number for a fetch about to be issued.
    pub fn begin_poll(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn poll(&self) -> Result<PollOutcome, MonitorError> {
        let sequence = self.begin_poll();
        tracing::debug!("Issuing fetch #{}", sequence);
        let result = self.source.fetch().await;
        self.complete(sequence, result).await
    }

    /// Apply a finished fetch unless a newer one has already been applied.
    pub async fn complete(
        &self,
        sequence: u64,
        result: Result<RawSnapshot, FetchError>,
    ) -> Result<PollOutcome, MonitorError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        if sequence <= state.applied {
            tracing::warn!(
                "Discarding fetch #{} completed after #{} was applied",
                sequence,
                state.applied
            );
            return Ok(PollOutcome::Stale(sequence));
        }
        state.applied = sequence;

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Fetch #{} failed: {}", sequence, e);
                let error = MonitorError::FetchFailed(e.to_string());
                state.error = Some(error.clone());
                self.publish(&state, now);
                return Err(error);
            }
        };

        let snapshot = Snapshot::build(raw, sequence, self.settings.encoding, now);
        tracing::debug!(
            "Applied fetch #{}: {} devices, power={}, wifi={}, motor={:?}",
            sequence,
            snapshot.devices.len(),
            snapshot.power,
            snapshot.wifi,
            snapshot.motor
        );

        state.power.observe(&snapshot.power, now);
        if let Some(motor) = &snapshot.motor {
            state.motor.observe(motor, now);
        }
        state.power_revert.observe(snapshot.power_on(), now);
        state.wifi_revert.observe(snapshot.wifi_on(), now);
        state.error = None;
        state.snapshot = Some(snapshot);

        self.publish(&state, now);
        Ok(PollOutcome::Applied(sequence))
    }

    /// Force back off any flag held on past its timeout and correct upstream.
    pub async fn check_reverts(&self) -> Vec<WriteBack> {
        let now = self.clock.now();
        let mut requests = Vec::new();

        {
            let mut state = self.state.lock().await;

            if state.power_revert.fire_if_due(now) {
                tracing::info!("Power held on past {:?}, reverting", self.settings.power_timeout);
                let off = Signal::Power.off_value();
                state.power.observe(off, now);
                if let Some(snapshot) = state.snapshot.as_mut() {
                    snapshot.power = off.to_string();
                }
                requests.push(WriteBack::PowerOff);
            }

            if state.wifi_revert.fire_if_due(now) {
                tracing::info!("Wi-Fi held on past {:?}, reverting", self.settings.wifi_timeout);
                if let Some(snapshot) = state.snapshot.as_mut() {
                    snapshot.wifi = Signal::Wifi.off_value().to_string();
                }
                requests.push(WriteBack::WifiOff);
            }

            if !requests.is_empty() {
                self.publish(&state, now);
            }
        }

        for request in &requests {
            if let Err(e) = self.source.write_back(*request).await {
                tracing::error!("{} reset failed: {}", request.field(), e);
            }
        }

        requests
    }

    pub async fn dashboard(&self) -> Dashboard {
        let now = self.clock.now();
        let state = self.state.lock().await;
        self.render(&state, now)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Dashboard> {
        self.updates.subscribe()
    }

    pub fn auto_refresh_enabled(&self) -> bool {
        *self.auto_refresh.borrow()
    }

    pub async fn set_auto_refresh(&self, enabled: bool) {
        let previous = self.auto_refresh.send_replace(enabled);
        if previous != enabled {
            tracing::info!("Auto refresh {}", if enabled { "enabled" } else { "disabled" });
            let now = self.clock.now();
            let state = self.state.lock().await;
            self.publish(&state, now);
        }
    }

    /// Poll on the refresh interval while auto refresh is enabled. Disabling
    /// it drops the pending tick.
    pub async fn run_auto_refresh(self: Arc<Self>) {
        let mut enabled = self.auto_refresh.subscribe();

        loop {
            if !*enabled.borrow_and_update() {
                if enabled.changed().await.is_err() {
                    return;
                }
                continue;
            }

            let mut ticker = tokio::time::interval(self.settings.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll().await {
                            tracing::debug!("Auto refresh poll failed: {}", e);
                        }
                    }
                    changed = enabled.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        break;
                    }
                }
            }
        }
    }

    pub async fn run_revert_checks(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.settings.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.check_reverts().await;
        }
    }

    fn render(&self, state: &MonitorState, now: DateTime<FixedOffset>) -> Dashboard {
        Dashboard::new(
            now,
            state.snapshot.as_ref(),
            &self.settings.device_names,
            state.power.state(),
            state.motor.state(),
            state.error.as_ref().map(ToString::to_string),
            self.auto_refresh_enabled(),
        )
    }

    fn publish(&self, state: &MonitorState, now: DateTime<FixedOffset>) {
        // no subscribers is fine
        let _ = self.updates.send(self.render(state, now));
    }
}
