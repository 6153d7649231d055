// Signal tracker - transition state bound to the persisted store
use crate::application::state_store::StateStore;
use crate::domain::signal::{Observation, Signal, SignalState};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

pub struct SignalTracker {
    signal: Signal,
    state: SignalState,
    store: Arc<dyn StateStore>,
}

impl SignalTracker {
    pub fn load(signal: Signal, store: Arc<dyn StateStore>) -> Self {
        let state = SignalState::restore(signal, |key| store.load(key));
        tracing::debug!("Restored {} state: {:?}", signal.name(), state);
        Self {
            signal,
            state,
            store,
        }
    }

    pub fn state(&self) -> &SignalState {
        &self.state
    }

    /// Record an observed value. Returns true when a new since was stamped.
    pub fn observe(&mut self, value: &str, now: DateTime<FixedOffset>) -> bool {
        let Observation { state, stamped } = self.state.observe(value, now);
        if stamped {
            tracing::info!(
                "{} changed from {:?} to {:?} at {}",
                self.signal.name(),
                self.state.value(),
                value,
                now.to_rfc3339()
            );
            if let Err(e) = self.store.save(&state.entries(self.signal)) {
                tracing::warn!("Failed to persist {} state: {}", self.signal.name(), e);
            }
        }
        self.state = state;
        stamped
    }
}
