// Signal transition tracking and fail-safe revert decisions
use chrono::{DateTime, FixedOffset};
use std::time::Duration;

/// Binary flags reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    Power,
    Motor,
    Wifi,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Power => "power",
            Signal::Motor => "motor",
            Signal::Wifi => "wifi",
        }
    }

    pub fn is_on(&self, value: &str) -> bool {
        match self {
            Signal::Power | Signal::Wifi => value == "1",
            Signal::Motor => value == "R",
        }
    }

    /// Value written when the signal is forced off.
    pub fn off_value(&self) -> &'static str {
        match self {
            Signal::Power | Signal::Wifi => "0",
            Signal::Motor => "S",
        }
    }

    pub fn value_key(&self) -> String {
        format!("{}.last_value", self.name())
    }

    pub fn since_key(&self, on: bool) -> String {
        format!("{}.{}_since", self.name(), if on { "on" } else { "off" })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalState {
    /// Nothing usable was persisted for this signal.
    Unknown,
    Stable {
        value: String,
        since: DateTime<FixedOffset>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub state: SignalState,
    /// A new since timestamp was recorded and must be persisted.
    pub stamped: bool,
}

impl SignalState {
    pub fn observe(&self, value: &str, now: DateTime<FixedOffset>) -> Observation {
        match self {
            SignalState::Stable { value: last, .. } if last == value => Observation {
                state: self.clone(),
                stamped: false,
            },
            _ => Observation {
                state: SignalState::Stable {
                    value: value.to_string(),
                    since: now,
                },
                stamped: true,
            },
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            SignalState::Unknown => None,
            SignalState::Stable { value, .. } => Some(value),
        }
    }

    pub fn since(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            SignalState::Unknown => None,
            SignalState::Stable { since, .. } => Some(*since),
        }
    }

    /// Rebuild from persisted entries. Anything missing or unparsable is `Unknown`.
    pub fn restore<F>(signal: Signal, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(value) = lookup(signal.value_key().as_str()).filter(|v| !v.is_empty()) else {
            return SignalState::Unknown;
        };

        lookup(signal.since_key(signal.is_on(&value)).as_str())
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|since| SignalState::Stable { value, since })
            .unwrap_or(SignalState::Unknown)
    }

    /// Entries to persist for this state. The since key of the opposite
    /// polarity is not part of the batch and keeps its stored value.
    pub fn entries(&self, signal: Signal) -> Vec<(String, String)> {
        match self {
            SignalState::Unknown => Vec::new(),
            SignalState::Stable { value, since } => vec![
                (signal.value_key(), value.clone()),
                (signal.since_key(signal.is_on(value)), since.to_rfc3339()),
            ],
        }
    }
}

pub fn should_revert(on: bool, elapsed: Duration, timeout: Duration) -> bool {
    on && elapsed >= timeout
}

/// Tracks how long a flag has been held on so it can be forced back off.
#[derive(Debug, Clone)]
pub struct RevertTimer {
    timeout: Duration,
    armed_at: Option<DateTime<FixedOffset>>,
}

impl RevertTimer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            armed_at: None,
        }
    }

    /// Arms on the first "on" observation, keeps the original deadline while
    /// the flag stays on, disarms on "off".
    pub fn observe(&mut self, on: bool, now: DateTime<FixedOffset>) {
        if !on {
            self.armed_at = None;
        } else if self.armed_at.is_none() {
            self.armed_at = Some(now);
        }
    }

    /// True exactly once when the timeout has elapsed; the timer disarms itself.
    pub fn fire_if_due(&mut self, now: DateTime<FixedOffset>) -> bool {
        let Some(armed_at) = self.armed_at else {
            return false;
        };

        let elapsed = (now - armed_at).to_std().unwrap_or(Duration::ZERO);
        if should_revert(true, elapsed, self.timeout) {
            self.armed_at = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn at(seconds: i64) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 5, 6, 8, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(seconds)
    }

    #[test]
    fn test_first_observation_stamps() {
        let observation = SignalState::Unknown.observe("R", at(0));
        assert!(observation.stamped);
        assert_eq!(observation.state.value(), Some("R"));
        assert_eq!(observation.state.since(), Some(at(0)));
    }

    #[test]
    fn test_repeated_value_keeps_since() {
        let state = SignalState::Unknown.observe("R", at(0)).state;
        let observation = state.observe("R", at(5));
        assert!(!observation.stamped);
        assert_eq!(observation.state.since(), Some(at(0)));
    }

    #[test]
    fn test_changed_value_restamps() {
        let state = SignalState::Unknown.observe("R", at(0)).state;
        let observation = state.observe("S", at(60));
        assert!(observation.stamped);
        assert_eq!(observation.state.value(), Some("S"));
        assert_eq!(observation.state.since(), Some(at(60)));
    }

    #[test]
    fn test_entries_write_only_current_polarity() {
        let on = SignalState::Stable {
            value: "R".to_string(),
            since: at(0),
        };
        let keys: Vec<String> = on.entries(Signal::Motor).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["motor.last_value", "motor.on_since"]);

        let off = on.observe("S", at(10)).state;
        let keys: Vec<String> = off.entries(Signal::Motor).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["motor.last_value", "motor.off_since"]);

        assert!(SignalState::Unknown.entries(Signal::Power).is_empty());
    }

    #[test]
    fn test_restore_round_trips_persisted_state() {
        let state = SignalState::Unknown.observe("1", at(42)).state;
        let stored: HashMap<String, String> = state.entries(Signal::Power).into_iter().collect();

        let restored = SignalState::restore(Signal::Power, |k| stored.get(k).cloned());
        assert_eq!(restored, state);
    }

    #[test]
    fn test_restore_invalid_values_are_unknown() {
        let mut stored: HashMap<String, String> = HashMap::new();
        assert_eq!(
            SignalState::restore(Signal::Motor, |k| stored.get(k).cloned()),
            SignalState::Unknown
        );

        stored.insert("motor.last_value".to_string(), "R".to_string());
        stored.insert("motor.on_since".to_string(), "not a date".to_string());
        assert_eq!(
            SignalState::restore(Signal::Motor, |k| stored.get(k).cloned()),
            SignalState::Unknown
        );

        // since recorded only for the opposite polarity
        stored.remove("motor.on_since");
        stored.insert("motor.off_since".to_string(), at(0).to_rfc3339());
        assert_eq!(
            SignalState::restore(Signal::Motor, |k| stored.get(k).cloned()),
            SignalState::Unknown
        );
    }

    #[test]
    fn test_should_revert() {
        let timeout = Duration::from_secs(300);
        assert!(should_revert(true, Duration::from_secs(300), timeout));
        assert!(!should_revert(true, Duration::from_secs(299), timeout));
        assert!(!should_revert(false, Duration::from_secs(900), timeout));
    }

    #[test]
    fn test_revert_timer_keeps_first_deadline_while_on() {
        let mut timer = RevertTimer::new(Duration::from_secs(300));
        timer.observe(true, at(0));
        timer.observe(true, at(200));
        assert!(!timer.fire_if_due(at(299)));
        assert!(timer.fire_if_due(at(300)));
        assert!(timer.armed_at.is_none());
        assert!(!timer.fire_if_due(at(600)));
    }

    #[test]
    fn test_revert_timer_cancelled_by_off() {
        let mut timer = RevertTimer::new(Duration::from_secs(300));
        timer.observe(true, at(0));
        timer.observe(false, at(100));
        assert!(!timer.fire_if_due(at(400)));

        timer.observe(true, at(500));
        assert!(!timer.fire_if_due(at(700)));
        assert!(timer.fire_if_due(at(800)));
    }
}
