//! Process configuration, read once from `FRONTDESK_*` environment variables.
//! Unset or unparsable values fall back to the defaults below.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::{EngineSettings, TransitionPolicy};
use crate::limits::{MAX_REVENUE_WINDOW_DAYS, MAX_SIMULATED_LATENCY_MS};
use crate::refresh::TrackerSettings;

pub const METRICS_PORT: &str = "FRONTDESK_METRICS_PORT";
pub const SEED_PATH: &str = "FRONTDESK_SEED_PATH";
pub const REFRESH_SECS: &str = "FRONTDESK_REFRESH_SECS";
pub const REFRESH_TIMEOUT_MS: &str = "FRONTDESK_REFRESH_TIMEOUT_MS";
pub const LATENCY_MS: &str = "FRONTDESK_LATENCY_MS";
pub const STRICT_TRANSITIONS: &str = "FRONTDESK_STRICT_TRANSITIONS";
pub const ENFORCE_NO_OVERLAP: &str = "FRONTDESK_ENFORCE_NO_OVERLAP";
pub const REVENUE_WINDOW_DAYS: &str = "FRONTDESK_REVENUE_WINDOW_DAYS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeskConfig {
    pub metrics_port: Option<u16>,
    /// Seed file replacing the embedded dataset.
    pub seed_path: Option<PathBuf>,
    pub refresh_interval: Duration,
    pub refresh_timeout: Duration,
    pub latency: Duration,
    pub strict_transitions: bool,
    pub enforce_no_overlap: bool,
    pub revenue_window_days: u32,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            metrics_port: None,
            seed_path: None,
            refresh_interval: Duration::from_secs(30),
            refresh_timeout: Duration::from_millis(2000),
            latency: Duration::ZERO,
            strict_transitions: false,
            enforce_no_overlap: true,
            revenue_window_days: 30,
        }
    }
}

impl DeskConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source; tests pass a map lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let refresh_secs: Option<u64> = parse(&lookup, REFRESH_SECS).filter(|s| *s > 0);
        let timeout_ms: Option<u64> = parse(&lookup, REFRESH_TIMEOUT_MS).filter(|ms| *ms > 0);
        let latency_ms: Option<u64> = parse(&lookup, LATENCY_MS);
        Self {
            metrics_port: parse(&lookup, METRICS_PORT),
            seed_path: lookup(SEED_PATH)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            refresh_interval: refresh_secs.map_or(defaults.refresh_interval, Duration::from_secs),
            refresh_timeout: timeout_ms.map_or(defaults.refresh_timeout, Duration::from_millis),
            latency: latency_ms.map_or(defaults.latency, |ms| {
                Duration::from_millis(ms.min(MAX_SIMULATED_LATENCY_MS))
            }),
            strict_transitions: flag(&lookup, STRICT_TRANSITIONS).unwrap_or(defaults.strict_transitions),
            enforce_no_overlap: flag(&lookup, ENFORCE_NO_OVERLAP).unwrap_or(defaults.enforce_no_overlap),
            revenue_window_days: parse(&lookup, REVENUE_WINDOW_DAYS)
                .filter(|d| (1..=MAX_REVENUE_WINDOW_DAYS).contains(d))
                .unwrap_or(defaults.revenue_window_days),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            policy: if self.strict_transitions {
                TransitionPolicy::Strict
            } else {
                TransitionPolicy::Permissive
            },
            enforce_no_overlap: self.enforce_no_overlap,
            latency: self.latency,
            revenue_window_days: self.revenue_window_days,
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            interval: self.refresh_interval,
            timeout: self.refresh_timeout,
        }
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring unparsable setting");
    }
    parsed
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring unparsable flag");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> DeskConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DeskConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), DeskConfig::default());
        let settings = DeskConfig::default().engine_settings();
        assert_eq!(settings.policy, TransitionPolicy::Permissive);
        assert!(settings.enforce_no_overlap);
    }

    #[test]
    fn reads_every_setting() {
        let c = config(&[
            (METRICS_PORT, "9100"),
            (SEED_PATH, "/tmp/hotel.json"),
            (REFRESH_SECS, "5"),
            (REFRESH_TIMEOUT_MS, "250"),
            (LATENCY_MS, "40"),
            (STRICT_TRANSITIONS, "true"),
            (ENFORCE_NO_OVERLAP, "off"),
            (REVENUE_WINDOW_DAYS, "14"),
        ]);
        assert_eq!(c.metrics_port, Some(9100));
        assert_eq!(c.seed_path, Some(PathBuf::from("/tmp/hotel.json")));
        assert_eq!(c.refresh_interval, Duration::from_secs(5));
        assert_eq!(c.refresh_timeout, Duration::from_millis(250));
        assert_eq!(c.latency, Duration::from_millis(40));
        assert_eq!(c.engine_settings().policy, TransitionPolicy::Strict);
        assert!(!c.enforce_no_overlap);
        assert_eq!(c.revenue_window_days, 14);
        assert_eq!(c.tracker_settings().interval, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_fall_back() {
        let c = config(&[
            (METRICS_PORT, "not-a-port"),
            (REFRESH_SECS, "0"),
            (REFRESH_TIMEOUT_MS, "-3"),
            (STRICT_TRANSITIONS, "maybe"),
            (REVENUE_WINDOW_DAYS, "9999"),
            (SEED_PATH, "  "),
        ]);
        assert_eq!(c, DeskConfig::default());
    }

    #[test]
    fn latency_is_capped() {
        let c = config(&[(LATENCY_MS, "600000")]);
        assert_eq!(c.latency, Duration::from_millis(MAX_SIMULATED_LATENCY_MS));
    }
}
