//! Effort level policy and usage statistics.
//!
//! Maps task types to a low/medium/high effort dial. The mapping favours
//! cheap calls for yes/no style work and spends more on synthesis.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::models::{EffortConfig, EffortLevel};

const LOW_TASKS: &[&str] = &["validation", "classification", "simple_check"];
const MEDIUM_TASKS: &[&str] = &["generation", "analysis", "test_generation", "overfit_detection"];
const HIGH_TASKS: &[&str] = &[
    "synthesis",
    "reasoning",
    "boundary_mapping",
    "executive_summary",
    "rule_generation",
];

/// Built-in effort for a task type, if the type is known.
pub fn mapped_effort(task_type: &str) -> Option<EffortLevel> {
    let task_type = task_type.trim().to_ascii_lowercase();
    let task_type = task_type.as_str();
    if LOW_TASKS.contains(&task_type) {
        Some(EffortLevel::Low)
    } else if MEDIUM_TASKS.contains(&task_type) {
        Some(EffortLevel::Medium)
    } else if HIGH_TASKS.contains(&task_type) {
        Some(EffortLevel::High)
    } else {
        None
    }
}

/// Every task type with a built-in mapping, grouped by level.
pub fn task_type_table() -> Vec<(EffortLevel, &'static [&'static str])> {
    vec![
        (EffortLevel::Low, LOW_TASKS),
        (EffortLevel::Medium, MEDIUM_TASKS),
        (EffortLevel::High, HIGH_TASKS),
    ]
}

/// Resolved effort policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffortPolicy {
    enabled: bool,
    default: EffortLevel,
}

impl Default for EffortPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            default: EffortLevel::Medium,
        }
    }
}

impl EffortPolicy {
    pub const fn new(enabled: bool, default: EffortLevel) -> Self {
        Self { enabled, default }
    }

    /// Build from config; an unparseable default falls back to medium.
    pub fn from_config(config: &EffortConfig) -> Self {
        Self {
            enabled: config.enabled,
            default: config.default.parse().unwrap_or(EffortLevel::Medium),
        }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn default_level(&self) -> EffortLevel {
        self.default
    }

    /// Effort for a call.
    ///
    /// Disabled policy always answers high. A valid override wins; an invalid
    /// one is ignored. Unknown or missing task types use the default.
    pub fn effort_for(&self, task_type: Option<&str>, override_level: Option<&str>) -> EffortLevel {
        self.resolve(task_type, override_level).0
    }

    /// Like [`Self::effort_for`], also reporting whether the default was used.
    pub fn resolve(&self, task_type: Option<&str>, override_level: Option<&str>) -> (EffortLevel, bool) {
        if !self.enabled {
            return (EffortLevel::High, false);
        }
        if let Some(level) = override_level.and_then(|o| o.parse::<EffortLevel>().ok()) {
            return (level, false);
        }
        match task_type.and_then(mapped_effort) {
            Some(level) => (level, false),
            None => (self.default, true),
        }
    }
}

/// Counters for effort levels actually used.
#[derive(Debug, Default)]
pub struct EffortStats {
    low: AtomicU64,
    medium: AtomicU64,
    high: AtomicU64,
    fallback: AtomicU64,
}

/// Point-in-time view of [`EffortStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffortStatsSnapshot {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub fallback: u64,
    pub total: u64,
    pub low_pct: f64,
    pub medium_pct: f64,
    pub high_pct: f64,
    pub fallback_pct: f64,
}

impl EffortStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, level: EffortLevel) {
        let counter = match level {
            EffortLevel::Low => &self.low,
            EffortLevel::Medium => &self.medium,
            EffortLevel::High => &self.high,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a call whose task type had no mapping.
    pub fn record_fallback(&self) {
        self.fallback.fetch_add(1, Ordering::Relaxed);
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> EffortStatsSnapshot {
        let low = self.low.load(Ordering::Relaxed);
        let medium = self.medium.load(Ordering::Relaxed);
        let high = self.high.load(Ordering::Relaxed);
        let fallback = self.fallback.load(Ordering::Relaxed);
        let total = low + medium + high;
        let pct = |n: u64| {
            if total == 0 {
                0.0
            } else {
                (n as f64 / total as f64 * 1000.0).round() / 10.0
            }
        };
        EffortStatsSnapshot {
            low,
            medium,
            high,
            fallback,
            total,
            low_pct: pct(low),
            medium_pct: pct(medium),
            high_pct: pct(high),
            fallback_pct: pct(fallback),
        }
    }

    pub fn reset(&self) {
        for counter in [&self.low, &self.medium, &self.high, &self.fallback] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_mapping() {
        let policy = EffortPolicy::default();
        assert_eq!(policy.effort_for(Some("validation"), None), EffortLevel::Low);
        assert_eq!(policy.effort_for(Some("overfit_detection"), None), EffortLevel::Medium);
        assert_eq!(policy.effort_for(Some("rule_generation"), None), EffortLevel::High);
        assert_eq!(policy.effort_for(Some("Synthesis"), None), EffortLevel::High);
        assert_eq!(policy.effort_for(Some("unheard_of"), None), EffortLevel::Medium);
        assert_eq!(policy.effort_for(None, None), EffortLevel::Medium);
    }

    #[test]
    fn test_override_and_disabled() {
        let policy = EffortPolicy::default();
        assert_eq!(policy.effort_for(Some("validation"), Some("HIGH")), EffortLevel::High);
        assert_eq!(policy.effort_for(Some("validation"), Some("turbo")), EffortLevel::Low);

        let disabled = EffortPolicy::new(false, EffortLevel::Low);
        assert_eq!(disabled.effort_for(Some("validation"), Some("low")), EffortLevel::High);
    }

    #[test]
    fn test_resolve_reports_default_use() {
        let policy = EffortPolicy::new(true, EffortLevel::Low);
        assert_eq!(policy.resolve(Some("mystery"), None), (EffortLevel::Low, true));
        assert_eq!(policy.resolve(Some("synthesis"), None), (EffortLevel::High, false));
    }

    #[test]
    fn test_from_config_bad_default() {
        let config = EffortConfig {
            enabled: true,
            default: "extreme".to_string(),
        };
        assert_eq!(EffortPolicy::from_config(&config).default_level(), EffortLevel::Medium);
    }

    #[test]
    fn test_stats_percentages_and_reset() {
        let stats = EffortStats::new();
        stats.record(EffortLevel::Low);
        stats.record(EffortLevel::High);
        stats.record(EffortLevel::High);
        stats.record_fallback();

        let snap = stats.snapshot();
        assert_eq!(snap.total, 3);
        assert!((snap.high_pct - 66.7).abs() < 1e-9);
        assert!((snap.low_pct - 33.3).abs() < 1e-9);
        assert_eq!(snap.fallback, 1);

        stats.reset();
        let snap = stats.snapshot();
        assert_eq!(snap.total, 0);
        assert!(snap.low_pct.abs() < f64::EPSILON);
    }
}
