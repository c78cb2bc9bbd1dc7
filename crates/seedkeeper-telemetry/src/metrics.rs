//! Prometheus-backed metrics registry for cycle and action observability.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges a scheduler, applier, and API surface need.

use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    cycles_total: IntCounterVec,
    actions_total: IntCounterVec,
    hardlink_rebuilds_total: IntCounterVec,
    torrents_scanned: IntGaugeVec,
    activity_runs_retained: IntGauge,
}

/// Snapshot of selected gauges for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of activity runs currently retained.
    pub activity_runs_retained: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any collector cannot be constructed or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cycles_total = IntCounterVec::new(
            Opts::new("seedkeeper_cycles_total", "Scan/apply-now cycles run"),
            &["instance", "outcome"],
        )?;
        let actions_total = IntCounterVec::new(
            Opts::new("seedkeeper_actions_total", "Actions applied by kind and outcome"),
            &["action", "outcome"],
        )?;
        let hardlink_rebuilds_total = IntCounterVec::new(
            Opts::new(
                "seedkeeper_hardlink_index_rebuilds_total",
                "Hardlink index rebuilds by instance",
            ),
            &["instance"],
        )?;
        let torrents_scanned = IntGaugeVec::new(
            Opts::new(
                "seedkeeper_torrents_scanned",
                "Torrents observed in the most recent cycle",
            ),
            &["instance"],
        )?;
        let activity_runs_retained = IntGauge::with_opts(Opts::new(
            "seedkeeper_activity_runs_retained",
            "Activity runs currently retained in the run store",
        ))?;

        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(actions_total.clone()))?;
        registry.register(Box::new(hardlink_rebuilds_total.clone()))?;
        registry.register(Box::new(torrents_scanned.clone()))?;
        registry.register(Box::new(activity_runs_retained.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                cycles_total,
                actions_total,
                hardlink_rebuilds_total,
                torrents_scanned,
                activity_runs_retained,
            }),
        })
    }

    /// Record a completed cycle for an instance.
    pub fn inc_cycle(&self, instance: &str, outcome: &str) {
        self.inner.cycles_total.with_label_values(&[instance, outcome]).inc();
    }

    /// Record an applied (or failed, or dry-run) action.
    pub fn inc_action(&self, action: &str, outcome: &str) {
        self.inner.actions_total.with_label_values(&[action, outcome]).inc();
    }

    /// Record a hardlink index rebuild for an instance.
    pub fn inc_hardlink_rebuild(&self, instance: &str) {
        self.inner.hardlink_rebuilds_total.with_label_values(&[instance]).inc();
    }

    /// Record how many torrents the most recent cycle observed.
    pub fn set_torrents_scanned(&self, instance: &str, count: i64) {
        self.inner.torrents_scanned.with_label_values(&[instance]).set(count);
    }

    /// Record how many activity runs the run store currently retains.
    pub fn set_activity_runs_retained(&self, count: i64) {
        self.inner.activity_runs_retained.set(count);
    }

    /// Render the registry in Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric families cannot be encoded.
    pub fn gather(&self) -> Result<String> {
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|err| TelemetryError::Encode(err.to_string()))?;
        String::from_utf8(buffer).map_err(|err| TelemetryError::Encode(err.to_string()))
    }

    /// Take a point-in-time snapshot of health-relevant gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            activity_runs_retained: self.inner.activity_runs_retained.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_reports_registered_collectors() {
        let metrics = Metrics::new().expect("metrics construct");
        metrics.inc_cycle("main", "success");
        metrics.inc_action("delete", "success");
        metrics.set_activity_runs_retained(3);

        let text = metrics.gather().expect("gather");
        assert!(text.contains("seedkeeper_cycles_total"));
        assert!(text.contains("seedkeeper_activity_runs_retained 3"));
        assert_eq!(metrics.snapshot().activity_runs_retained, 3);
    }
}
