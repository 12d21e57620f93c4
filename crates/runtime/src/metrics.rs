use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Counters shared by every worker of a run.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    events_ingested: AtomicU64,
    events_filtered: AtomicU64,
    chart_adds: AtomicU64,
    chart_removes: AtomicU64,
    stale_retractions: AtomicU64,
    evictions: AtomicU64,
    charts_peak: AtomicU64,
}

impl MetricsRegistry {
    pub fn inc_events_ingested(&self, delta: u64) {
        self.inner.events_ingested.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_events_filtered(&self, delta: u64) {
        self.inner.events_filtered.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_chart_adds(&self, delta: u64) {
        self.inner.chart_adds.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_chart_removes(&self, delta: u64) {
        self.inner.chart_removes.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_stale_retractions(&self, delta: u64) {
        self.inner.stale_retractions.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn inc_evictions(&self, delta: u64) {
        self.inner.evictions.fetch_add(delta, Ordering::Relaxed);
    }

    pub fn record_charts_peak(&self, charts: u64) {
        self.inner.charts_peak.fetch_max(charts, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_ingested: self.inner.events_ingested.load(Ordering::Relaxed),
            events_filtered: self.inner.events_filtered.load(Ordering::Relaxed),
            chart_adds: self.inner.chart_adds.load(Ordering::Relaxed),
            chart_removes: self.inner.chart_removes.load(Ordering::Relaxed),
            stale_retractions: self.inner.stale_retractions.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            charts_peak: self.inner.charts_peak.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_ingested: u64,
    pub events_filtered: u64,
    pub chart_adds: u64,
    pub chart_removes: u64,
    pub stale_retractions: u64,
    pub evictions: u64,
    pub charts_peak: u64,
}

impl MetricsSnapshot {
    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            label: &'a str,
            #[serde(flatten)]
            counters: &'a MetricsSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Snapshot {
            label,
            counters: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct EpochTimer {
    start: Instant,
}

impl EpochTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = MetricsRegistry::default();
        let worker = metrics.clone();
        worker.inc_chart_adds(3);
        worker.record_charts_peak(4);
        worker.record_charts_peak(2);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.chart_adds, 3);
        assert_eq!(snapshot.charts_peak, 4);
    }

    #[test]
    fn json_line_flattens_counters() {
        let metrics = MetricsRegistry::default();
        metrics.inc_evictions(1);
        let line = metrics.snapshot().to_json_line("final", None);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["label"], "final");
        assert_eq!(value["evictions"], 1);
        assert!(value["elapsed_ms"].is_null());
    }
}
