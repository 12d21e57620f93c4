//! Helpers shared by the demo binaries.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::warn;

use charts_core::{decode_json_line, ChangeOp};
use charts_runtime::metrics::MetricsRegistry;
use charts_views::ApplyOutcome;

/// Reads a JSON-lines feed. Blank lines are skipped; malformed lines are
/// logged, counted as filtered and skipped.
pub fn read_json_lines<T>(path: &Path, metrics: &MetricsRegistry) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut records = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match decode_json_line(line) {
            Ok(record) => records.push(record),
            Err(error) => {
                warn!(path = %path.display(), line = line_no + 1, %error, "skipping malformed record");
                metrics.inc_events_filtered(1);
            }
        }
    }
    Ok(records)
}

/// Folds one chart mutation into the run's counters.
pub fn record_apply(metrics: &MetricsRegistry, op: ChangeOp, outcome: &ApplyOutcome) {
    match op {
        ChangeOp::Add => metrics.inc_chart_adds(1),
        ChangeOp::Remove => metrics.inc_chart_removes(1),
    }
    if outcome.stale {
        metrics.inc_stale_retractions(1);
    }
    if outcome.evicted.is_some() {
        metrics.inc_evictions(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charts_core::music::PlayEvent;
    use tempfile::tempdir;

    #[test]
    fn malformed_lines_are_skipped_and_counted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plays.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"song_id\":1,\"duration_ms\":40000,\"region\":\"uk\"}\n",
                "\n",
                "{\"song_id\":\"two\"}\n",
                "not json\n",
                "{\"song_id\":3,\"duration_ms\":1000,\"region\":\"us\"}\n",
            ),
        )
        .unwrap();

        let metrics = MetricsRegistry::default();
        let plays: Vec<PlayEvent> = read_json_lines(&path, &metrics).unwrap();
        assert_eq!(plays.iter().map(|play| play.song_id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(metrics.snapshot().events_filtered, 2);
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.jsonl");
        let err = read_json_lines::<PlayEvent>(&path, &MetricsRegistry::default()).unwrap_err();
        assert!(err.to_string().contains("absent.jsonl"));
    }
}
