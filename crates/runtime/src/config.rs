use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use charts_core::articles::DEFAULT_WINDOW_SIZE_MS;
use charts_core::music::MIN_CHARTABLE_DURATION_MS;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub workers: usize,
    pub epochs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { workers: 2, epochs: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MusicChartsConfig {
    pub runtime: RuntimeConfig,
    pub min_chartable_duration_ms: u64,
    pub songs: u64,
    pub plays_per_epoch: u64,
}

impl Default for MusicChartsConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            min_chartable_duration_ms: MIN_CHARTABLE_DURATION_MS,
            songs: 40,
            plays_per_epoch: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArticleChartsConfig {
    pub runtime: RuntimeConfig,
    pub window_size_ms: u64,
    pub views_per_epoch: u64,
    /// Simulated time covered by one epoch of generated views.
    pub epoch_span_ms: u64,
    /// Closed windows kept queryable behind the current one.
    pub retained_windows: u64,
}

impl Default for ArticleChartsConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            window_size_ms: DEFAULT_WINDOW_SIZE_MS,
            views_per_epoch: 120,
            epoch_span_ms: 15 * 60 * 1_000,
            retained_windows: 2,
        }
    }
}

/// Loads a JSON config file, or the defaults when no path is given. Missing
/// fields keep their default values.
pub fn load_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        return Ok(T::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}
