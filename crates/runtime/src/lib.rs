//! Runtime bootstrap for the chart dataflows.

use anyhow::{anyhow, Result};
use tracing::{info, Level};

pub mod config;
pub mod metrics;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_max_level(Level::INFO)
        .try_init();
}

/// Start a single-process timely runtime with `workers` threads and execute
/// the provided closure once per worker. Returns each worker's result in
/// worker index order.
pub fn start_runtime<T, F>(workers: usize, f: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: Fn(usize, &mut timely::worker::Worker<timely::communication::allocator::Generic>) -> T
        + Send
        + Sync
        + 'static,
{
    let workers = workers.max(1);
    info!(%workers, "starting timely runtime");
    let guards = timely::execute(timely::Config::process(workers), move |worker| {
        let index = worker.index();
        f(index, worker)
    })
    .map_err(|e| anyhow!("timely runtime failed to start: {e}"))?;

    guards
        .join()
        .into_iter()
        .collect::<std::result::Result<Vec<_>, String>>()
        .map_err(|e| anyhow!("timely worker failed: {e}"))
}
