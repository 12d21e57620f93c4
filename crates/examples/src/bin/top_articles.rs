use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn};

use charts_core::articles::{retention_horizon, ArticleCatalog, PageView, WindowedIndustry};
use charts_examples::{read_json_lines, record_apply};
use charts_runtime::config::{load_config, ArticleChartsConfig};
use charts_runtime::metrics::{EpochTimer, MetricsRegistry};
use charts_runtime::{init_tracing, start_runtime};
use charts_views::{
    shard_for, ChartQuery, ChartRouter, ChartStore, RetractionDriver, ShardSnapshot, TOP_K,
};

const USERS: [&str; 9] = ["erica", "bob", "joe", "damian", "tania", "phil", "sam", "lauren", "joseph"];
const INDUSTRIES: [&str; 5] = ["engineering", "telco", "finance", "health", "science"];
const PAGES: [&str; 5] = ["index.html", "news.html", "contact.html", "about.html", "stuff.html"];

/// Top five articles per industry per time window, from a stream of page views.
#[derive(Debug, Parser)]
struct Args {
    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    epochs: Option<u64>,
    /// JSON-lines page views replayed in the first epoch.
    #[arg(long)]
    views: Option<PathBuf>,
}

#[derive(Serialize)]
struct ArticleView<'a> {
    page: &'a str,
    views: i64,
}

#[derive(Serialize)]
struct ChartLine<'a> {
    industry: &'a str,
    window_start_ms: u64,
    shard: Option<usize>,
    articles: Vec<ArticleView<'a>>,
}

fn synthetic_views(epoch: u64, cfg: &ArticleChartsConfig) -> impl Iterator<Item = PageView> {
    let count = cfg.views_per_epoch.max(1);
    let span = cfg.epoch_span_ms;
    (0..count).map(move |i| PageView {
        user: USERS[((epoch * 7 + i) % USERS.len() as u64) as usize].to_string(),
        page: PAGES[((i * i + epoch) % PAGES.len() as u64) as usize].to_string(),
        industry: INDUSTRIES[((i * 3 + epoch) % INDUSTRIES.len() as u64) as usize].to_string(),
        flags: if i % 4 == 3 { String::new() } else { "ARTICLE".to_string() },
        ts_ms: epoch * span + i * span / count,
    })
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg: ArticleChartsConfig = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        cfg.runtime.workers = workers;
    }
    if let Some(epochs) = args.epochs {
        cfg.runtime.epochs = epochs;
    }
    info!(?cfg, "top_articles starting");

    let metrics = MetricsRegistry::default();
    let replay: Vec<PageView> = match &args.views {
        Some(path) => read_json_lines(path, &metrics)?,
        None => Vec::new(),
    };
    let mut catalog = ArticleCatalog::new();
    for page in PAGES.iter().copied().chain(replay.iter().map(|view| view.page.as_str())) {
        catalog.intern(page);
    }
    info!(pages = catalog.len(), "article catalog ready");
    let catalog = Arc::new(catalog);
    let replay = Arc::new(replay);

    let run_cfg = cfg.clone();
    let run_metrics = metrics.clone();
    let run_catalog = Arc::clone(&catalog);
    let snapshots = start_runtime(cfg.runtime.workers, move |index, worker| {
        let peers = worker.peers();
        let cfg = &run_cfg;
        let metrics = &run_metrics;
        info!(worker = index, peers, "top_articles worker running");

        // Each worker owns the windows hashed to it and is their only writer.
        let mut driver = RetractionDriver::<(WindowedIndustry, i64), WindowedIndustry>::new();
        let mut charts = ChartStore::<WindowedIndustry, TOP_K>::new();

        for epoch in 0..cfg.runtime.epochs {
            let timer = EpochTimer::start();
            let replayed = if epoch == 0 { replay.to_vec() } else { Vec::new() };
            let mut applied = 0usize;
            for view in replayed.into_iter().chain(synthetic_views(epoch, cfg)) {
                let key = WindowedIndustry::for_view(&view, cfg.window_size_ms);
                if shard_for(&key, peers) != index {
                    continue;
                }
                metrics.inc_events_ingested(1);
                if !view.is_article() {
                    metrics.inc_events_filtered(1);
                    continue;
                }
                let Some(article) = run_catalog.id(&view.page) else {
                    warn!(page = %view.page, "view of unknown page");
                    metrics.inc_events_filtered(1);
                    continue;
                };
                for update in driver.increment(key, article, 1).into_updates() {
                    let op = update.op;
                    let outcome = charts.apply_update(update);
                    record_apply(metrics, op, &outcome);
                    applied += 1;
                }
            }

            // Every worker derives the horizon from the shared epoch clock.
            let clock_ms = epoch * cfg.epoch_span_ms;
            let horizon = retention_horizon(clock_ms, cfg.window_size_ms, cfg.retained_windows);
            let expired = charts.retain_keys(|key| key.window_start_ms >= horizon);
            driver.forget_groups(|key| key.window_start_ms >= horizon);
            if expired > 0 {
                debug!(worker = index, expired, horizon, "dropped expired windows");
            }

            metrics.record_charts_peak(charts.len() as u64);
            info!(
                worker = index,
                epoch,
                updates = applied,
                charts = charts.len(),
                duration_ms = timer.elapsed().as_millis(),
                "epoch complete"
            );
        }
        ShardSnapshot::capture(index, &charts)
    })?;

    let router = ChartRouter::<WindowedIndustry, TOP_K>::from_snapshots(snapshots)?;
    for key in router.keys() {
        let entries = router.top_k(&key)?.unwrap_or_default();
        let articles = entries
            .iter()
            .map(|entry| ArticleView {
                page: catalog.page(entry.identity).unwrap_or("<unknown>"),
                views: entry.score,
            })
            .collect();
        let line = ChartLine {
            industry: &key.industry,
            window_start_ms: key.window_start_ms,
            shard: router.owner_of(&key),
            articles,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    let snapshot = metrics.snapshot();
    info!(?snapshot, "final metrics summary");
    println!("{}", snapshot.to_json_line("top_articles", None));
    Ok(())
}
