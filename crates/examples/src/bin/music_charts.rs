use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use differential_dataflow::input::InputSession;
use timely::dataflow::operators::probe::Handle as ProbeHandle;

use charts_core::music::{PlayEvent, Song, SongBean, SongPlayCount};
use charts_examples::{read_json_lines, record_apply};
use charts_runtime::config::{load_config, MusicChartsConfig};
use charts_runtime::metrics::{EpochTimer, MetricsRegistry};
use charts_runtime::{init_tracing, start_runtime};
use charts_views::dataflow::{chartable_plays, record_changes, song_play_counts};
use charts_views::{ChangeLog, ChartQuery, ChartRouter, GenreCharts, ShardSnapshot, TOP_K};

const GENRES: [&str; 5] = ["Punk", "Jazz", "Hip Hop", "Electronic", "Rock"];

/// Top five songs per genre and overall, from a stream of song plays.
#[derive(Debug, Parser)]
struct Args {
    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    epochs: Option<u64>,
    /// JSON-lines play events replayed in the first epoch.
    #[arg(long)]
    plays: Option<PathBuf>,
}

#[derive(Serialize)]
struct ChartLine<'a> {
    chart: &'a str,
    shard: Option<usize>,
    songs: Vec<SongBean>,
}

fn catalog(songs: u64) -> Vec<Song> {
    (1..=songs as i64)
        .map(|id| Song {
            id,
            album: format!("Album {}", (id - 1) / 4 + 1),
            artist: format!("Artist {}", id % 9),
            name: format!("Song {id}"),
            genre: GENRES[(id as usize) % GENRES.len()].to_string(),
        })
        .collect()
}

/// Deterministic synthetic plays for one epoch, skewed towards a few songs.
fn synthetic_plays(epoch: u64, count: u64, songs: u64) -> impl Iterator<Item = PlayEvent> {
    (0..count).map(move |i| {
        let hot = if i % 5 == 0 { (epoch % 3) * 2 } else { (epoch * 13 + i * 7) % songs };
        PlayEvent {
            song_id: hot as i64 + 1,
            duration_ms: 20_000 + (i % 7) * 5_000,
            region: ["uk", "us", "de"][(i % 3) as usize].to_string(),
        }
    })
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut cfg: MusicChartsConfig = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        cfg.runtime.workers = workers;
    }
    if let Some(epochs) = args.epochs {
        cfg.runtime.epochs = epochs;
    }
    info!(?cfg, "music_charts starting");

    let metrics = MetricsRegistry::default();
    let replay: Arc<Vec<PlayEvent>> = Arc::new(match &args.plays {
        Some(path) => read_json_lines(path, &metrics)?,
        None => Vec::new(),
    });
    let songs = Arc::new(catalog(cfg.songs));

    let run_cfg = cfg.clone();
    let run_metrics = metrics.clone();
    let run_songs = Arc::clone(&songs);
    let snapshots = start_runtime(cfg.runtime.workers, move |index, worker| {
        let peers = worker.peers();
        let cfg = &run_cfg;
        let metrics = &run_metrics;
        info!(worker = index, peers, "music_charts worker running");

        let mut play_input: InputSession<_, PlayEvent, isize> = InputSession::new();
        let mut song_input: InputSession<_, Song, isize> = InputSession::new();
        let log = ChangeLog::new();
        let mut probe = ProbeHandle::new();

        worker.dataflow::<u64, _, _>(|scope| {
            let plays = play_input.to_collection(scope);
            let songs = song_input.to_collection(scope);
            let chartable = chartable_plays(&plays, cfg.min_chartable_duration_ms);
            let counts = song_play_counts(&chartable, &songs);
            record_changes(&counts, &log).probe_with(&mut probe);
        });

        for song in run_songs.iter().skip(index).step_by(peers) {
            song_input.insert(song.clone());
        }

        let mut charts = GenreCharts::new();
        for epoch in 0..cfg.runtime.epochs {
            let timer = EpochTimer::start();
            let generated = synthetic_plays(epoch, cfg.plays_per_epoch, cfg.songs);
            let replayed = if epoch == 0 { replay.to_vec() } else { Vec::new() };
            for (i, play) in replayed.into_iter().chain(generated).enumerate() {
                if i % peers != index {
                    continue;
                }
                metrics.inc_events_ingested(1);
                if !play.is_chartable(cfg.min_chartable_duration_ms) {
                    metrics.inc_events_filtered(1);
                }
                play_input.insert(play);
            }

            play_input.advance_to(epoch + 1);
            song_input.advance_to(epoch + 1);
            play_input.flush();
            song_input.flush();
            while probe.less_than(play_input.time()) {
                worker.step();
            }

            let updates = log.drain_ordered();
            let applied = updates.len();
            for update in updates {
                let op = update.op;
                let outcome = charts.apply_update(update);
                record_apply(metrics, op, &outcome);
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

    let router = ChartRouter::<String, TOP_K>::from_snapshots(snapshots)?;
    for shard in router.shards_for_discovery() {
        info!(shard = shard.shard, keys = ?shard.keys, "shard serves charts");
    }

    let by_id: HashMap<i64, &Song> = songs.iter().map(|song| (song.id, song)).collect();
    for key in router.keys() {
        let entries = router.top_k(&key)?.unwrap_or_default();
        let songs = entries
            .into_iter()
            .map(SongPlayCount::from)
            .filter_map(|count| match by_id.get(&count.song_id) {
                Some(song) => Some(SongBean::new(song, count.plays)),
                None => {
                    warn!(song_id = count.song_id, "charted song missing from catalog");
                    None
                }
            })
            .collect();
        let line = ChartLine { chart: &key, shard: router.owner_of(&key), songs };
        println!("{}", serde_json::to_string(&line)?);
    }

    let snapshot = metrics.snapshot();
    info!(?snapshot, "final metrics summary");
    println!("{}", snapshot.to_json_line("music_charts", None));
    Ok(())
}
