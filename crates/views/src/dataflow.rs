//! Differential-dataflow builders for the chart inputs.

use differential_dataflow::hashable::Hashable;
use differential_dataflow::lattice::Lattice;
use differential_dataflow::operators::reduce::Reduce;
use differential_dataflow::operators::Join;
use differential_dataflow::{AsCollection, Collection};
use timely::dataflow::operators::Exchange;
use timely::dataflow::Scope;

use charts_core::music::{PlayEvent, Song, SongId, SongPlayCount};
use charts_core::RankedEntry;

use crate::changelog::ChangeLog;

/// Song ids of the plays long enough to chart.
pub fn chartable_plays<G>(plays: &Collection<G, PlayEvent>, min_duration_ms: u64) -> Collection<G, SongId>
where
    G: Scope,
    G::Timestamp: Lattice + Ord,
{
    plays
        .filter(move |play| play.is_chartable(min_duration_ms))
        .map(|play| play.song_id)
}

/// Play counts per chart key and song.
///
/// Plays are joined with the song table; plays of songs missing from the
/// table chart nowhere. Each song counts towards its genre chart and the
/// global chart. The counts leave on the worker owning their chart key, so
/// every chart has a single writer.
pub fn song_play_counts<G>(
    plays: &Collection<G, SongId>,
    songs: &Collection<G, Song>,
) -> Collection<G, (String, RankedEntry)>
where
    G: Scope,
    G::Timestamp: Lattice + Ord,
{
    let songs_by_id = songs.map(|song| (song.id, song));

    plays
        .map(|song_id| (song_id, ()))
        .join_map(&songs_by_id, |song_id, _, song| (*song_id, song.chart_keys()))
        .flat_map(|(song_id, keys)| keys.into_iter().map(move |key| ((key, song_id), ())))
        .reduce(|_key, inputs, output| {
            let plays: isize = inputs.iter().map(|(_, count)| *count).sum();
            output.push((plays as i64, 1));
        })
        .map(|((key, song_id), plays)| (key, RankedEntry::from(SongPlayCount { song_id, plays })))
        .inner
        .exchange(|((key, _entry), _time, _diff)| key.hashed())
        .as_collection()
}

/// Buffers every change of `counts` into `log` as it passes.
pub fn record_changes<G>(
    counts: &Collection<G, (String, RankedEntry)>,
    log: &ChangeLog<String, G::Timestamp>,
) -> Collection<G, (String, RankedEntry)>
where
    G: Scope,
    G::Timestamp: Lattice + Ord,
{
    let log = log.clone();
    counts.inspect(move |((key, entry), time, diff)| {
        log.record(key.clone(), *entry, time.clone(), *diff);
    })
}
