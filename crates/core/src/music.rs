use serde::{Deserialize, Serialize};

use crate::{RankedEntry, TOP_FIVE_KEY};

pub type SongId = i64;

/// Plays shorter than this are not counted towards any chart.
pub const MIN_CHARTABLE_DURATION_MS: u64 = 30_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayEvent {
    pub song_id: SongId,
    pub duration_ms: u64,
    #[serde(default)]
    pub region: String,
}

impl PlayEvent {
    pub fn is_chartable(&self, min_duration_ms: u64) -> bool {
        self.duration_ms >= min_duration_ms
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Song {
    pub id: SongId,
    pub album: String,
    pub artist: String,
    pub name: String,
    pub genre: String,
}

impl Song {
    /// Genre chart key; genres are charted case-insensitively.
    pub fn genre_key(&self) -> String {
        self.genre.to_lowercase()
    }

    /// Every chart a play of this song counts towards.
    pub fn chart_keys(&self) -> [String; 2] {
        [self.genre_key(), TOP_FIVE_KEY.to_string()]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SongPlayCount {
    pub song_id: SongId,
    pub plays: i64,
}

impl From<SongPlayCount> for RankedEntry {
    fn from(count: SongPlayCount) -> Self {
        RankedEntry::new(count.song_id, count.plays)
    }
}

impl From<RankedEntry> for SongPlayCount {
    fn from(entry: RankedEntry) -> Self {
        Self {
            song_id: entry.identity,
            plays: entry.score,
        }
    }
}

/// A charted song resolved against the catalog for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SongBean {
    pub artist: String,
    pub album: String,
    pub name: String,
    pub plays: i64,
}

impl SongBean {
    pub fn new(song: &Song, plays: i64) -> Self {
        Self {
            artist: song.artist.clone(),
            album: song.album.clone(),
            name: song.name.clone(),
            plays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_key_is_lowercase_and_global_key_is_included() {
        let song = Song {
            id: 1,
            album: "Fresh Fruit".into(),
            artist: "Dead Kennedys".into(),
            name: "Holiday in Cambodia".into(),
            genre: "Punk".into(),
        };
        assert_eq!(song.chart_keys(), ["punk".to_string(), "all".to_string()]);
    }

    #[test]
    fn short_plays_are_not_chartable() {
        let play = PlayEvent { song_id: 1, duration_ms: 29_999, region: "uk".into() };
        assert!(!play.is_chartable(MIN_CHARTABLE_DURATION_MS));
        let play = PlayEvent { duration_ms: 30_000, ..play };
        assert!(play.is_chartable(MIN_CHARTABLE_DURATION_MS));
    }

    #[test]
    fn play_counts_map_onto_entries() {
        let entry: RankedEntry = SongPlayCount { song_id: 4, plays: 12 }.into();
        assert_eq!(entry, RankedEntry::new(4, 12));
        assert_eq!(SongPlayCount::from(entry).plays, 12);
    }
}
