use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Identity, Score};

/// An identity paired with its current score.
///
/// Entries are ordered by rank: higher scores first, equal scores broken by
/// ascending identity. Two entries are equal only when both fields match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RankedEntry {
    pub identity: Identity,
    pub score: Score,
}

impl RankedEntry {
    pub fn new(identity: Identity, score: Score) -> Self {
        Self { identity, score }
    }
}

impl Ord for RankedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.identity.cmp(&other.identity))
    }
}

impl PartialOrd for RankedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<(Identity, Score)> for RankedEntry {
    fn from((identity, score): (Identity, Score)) -> Self {
        Self { identity, score }
    }
}

impl fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.identity, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_score_ranks_first() {
        let hi = RankedEntry::new(9, 100);
        let lo = RankedEntry::new(1, 50);
        assert!(hi < lo);
    }

    #[test]
    fn equal_scores_rank_by_ascending_identity() {
        let mut entries = vec![RankedEntry::new(5, 10), RankedEntry::new(2, 10)];
        entries.sort();
        assert_eq!(entries, vec![RankedEntry::new(2, 10), RankedEntry::new(5, 10)]);
    }

    #[test]
    fn equality_needs_both_fields() {
        assert_ne!(RankedEntry::new(1, 10), RankedEntry::new(1, 11));
        assert_eq!(RankedEntry::new(1, 10).cmp(&RankedEntry::new(1, 10)), Ordering::Equal);
    }
}
