//! Bounded top-K aggregate driven by upserts and retractions.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::{Identity, RankedEntry};

/// The five-slot chart used for songs and articles.
pub type TopFive = TopK<5>;

/// Keeps the `K` highest-ranked entries seen for one grouping key.
///
/// `membership` holds the single live entry per identity and `ranking` holds
/// those entries in rank order. An identity that falls out of the top `K` is
/// dropped from both; it only comes back if a later [`TopK::add`] delivers it
/// again.
///
/// The aggregate has no internal locking. The upstream pipeline owns one
/// instance per key and, for every change of a value from `old` to `new`,
/// must call `remove(old)` strictly before `add(new)`. Hosts that cannot
/// promise that order should hand both values to [`TopK::replace`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopK<const K: usize> {
    membership: HashMap<Identity, RankedEntry>,
    ranking: BTreeSet<RankedEntry>,
}

impl<const K: usize> TopK<K> {
    pub fn new() -> Self {
        Self {
            membership: HashMap::with_capacity(K + 1),
            ranking: BTreeSet::new(),
        }
    }

    /// Upserts `entry`, replacing any entry already held for its identity.
    ///
    /// Returns the entry pushed out of the top `K`, which may be `entry`
    /// itself when it ranks below a full chart.
    pub fn add(&mut self, entry: RankedEntry) -> Option<RankedEntry> {
        if let Some(previous) = self.membership.remove(&entry.identity) {
            self.ranking.remove(&previous);
        }
        self.ranking.insert(entry);
        self.membership.insert(entry.identity, entry);

        let evicted = if self.ranking.len() > K {
            self.ranking.pop_last()
        } else {
            None
        };
        if let Some(last) = evicted {
            self.membership.remove(&last.identity);
        }
        debug_assert!(self.invariants_hold());
        evicted
    }

    /// Retracts exactly `entry`. A stale score for a tracked identity leaves
    /// the newer value in place, and an unknown entry is ignored.
    ///
    /// Returns whether `entry` was part of the ranking.
    pub fn remove(&mut self, entry: &RankedEntry) -> bool {
        let ranked = self.ranking.remove(entry);
        if self
            .membership
            .get(&entry.identity)
            .is_some_and(|current| current.score == entry.score)
        {
            self.membership.remove(&entry.identity);
        }
        debug_assert!(self.invariants_hold());
        ranked
    }

    /// Applies an `old -> new` change as one step: the retraction always
    /// lands before the upsert, whatever order the host produced them in.
    pub fn replace(
        &mut self,
        old: Option<RankedEntry>,
        new: Option<RankedEntry>,
    ) -> Option<RankedEntry> {
        if let Some(old) = old {
            self.remove(&old);
        }
        new.and_then(|new| self.add(new))
    }

    pub fn get(&self, identity: Identity) -> Option<&RankedEntry> {
        self.membership.get(&identity)
    }

    pub fn to_vec(&self) -> Vec<RankedEntry> {
        self.ranking.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ranking.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }

    /// Checks the structural invariants: the ranking is bounded by `K`, every
    /// ranked entry is the live entry for its identity, identities are
    /// unique, and anything tracked but unranked ranks below the whole chart.
    pub fn invariants_hold(&self) -> bool {
        if self.ranking.len() > K {
            return false;
        }
        let mut seen = HashSet::with_capacity(self.ranking.len());
        for entry in &self.ranking {
            if !seen.insert(entry.identity) {
                return false;
            }
            if self.membership.get(&entry.identity) != Some(entry) {
                return false;
            }
        }
        match self.ranking.last() {
            Some(lowest) => self
                .membership
                .values()
                .filter(|entry| !self.ranking.contains(*entry))
                .all(|entry| entry > lowest),
            None => self.membership.is_empty(),
        }
    }
}

impl<'a, const K: usize> IntoIterator for &'a TopK<K> {
    type Item = &'a RankedEntry;
    type IntoIter = std::collections::btree_set::Iter<'a, RankedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranking.iter()
    }
}

impl<const K: usize> FromIterator<RankedEntry> for TopK<K> {
    fn from_iter<I: IntoIterator<Item = RankedEntry>>(iter: I) -> Self {
        let mut topk = Self::new();
        for entry in iter {
            topk.add(entry);
        }
        topk
    }
}

impl<const K: usize> fmt::Display for TopK<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, entry) in self.ranking.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        f.write_str("]")
    }
}
