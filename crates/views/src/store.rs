use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use charts_core::{ChangeOp, Codec, CodecError, RankedEntry, TopK, TopKCodec};

/// One operation of the upstream feed, addressed to a grouping key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChartUpdate<G> {
    pub key: G,
    pub op: ChangeOp,
    pub entry: RankedEntry,
}

impl<G> ChartUpdate<G> {
    pub fn add(key: G, entry: RankedEntry) -> Self {
        Self { key, op: ChangeOp::Add, entry }
    }

    pub fn remove(key: G, entry: RankedEntry) -> Self {
        Self { key, op: ChangeOp::Remove, entry }
    }
}

/// What a single store mutation did, for bookkeeping by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The key had no chart before this call.
    pub created: bool,
    /// A retraction matched a ranked entry.
    pub retracted: bool,
    /// A retraction found nothing to remove.
    pub stale: bool,
    /// Entry pushed out of the chart by an add.
    pub evicted: Option<RankedEntry>,
}

impl ApplyOutcome {
    fn merge(mut self, other: ApplyOutcome) -> Self {
        self.created |= other.created;
        self.retracted |= other.retracted;
        self.stale |= other.stale;
        self.evicted = other.evicted.or(self.evicted);
        self
    }
}

/// Per-key charts owned by a single worker.
///
/// Each grouping key gets its own [`TopK`] the first time it is observed,
/// and keeps it until [`ChartStore::drop_key`] or
/// [`ChartStore::retain_keys`] releases it. The store is single-writer: the
/// partitioning upstream hands every key to exactly one owner.
#[derive(Debug, Clone)]
pub struct ChartStore<G, const K: usize> {
    charts: BTreeMap<G, TopK<K>>,
    codec: TopKCodec<K>,
}

impl<G: Ord + Clone, const K: usize> Default for ChartStore<G, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Ord + Clone, const K: usize> ChartStore<G, K> {
    pub fn new() -> Self {
        Self {
            charts: BTreeMap::new(),
            codec: TopKCodec::new(),
        }
    }

    /// Dispatches one feed operation to the chart owned by `key`.
    ///
    /// For a value changing from `old` to `new` the caller must apply the
    /// `Remove` of `old` before the `Add` of `new`; see
    /// [`ChartStore::apply_change`] for hosts that cannot guarantee that.
    /// The first operation seen for a key creates its chart empty.
    pub fn apply(&mut self, key: G, op: ChangeOp, entry: RankedEntry) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        let chart = self.charts.entry(key).or_insert_with(|| {
            outcome.created = true;
            TopK::new()
        });
        match op {
            ChangeOp::Add => {
                outcome.evicted = chart.add(entry);
                debug!(%entry, evicted = ?outcome.evicted, "chart add");
            }
            ChangeOp::Remove => {
                outcome.retracted = chart.remove(&entry);
                outcome.stale = !outcome.retracted;
                debug!(%entry, retracted = outcome.retracted, "chart remove");
            }
        }
        outcome
    }

    pub fn apply_update(&mut self, update: ChartUpdate<G>) -> ApplyOutcome {
        self.apply(update.key, update.op, update.entry)
    }

    /// Applies updates in the order given, returning the merged outcome.
    pub fn apply_all<I>(&mut self, updates: I) -> ApplyOutcome
    where
        I: IntoIterator<Item = ChartUpdate<G>>,
    {
        updates
            .into_iter()
            .fold(ApplyOutcome::default(), |acc, update| {
                acc.merge(self.apply_update(update))
            })
    }

    /// Applies an `old -> new` change for `key` in one step, retraction first.
    pub fn apply_change(
        &mut self,
        key: G,
        old: Option<RankedEntry>,
        new: Option<RankedEntry>,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();
        if let Some(old) = old {
            outcome = self.apply(key.clone(), ChangeOp::Remove, old);
        }
        if let Some(new) = new {
            outcome = outcome.merge(self.apply(key, ChangeOp::Add, new));
        }
        outcome
    }

    pub fn get(&self, key: &G) -> Option<&TopK<K>> {
        self.charts.get(key)
    }

    /// Point-in-time copy of the chart for `key`, highest rank first.
    pub fn top_k(&self, key: &G) -> Option<Vec<RankedEntry>> {
        self.charts.get(key).map(TopK::to_vec)
    }

    pub fn keys(&self) -> impl Iterator<Item = &G> + '_ {
        self.charts.keys()
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Releases the chart for a key whose partition is no longer owned here.
    pub fn drop_key(&mut self, key: &G) -> Option<TopK<K>> {
        self.charts.remove(key)
    }

    pub fn retain_keys<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&G) -> bool,
    {
        let before = self.charts.len();
        self.charts.retain(|key, _| keep(key));
        before - self.charts.len()
    }

    /// Encoded chart for `key`; `None` when the key has not been observed.
    pub fn encode(&self, key: &G) -> Option<Bytes> {
        self.charts.get(key).map(|chart| self.codec.encode(chart))
    }

    /// Restores a chart from its encoding. An absent or empty value leaves
    /// the key unset and returns `Ok(false)`.
    pub fn restore(&mut self, key: G, bytes: Option<&[u8]>) -> Result<bool, CodecError> {
        match self.codec.decode(bytes)? {
            Some(chart) => {
                self.charts.insert(key, chart);
                Ok(true)
            }
            None => {
                self.charts.remove(&key);
                Ok(false)
            }
        }
    }
}
