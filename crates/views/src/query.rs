//! Read-only access to charts owned by other workers.
//!
//! A worker never hands out its [`ChartStore`]. It publishes a
//! [`ShardSnapshot`] with every chart encoded by the codec, and a
//! [`ChartRouter`] built from the published snapshots forwards each query to
//! the shard that owns the key.

use std::collections::BTreeMap;
use std::hash::Hash;

use bytes::Bytes;
use differential_dataflow::hashable::Hashable;
use serde::Serialize;
use tracing::debug;

use charts_core::{Codec, CodecError, RankedEntry, TopKCodec};

use crate::store::ChartStore;

pub type ShardId = usize;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("shard {shard} already published")]
    DuplicateShard { shard: ShardId },
    #[error("key published by both shard {first} and shard {second}")]
    SharedKey { first: ShardId, second: ShardId },
    #[error("shard {shard} holds a corrupt chart: {source}")]
    Corrupt {
        shard: ShardId,
        #[source]
        source: CodecError,
    },
}

/// Queries a chart owner can answer.
pub trait ChartQuery<G> {
    /// The chart for `key`, highest rank first; `None` if the key is unknown.
    fn top_k(&self, key: &G) -> Result<Option<Vec<RankedEntry>>, QueryError>;

    /// Every key with a chart, for discovery.
    fn keys(&self) -> Vec<G>;
}

impl<G: Ord + Clone, const K: usize> ChartQuery<G> for ChartStore<G, K> {
    fn top_k(&self, key: &G) -> Result<Option<Vec<RankedEntry>>, QueryError> {
        Ok(ChartStore::top_k(self, key))
    }

    fn keys(&self) -> Vec<G> {
        ChartStore::keys(self).cloned().collect()
    }
}

/// Picks the shard owning `key`, using the same hash the dataflow exchanges
/// chart keys by.
pub fn shard_for<G: Hash>(key: &G, shards: usize) -> ShardId {
    (key.hashed() % shards.max(1) as u64) as ShardId
}

/// A worker's charts in their transfer encoding.
#[derive(Debug, Clone)]
pub struct ShardSnapshot<G> {
    pub shard: ShardId,
    pub charts: BTreeMap<G, Bytes>,
}

impl<G: Ord + Clone> ShardSnapshot<G> {
    pub fn capture<const K: usize>(shard: ShardId, store: &ChartStore<G, K>) -> Self {
        let charts = store
            .keys()
            .filter_map(|key| store.encode(key).map(|bytes| (key.clone(), bytes)))
            .collect();
        Self { shard, charts }
    }
}

/// Discovery metadata: which keys a shard serves.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShardMetadata<G> {
    pub shard: ShardId,
    pub keys: Vec<G>,
}

/// Routes chart queries to the shard that published the key.
#[derive(Debug, Clone)]
pub struct ChartRouter<G, const K: usize> {
    shards: BTreeMap<ShardId, ShardSnapshot<G>>,
    directory: BTreeMap<G, ShardId>,
    codec: TopKCodec<K>,
}

impl<G: Ord + Clone, const K: usize> Default for ChartRouter<G, K> {
    fn default() -> Self {
        Self {
            shards: BTreeMap::new(),
            directory: BTreeMap::new(),
            codec: TopKCodec::new(),
        }
    }
}

impl<G: Ord + Clone, const K: usize> ChartRouter<G, K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshots<I>(snapshots: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = ShardSnapshot<G>>,
    {
        let mut router = Self::new();
        for snapshot in snapshots {
            router.publish(snapshot)?;
        }
        Ok(router)
    }

    /// Registers a shard's snapshot. Keys must be owned by a single shard.
    pub fn publish(&mut self, snapshot: ShardSnapshot<G>) -> Result<(), QueryError> {
        if self.shards.contains_key(&snapshot.shard) {
            return Err(QueryError::DuplicateShard { shard: snapshot.shard });
        }
        for key in snapshot.charts.keys() {
            if let Some(&first) = self.directory.get(key) {
                return Err(QueryError::SharedKey { first, second: snapshot.shard });
            }
        }
        for key in snapshot.charts.keys() {
            self.directory.insert(key.clone(), snapshot.shard);
        }
        debug!(shard = snapshot.shard, charts = snapshot.charts.len(), "shard published");
        self.shards.insert(snapshot.shard, snapshot);
        Ok(())
    }

    pub fn owner_of(&self, key: &G) -> Option<ShardId> {
        self.directory.get(key).copied()
    }

    pub fn shards_for_discovery(&self) -> Vec<ShardMetadata<G>> {
        self.shards
            .values()
            .map(|snapshot| ShardMetadata {
                shard: snapshot.shard,
                keys: snapshot.charts.keys().cloned().collect(),
            })
            .collect()
    }
}

impl<G: Ord + Clone, const K: usize> ChartQuery<G> for ChartRouter<G, K> {
    fn top_k(&self, key: &G) -> Result<Option<Vec<RankedEntry>>, QueryError> {
        let Some(shard) = self.owner_of(key) else {
            return Ok(None);
        };
        let bytes = self
            .shards
            .get(&shard)
            .and_then(|snapshot| snapshot.charts.get(key));
        // An empty chart travels as zero bytes and reads back as unset.
        let chart = self
            .codec
            .decode(bytes.map(|bytes| &bytes[..]))
            .map_err(|source| QueryError::Corrupt { shard, source })?;
        Ok(Some(chart.map(|chart| chart.to_vec()).unwrap_or_default()))
    }

    fn keys(&self) -> Vec<G> {
        self.directory.keys().cloned().collect()
    }
}
