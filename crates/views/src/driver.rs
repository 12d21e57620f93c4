//! Turns a stream of latest values into ordered retraction/upsert pairs.
//!
//! Table-like sources only report the new value of a record. Charts need the
//! old value retracted before the new one is added, possibly under a
//! different grouping key, so the driver remembers what it last emitted for
//! each upstream record.

use std::collections::HashMap;
use std::hash::Hash;

use charts_core::{Identity, RankedEntry, Score};

use crate::store::ChartUpdate;

/// The updates produced by one upstream change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOutcome<G> {
    pub retracted: Option<(G, RankedEntry)>,
    pub upserted: Option<(G, RankedEntry)>,
}

impl<G> Default for DriverOutcome<G> {
    fn default() -> Self {
        Self {
            retracted: None,
            upserted: None,
        }
    }
}

impl<G> DriverOutcome<G> {
    pub fn is_empty(&self) -> bool {
        self.retracted.is_none() && self.upserted.is_none()
    }

    /// The feed operations, retraction first.
    pub fn into_updates(self) -> impl Iterator<Item = ChartUpdate<G>> {
        let removed = self
            .retracted
            .map(|(key, entry)| ChartUpdate::remove(key, entry));
        let added = self.upserted.map(|(key, entry)| ChartUpdate::add(key, entry));
        removed.into_iter().chain(added)
    }
}

/// Remembers the last `(group, entry)` emitted per upstream record `U`.
#[derive(Debug, Clone)]
pub struct RetractionDriver<U, G> {
    current: HashMap<U, (G, RankedEntry)>,
}

impl<U, G> Default for RetractionDriver<U, G> {
    fn default() -> Self {
        Self {
            current: HashMap::new(),
        }
    }
}

impl<U, G> RetractionDriver<U, G>
where
    U: Eq + Hash,
    G: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry` as the value of `upstream`, grouped under `group`.
    /// An unchanged value produces no updates.
    pub fn upsert(&mut self, upstream: U, group: G, entry: RankedEntry) -> DriverOutcome<G> {
        match self.current.insert(upstream, (group.clone(), entry)) {
            Some((old_group, old_entry)) if old_group == group && old_entry == entry => {
                DriverOutcome::default()
            }
            previous => DriverOutcome {
                retracted: previous,
                upserted: Some((group, entry)),
            },
        }
    }

    /// Deletes `upstream`, retracting whatever was last emitted for it.
    pub fn retract(&mut self, upstream: &U) -> DriverOutcome<G> {
        DriverOutcome {
            retracted: self.current.remove(upstream),
            upserted: None,
        }
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Forgets every record whose group fails `keep`, without emitting
    /// retractions. Used when the charts for those groups are dropped.
    pub fn forget_groups<F>(&mut self, mut keep: F)
    where
        F: FnMut(&G) -> bool,
    {
        self.current.retain(|_, (group, _)| keep(group));
    }
}

impl<G> RetractionDriver<(G, Identity), G>
where
    G: Clone + Eq + Hash,
{
    /// Counts `delta` more occurrences of `identity` within `group`.
    pub fn increment(&mut self, group: G, identity: Identity, delta: Score) -> DriverOutcome<G> {
        let score = self
            .current
            .get(&(group.clone(), identity))
            .map(|(_, entry)| entry.score)
            .unwrap_or(0)
            + delta;
        self.upsert(
            (group.clone(), identity),
            group,
            RankedEntry::new(identity, score),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charts_core::ChangeOp;

    #[test]
    fn first_value_is_a_plain_add() {
        let mut driver = RetractionDriver::<i64, &str>::new();
        let outcome = driver.upsert(1, "rock", RankedEntry::new(1, 1));
        assert_eq!(outcome.retracted, None);
        assert_eq!(outcome.upserted, Some(("rock", RankedEntry::new(1, 1))));
    }

    #[test]
    fn change_retracts_old_value_first() {
        let mut driver = RetractionDriver::<i64, &str>::new();
        driver.upsert(1, "rock", RankedEntry::new(1, 1));
        let updates: Vec<_> = driver
            .upsert(1, "rock", RankedEntry::new(1, 2))
            .into_updates()
            .collect();
        assert_eq!(
            updates,
            vec![
                ChartUpdate { key: "rock", op: ChangeOp::Remove, entry: RankedEntry::new(1, 1) },
                ChartUpdate { key: "rock", op: ChangeOp::Add, entry: RankedEntry::new(1, 2) },
            ]
        );
    }

    #[test]
    fn regrouped_record_is_retracted_from_its_old_group() {
        let mut driver = RetractionDriver::<i64, &str>::new();
        driver.upsert(1, "rock", RankedEntry::new(1, 5));
        let outcome = driver.upsert(1, "pop", RankedEntry::new(1, 5));
        assert_eq!(outcome.retracted, Some(("rock", RankedEntry::new(1, 5))));
        assert_eq!(outcome.upserted, Some(("pop", RankedEntry::new(1, 5))));
    }

    #[test]
    fn unchanged_value_is_silent() {
        let mut driver = RetractionDriver::<i64, &str>::new();
        driver.upsert(1, "rock", RankedEntry::new(1, 5));
        assert!(driver.upsert(1, "rock", RankedEntry::new(1, 5)).is_empty());
    }

    #[test]
    fn increments_accumulate_per_group() {
        let mut driver = RetractionDriver::<(&str, i64), &str>::new();
        driver.increment("telco", 3, 1);
        let outcome = driver.increment("telco", 3, 2);
        assert_eq!(outcome.retracted, Some(("telco", RankedEntry::new(3, 1))));
        assert_eq!(outcome.upserted, Some(("telco", RankedEntry::new(3, 3))));
        assert_eq!(
            driver.increment("health", 3, 1).upserted,
            Some(("health", RankedEntry::new(3, 1)))
        );
    }

    #[test]
    fn retract_emits_last_value() {
        let mut driver = RetractionDriver::<i64, &str>::new();
        driver.upsert(9, "jazz", RankedEntry::new(9, 4));
        let updates: Vec<_> = driver.retract(&9).into_updates().collect();
        assert_eq!(updates, vec![ChartUpdate::remove("jazz", RankedEntry::new(9, 4))]);
        assert!(driver.retract(&9).is_empty());
    }
}
