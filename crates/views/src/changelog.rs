use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use charts_core::RankedEntry;

use crate::store::ChartUpdate;

/// Buffers `(key, entry, time, diff)` changes seen on a worker's collection
/// until the epoch that produced them completes.
///
/// Differential delivers the retraction of an old count and the addition of
/// the new one in the same batch, in no promised order. Draining sorts each
/// key's changes so the retraction reaches the chart first.
pub struct ChangeLog<G, T> {
    pending: Rc<RefCell<Vec<(T, G, RankedEntry, isize)>>>,
}

impl<G, T> Clone for ChangeLog<G, T> {
    fn clone(&self) -> Self {
        Self {
            pending: Rc::clone(&self.pending),
        }
    }
}

impl<G, T> Default for ChangeLog<G, T> {
    fn default() -> Self {
        Self {
            pending: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<G: Ord, T: Ord> ChangeLog<G, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, key: G, entry: RankedEntry, time: T, diff: isize) {
        self.pending.borrow_mut().push((time, key, entry, diff));
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Takes every buffered change as feed operations ordered by time, then
    /// key, with retractions ahead of additions. Changes that cancel out
    /// within a time are dropped.
    pub fn drain_ordered(&self) -> Vec<ChartUpdate<G>> {
        let mut pending = std::mem::take(&mut *self.pending.borrow_mut());
        pending.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));

        let mut consolidated: Vec<(T, G, RankedEntry, isize)> = Vec::with_capacity(pending.len());
        for (time, key, entry, diff) in pending {
            match consolidated.last_mut() {
                Some(last) if last.0 == time && last.1 == key && last.2 == entry => last.3 += diff,
                _ => consolidated.push((time, key, entry, diff)),
            }
        }

        let mut updates: Vec<(T, ChartUpdate<G>)> = consolidated
            .into_iter()
            .filter(|(_, _, _, diff)| *diff != 0)
            .map(|(time, key, entry, diff)| {
                if diff.abs() > 1 {
                    warn!(%entry, diff, "chart value with multiplicity above one");
                }
                let update = if diff < 0 {
                    ChartUpdate::remove(key, entry)
                } else {
                    ChartUpdate::add(key, entry)
                };
                (time, update)
            })
            .collect();
        updates.sort();
        updates.into_iter().map(|(_, update)| update).collect()
    }
}
