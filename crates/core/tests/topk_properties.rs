use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use charts_core::{Codec, RankedEntry, TopK, TopKCodec};

#[derive(Debug, Clone, Copy)]
enum Op {
    Add(RankedEntry),
    Remove(RankedEntry),
}

fn arb_entry() -> impl Strategy<Value = RankedEntry> {
    // A small identity space forces upserts, stale retractions and ties.
    (0i64..12, -3i64..40).prop_map(|(identity, score)| RankedEntry::new(identity, score))
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => arb_entry().prop_map(Op::Add),
            1 => arb_entry().prop_map(Op::Remove),
        ],
        0..64,
    )
}

fn apply<const K: usize>(chart: &mut TopK<K>, op: Op) {
    match op {
        Op::Add(entry) => {
            chart.add(entry);
        }
        Op::Remove(entry) => {
            chart.remove(&entry);
        }
    }
}

/// Straightforward model: a sorted vector truncated to `k`.
fn model_apply(model: &mut Vec<RankedEntry>, k: usize, op: Op) {
    match op {
        Op::Add(entry) => {
            model.retain(|e| e.identity != entry.identity);
            model.push(entry);
            model.sort();
            model.truncate(k);
        }
        Op::Remove(entry) => model.retain(|e| *e != entry),
    }
}

fn check_sequence<const K: usize>(ops: &[Op]) -> Result<(), TestCaseError> {
    let mut chart = TopK::<K>::new();
    let mut model = Vec::new();
    for op in ops {
        apply(&mut chart, *op);
        model_apply(&mut model, K, *op);
        prop_assert!(chart.invariants_hold(), "invariants broken after {:?}", op);
        prop_assert!(chart.len() <= K);
        prop_assert_eq!(chart.to_vec(), model.clone());
    }
    Ok(())
}

fn check_round_trip<const K: usize>(ops: &[Op]) -> Result<(), TestCaseError> {
    let mut chart = TopK::<K>::new();
    for op in ops {
        apply(&mut chart, *op);
    }
    let codec = TopKCodec::<K>::new();
    let bytes = codec.encode(&chart);
    prop_assert_eq!(bytes.len(), chart.len() * 16);
    let decoded = codec.decode(Some(&bytes[..])).map_err(|e| TestCaseError::fail(e.to_string()))?;
    if chart.is_empty() {
        prop_assert!(decoded.is_none());
    } else {
        prop_assert_eq!(decoded.as_ref().map(TopK::to_vec), Some(chart.to_vec()));
        prop_assert_eq!(decoded, Some(chart));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn invariants_hold_for_any_sequence(ops in arb_ops()) {
        check_sequence::<1>(&ops)?;
        check_sequence::<2>(&ops)?;
        check_sequence::<3>(&ops)?;
        check_sequence::<5>(&ops)?;
    }

    #[test]
    fn encoding_round_trips_reachable_charts(ops in arb_ops()) {
        check_round_trip::<1>(&ops)?;
        check_round_trip::<5>(&ops)?;
    }

    #[test]
    fn repeated_add_is_idempotent(ops in arb_ops(), entry in arb_entry()) {
        let mut once = TopK::<3>::new();
        for op in &ops {
            apply(&mut once, *op);
        }
        let mut twice = once.clone();
        once.add(entry);
        twice.add(entry);
        twice.add(entry);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn increasing_scores_keep_the_highest(base in -1_000i64..1_000, step in 1i64..50) {
        let mut chart = TopK::<5>::new();
        for id in 0..6i64 {
            chart.add(RankedEntry::new(id, base + id * step));
        }
        let expected: Vec<_> = (1..6i64)
            .rev()
            .map(|id| RankedEntry::new(id, base + id * step))
            .collect();
        prop_assert_eq!(chart.to_vec(), expected);
    }
}

#[test]
fn equal_scores_break_ties_by_identity() {
    let mut chart = TopK::<5>::new();
    chart.add(RankedEntry::new(5, 10));
    chart.add(RankedEntry::new(2, 10));
    assert_eq!(chart.to_vec(), vec![RankedEntry::new(2, 10), RankedEntry::new(5, 10)]);
}

#[test]
fn seventeen_bytes_are_rejected() {
    let codec = TopKCodec::<5>::new();
    let err = codec.decode(Some(&[7u8; 17][..])).unwrap_err();
    assert!(err.to_string().contains("17 bytes"));
}

#[test]
fn reversed_pair_for_one_identity_still_converges() {
    // add(new) arriving before remove(old) upserts first; the stale score then
    // fails to match and the retraction is ignored.
    let mut chart = TopK::<5>::new();
    chart.add(RankedEntry::new(1, 4));
    chart.add(RankedEntry::new(1, 5));
    chart.remove(&RankedEntry::new(1, 4));
    assert_eq!(chart.to_vec(), vec![RankedEntry::new(1, 5)]);
}

#[test]
fn reversed_pair_loses_a_ranked_entry_when_the_chart_is_full() {
    // With the add first, a full chart evicts its lowest entry before the
    // retraction frees a slot.
    let mut ordered = TopK::<2>::new();
    let mut reversed = TopK::<2>::new();
    for chart in [&mut ordered, &mut reversed] {
        chart.add(RankedEntry::new(1, 10));
        chart.add(RankedEntry::new(2, 5));
    }

    ordered.remove(&RankedEntry::new(1, 10));
    ordered.add(RankedEntry::new(3, 7));

    reversed.add(RankedEntry::new(3, 7));
    reversed.remove(&RankedEntry::new(1, 10));

    assert_eq!(ordered.to_vec(), vec![RankedEntry::new(3, 7), RankedEntry::new(2, 5)]);
    assert_eq!(reversed.to_vec(), vec![RankedEntry::new(3, 7)]);
}
