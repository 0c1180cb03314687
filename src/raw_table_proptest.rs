#![cfg(test)]

// Property tests for RawTable kept inside the crate so they can read the
// tracking allocator through the table without extra plumbing.

use crate::config::{DuplicatePolicy, RemovalMode, TableConfig};
use crate::error::InsertError;
use crate::raw_table::{Insertion, RawTable};
use crate::tracking::TrackingAllocator;
use core::alloc::Layout;
use proptest::prelude::*;
use std::collections::HashMap;

// Pool-indexed operations: indices shrink to earlier keys and op lists
// shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, u32),
    Remove(usize),
    Lookup(usize),
    Mutate(usize, u32),
    Clear,
}

// Short keys over a narrow alphabet so byte sums collide often.
fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-h]{1,3}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<u32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            3 => idx.clone().prop_map(Op::Lookup),
            1 => (idx.clone(), any::<u32>()).prop_map(|(i, v)| Op::Mutate(i, v)),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn value_layout() -> Layout {
    Layout::new::<[u8; 4]>()
}

fn read(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytes.try_into().expect("4-byte value"))
}

// Property: with Overwrite + Tombstone the table behaves exactly like a map
// bounded to `capacity` keys.
// - insert succeeds iff the key exists (Replaced) or there is room (New).
// - lookup/remove agree with the model, including keys displaced past
//   removed slots.
// - live value buffers equal len (plus the slot array).
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_overwrite_matches_map(cap_log in 0u32..=4, (pool, ops) in arb_scenario()) {
        let capacity = 1usize << cap_log;
        let cfg = TableConfig::new(capacity).duplicates(DuplicatePolicy::Overwrite);
        let mut sut = RawTable::with_config_in(&cfg, value_layout(), TrackingAllocator::new()).unwrap();
        let mut model: HashMap<&str, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(i, v) => {
                    let k = pool[i].as_str();
                    let res = sut.insert(k, &v.to_le_bytes());
                    if model.contains_key(k) {
                        prop_assert_eq!(res, Ok(Insertion::Replaced));
                        model.insert(k, v);
                    } else if model.len() < capacity {
                        prop_assert_eq!(res, Ok(Insertion::New));
                        model.insert(k, v);
                    } else {
                        prop_assert_eq!(res, Err(InsertError::CapacityExceeded { capacity }));
                    }
                }
                Op::Remove(i) => {
                    let k = pool[i].as_str();
                    prop_assert_eq!(sut.remove(k), model.remove(k).is_some());
                }
                Op::Lookup(i) => {
                    let k = pool[i].as_str();
                    prop_assert_eq!(sut.lookup(k).map(read), model.get(k).copied());
                }
                Op::Mutate(i, v) => {
                    let k = pool[i].as_str();
                    if let Some(buf) = sut.lookup_mut(k) {
                        buf.copy_from_slice(&v.to_le_bytes());
                        *model.get_mut(k).expect("model has key") = v;
                    } else {
                        prop_assert!(!model.contains_key(k));
                    }
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert!(sut.len() + sut.tombstones() <= capacity);
            prop_assert_eq!(sut.allocator().live(), model.len() + 1);
            for (k, v) in &model {
                prop_assert_eq!(sut.lookup(k).map(read), Some(*v));
            }
        }
        prop_assert_eq!(sut.destroy(), model.len());
    }
}

// Property: with Shadow + Tombstone and only absent keys inserted, every
// stored key stays reachable across arbitrary removals.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_shadow_unique_keys_reachable(cap_log in 0u32..=4, (pool, ops) in arb_scenario()) {
        let capacity = 1usize << cap_log;
        let cfg = TableConfig::new(capacity);
        let mut sut = RawTable::with_config_in(&cfg, value_layout(), TrackingAllocator::new()).unwrap();
        let mut model: HashMap<&str, u32> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(i, v) | Op::Mutate(i, v) => {
                    let k = pool[i].as_str();
                    if model.contains_key(k) {
                        continue;
                    }
                    let res = sut.insert(k, &v.to_le_bytes());
                    if model.len() < capacity {
                        prop_assert_eq!(res, Ok(Insertion::New));
                        model.insert(k, v);
                    } else {
                        prop_assert_eq!(res, Err(InsertError::CapacityExceeded { capacity }));
                    }
                }
                Op::Remove(i) => {
                    let k = pool[i].as_str();
                    prop_assert_eq!(sut.remove(k), model.remove(k).is_some());
                }
                Op::Lookup(i) => {
                    let k = pool[i].as_str();
                    prop_assert_eq!(sut.lookup(k).map(read), model.get(k).copied());
                }
                Op::Clear => {
                    sut.clear();
                    model.clear();
                }
            }
            for (k, v) in &model {
                prop_assert_eq!(sut.lookup(k).map(read), Some(*v));
            }
            prop_assert_eq!(sut.allocator().live(), model.len() + 1);
        }
    }
}

// Property: in Clear mode removals may hide other keys, but lookups never
// return a value that was not stored for that key, and buffers are still
// accounted for exactly.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_clear_mode_never_returns_wrong_value(cap_log in 0u32..=4, (pool, ops) in arb_scenario()) {
        let capacity = 1usize << cap_log;
        let cfg = TableConfig::new(capacity)
            .removal(RemovalMode::Clear)
            .duplicates(DuplicatePolicy::Overwrite);
        let mut sut = RawTable::with_config_in(&cfg, value_layout(), TrackingAllocator::new()).unwrap();
        // Every value ever stored per key and still possibly present.
        let mut stored: HashMap<&str, Vec<u32>> = HashMap::new();

        for op in ops {
            match op {
                Op::Insert(i, v) | Op::Mutate(i, v) => {
                    let k = pool[i].as_str();
                    if sut.insert(k, &v.to_le_bytes()).is_ok() {
                        stored.entry(k).or_default().push(v);
                    }
                }
                Op::Remove(i) => {
                    let _ = sut.remove(pool[i].as_str());
                }
                Op::Lookup(i) => {
                    let k = pool[i].as_str();
                    if let Some(v) = sut.lookup(k).map(read) {
                        let known = stored.get(k).map(|vs| vs.contains(&v)).unwrap_or(false);
                        prop_assert!(known, "lookup returned a value never stored for {:?}", k);
                    }
                }
                Op::Clear => {
                    sut.clear();
                    stored.clear();
                }
            }
            prop_assert_eq!(sut.tombstones(), 0);
            prop_assert_eq!(sut.allocator().live(), sut.len() + 1);
            // Overwrite keeps keys unique even when some are unreachable.
            let mut keys: Vec<&str> = sut.live_keys().collect();
            prop_assert_eq!(keys.len(), sut.len());
            keys.sort_unstable();
            keys.dedup();
            prop_assert_eq!(keys.len(), sut.len(), "a key is stored twice");
        }
    }
}
