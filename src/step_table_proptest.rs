#![cfg(test)]

// Property tests for StepTable kept inside the crate so they can inspect
// capacity against the schedule without widening the public API.

use crate::error::StepTableError;
use crate::key::StepKey;
use crate::schedule::SizeSchedule;
use crate::step_table::StepTable;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}
impl StepKey for Key {
    fn as_key_str(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    GetOrInsert(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario(
    key_pattern: &'static str,
    pool_size: usize,
) -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec(key_pattern, 1..=pool_size).prop_flat_map(move |pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::GetOrInsert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                key_pattern.prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drive `sut` and a std HashMap model through the same operations.
// Invariants checked after every op:
// - get/contains parity with the model; removed keys are absent.
// - Overwrites keep a single logical entry.
// - Iteration yields each live key exactly once.
// - len parity; capacity is a schedule entry and never shrinks.
// - Load stays at or under 2/3 until the schedule is exhausted.
// - CapacityExhausted only when a new key meets a literally full table.
fn run_state_machine(
    mut sut: StepTable<Key, i32>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let schedule: SizeSchedule = sut.schedule().clone();
    let mut last_capacity = sut.capacity();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(pool, i);
                match sut.insert(k.clone(), v) {
                    Ok(prev) => {
                        prop_assert_eq!(prev, model.insert(k, v));
                    }
                    Err(StepTableError::CapacityExhausted { capacity }) => {
                        prop_assert!(!model.contains_key(&k));
                        prop_assert_eq!(capacity, schedule.max_capacity());
                        prop_assert!(sut.is_full());
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::GetOrInsert(i, v) => {
                let k = key_from(pool, i);
                let expected = model.get(&k).copied();
                match sut.get_or_insert_with(k.clone(), || v) {
                    Ok(got) => {
                        prop_assert_eq!(*got, expected.unwrap_or(v));
                        model.entry(k).or_insert(v);
                    }
                    Err(StepTableError::CapacityExhausted { .. }) => {
                        prop_assert!(expected.is_none());
                        prop_assert!(sut.is_full());
                    }
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                match model.remove(&k) {
                    Some(mv) => prop_assert_eq!(sut.remove(&k), Ok(mv)),
                    None => prop_assert_eq!(sut.remove(&k), Err(StepTableError::KeyNotFound)),
                }
                prop_assert!(!sut.contains_key(&k));
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.try_get(&k).ok(), model.get(&k));
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(vr) = sut.get_mut(&k) {
                    *vr = vr.saturating_add(d);
                    let mv = model.get_mut(&k).expect("model tracks live key");
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(!model.contains_key(&k));
                }
            }
            OpI::Iterate => {
                let s_keys: Vec<_> = sut.keys().cloned().collect();
                let unique: BTreeSet<_> = s_keys.iter().cloned().collect();
                prop_assert_eq!(s_keys.len(), unique.len(), "a key stored twice");
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(unique, m_keys);
                for (k, v) in sut.iter() {
                    prop_assert_eq!(Some(v), model.get(k));
                }
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        let capacity = sut.capacity();
        prop_assert!(schedule.sizes().contains(&capacity));
        prop_assert!(capacity >= last_capacity, "capacity shrank");
        if capacity < schedule.max_capacity() {
            prop_assert!(sut.len() * 3 <= capacity * 2, "load above 2/3");
        }
        last_capacity = capacity;
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario("[a-zA-Z]{1,5}", 40)) {
        run_state_machine(StepTable::new(), &pool, ops)?;
    }
}

// Keys sharing a first character share a probe step, and a short schedule
// forces the table to fill completely. This stresses tombstone reuse and
// the full-table path.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario("A[a-c]{0,3}", 24)) {
        let sut = StepTable::with_sizes(vec![3, 7, 11]).unwrap();
        run_state_machine(sut, &pool, ops)?;
    }
}

proptest! {
    // Property: round-trip survives any number of unrelated inserts/removes.
    #[test]
    fn prop_unrelated_ops_preserve_entry(
        others in proptest::collection::vec(("[b-z][a-z]{0,4}", any::<bool>()), 0..200),
        v in any::<i32>(),
    ) {
        let mut t: StepTable<String, i32> = StepTable::new();
        t.insert("Anchor".to_string(), v).unwrap();
        for (k, remove) in others {
            if remove {
                let _ = t.remove(k.as_str());
            } else {
                t.insert(k, 0).unwrap();
            }
            prop_assert_eq!(t.get("Anchor"), Some(&v));
        }
    }
}
