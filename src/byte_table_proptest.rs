#![cfg(test)]

// Property tests for ByteTable kept inside the crate so they can check the
// chain-walk invariants through `assert_invariants`.

use crate::byte_table::{ByteTable, Handle};
use crate::config::{Flags, TableConfig};
use crate::hash_function::HashFunction;
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

// Pool-indexed operations to improve shrinking: indices shrink to earlier
// keys, pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, Vec<u8>),
    Remove(usize),
    Get(usize),
    Contains(Vec<u8>),
    Find(usize),
    Resize(usize),
    Keys,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<Vec<u8>>, Vec<Op>)> {
    proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..6), 1..=12).prop_flat_map(
        |pool| {
            let idx = 0..pool.len();
            let op = prop_oneof![
                4 => (idx.clone(), proptest::collection::vec(any::<u8>(), 0..8))
                    .prop_map(|(i, v)| Op::Insert(i, v)),
                2 => idx.clone().prop_map(Op::Remove),
                2 => idx.clone().prop_map(Op::Get),
                1 => proptest::collection::vec(any::<u8>(), 0..6).prop_map(Op::Contains),
                1 => idx.clone().prop_map(Op::Find),
                1 => (1usize..40).prop_map(Op::Resize),
                1 => Just(Op::Keys),
                1 => Just(Op::Clear),
            ];
            proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
        },
    )
}

/// Sends every key to bucket 0.
struct Constant;
impl HashFunction for Constant {
    fn hash32(&self, _bytes: &[u8], _seed: u32) -> u32 {
        0
    }
}

// State-machine equivalence against a hashbrown::HashMap model.
// After every operation:
// - chain walk count == len, collisions == non-head entries, every entry
//   sits in the bucket its key hashes to;
// - len/is_empty parity with the model;
// - handles obtained earlier resolve iff their key is still present.
fn run_state_machine<H: HashFunction>(
    mut sut: ByteTable<'static, H>,
    pool: &[Vec<u8>],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    let mut handles: Vec<(Vec<u8>, Handle)> = Vec::new();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = pool[i].clone();
                sut.insert(k.clone(), v.clone()).unwrap();
                model.insert(k, v);
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let before = sut.len();
                let removed = sut.remove(k);
                prop_assert_eq!(removed, model.remove(k).is_some());
                prop_assert_eq!(sut.len(), before - usize::from(removed));
                prop_assert!(!sut.contains(k));
                if removed {
                    handles.retain(|(hk, _)| hk != k);
                }
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k).map(Vec::as_slice));
            }
            Op::Contains(k) => {
                prop_assert_eq!(sut.contains(&k), model.contains_key(&k));
            }
            Op::Find(i) => {
                let k = &pool[i];
                let h = sut.find(k);
                prop_assert_eq!(h.is_some(), model.contains_key(k));
                if let Some(h) = h {
                    prop_assert_eq!(h.key(&sut), Some(k.as_slice()));
                    handles.push((k.clone(), h));
                }
            }
            Op::Resize(cap) => {
                sut.resize(cap).unwrap();
                prop_assert_eq!(sut.capacity(), cap);
                for (k, v) in &model {
                    prop_assert_eq!(sut.get(k), Some(v.as_slice()));
                }
            }
            Op::Keys => {
                let keys = sut.keys();
                prop_assert_eq!(keys.len(), sut.len());
                let s_keys: BTreeSet<Vec<u8>> = keys.into_iter().map(<[u8]>::to_vec).collect();
                let m_keys: BTreeSet<Vec<u8>> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
            Op::Clear => {
                sut.clear().unwrap();
                model.clear();
                handles.clear();
                prop_assert!(sut.keys().is_empty());
            }
        }

        sut.assert_invariants();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        // Replacing a value keeps the entry, so its handle keeps resolving.
        for (k, h) in &handles {
            prop_assert_eq!(h.value(&sut), model.get(k).map(Vec::as_slice));
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        // Tiny start and threshold so autoresize runs often.
        let config = TableConfig::default()
            .with_initial_capacity(2)
            .with_max_load_factor(0.25);
        run_state_machine(ByteTable::with_config(config).unwrap(), &pool, ops)?;
    }
}

// Same invariants under worst-case collisions: every key shares one chain,
// which stresses head removal, tail append and relinking during resize.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        let config = TableConfig::default().with_flags(Flags::NO_AUTORESIZE);
        run_state_machine(ByteTable::with_hasher(config, Constant).unwrap(), &pool, ops)?;
    }
}

// Removed handles never resolve again, even after their slot is reused
// by later inserts.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_stale_handles_stay_dead(n in 1usize..40) {
        let mut sut = ByteTable::new();
        let keys: Vec<Vec<u8>> = (0..n).map(|i| (i as u32).to_be_bytes().to_vec()).collect();
        for k in &keys {
            sut.insert(k.clone(), k.clone()).unwrap();
        }
        let stale: Vec<Handle> = keys.iter().map(|k| sut.find(k).unwrap()).collect();
        for k in &keys {
            prop_assert!(sut.remove(k));
        }
        for k in &keys {
            sut.insert(k.clone(), b"again".to_vec()).unwrap();
        }
        for h in &stale {
            prop_assert_eq!(h.value(&sut), None);
        }
        sut.assert_invariants();
    }
}
