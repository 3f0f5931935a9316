//! Randomized Interleaving Tests
//!
//! Drives several transactions through random operation sequences and
//! checks that no transaction ever sees two revisions of one key.

use crate::*;
use proptest::prelude::*;
use std::collections::HashSet;

const SLOTS: usize = 3;
const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
enum Op {
    Insert(usize, usize),
    Update(usize, usize),
    Remove(usize, usize),
    Get(usize, usize),
    Commit(usize),
    Abort(usize),
    Vacuum,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let slot = 0..SLOTS;
    let key = 0..KEYS.len();
    prop_oneof![
        3 => (slot.clone(), key.clone()).prop_map(|(s, k)| Op::Insert(s, k)),
        3 => (slot.clone(), key.clone()).prop_map(|(s, k)| Op::Update(s, k)),
        2 => (slot.clone(), key.clone()).prop_map(|(s, k)| Op::Remove(s, k)),
        2 => (slot.clone(), key).prop_map(|(s, k)| Op::Get(s, k)),
        1 => slot.clone().prop_map(Op::Commit),
        1 => slot.prop_map(Op::Abort),
        1 => Just(Op::Vacuum),
    ]
}

fn assert_unique_keys(coll: &DocumentCollection, txn: &Transaction) {
    let docs = coll.all(txn).unwrap();
    let mut seen = HashSet::new();
    for doc in &docs {
        assert!(seen.insert(doc.key.clone()), "{} visible twice", doc.key);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_at_most_one_visible_revision(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let coll = DocumentCollection::builder("prop")
            .initial_capacity(2)
            .build()
            .unwrap();
        let mut txns: Vec<Transaction> = (0..SLOTS).map(|_| coll.begin()).collect();

        for (step, op) in ops.into_iter().enumerate() {
            // business errors are expected; capacity errors are not
            let result = match op {
                Op::Insert(s, k) => coll.insert(&mut txns[s], KEYS[k], json!(step)).map(|_| ()),
                Op::Update(s, k) => coll.update(&mut txns[s], KEYS[k], json!(step)).map(|_| ()),
                Op::Remove(s, k) => coll.remove(&mut txns[s], KEYS[k]).map(|_| ()),
                Op::Get(s, k) => coll.get(&mut txns[s], KEYS[k]).map(|_| ()),
                Op::Commit(s) => {
                    coll.commit(&mut txns[s]).unwrap();
                    txns[s] = coll.begin();
                    Ok(())
                }
                Op::Abort(s) => {
                    coll.abort(&mut txns[s], "random").unwrap();
                    txns[s] = coll.begin();
                    Ok(())
                }
                Op::Vacuum => {
                    coll.vacuum();
                    Ok(())
                }
            };
            if let Err(e) = result {
                prop_assert!(!e.is_serious(), "unexpected error: {}", e);
            }

            for txn in &txns {
                assert_unique_keys(&coll, txn);
            }
            let stats = coll.stats().index;
            prop_assert!(stats.used * 2 <= stats.capacity);
        }
    }

    #[test]
    fn prop_committed_state_matches_model(
        ops in prop::collection::vec((0..3u8, 0..KEYS.len()), 1..60),
    ) {
        let coll = collection();
        let mut model: std::collections::BTreeMap<&str, serde_json::Value> = Default::default();

        // one transaction per operation, committed in order
        for (step, (kind, k)) in ops.into_iter().enumerate() {
            let key = KEYS[k];
            let mut txn = coll.begin();
            let result = match kind {
                0 => coll.insert(&mut txn, key, json!(step)).map(|_| ()),
                1 => coll.update(&mut txn, key, json!(step)).map(|_| ()),
                _ => coll.remove(&mut txn, key).map(|_| ()),
            };
            match (kind, result) {
                (0, Ok(())) => {
                    prop_assert!(!model.contains_key(key));
                    model.insert(key, json!(step));
                }
                (0, Err(e)) => {
                    prop_assert!(matches!(e, Error::DuplicateKey(_)));
                }
                (1, Ok(())) => {
                    prop_assert!(model.contains_key(key));
                    model.insert(key, json!(step));
                }
                (_, Ok(())) => {
                    prop_assert!(model.remove(key).is_some());
                }
                (_, Err(e)) => {
                    prop_assert!(e.is_not_found());
                    prop_assert!(!model.contains_key(key));
                }
            }
            coll.commit(&mut txn).unwrap();
        }

        let reader = coll.begin();
        let docs: Vec<_> = coll
            .all(&reader)
            .unwrap()
            .into_iter()
            .map(|d| (d.key, d.body))
            .collect();
        let expected: Vec<_> = model.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        prop_assert_eq!(docs, expected);
    }
}
