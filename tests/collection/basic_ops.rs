//! Basic Operations Tests
//!
//! Single-transaction CRUD behaviour.

use crate::*;

#[test]
fn test_insert_then_get_same_transaction() {
    let coll = collection();
    let mut txn = coll.begin();

    let rev = coll.insert(&mut txn, "alice", json!({"age": 31})).unwrap();
    let doc = coll.get(&mut txn, "alice").unwrap().unwrap();

    assert_eq!(doc.key, "alice");
    assert_eq!(doc.revision, rev);
    assert_eq!(doc.body, json!({"age": 31}));
}

#[test]
fn test_get_missing_returns_none() {
    let coll = collection();
    let mut txn = coll.begin();
    assert!(coll.get(&mut txn, "nobody").unwrap().is_none());
    assert!(!coll.contains(&txn, "nobody").unwrap());
}

#[test]
fn test_duplicate_insert() {
    let coll = seeded(&[("k", json!(1))]);
    let mut txn = coll.begin();
    let err = coll.insert(&mut txn, "k", json!(2)).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(ref key) if key == "k"));
    assert_eq!(body_of(&coll, &mut txn, "k"), Some(json!(1)));
}

#[test]
fn test_update_missing_key() {
    let coll = collection();
    let mut txn = coll.begin();
    let err = coll.update(&mut txn, "k", json!(1)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_remove_missing_key() {
    let coll = collection();
    let mut txn = coll.begin();
    assert!(coll.remove(&mut txn, "k").unwrap_err().is_not_found());
}

#[test]
fn test_repeated_update_in_one_transaction_keeps_one_slot() {
    let coll = collection();
    let mut txn = coll.begin();
    coll.insert(&mut txn, "counter", json!(0)).unwrap();
    let used = coll.stats().index.used;

    for i in 1..=20 {
        coll.update(&mut txn, "counter", json!(i)).unwrap();
        assert_eq!(coll.stats().index.used, used);
    }
    assert_eq!(body_of(&coll, &mut txn, "counter"), Some(json!(20)));
}

#[test]
fn test_insert_then_remove_in_one_transaction_vacates() {
    let coll = seeded(&[("other", json!(0))]);
    let mut txn = coll.begin();
    let used = coll.stats().index.used;

    coll.insert(&mut txn, "tmp", json!("scratch")).unwrap();
    assert_eq!(coll.stats().index.used, used + 1);
    coll.remove(&mut txn, "tmp").unwrap();

    assert_eq!(coll.stats().index.used, used);
    assert!(coll.get(&mut txn, "tmp").unwrap().is_none());
    assert!(coll.get(&mut txn, "other").unwrap().is_some());
}

#[test]
fn test_remove_then_reinsert_same_transaction() {
    let coll = seeded(&[("k", json!("old"))]);
    let mut txn = coll.begin();
    coll.remove(&mut txn, "k").unwrap();
    coll.insert(&mut txn, "k", json!("new")).unwrap();
    assert_eq!(body_of(&coll, &mut txn, "k"), Some(json!("new")));
}

#[test]
fn test_all_is_sorted_and_reflects_own_writes() {
    let coll = seeded(&[("b", json!(2)), ("a", json!(1)), ("c", json!(3))]);
    let mut txn = coll.begin();
    coll.remove(&mut txn, "b").unwrap();
    coll.insert(&mut txn, "d", json!(4)).unwrap();
    coll.update(&mut txn, "a", json!(10)).unwrap();

    let docs = coll.all(&txn).unwrap();
    let pairs: Vec<_> = docs.iter().map(|d| (d.key.as_str(), d.body.clone())).collect();
    assert_eq!(
        pairs,
        vec![("a", json!(10)), ("c", json!(3)), ("d", json!(4))]
    );
}

#[test]
fn test_closed_transaction_rejected() {
    let coll = collection();
    let mut txn = coll.begin();
    coll.commit(&mut txn).unwrap();

    let err = coll.insert(&mut txn, "k", json!(1)).unwrap_err();
    assert!(matches!(err, Error::Transaction(_)));
    assert!(matches!(coll.commit(&mut txn), Err(Error::Transaction(_))));
    assert!(matches!(coll.abort(&mut txn, "late"), Err(Error::Transaction(_))));
}

#[test]
fn test_revisions_are_unique() {
    let coll = collection();
    let mut txn = coll.begin();
    let a = coll.insert(&mut txn, "a", json!(1)).unwrap();
    let b = coll.update(&mut txn, "a", json!(2)).unwrap();
    let c = coll.insert(&mut txn, "c", json!(3)).unwrap();
    assert!(a < b && b < c);
}
