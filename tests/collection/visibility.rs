//! Visibility Tests
//!
//! What each transaction sees while others are in flight.

use crate::*;

#[test]
fn test_uncommitted_insert_invisible_to_later_transaction() {
    let coll = collection();
    let mut t1 = coll.begin();
    coll.insert(&mut t1, "k", json!("v")).unwrap();

    let mut t2 = coll.begin();
    assert!(coll.get(&mut t2, "k").unwrap().is_none());
    assert_eq!(body_of(&coll, &mut t1, "k"), Some(json!("v")));

    coll.commit(&mut t1).unwrap();
    let mut t3 = coll.begin();
    assert_eq!(body_of(&coll, &mut t3, "k"), Some(json!("v")));
}

#[test]
fn test_insert_invisible_to_earlier_transaction_after_commit() {
    let coll = collection();
    let mut early = coll.begin();
    let mut writer = coll.begin();
    coll.insert(&mut writer, "k", json!(1)).unwrap();
    coll.commit(&mut writer).unwrap();

    // created by a larger id
    assert!(coll.get(&mut early, "k").unwrap().is_none());
}

#[test]
fn test_update_keeps_old_revision_for_earlier_readers() {
    let coll = seeded(&[("k", json!("v1"))]);

    let mut reader = coll.begin();
    assert_eq!(body_of(&coll, &mut reader, "k"), Some(json!("v1")));

    let mut writer = coll.begin();
    coll.update(&mut writer, "k", json!("v2")).unwrap();
    coll.commit(&mut writer).unwrap();

    assert_eq!(body_of(&coll, &mut reader, "k"), Some(json!("v1")));

    let mut later = coll.begin();
    assert_eq!(body_of(&coll, &mut later, "k"), Some(json!("v2")));
}

#[test]
fn test_uncommitted_update_invisible_to_others() {
    let coll = seeded(&[("k", json!("v1"))]);
    let mut writer = coll.begin();
    coll.update(&mut writer, "k", json!("v2")).unwrap();

    // both earlier- and later-started readers keep the committed body
    let mut later = coll.begin();
    assert_eq!(body_of(&coll, &mut later, "k"), Some(json!("v1")));
    assert_eq!(body_of(&coll, &mut writer, "k"), Some(json!("v2")));
}

#[test]
fn test_uncommitted_delete_invisible_to_others() {
    let coll = seeded(&[("k", json!(1))]);
    let mut deleter = coll.begin();
    coll.remove(&mut deleter, "k").unwrap();
    assert!(coll.get(&mut deleter, "k").unwrap().is_none());

    let mut other = coll.begin();
    assert!(coll.get(&mut other, "k").unwrap().is_some());

    coll.commit(&mut deleter).unwrap();
    let mut after = coll.begin();
    assert!(coll.get(&mut after, "k").unwrap().is_none());
    // `other` began while the delete was uncommitted
    assert!(coll.get(&mut other, "k").unwrap().is_some());
}

#[test]
fn test_scan_shows_snapshot() {
    let coll = seeded(&[("a", json!(1)), ("b", json!(2))]);
    let reader = coll.begin();

    let mut writer = coll.begin();
    coll.remove(&mut writer, "a").unwrap();
    coll.insert(&mut writer, "c", json!(3)).unwrap();
    coll.commit(&mut writer).unwrap();

    let keys: Vec<_> = coll.all(&reader).unwrap().into_iter().map(|d| d.key).collect();
    assert_eq!(keys, vec!["a", "b"]);
}

#[test]
fn test_disabled_tracking_sees_uncommitted_writes() {
    let coll = DocumentCollection::builder("single-writer")
        .active_tracking(ActiveTracking::Disabled)
        .build()
        .unwrap();

    let mut writer = coll.begin();
    coll.insert(&mut writer, "k", json!(1)).unwrap();

    // every smaller id counts as committed
    let mut reader = coll.begin();
    assert_eq!(body_of(&coll, &mut reader, "k"), Some(json!(1)));
}
