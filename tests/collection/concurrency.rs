//! Concurrency Tests
//!
//! Tests for thread safety:
//! - Concurrent readers of one document
//! - Concurrent writers of distinct documents
//! - Read-modify-write on one document with conflict retry

use crate::*;
use std::sync::{Arc, Barrier};
use std::thread;

/// Test concurrent reads of the same document
#[test]
fn test_concurrent_reads() {
    let coll = Arc::new(seeded(&[("shared", json!({"value": 42}))]));

    const NUM_READERS: usize = 8;
    const READS_PER_THREAD: usize = 200;

    let barrier = Arc::new(Barrier::new(NUM_READERS));
    let handles: Vec<_> = (0..NUM_READERS)
        .map(|_| {
            let coll = Arc::clone(&coll);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                let mut txn = coll.begin();
                for _ in 0..READS_PER_THREAD {
                    let doc = coll.get(&mut txn, "shared").unwrap().unwrap();
                    assert_eq!(doc.body, json!({"value": 42}));
                }
                coll.commit(&mut txn).unwrap();
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

/// Test concurrent inserts of distinct documents, forcing several growths
#[test]
fn test_concurrent_inserts_different_docs() {
    let coll = Arc::new(
        DocumentCollection::builder("parallel")
            .initial_capacity(8)
            .build()
            .unwrap(),
    );

    const NUM_WRITERS: usize = 8;
    const DOCS_PER_THREAD: usize = 100;

    let barrier = Arc::new(Barrier::new(NUM_WRITERS));
    let handles: Vec<_> = (0..NUM_WRITERS)
        .map(|i| {
            let coll = Arc::clone(&coll);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                let mut txn = coll.begin();
                for j in 0..DOCS_PER_THREAD {
                    let key = format!("writer-{}/doc-{}", i, j);
                    coll.insert(&mut txn, &key, json!(j)).unwrap();
                }
                coll.commit(&mut txn).unwrap();
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let reader = coll.begin();
    let docs = coll.all(&reader).unwrap();
    assert_eq!(docs.len(), NUM_WRITERS * DOCS_PER_THREAD);
    let stats = coll.stats().index;
    assert!(stats.used * 2 <= stats.capacity);
}

/// Test read-modify-write increments with retry on conflict
///
/// Every increment must survive: a lost update would leave the counter short.
#[test]
fn test_concurrent_increments_no_lost_updates() {
    let coll = Arc::new(seeded(&[("counter", json!(0))]));

    const NUM_THREADS: usize = 4;
    const INCREMENTS_PER_THREAD: usize = 25;

    let barrier = Arc::new(Barrier::new(NUM_THREADS));
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let coll = Arc::clone(&coll);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                let mut retries = 0usize;
                for _ in 0..INCREMENTS_PER_THREAD {
                    loop {
                        let mut txn = coll.begin();
                        let current = coll
                            .get(&mut txn, "counter")
                            .unwrap()
                            .and_then(|doc| doc.body.as_u64())
                            .unwrap();
                        match coll.update(&mut txn, "counter", json!(current + 1)) {
                            Ok(_) => {
                                coll.commit(&mut txn).unwrap();
                                break;
                            }
                            Err(e) if e.is_retryable() => {
                                coll.abort(&mut txn, "retry").unwrap();
                                retries += 1;
                            }
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                }
                retries
            })
        })
        .collect();

    let total_retries: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    let mut reader = coll.begin();
    assert_eq!(
        body_of(&coll, &mut reader, "counter"),
        Some(json!(NUM_THREADS * INCREMENTS_PER_THREAD)),
        "lost updates after {} retries",
        total_retries
    );

    coll.commit(&mut reader).unwrap();
    coll.vacuum();
    assert_eq!(coll.stats().index.used, 1);
}

/// Test readers running alongside a writer never see a torn state
#[test]
fn test_readers_during_writes_see_exactly_one_revision() {
    let coll = Arc::new(seeded(&[("doc", json!(0))]));

    const NUM_READERS: usize = 4;
    const WRITES: usize = 100;

    let barrier = Arc::new(Barrier::new(NUM_READERS + 1));

    let writer = {
        let coll = Arc::clone(&coll);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 1..=WRITES {
                let mut txn = coll.begin();
                coll.update(&mut txn, "doc", json!(i)).unwrap();
                coll.commit(&mut txn).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..NUM_READERS)
        .map(|_| {
            let coll = Arc::clone(&coll);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..WRITES {
                    let txn = coll.begin();
                    let docs = coll.all(&txn).unwrap();
                    assert_eq!(docs.len(), 1, "exactly one visible revision");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for h in readers {
        h.join().unwrap();
    }
}
