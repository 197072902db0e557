//! Concurrent producer/reader tests and file-backed persistence.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use udstore::store::{PersistenceHook, StoreSnapshot};
use udstore::{
    Expression, OpIdAllocator, Operation, OperationStore, Row, RowOutcome, StoreConfig, StoreError,
    TableSchema, Type, Value,
};

const COMMITS: i64 = 2_000;
const READERS: u64 = 4;

/// Columns: version bigint, bucket integer (indexed).
fn schema() -> TableSchema {
    TableSchema::new(
        vec!["version".into(), "bucket".into()],
        vec![Type::Bigint, Type::Integer, Type::Integer],
        Some(1),
    )
    .unwrap()
}

fn base_row() -> Row {
    Row::new(vec![Value::Int64(0), Value::Int32(0)], 0)
}

fn stamp(id: i64) -> Operation {
    Operation::update(id, None, vec![Expression::new(0, Value::Int64(id))]).unwrap()
}

fn version_at(store: &OperationStore, t: i64) -> i64 {
    match store.replay(base_row(), t).unwrap() {
        RowOutcome::Kept(row) => row.values[0].as_i64().unwrap(),
        RowOutcome::Suppressed => panic!("row was suppressed at t={}", t),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_uncommitted_updates() {
    let store = Arc::new(OperationStore::new(&schema(), StoreConfig::default()));

    // Commit time equals the op id, so a snapshot at t sees at most #t.
    let producer = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || {
            let ids = OpIdAllocator::new(1);
            for time in 1..=COMMITS {
                let id = ids.allocate();
                store.add(stamp(id));
                store.put(time, id);
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|seed| {
            let store = store.clone();
            tokio::task::spawn_blocking(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..500 {
                    let t = rng.gen_range(0..=COMMITS);
                    let version = version_at(&store, t);
                    assert!(version <= t, "t={} saw version {}", t, version);
                }
            })
        })
        .collect();

    producer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let t = rng.gen_range(1..=COMMITS);
        assert_eq!(version_at(&store, t), t);
    }
    assert_eq!(store.stats().by_id, COMMITS as usize);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_indexed_adds() {
    let store = Arc::new(OperationStore::new(&schema(), StoreConfig::default()));
    let ids = Arc::new(OpIdAllocator::new(1));

    let writers: Vec<_> = (0..8)
        .map(|bucket| {
            let store = store.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let id = ids.allocate();
                    let op = Operation::update(
                        id,
                        Some(Expression::new(1, Value::Int32(bucket))),
                        vec![Expression::new(0, Value::Int64(id))],
                    )
                    .unwrap();
                    store.add(op);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let max_id = ids.peek() - 1;
    assert_eq!(max_id, 400);
    store.put(1, max_id);

    let stats = store.stats();
    assert_eq!(stats.by_indexed_value, 400);
    assert_eq!(stats.by_id, 0);

    // Each bucket ends at the highest id its writer allocated.
    let snapshot = store.snapshot();
    for bucket in 0..8 {
        let last = snapshot
            .operations
            .iter()
            .filter(|op| {
                op.selector().map(|s| s.value().clone()) == Some(Value::Int32(bucket))
            })
            .map(|op| op.id())
            .max()
            .unwrap();
        let row = Row::new(vec![Value::Int64(0), Value::Int32(bucket)], 0);
        match store.replay(row, 1).unwrap() {
            RowOutcome::Kept(row) => assert_eq!(row.values[0], Value::Int64(last)),
            RowOutcome::Suppressed => panic!("bucket {} suppressed", bucket),
        }
    }
}

/// Writes one line per commit entry and operation.
struct TextFileHook;

impl PersistenceHook for TextFileHook {
    fn backup(&self, snapshot: &StoreSnapshot, path: &Path) -> Result<(), StoreError> {
        let mut out = String::new();
        for (time, max_id) in &snapshot.commits {
            let _ = writeln!(out, "commit {} {}", time, max_id);
        }
        for op in &snapshot.operations {
            let _ = writeln!(out, "{}", op);
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    fn recover(&self) -> Result<Option<StoreSnapshot>, StoreError> {
        Ok(None)
    }
}

#[test]
fn test_backup_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ops.txt");

    let store =
        OperationStore::new(&schema(), StoreConfig::default()).with_persistence(Box::new(TextFileHook));
    store.add(stamp(2));
    store.add(Operation::delete(3, Some(Expression::new(1, Value::Int32(9)))));
    store.put(10, 3);
    store.backup(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = written.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "commit 10 3");
    assert!(lines[1].starts_with("#2 UPDATE"));
    assert!(lines[2].starts_with("#3 DELETE"));
}

#[test]
fn test_backup_to_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("ops.txt");
    let store =
        OperationStore::new(&schema(), StoreConfig::default()).with_persistence(Box::new(TextFileHook));
    assert!(matches!(store.backup(&path), Err(StoreError::Io(_))));
}
