//! Concurrent readers and writers over one shared store, and the lock
//! nesting discipline.

use std::sync::Arc;
use std::thread;

use rust_daf::store::{DafReader, DafWriter, MemoryDaf};
use rust_daf::types::{StorageScalar, VectorData};

#[test]
fn test_many_readers_one_writer() {
    let daf = Arc::new(MemoryDaf::new("shared!"));
    daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
    daf.set_vector("cell", "age", VectorData::from(vec![1i64, 2]), false)
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let daf = Arc::clone(&daf);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                let vector = daf.get_vector("cell", "age").unwrap();
                // Vectors are consistent snapshots: both entries come from
                // the same write.
                let first = vector.data().get(0);
                let second = vector.data().get(1);
                match (first, second) {
                    (StorageScalar::Int64(a), StorageScalar::Int64(b)) => {
                        assert_eq!(a + 1, b);
                    }
                    other => panic!("unexpected values: {:?}", other),
                }
            }
        }));
    }
    {
        let daf = Arc::clone(&daf);
        handles.push(thread::spawn(move || {
            for step in 0..100i64 {
                daf.set_vector(
                    "cell",
                    "age",
                    VectorData::from(vec![step, step + 1]),
                    true,
                )
                .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let version = daf.vector_version("cell", "age").unwrap();
    assert!(version >= 100);
}

#[test]
fn test_concurrent_relayout_requests_agree() {
    use rust_daf::types::{DenseMatrix, ElementType, MatrixData};

    let daf = Arc::new(MemoryDaf::new("shared!"));
    daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
    daf.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
        .unwrap();
    let matrix = DenseMatrix::from_rows(
        ElementType::UInt8,
        &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
    )
    .unwrap();
    daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let daf = Arc::clone(&daf);
        handles.push(thread::spawn(move || {
            for _ in 0..50 {
                let flipped = daf.get_matrix("cell", "gene", "UMIs").unwrap();
                assert_eq!(flipped.data().get_f64(2, 1), 6.0);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_writes_are_serialized() {
    let daf = Arc::new(MemoryDaf::new("shared!"));
    let mut handles = Vec::new();
    for thread_index in 0..4u64 {
        let daf = Arc::clone(&daf);
        handles.push(thread::spawn(move || {
            for step in 0..50u64 {
                daf.set_scalar(
                    &format!("slot_{}", thread_index),
                    StorageScalar::UInt64(step),
                    true,
                )
                .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(daf.scalar_names().unwrap().len(), 4);
    for thread_index in 0..4u64 {
        assert_eq!(
            daf.get_scalar(&format!("slot_{}", thread_index)).unwrap(),
            StorageScalar::UInt64(49)
        );
    }
}
