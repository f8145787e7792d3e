//! End-to-end store scenarios: create-and-read, matrix layout and automatic
//! relayout, and the basic invariants every reader upholds.

use rust_daf::layout::{major_axis, MajorAxis};
use rust_daf::store::{DafReader, DafWriter, MemoryDaf};
use rust_daf::types::{DenseMatrix, ElementType, MatrixData, StorageScalar, VectorData};
use rust_daf::DafError;

#[test]
fn test_create_and_read() {
    let daf = MemoryDaf::new("memory!");
    daf.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
        .unwrap();
    daf.set_vector("cell", "age", VectorData::from(vec![10i64, 20, 30]), false)
        .unwrap();

    let ages = daf.get_vector("cell", "age").unwrap();
    assert_eq!(ages.len(), 3);
    assert_eq!(ages.element_type(), ElementType::Int64);
    assert_eq!(ages.data().get(0), StorageScalar::Int64(10));
    assert_eq!(ages.data().get(1), StorageScalar::Int64(20));
    assert_eq!(ages.data().get(2), StorageScalar::Int64(30));

    assert!(daf.scalar_names().unwrap().is_empty());
    assert_eq!(daf.vector_names("cell").unwrap(), vec!["age"]);
}

#[test]
fn test_layout_and_relayout() {
    let daf = MemoryDaf::new("memory!");
    daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
    daf.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
        .unwrap();

    // [[1, 2, 3], [4, 5, 6]] stored column-major under (gene, cell).
    let matrix = DenseMatrix::from_rows(
        ElementType::UInt8,
        &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
    )
    .unwrap();
    daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
        .unwrap();

    let stored = daf.get_matrix("gene", "cell", "UMIs").unwrap();
    assert_eq!(major_axis(stored.data()), Some(MajorAxis::Columns));

    // Requesting the flipped orientation auto-relayouts.
    let flipped = daf.get_matrix("cell", "gene", "UMIs").unwrap();
    assert_eq!(flipped.shape(), (3, 2));
    assert_eq!(major_axis(flipped.data()), Some(MajorAxis::Columns));
    let expected = [[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]];
    for (row, expected_row) in expected.iter().enumerate() {
        for (column, expected_value) in expected_row.iter().enumerate() {
            assert_eq!(flipped.data().get_f64(row, column), *expected_value);
        }
    }

    // Subsequent fetches return the identical cached rendition.
    let again = daf.get_matrix("cell", "gene", "UMIs").unwrap();
    for row in 0..3 {
        for column in 0..2 {
            assert_eq!(
                again.data().get_f64(row, column),
                flipped.data().get_f64(row, column)
            );
        }
    }
}

#[test]
fn test_has_names_consistency() {
    let daf = MemoryDaf::new("memory!");
    daf.set_scalar("depth", StorageScalar::UInt32(7), false)
        .unwrap();
    daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
    daf.set_vector("cell", "age", VectorData::from(vec![1u8, 2]), false)
        .unwrap();

    for name in daf.scalar_names().unwrap() {
        assert!(daf.has_scalar(&name).unwrap());
    }
    for name in daf.vector_names("cell").unwrap() {
        assert!(daf.has_vector("cell", &name).unwrap());
    }
    assert!(!daf.has_scalar("nope").unwrap());
    assert!(!daf.has_vector("cell", "nope").unwrap());

    for axis in daf.axis_names().unwrap() {
        assert_eq!(
            daf.axis_entries(&axis).unwrap().len(),
            daf.axis_length(&axis).unwrap()
        );
    }
}

#[test]
fn test_version_counters_grow() {
    let daf = MemoryDaf::new("memory!");
    daf.add_axis("cell", vec!["c0".into()]).unwrap();
    let axis_version = daf.axis_version("cell").unwrap();

    daf.set_vector("cell", "age", VectorData::from(vec![1u8]), false)
        .unwrap();
    let first = daf.vector_version("cell", "age").unwrap();
    daf.set_vector("cell", "age", VectorData::from(vec![2u8]), true)
        .unwrap();
    let second = daf.vector_version("cell", "age").unwrap();
    assert!(second > first);
    assert_eq!(daf.axis_version("cell").unwrap(), axis_version);
}

#[test]
fn test_empty_axis_boundaries() {
    let daf = MemoryDaf::new("memory!");
    daf.add_axis("void", Vec::new()).unwrap();
    assert_eq!(daf.axis_length("void").unwrap(), 0);
    daf.set_vector(
        "void",
        "nothing",
        VectorData::from(Vec::<i64>::new()),
        false,
    )
    .unwrap();
    assert_eq!(daf.get_vector("void", "nothing").unwrap().len(), 0);
}

#[test]
fn test_square_matrix_relayout_is_transpose() {
    let daf = MemoryDaf::new("memory!");
    daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
    let matrix = DenseMatrix::from_rows(
        ElementType::Float64,
        &[vec![1.0, 2.0], vec![3.0, 4.0]],
    )
    .unwrap();
    daf.set_matrix("cell", "cell", "links", MatrixData::Dense(matrix), false)
        .unwrap();
    daf.relayout_matrix("cell", "cell", "links", true).unwrap();
    let relayed = daf.get_matrix("cell", "cell", "links").unwrap();
    assert_eq!(relayed.data().get_f64(0, 1), 2.0);
    assert_eq!(relayed.data().get_f64(1, 0), 3.0);
}

#[test]
fn test_delete_axis_guard_and_error_types() {
    let daf = MemoryDaf::new("memory!");
    daf.add_axis("cell", vec!["c0".into()]).unwrap();
    daf.set_vector("cell", "age", VectorData::from(vec![9i16]), false)
        .unwrap();

    assert!(matches!(
        daf.delete_axis("cell", true),
        Err(DafError::AxisInUse { .. })
    ));
    assert!(matches!(
        daf.get_vector("cell", "nope"),
        Err(DafError::UnknownVector { .. })
    ));
    assert!(matches!(
        daf.get_vector("nope", "age"),
        Err(DafError::UnknownAxis { .. })
    ));
}
