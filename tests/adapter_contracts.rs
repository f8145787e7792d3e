//! Contracts, the computation wrapper, the adapter protocol, copy-all and
//! concatenation, end to end.

use std::sync::Arc;

use rust_daf::contracts::{
    adapter, concatenate, copy_all, AdapterOptions, Computation, ConcatOptions, Contract,
    ContractKey, CopyOptions, DataTypeSpec,
};
use rust_daf::store::{DafReader, DafWriter, MemoryDaf};
use rust_daf::types::{ElementType, StorageScalar, VectorData};
use rust_daf::wrappers::ViewSpec;
use rust_daf::DafError;

#[test]
fn test_adapter_round_trip_scenario() {
    let base = Arc::new(MemoryDaf::new("base!"));
    base.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
        .unwrap();
    base.set_vector(
        "cell",
        "donor",
        VectorData::from(vec!["d0", "d1", "d0"]),
        false,
    )
    .unwrap();

    // The computation expects cell.subject and produces cell.score; the
    // adapter maps donor -> subject on input and score -> quality on output.
    adapter(
        &base,
        &ViewSpec::new()
            .axis("cell", "=")
            .vector("cell", "subject", "donor"),
        &ViewSpec::new()
            .axis("cell", "=")
            .vector("cell", "quality", "score"),
        &AdapterOptions::default(),
        |adapted| {
            let subjects = adapted.get_vector("cell", "subject")?;
            let scores: Vec<f64> = (0..subjects.len())
                .map(|index| match subjects.data().get(index) {
                    StorageScalar::String(subject) => subject.len() as f64,
                    _ => 0.0,
                })
                .collect();
            adapted.set_vector("cell", "score", VectorData::from(scores), false)
        },
    )
    .unwrap();

    // The base gained cell.quality and is otherwise unchanged.
    assert_eq!(base.vector_names("cell").unwrap(), vec!["donor", "quality"]);
    assert_eq!(
        base.get_vector("cell", "quality").unwrap().data().get(1),
        StorageScalar::Float64(2.0)
    );
}

#[test]
fn test_contract_failure_before_user_code() {
    let daf = MemoryDaf::new("bare!");
    let computation = Computation::new(
        "needs_organism",
        Contract::new().required_input(
            ContractKey::Scalar("organism".into()),
            DataTypeSpec::Exactly(ElementType::String),
        ),
        Contract::new(),
    );

    let mut entered = false;
    let result = computation.run(&daf, |_| {
        entered = true;
        Ok(())
    });
    match result {
        Err(DafError::ContractViolation {
            computation,
            direction,
            key,
            ..
        }) => {
            assert_eq!(computation, "needs_organism");
            assert_eq!(direction, "input");
            assert!(key.contains("organism"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!entered);
}

#[test]
fn test_copy_all_twice_with_overwrite_is_stable() {
    let source = MemoryDaf::new("source!");
    source
        .set_scalar("depth", StorageScalar::UInt32(3), false)
        .unwrap();
    source
        .add_axis("cell", vec!["c0".into(), "c1".into()])
        .unwrap();
    source
        .set_vector("cell", "age", VectorData::from(vec![1i64, 2]), false)
        .unwrap();

    let destination = MemoryDaf::new("destination!");
    copy_all(&source, &destination, &CopyOptions::default()).unwrap();
    copy_all(
        &source,
        &destination,
        &CopyOptions {
            overwrite: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(
        destination.get_scalar("depth").unwrap(),
        StorageScalar::UInt32(3)
    );
    assert_eq!(
        destination.get_vector("cell", "age").unwrap().data().get(1),
        StorageScalar::Int64(2)
    );
}

#[test]
fn test_adapter_with_subset_and_empty_fill() {
    let base = Arc::new(MemoryDaf::new("base!"));
    base.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
        .unwrap();
    base.set_vector(
        "cell",
        "keep",
        VectorData::from(vec![true, false, true]),
        false,
    )
    .unwrap();
    base.set_vector("cell", "age", VectorData::from(vec![1.0f64, 2.0, 3.0]), false)
        .unwrap();

    adapter(
        &base,
        &ViewSpec::new()
            .axis("cell", "/ cell & keep")
            .vector("cell", "age", "="),
        &ViewSpec::new()
            .axis("cell", "=")
            .vector("cell", "doubled", "doubled"),
        &AdapterOptions {
            empty: Some(StorageScalar::Float64(-1.0)),
            ..Default::default()
        },
        |adapted| {
            let ages = adapted.get_vector("cell", "age")?;
            assert_eq!(ages.len(), 2);
            let doubled: Vec<f64> = (0..ages.len())
                .map(|index| match ages.data().get(index) {
                    StorageScalar::Float64(age) => age * 2.0,
                    _ => 0.0,
                })
                .collect();
            adapted.set_vector("cell", "doubled", VectorData::from(doubled), false)
        },
    )
    .unwrap();

    // The write-back expanded the subsetted axis with the fill value.
    let doubled = base.get_vector("cell", "doubled").unwrap();
    assert_eq!(doubled.data().get(0), StorageScalar::Float64(2.0));
    assert_eq!(doubled.data().get(1), StorageScalar::Float64(-1.0));
    assert_eq!(doubled.data().get(2), StorageScalar::Float64(6.0));
}

#[test]
fn test_concatenate_stores() {
    let first = MemoryDaf::new("first!");
    first
        .add_axis("cell", vec!["c0".into(), "c1".into()])
        .unwrap();
    first
        .set_vector("cell", "age", VectorData::from(vec![1i64, 2]), false)
        .unwrap();
    let second = MemoryDaf::new("second!");
    second.add_axis("cell", vec!["c2".into()]).unwrap();
    second
        .set_vector("cell", "age", VectorData::from(vec![3i64]), false)
        .unwrap();

    let merged = MemoryDaf::new("merged!");
    concatenate(
        &merged,
        "cell",
        &[Arc::new(first), Arc::new(second)],
        &ConcatOptions::default(),
    )
    .unwrap();

    assert_eq!(
        merged.axis_entries("cell").unwrap().as_ref(),
        &vec!["c0", "c1", "c2"]
    );
    let ages = merged.get_vector("cell", "age").unwrap();
    assert_eq!(ages.data().get(2), StorageScalar::Int64(3));
}
