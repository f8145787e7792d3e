//! Group aggregation over axis-labeled vectors, and reconstruction of an
//! implicit axis out of group-determined properties.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::query::ops::ReductionOp;
use crate::store::{DafReader, DafWriter};
use crate::types::{
    AxisLabels, DenseMatrix, ElementType, MajorOrder, MatrixData, NamedMatrix, NamedVector,
    NumericBuf, StorageScalar, VectorBuf, VectorData,
};

/// The axis a property's values refer to: the name up to the first `.`,
/// so `type.manual` still labels entries of the `type` axis.
pub fn property_axis_name(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn string_vector(daf: &dyn DafReader, axis: &str, name: &str) -> DafResult<Arc<Vec<String>>> {
    let vector = daf.get_vector(axis, name)?;
    match vector.data().as_strings() {
        Some(values) => Ok(Arc::clone(values)),
        None => Err(DafError::UnsupportedElementType {
            holder: format!("the group vector: {}/{}", axis, name),
            element_type: vector.element_type(),
        }),
    }
}

/// For each entry of `axis`, follow its group label into `prop` of the group
/// axis: the result is `prop[group[a]]` over `axis`.
///
/// An empty group label means "ungrouped": it takes `default` when provided
/// and fails with [`DafError::UngroupedEntry`] otherwise. A label that is
/// not an entry of the group axis fails with [`DafError::UnknownGroup`].
pub fn get_group_vector(
    daf: &dyn DafReader,
    axis: &str,
    group: &str,
    prop: &str,
    default: Option<StorageScalar>,
) -> DafResult<NamedVector> {
    let group_axis = property_axis_name(group).to_string();
    let labels = string_vector(daf, axis, group)?;
    let prop_vector = daf.get_vector(&group_axis, prop)?;
    let entries = daf.axis_entries(axis)?;

    let mut values = Vec::with_capacity(labels.len());
    for (index, label) in labels.iter().enumerate() {
        if label.is_empty() {
            match &default {
                Some(default) => values.push(default.clone()),
                None => {
                    return Err(DafError::UngroupedEntry {
                        axis: axis.to_string(),
                        entry: entries[index].clone(),
                    })
                }
            }
            continue;
        }
        match daf.axis_entry_index(&group_axis, label)? {
            Some(position) => values.push(prop_vector.data().get(position)),
            None => {
                return Err(DafError::UnknownGroup {
                    group: label.clone(),
                    group_axis,
                })
            }
        }
    }

    let element_type = prop_vector.element_type();
    let buf = VectorBuf::from_scalars(element_type, &values).map_err(|reason| {
        DafError::QueryEvaluationError {
            operation: format!("get_group_vector of {}/{}", axis, prop),
            reason,
        }
    })?;
    Ok(NamedVector::new(
        AxisLabels::new(axis, entries),
        prop,
        VectorData::Dense(buf),
    ))
}

/// For each entry of the group axis, reduce the values of `vector` over the
/// entries assigned to that group. Ungrouped entries (empty label) are
/// excluded. A group with no members takes `default`; without one the
/// aggregation fails.
pub fn aggregate_group_vector(
    daf: &dyn DafReader,
    axis: &str,
    vector: &str,
    group: &str,
    op: &ReductionOp,
    default: Option<f64>,
) -> DafResult<NamedVector> {
    let group_axis = property_axis_name(group).to_string();
    let labels = string_vector(daf, axis, group)?;
    let values = daf.get_vector(axis, vector)?;
    let numeric = match values.data().to_dense_buf() {
        VectorBuf::Numeric(buf) => buf,
        VectorBuf::String(_) => {
            return Err(DafError::UnsupportedElementType {
                holder: format!("the aggregated vector: {}/{}", axis, vector),
                element_type: ElementType::String,
            })
        }
    };

    let group_entries = daf.axis_entries(&group_axis)?;
    let mut per_group: Vec<Vec<f64>> = vec![Vec::new(); group_entries.len()];
    for (index, label) in labels.iter().enumerate() {
        if label.is_empty() {
            continue;
        }
        match daf.axis_entry_index(&group_axis, label)? {
            Some(position) => per_group[position].push(numeric.get_f64(index)),
            None => {
                return Err(DafError::UnknownGroup {
                    group: label.clone(),
                    group_axis,
                })
            }
        }
    }

    let mut reduced = Vec::with_capacity(per_group.len());
    for (position, values) in per_group.iter().enumerate() {
        // A group with no members takes the default, never the reduction of
        // nothing (even for reductions defined on an empty slice).
        let value = if values.is_empty() {
            default
        } else {
            op.apply(values)
        };
        match value {
            Some(value) => reduced.push(value),
            None => {
                return Err(DafError::QueryEvaluationError {
                    operation: format!("aggregate of {}/{} per {}", axis, vector, group),
                    reason: format!(
                        "the group: {} is empty and no default was provided",
                        group_entries[position]
                    ),
                })
            }
        }
    }

    let buf = NumericBuf::from_f64_vec(ElementType::Float64, reduced)
        .unwrap_or_else(|| unreachable!("Float64 always has a buffer"));
    Ok(NamedVector::new(
        AxisLabels::new(group_axis.clone(), group_entries),
        vector,
        VectorData::Dense(VectorBuf::Numeric(buf)),
    ))
}

/// Count matrix of two label slices: one row per observed `first` value, one
/// column per observed `second` value, ignoring empty labels. When an axis
/// with the label set already exists its entries (and order) are used
/// instead of the observed values.
pub(crate) fn cross_tabulate(
    first_values: &[String],
    second_values: &[String],
    first_entries: Option<Arc<Vec<String>>>,
    second_entries: Option<Arc<Vec<String>>>,
) -> (Vec<String>, Vec<String>, DenseMatrix) {
    fn index_of(values: &[String], entries: &Option<Arc<Vec<String>>>) -> Vec<String> {
        match entries {
            Some(entries) => entries.as_ref().clone(),
            None => {
                let unique: BTreeMap<&String, ()> = values
                    .iter()
                    .filter(|value| !value.is_empty())
                    .map(|value| (value, ()))
                    .collect();
                unique.into_keys().cloned().collect()
            }
        }
    }

    let row_entries = index_of(first_values, &first_entries);
    let column_entries = index_of(second_values, &second_entries);
    let row_index: BTreeMap<&String, usize> = row_entries
        .iter()
        .enumerate()
        .map(|(index, entry)| (entry, index))
        .collect();
    let column_index: BTreeMap<&String, usize> = column_entries
        .iter()
        .enumerate()
        .map(|(index, entry)| (entry, index))
        .collect();

    let nrows = row_entries.len();
    let ncols = column_entries.len();
    let mut counts = vec![0.0f64; nrows * ncols];
    for (first, second) in first_values.iter().zip(second_values.iter()) {
        if first.is_empty() || second.is_empty() {
            continue;
        }
        if let (Some(&row), Some(&column)) = (row_index.get(first), column_index.get(second)) {
            counts[column * nrows + row] += 1.0;
        }
    }

    let buf = NumericBuf::from_f64_vec(ElementType::UInt64, counts)
        .unwrap_or_else(|| unreachable!("UInt64 always has a buffer"));
    let matrix = DenseMatrix::new(nrows, ncols, MajorOrder::ColumnMajor, buf)
        .unwrap_or_else(|_| unreachable!("count buffer matches its shape"));
    (row_entries, column_entries, matrix)
}

/// Count matrix of two string vectors over the same axis (spec'd by their
/// observed value sets, ignoring empty labels).
pub fn count_groups_matrix(
    daf: &dyn DafReader,
    axis: &str,
    first: &str,
    second: &str,
) -> DafResult<NamedMatrix> {
    let first_values = string_vector(daf, axis, first)?;
    let second_values = string_vector(daf, axis, second)?;

    let axis_entries_of = |name: &str| -> DafResult<Option<Arc<Vec<String>>>> {
        let axis_name = property_axis_name(name);
        if daf.has_axis(axis_name)? {
            Ok(Some(daf.axis_entries(axis_name)?))
        } else {
            Ok(None)
        }
    };

    let (row_entries, column_entries, matrix) = cross_tabulate(
        &first_values,
        &second_values,
        axis_entries_of(first)?,
        axis_entries_of(second)?,
    );
    Ok(NamedMatrix::new(
        AxisLabels::new(property_axis_name(first), Arc::new(row_entries)),
        AxisLabels::new(property_axis_name(second), Arc::new(column_entries)),
        format!("{}_by_{}", first, second),
        MatrixData::Dense(matrix),
    ))
}

/// Result of [`reconstruct_axis`]: the per-property values migrated onto the
/// implicit axis.
#[derive(Debug)]
pub struct Reconstruction {
    pub implicit_axis: String,
    pub entries: Vec<String>,
    pub migrated: Vec<String>,
}

/// Verify that the chosen properties of `existing_axis` are functionally
/// determined by the values of `implicit_property`, then create (or
/// validate) the implicit axis, migrate those properties onto it, and delete
/// them from the existing axis.
///
/// `properties`: `None` migrates every vector of `existing_axis` that turns
/// out to be group-determined; an explicit list requires each named property
/// to be determined and fails otherwise.
pub fn reconstruct_axis(
    daf: &dyn DafWriter,
    existing_axis: &str,
    implicit_property: &str,
    properties: Option<&[String]>,
) -> DafResult<Reconstruction> {
    let labels = string_vector(daf, existing_axis, implicit_property)?;

    // The implicit axis entries: observed non-empty labels, first-seen order.
    let mut entries: Vec<String> = Vec::new();
    let mut entry_index: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels.iter() {
        if label.is_empty() {
            continue;
        }
        if !entry_index.contains_key(label) {
            entry_index.insert(label.clone(), entries.len());
            entries.push(label.clone());
        }
    }

    let implicit_axis = property_axis_name(implicit_property).to_string();
    if daf.has_axis(&implicit_axis)? {
        let existing = daf.axis_entries(&implicit_axis)?;
        let mut expected: Vec<String> = entries.clone();
        expected.sort();
        let mut actual: Vec<String> = existing.as_ref().clone();
        actual.sort();
        if expected != actual {
            return Err(DafError::InconsistentReconstruction {
                property: implicit_property.to_string(),
                entry: implicit_axis.clone(),
                values: "the axis exists with different entries".to_string(),
            });
        }
        entries = existing.as_ref().clone();
        entry_index = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.clone(), index))
            .collect();
    } else {
        daf.add_axis(&implicit_axis, entries.clone())?;
    }

    let candidates: Vec<String> = match properties {
        Some(properties) => properties.to_vec(),
        None => daf
            .vector_names(existing_axis)?
            .into_iter()
            .filter(|name| name != implicit_property)
            .collect(),
    };

    let explicit = properties.is_some();
    let mut migrated = Vec::new();
    for property in candidates {
        let vector = daf.get_vector(existing_axis, &property)?;
        // One value slot per implicit entry; every member must agree.
        let mut determined: Vec<Option<StorageScalar>> = vec![None; entries.len()];
        let mut consistent = true;
        for (index, label) in labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            let slot = entry_index[label];
            let value = vector.data().get(index);
            match &determined[slot] {
                None => determined[slot] = Some(value),
                Some(existing) if *existing == value => {}
                Some(existing) => {
                    if explicit {
                        return Err(DafError::InconsistentReconstruction {
                            property: property.clone(),
                            entry: label.clone(),
                            values: format!("{} and {}", existing, value),
                        });
                    }
                    consistent = false;
                    break;
                }
            }
        }
        if !consistent {
            continue;
        }
        let values: Vec<StorageScalar> = determined
            .into_iter()
            .map(|value| value.unwrap_or(StorageScalar::String(String::new())))
            .collect();
        // A group with no members only types cleanly for strings; skip
        // incomplete numeric properties in the implicit migration.
        let element_type = vector.element_type();
        let all_present = values
            .iter()
            .all(|value| value.element_type() == element_type);
        if !all_present {
            if explicit {
                return Err(DafError::InconsistentReconstruction {
                    property: property.clone(),
                    entry: implicit_axis.clone(),
                    values: "some implicit entries have no value".to_string(),
                });
            }
            continue;
        }
        let buf = VectorBuf::from_scalars(element_type, &values).map_err(|reason| {
            DafError::QueryEvaluationError {
                operation: format!("reconstruct_axis of {}", existing_axis),
                reason,
            }
        })?;
        daf.set_vector(
            &implicit_axis,
            &property,
            VectorData::Dense(buf),
            true,
        )?;
        daf.delete_vector(existing_axis, &property, true)?;
        migrated.push(property);
    }

    Ok(Reconstruction {
        implicit_axis,
        entries,
        migrated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDaf;

    fn grouped_daf() -> MemoryDaf {
        let daf = MemoryDaf::new("groups!");
        daf.add_axis(
            "cell",
            vec!["c0".into(), "c1".into(), "c2".into(), "c3".into()],
        )
        .unwrap();
        daf.add_axis("type", vec!["B".into(), "T".into()]).unwrap();
        daf.set_vector(
            "cell",
            "type",
            VectorData::from(vec!["T", "T", "B", ""]),
            false,
        )
        .unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![3i64, 5, 7, 9]), false)
            .unwrap();
        daf.set_vector(
            "type",
            "color",
            VectorData::from(vec!["blue", "red"]),
            false,
        )
        .unwrap();
        daf
    }

    #[test]
    fn test_get_group_vector() {
        let daf = grouped_daf();
        let colors = get_group_vector(
            &daf,
            "cell",
            "type",
            "color",
            Some(StorageScalar::from("gray")),
        )
        .unwrap();
        assert_eq!(colors.data().get(0), StorageScalar::from("red"));
        assert_eq!(colors.data().get(2), StorageScalar::from("blue"));
        assert_eq!(colors.data().get(3), StorageScalar::from("gray"));
    }

    #[test]
    fn test_get_group_vector_requires_default_for_ungrouped() {
        let daf = grouped_daf();
        assert!(matches!(
            get_group_vector(&daf, "cell", "type", "color", None),
            Err(DafError::UngroupedEntry { .. })
        ));
    }

    #[test]
    fn test_get_group_vector_unknown_group() {
        let daf = grouped_daf();
        daf.set_vector(
            "cell",
            "type.manual",
            VectorData::from(vec!["T", "NK", "B", "T"]),
            false,
        )
        .unwrap();
        assert!(matches!(
            get_group_vector(&daf, "cell", "type.manual", "color", None),
            Err(DafError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn test_aggregate_group_vector() {
        let daf = grouped_daf();
        let sums =
            aggregate_group_vector(&daf, "cell", "age", "type", &ReductionOp::Sum, None).unwrap();
        assert_eq!(sums.axis().name(), "type");
        assert_eq!(sums.data().get(0), StorageScalar::Float64(7.0));
        assert_eq!(sums.data().get(1), StorageScalar::Float64(8.0));
    }

    #[test]
    fn test_aggregate_empty_group_needs_default() {
        let daf = grouped_daf();
        daf.set_vector(
            "cell",
            "type.sparse",
            VectorData::from(vec!["T", "T", "T", ""]),
            false,
        )
        .unwrap();
        assert!(aggregate_group_vector(
            &daf,
            "cell",
            "age",
            "type.sparse",
            &ReductionOp::Max,
            None
        )
        .is_err());
        let with_default = aggregate_group_vector(
            &daf,
            "cell",
            "age",
            "type.sparse",
            &ReductionOp::Max,
            Some(-1.0),
        )
        .unwrap();
        assert_eq!(with_default.data().get(0), StorageScalar::Float64(-1.0));
        assert_eq!(with_default.data().get(1), StorageScalar::Float64(7.0));
    }

    #[test]
    fn test_count_groups_matrix() {
        let daf = grouped_daf();
        daf.set_vector(
            "cell",
            "batch",
            VectorData::from(vec!["b0", "b1", "b0", "b0"]),
            false,
        )
        .unwrap();
        let counts = count_groups_matrix(&daf, "cell", "type", "batch").unwrap();
        // Rows follow the existing type axis; columns are observed batches.
        assert_eq!(counts.rows().entries().as_ref(), &vec!["B", "T"]);
        assert_eq!(counts.columns().entries().as_ref(), &vec!["b0", "b1"]);
        assert_eq!(counts.data().get_f64(1, 0), 1.0); // T in b0
        assert_eq!(counts.data().get_f64(1, 1), 1.0); // T in b1
        assert_eq!(counts.data().get_f64(0, 0), 1.0); // B in b0
        assert_eq!(counts.data().get_f64(0, 1), 0.0);
    }

    #[test]
    fn test_reconstruct_axis() {
        let daf = MemoryDaf::new("reconstruct!");
        daf.add_axis(
            "cell",
            vec!["c0".into(), "c1".into(), "c2".into(), "c3".into()],
        )
        .unwrap();
        daf.set_vector(
            "cell",
            "batch",
            VectorData::from(vec!["b0", "b0", "b1", "b1"]),
            false,
        )
        .unwrap();
        // Determined by batch.
        daf.set_vector(
            "cell",
            "donor",
            VectorData::from(vec!["d0", "d0", "d1", "d1"]),
            false,
        )
        .unwrap();
        // Not determined by batch.
        daf.set_vector("cell", "age", VectorData::from(vec![1i64, 2, 3, 4]), false)
            .unwrap();

        let result = reconstruct_axis(&daf, "cell", "batch", None).unwrap();
        assert_eq!(result.implicit_axis, "batch");
        assert_eq!(result.entries, vec!["b0", "b1"]);
        assert_eq!(result.migrated, vec!["donor"]);

        assert!(daf.has_axis("batch").unwrap());
        let donors = daf.get_vector("batch", "donor").unwrap();
        assert_eq!(donors.data().get(1), StorageScalar::from("d1"));
        assert!(!daf.has_vector("cell", "donor").unwrap());
        assert!(daf.has_vector("cell", "age").unwrap());
    }

    #[test]
    fn test_reconstruct_axis_explicit_inconsistency() {
        let daf = MemoryDaf::new("reconstruct!");
        daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        daf.set_vector("cell", "batch", VectorData::from(vec!["b0", "b0"]), false)
            .unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1i64, 2]), false)
            .unwrap();
        assert!(matches!(
            reconstruct_axis(&daf, "cell", "batch", Some(&["age".to_string()])),
            Err(DafError::InconsistentReconstruction { .. })
        ));
    }
}
