use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::store::{DafReader, DafWriter};
use crate::types::{
    DenseMatrix, MajorOrder, MatrixData, NumericBuf, StorageScalar, VectorBuf, VectorData,
};

/// Options of [`concatenate`].
#[derive(Debug, Clone, Default)]
pub struct ConcatOptions {
    /// Per-property fill for sources that lack a concatenated vector or
    /// matrix, keyed by the property name.
    pub defaults: HashMap<String, StorageScalar>,
    /// Replace existing destination properties.
    pub overwrite: bool,
}

fn default_of<'a>(
    options: &'a ConcatOptions,
    name: &str,
    axis: &str,
    daf: &str,
) -> DafResult<&'a StorageScalar> {
    options
        .defaults
        .get(name)
        .ok_or_else(|| DafError::UnknownVector {
            daf: daf.to_string(),
            axis: axis.to_string(),
            name: format!("{} (missing in a concatenated store and no default)", name),
        })
}

/// Concatenate `sources` along `axis` into `destination`.
///
/// The destination gets the concatenated axis (all source entries in order,
/// unique across sources), the union of the vectors along that axis (sources
/// lacking a vector contribute its per-property default), the matrices
/// between the concatenated axis and each fixed axis, and the scalars, fixed
/// axes and fixed-axes properties of the first source. Square matrices on
/// the concatenated axis are not concatenatable and are skipped.
pub fn concatenate(
    destination: &dyn DafWriter,
    axis: &str,
    sources: &[Arc<dyn DafReader>],
    options: &ConcatOptions,
) -> DafResult<()> {
    let first = sources.first().ok_or_else(|| DafError::UnknownAxis {
        daf: destination.name(),
        axis: format!("{} (no sources to concatenate)", axis),
    })?;

    // The concatenated axis: all source entries, in order, globally unique.
    let mut entries = Vec::new();
    let mut seen = BTreeSet::new();
    let mut offsets = Vec::with_capacity(sources.len());
    for source in sources {
        offsets.push(entries.len());
        for entry in source.axis_entries(axis)?.iter() {
            if !seen.insert(entry.clone()) {
                return Err(DafError::DuplicateEntry {
                    daf: destination.name(),
                    axis: axis.to_string(),
                    entry: entry.clone(),
                });
            }
            entries.push(entry.clone());
        }
    }
    let total = entries.len();
    destination.add_axis(axis, entries)?;

    // Fixed axes and everything hanging off them come from the first source;
    // the other sources must agree on the axes themselves.
    let mut fixed_axes = Vec::new();
    for fixed in first.axis_names()? {
        if fixed == axis {
            continue;
        }
        let first_entries = first.axis_entries(&fixed)?;
        for other in &sources[1..] {
            if !other.has_axis(&fixed)? {
                continue;
            }
            if other.axis_entries(&fixed)? != first_entries {
                return Err(DafError::ChainAxisMismatch {
                    axis: fixed.clone(),
                    earlier: first.name(),
                    later: other.name(),
                    reason: "concatenated stores disagree on a fixed axis".to_string(),
                });
            }
        }
        if !destination.has_axis(&fixed)? {
            destination.add_axis(&fixed, first_entries.as_ref().clone())?;
        }
        fixed_axes.push(fixed);
    }

    for name in first.scalar_names()? {
        let value = first.get_scalar(&name)?;
        destination.set_scalar(&name, value, options.overwrite)?;
    }

    // Union of the vector names along the concatenated axis.
    let mut vector_names = BTreeSet::new();
    for source in sources {
        vector_names.extend(source.vector_names(axis)?);
    }
    for name in &vector_names {
        let mut values: Vec<StorageScalar> = Vec::with_capacity(total);
        let mut element_type = None;
        for source in sources {
            let length = source.axis_length(axis)?;
            if source.has_vector(axis, name)? {
                let vector = source.get_vector(axis, name)?;
                element_type.get_or_insert(vector.element_type());
                for index in 0..length {
                    values.push(vector.data().get(index));
                }
            } else {
                let default = default_of(options, name, axis, &destination.name())?;
                element_type.get_or_insert(default.element_type());
                values.extend(std::iter::repeat(default.clone()).take(length));
            }
        }
        let element_type =
            element_type.unwrap_or_else(|| unreachable!("some source defines the vector"));
        let buf = VectorBuf::from_scalars(element_type, &values).map_err(|reason| {
            DafError::Corrupt {
                path: format!("{}/{}", axis, name),
                reason,
            }
        })?;
        destination.set_vector(axis, name, VectorData::Dense(buf), options.overwrite)?;
    }

    // Matrices between the concatenated axis and each fixed axis: stacked
    // with the concatenated axis as rows.
    for fixed in &fixed_axes {
        let fixed_length = destination.axis_length(fixed)?;
        let mut matrix_names = BTreeSet::new();
        for source in sources {
            if source.has_axis(fixed)? {
                matrix_names.extend(source.matrix_names(axis, fixed)?);
            }
        }
        for name in &matrix_names {
            let mut values = vec![0.0f64; total * fixed_length];
            let mut element_type = None;
            for (source, &offset) in sources.iter().zip(offsets.iter()) {
                let length = source.axis_length(axis)?;
                let has = source.has_axis(fixed)? && source.has_matrix(axis, fixed, name)?;
                if has {
                    let matrix = source.get_matrix(axis, fixed, name)?;
                    element_type.get_or_insert(matrix.element_type());
                    for column in 0..fixed_length {
                        for row in 0..length {
                            values[column * total + offset + row] =
                                matrix.data().get_f64(row, column);
                        }
                    }
                } else {
                    let default = default_of(options, name, axis, &destination.name())?;
                    let fill = default.to_f64().ok_or_else(|| {
                        DafError::UnsupportedElementType {
                            holder: format!("the default of the matrix: {}", name),
                            element_type: default.element_type(),
                        }
                    })?;
                    element_type.get_or_insert(default.element_type());
                    for column in 0..fixed_length {
                        for row in 0..length {
                            values[column * total + offset + row] = fill;
                        }
                    }
                }
            }
            let element_type =
                element_type.unwrap_or_else(|| unreachable!("some source defines the matrix"));
            let buf = NumericBuf::from_f64_vec(element_type, values).ok_or_else(|| {
                DafError::UnsupportedElementType {
                    holder: format!("the matrix: {}", name),
                    element_type,
                }
            })?;
            let dense = DenseMatrix::new(total, fixed_length, MajorOrder::ColumnMajor, buf)
                .map_err(|reason| DafError::Corrupt {
                    path: format!("{}/{}/{}", axis, fixed, name),
                    reason,
                })?;
            destination.set_matrix(axis, fixed, name, MatrixData::Dense(dense), options.overwrite)?;
        }
    }

    // Properties between fixed axes come from the first source.
    for rows_axis in &fixed_axes {
        for name in first.vector_names(rows_axis)? {
            let vector = first.get_vector(rows_axis, &name)?;
            destination.set_vector(rows_axis, &name, vector.into_data(), options.overwrite)?;
        }
        for columns_axis in &fixed_axes {
            for name in first.matrix_names(rows_axis, columns_axis)? {
                if first.matrix_requires_relayout(rows_axis, columns_axis, &name)? {
                    continue;
                }
                let matrix = first.get_matrix(rows_axis, columns_axis, &name)?;
                destination.set_matrix(
                    rows_axis,
                    columns_axis,
                    &name,
                    matrix.into_data(),
                    options.overwrite,
                )?;
            }
        }
    }

    let skipped: Vec<String> = first.matrix_names(axis, axis).unwrap_or_default();
    if !skipped.is_empty() {
        log::warn!(
            "skipping square matrices on the concatenated axis: {}: {}",
            axis,
            skipped.join(", ")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDaf;
    use crate::types::ElementType;

    fn batch(name: &str, cells: &[&str], ages: Vec<i64>) -> Arc<dyn DafReader> {
        let daf = MemoryDaf::new(name);
        daf.add_axis("cell", cells.iter().map(|c| c.to_string()).collect())
            .unwrap();
        daf.set_vector("cell", "age", VectorData::from(ages), false)
            .unwrap();
        Arc::new(daf)
    }

    #[test]
    fn test_concatenate_vectors() {
        let first = batch("first!", &["c0", "c1"], vec![1, 2]);
        let second = batch("second!", &["c2"], vec![3]);
        let destination = MemoryDaf::new("merged!");
        concatenate(
            &destination,
            "cell",
            &[first, second],
            &ConcatOptions::default(),
        )
        .unwrap();

        assert_eq!(destination.axis_length("cell").unwrap(), 3);
        let ages = destination.get_vector("cell", "age").unwrap();
        assert_eq!(ages.data().get(2), StorageScalar::Int64(3));
    }

    #[test]
    fn test_concatenate_rejects_duplicate_entries() {
        let first = batch("first!", &["c0"], vec![1]);
        let second = batch("second!", &["c0"], vec![2]);
        let destination = MemoryDaf::new("merged!");
        assert!(matches!(
            concatenate(
                &destination,
                "cell",
                &[first, second],
                &ConcatOptions::default()
            ),
            Err(DafError::DuplicateEntry { .. })
        ));
    }

    #[test]
    fn test_concatenate_pads_missing_vectors() {
        let first = batch("first!", &["c0", "c1"], vec![1, 2]);
        let second = MemoryDaf::new("second!");
        second.add_axis("cell", vec!["c2".into()]).unwrap();
        let destination = MemoryDaf::new("merged!");

        // No default: fails.
        assert!(concatenate(
            &destination,
            "cell",
            &[first.clone(), Arc::new(second)],
            &ConcatOptions::default()
        )
        .is_err());

        let second = MemoryDaf::new("second!");
        second.add_axis("cell", vec!["c2".into()]).unwrap();
        let retry = MemoryDaf::new("merged_again!");
        let mut defaults = HashMap::new();
        defaults.insert("age".to_string(), StorageScalar::Int64(-1));
        concatenate(
            &retry,
            "cell",
            &[first, Arc::new(second)],
            &ConcatOptions {
                defaults,
                overwrite: false,
            },
        )
        .unwrap();
        let ages = retry.get_vector("cell", "age").unwrap();
        assert_eq!(ages.data().get(2), StorageScalar::Int64(-1));
    }

    #[test]
    fn test_concatenate_matrices_along_axis() {
        let make = |name: &str, cells: &[&str], rows: &[Vec<f64>]| -> Arc<dyn DafReader> {
            let daf = MemoryDaf::new(name);
            daf.add_axis("cell", cells.iter().map(|c| c.to_string()).collect())
                .unwrap();
            daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
            let matrix = DenseMatrix::from_rows(ElementType::Float64, rows).unwrap();
            daf.set_matrix("cell", "gene", "UMIs", MatrixData::Dense(matrix), false)
                .unwrap();
            Arc::new(daf)
        };
        let first = make("first!", &["c0", "c1"], &[vec![1.0, 2.0], vec![3.0, 4.0]]);
        let second = make("second!", &["c2"], &[vec![5.0, 6.0]]);
        let destination = MemoryDaf::new("merged!");
        concatenate(
            &destination,
            "cell",
            &[first, second],
            &ConcatOptions::default(),
        )
        .unwrap();

        let stacked = destination.get_matrix("cell", "gene", "UMIs").unwrap();
        assert_eq!(stacked.shape(), (3, 2));
        assert_eq!(stacked.data().get_f64(0, 0), 1.0);
        assert_eq!(stacked.data().get_f64(2, 1), 6.0);
    }
}
