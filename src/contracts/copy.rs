use crate::errors::{DafError, DafResult};
use crate::store::{DafReader, DafWriter};
use crate::types::{
    DenseMatrix, MajorOrder, MatrixData, NumericBuf, StorageScalar, VectorBuf, VectorData,
};

/// Options of [`copy_all`] and the per-kind copy helpers.
#[derive(Debug, Clone, Default)]
pub struct CopyOptions {
    /// Replace existing destination properties instead of failing with
    /// `PropertyExists`.
    pub overwrite: bool,
    /// Also persist the flipped layout of every copied matrix.
    pub relayout: bool,
    /// Fill value for destination entries a subsetted source axis does not
    /// cover (the source axis may be a subset of the destination axis).
    pub empty: Option<StorageScalar>,
}

/// How each source axis entry lands in the destination axis: `None` when the
/// axes are identical, otherwise the destination position per source entry.
fn axis_mapping(
    source: &dyn DafReader,
    destination: &dyn DafWriter,
    axis: &str,
) -> DafResult<Option<Vec<usize>>> {
    let source_entries = source.axis_entries(axis)?;
    let destination_entries = destination.axis_entries(axis)?;
    if source_entries == destination_entries {
        return Ok(None);
    }
    let mut mapping = Vec::with_capacity(source_entries.len());
    for entry in source_entries.iter() {
        match destination.axis_entry_index(axis, entry)? {
            Some(index) => mapping.push(index),
            None => {
                return Err(DafError::ChainAxisMismatch {
                    axis: axis.to_string(),
                    earlier: destination.name(),
                    later: source.name(),
                    reason: format!("the entry: {} is missing from the destination", entry),
                })
            }
        }
    }
    Ok(Some(mapping))
}

pub fn copy_scalar(
    source: &dyn DafReader,
    destination: &dyn DafWriter,
    name: &str,
    options: &CopyOptions,
) -> DafResult<()> {
    let value = source.get_scalar(name)?;
    destination.set_scalar(name, value, options.overwrite)
}

/// Copy an axis: create it when absent; when present, the destination must
/// hold at least the source entries (a subsetted source is acceptable).
pub fn copy_axis(source: &dyn DafReader, destination: &dyn DafWriter, axis: &str) -> DafResult<()> {
    if !destination.has_axis(axis)? {
        let entries = source.axis_entries(axis)?;
        return destination.add_axis(axis, entries.as_ref().clone());
    }
    axis_mapping(source, destination, axis).map(|_| ())
}

pub fn copy_vector(
    source: &dyn DafReader,
    destination: &dyn DafWriter,
    axis: &str,
    name: &str,
    options: &CopyOptions,
) -> DafResult<()> {
    let vector = source.get_vector(axis, name)?;
    match axis_mapping(source, destination, axis)? {
        None => destination.set_vector(axis, name, vector.into_data(), options.overwrite),
        Some(mapping) => {
            let length = destination.axis_length(axis)?;
            let empty = options.empty.clone().ok_or_else(|| DafError::LengthMismatch {
                daf: destination.name(),
                axis: axis.to_string(),
                name: name.to_string(),
                expected: length,
                actual: vector.len(),
            })?;
            let mut values = vec![empty; length];
            for (source_index, destination_index) in mapping.into_iter().enumerate() {
                values[destination_index] = vector.data().get(source_index);
            }
            let buf = VectorBuf::from_scalars(vector.element_type(), &values).map_err(|reason| {
                DafError::Corrupt {
                    path: format!("{}/{}", axis, name),
                    reason,
                }
            })?;
            destination.set_vector(axis, name, VectorData::Dense(buf), options.overwrite)
        }
    }
}

pub fn copy_matrix(
    source: &dyn DafReader,
    destination: &dyn DafWriter,
    rows_axis: &str,
    columns_axis: &str,
    name: &str,
    options: &CopyOptions,
) -> DafResult<()> {
    let matrix = source.get_matrix(rows_axis, columns_axis, name)?;
    let rows_mapping = axis_mapping(source, destination, rows_axis)?;
    let columns_mapping = axis_mapping(source, destination, columns_axis)?;

    let data = match (&rows_mapping, &columns_mapping) {
        (None, None) => matrix.data().clone(),
        _ => {
            let expected_rows = destination.axis_length(rows_axis)?;
            let expected_columns = destination.axis_length(columns_axis)?;
            let empty = options
                .empty
                .as_ref()
                .and_then(|value| value.to_f64())
                .ok_or_else(|| DafError::ShapeMismatch {
                    daf: destination.name(),
                    rows_axis: rows_axis.to_string(),
                    columns_axis: columns_axis.to_string(),
                    name: name.to_string(),
                    expected_rows,
                    expected_columns,
                    actual_rows: matrix.shape().0,
                    actual_columns: matrix.shape().1,
                })?;
            let nrows = destination.axis_length(rows_axis)?;
            let ncols = destination.axis_length(columns_axis)?;
            let mut values = vec![empty; nrows * ncols];
            let identity_rows: Vec<usize> = (0..matrix.shape().0).collect();
            let identity_columns: Vec<usize> = (0..matrix.shape().1).collect();
            let rows = rows_mapping.as_deref().unwrap_or(&identity_rows);
            let columns = columns_mapping.as_deref().unwrap_or(&identity_columns);
            for (source_column, &destination_column) in columns.iter().enumerate() {
                for (source_row, &destination_row) in rows.iter().enumerate() {
                    values[destination_column * nrows + destination_row] =
                        matrix.data().get_f64(source_row, source_column);
                }
            }
            let buf = NumericBuf::from_f64_vec(matrix.element_type(), values)
                .unwrap_or_else(|| unreachable!("matrix element types are numeric"));
            MatrixData::Dense(
                DenseMatrix::new(nrows, ncols, MajorOrder::ColumnMajor, buf).map_err(|reason| {
                    DafError::Corrupt {
                        path: format!("{}/{}/{}", rows_axis, columns_axis, name),
                        reason,
                    }
                })?,
            )
        }
    };

    destination.set_matrix(rows_axis, columns_axis, name, data, options.overwrite)?;
    if options.relayout {
        destination.relayout_matrix(rows_axis, columns_axis, name, true)?;
    }
    Ok(())
}

/// Copy everything: scalars first, then axes, then vectors, then matrices.
pub fn copy_all(
    source: &dyn DafReader,
    destination: &dyn DafWriter,
    options: &CopyOptions,
) -> DafResult<()> {
    for name in source.scalar_names()? {
        copy_scalar(source, destination, &name, options)?;
    }
    let axes = source.axis_names()?;
    for axis in &axes {
        copy_axis(source, destination, axis)?;
    }
    for axis in &axes {
        for name in source.vector_names(axis)? {
            copy_vector(source, destination, axis, &name, options)?;
        }
    }
    for rows_axis in &axes {
        for columns_axis in &axes {
            for name in source.matrix_names(rows_axis, columns_axis)? {
                // Copy each stored orientation once.
                if source.matrix_requires_relayout(rows_axis, columns_axis, &name)? {
                    continue;
                }
                copy_matrix(source, destination, rows_axis, columns_axis, &name, options)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDaf;
    use crate::types::ElementType;

    fn source() -> MemoryDaf {
        let daf = MemoryDaf::new("source!");
        daf.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        daf.add_axis("gene", vec!["g0".into(), "g1".into(), "g2".into()])
            .unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1i64, 2]), false)
            .unwrap();
        let matrix = DenseMatrix::from_rows(
            ElementType::Float32,
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        )
        .unwrap();
        daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
            .unwrap();
        daf
    }

    #[test]
    fn test_copy_all_round_trip() {
        let source = source();
        let destination = MemoryDaf::new("destination!");
        copy_all(&source, &destination, &CopyOptions::default()).unwrap();

        assert_eq!(
            destination.get_scalar("organism").unwrap(),
            StorageScalar::from("human")
        );
        assert_eq!(destination.axis_length("gene").unwrap(), 3);
        assert_eq!(
            destination.get_vector("cell", "age").unwrap().data().get(1),
            StorageScalar::Int64(2)
        );
        assert_eq!(
            destination
                .get_matrix("gene", "cell", "UMIs")
                .unwrap()
                .data()
                .get_f64(2, 1),
            6.0
        );
    }

    #[test]
    fn test_second_copy_needs_overwrite() {
        let source = source();
        let destination = MemoryDaf::new("destination!");
        copy_all(&source, &destination, &CopyOptions::default()).unwrap();
        assert!(matches!(
            copy_all(&source, &destination, &CopyOptions::default()),
            Err(DafError::PropertyExists { .. })
        ));
        copy_all(
            &source,
            &destination,
            &CopyOptions {
                overwrite: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(destination.axis_length("cell").unwrap(), 2);
    }

    #[test]
    fn test_copy_with_relayout() {
        let source = source();
        let destination = MemoryDaf::new("destination!");
        copy_all(
            &source,
            &destination,
            &CopyOptions {
                relayout: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!destination
            .matrix_requires_relayout("cell", "gene", "UMIs")
            .unwrap());
    }

    #[test]
    fn test_subset_axis_expansion_with_empty() {
        let subset = MemoryDaf::new("subset!");
        subset.add_axis("cell", vec!["c1".into()]).unwrap();
        subset
            .set_vector("cell", "score", VectorData::from(vec![0.5f64]), false)
            .unwrap();

        let destination = MemoryDaf::new("destination!");
        destination
            .add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
            .unwrap();

        // Without a fill value the expansion fails.
        assert!(copy_all(&subset, &destination, &CopyOptions::default()).is_err());

        copy_all(
            &subset,
            &destination,
            &CopyOptions {
                empty: Some(StorageScalar::Float64(0.0)),
                ..Default::default()
            },
        )
        .unwrap();
        let scores = destination.get_vector("cell", "score").unwrap();
        assert_eq!(scores.data().get(0), StorageScalar::Float64(0.0));
        assert_eq!(scores.data().get(1), StorageScalar::Float64(0.5));
        assert_eq!(scores.data().get(2), StorageScalar::Float64(0.0));
    }
}
