use std::fmt::Write as _;

use super::reader::DafReader;
use crate::layout::{major_axis, MajorAxis};

/// Pretty-printed listing of a data set: scalars, axes with entry counts,
/// vectors with element type and density, matrices with shape, element type,
/// layout and density.
pub fn description<R: DafReader + ?Sized>(reader: &R) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "name: {}", reader.name());

    match reader.scalar_names() {
        Ok(names) if !names.is_empty() => {
            let _ = writeln!(text, "scalars:");
            for name in names {
                match reader.get_scalar(&name) {
                    Ok(value) => {
                        let _ = writeln!(
                            text,
                            "  {}: {} ({})",
                            name,
                            value,
                            value.element_type()
                        );
                    }
                    Err(error) => {
                        let _ = writeln!(text, "  {}: <{}>", name, error);
                    }
                }
            }
        }
        _ => {}
    }

    let axes = reader.axis_names().unwrap_or_default();
    if !axes.is_empty() {
        let _ = writeln!(text, "axes:");
        for axis in &axes {
            let length = reader.axis_length(axis).unwrap_or(0);
            let _ = writeln!(text, "  {}: {} entries", axis, length);
        }
    }

    let mut wrote_vectors_header = false;
    for axis in &axes {
        let names = reader.vector_names(axis).unwrap_or_default();
        if names.is_empty() {
            continue;
        }
        if !wrote_vectors_header {
            let _ = writeln!(text, "vectors:");
            wrote_vectors_header = true;
        }
        let _ = writeln!(text, "  {}:", axis);
        for name in names {
            match reader.get_vector(axis, &name) {
                Ok(vector) => {
                    let density = if vector.data().is_sparse() {
                        format!("sparse {:.0}%", vector.data().density() * 100.0)
                    } else {
                        "dense".to_string()
                    };
                    let _ = writeln!(
                        text,
                        "    {}: {} ({})",
                        name,
                        vector.element_type(),
                        density
                    );
                }
                Err(error) => {
                    let _ = writeln!(text, "    {}: <{}>", name, error);
                }
            }
        }
    }

    let mut wrote_matrices_header = false;
    for rows_axis in &axes {
        for columns_axis in &axes {
            let names = reader
                .matrix_names(rows_axis, columns_axis)
                .unwrap_or_default();
            let mut wrote_pair_header = false;
            for name in names {
                // List each stored orientation once, under its own pair.
                match reader.matrix_requires_relayout(rows_axis, columns_axis, &name) {
                    Ok(false) => {}
                    _ => continue,
                }
                if !wrote_matrices_header {
                    let _ = writeln!(text, "matrices:");
                    wrote_matrices_header = true;
                }
                if !wrote_pair_header {
                    let _ = writeln!(text, "  {},{}:", rows_axis, columns_axis);
                    wrote_pair_header = true;
                }
                match reader.get_matrix(rows_axis, columns_axis, &name) {
                    Ok(matrix) => {
                        let layout = match major_axis(matrix.data()) {
                            Some(MajorAxis::Columns) => "column-major",
                            Some(MajorAxis::Rows) => "row-major",
                            None => "no major axis",
                        };
                        let density = if matrix.data().is_sparse() {
                            format!("sparse {:.0}%", matrix.data().density() * 100.0)
                        } else {
                            "dense".to_string()
                        };
                        let _ = writeln!(
                            text,
                            "    {}: {}x{} {} ({}, {})",
                            name,
                            matrix.shape().0,
                            matrix.shape().1,
                            matrix.element_type(),
                            density,
                            layout
                        );
                    }
                    Err(error) => {
                        let _ = writeln!(text, "    {}: <{}>", name, error);
                    }
                }
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use crate::store::{DafReader, DafWriter, MemoryDaf};
    use crate::types::{DenseMatrix, ElementType, MatrixData, StorageScalar, VectorData};

    #[test]
    fn test_description_lists_everything() {
        let daf = MemoryDaf::new("described!");
        daf.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
        daf.add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
            .unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1u8, 2, 3]), false)
            .unwrap();
        let matrix = DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
            .unwrap();

        let text = daf.description();
        assert!(text.contains("name: described!"));
        assert!(text.contains("organism: human (String)"));
        assert!(text.contains("cell: 3 entries"));
        assert!(text.contains("age: UInt8 (dense)"));
        assert!(text.contains("UMIs: 2x3 UInt8 (dense, column-major)"));
        // The flipped orientation is reachable but not listed twice.
        assert!(!text.contains("3x2"));
    }
}
