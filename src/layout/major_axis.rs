use std::fmt;

use crate::types::{Compression, MajorOrder, MatrixData};

/// The axis along which a matrix's elements are contiguous in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorAxis {
    Rows,
    Columns,
}

impl MajorAxis {
    pub fn other(self) -> MajorAxis {
        match self {
            MajorAxis::Rows => MajorAxis::Columns,
            MajorAxis::Columns => MajorAxis::Rows,
        }
    }
}

impl fmt::Display for MajorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MajorAxis::Rows => f.write_str("rows"),
            MajorAxis::Columns => f.write_str("columns"),
        }
    }
}

/// Classify the memory layout of a matrix value.
///
/// Column-compressed sparse and column-major dense report `Columns`;
/// row-compressed sparse and row-major dense report `Rows`. A transposed
/// value reports the flipped answer because transposition swaps both the
/// dimensions and the storage order. `None` is reserved for layouts without
/// a contiguous axis; every value this crate stores has one.
pub fn major_axis(matrix: &MatrixData) -> Option<MajorAxis> {
    match matrix {
        MatrixData::Dense(dense) => match dense.order() {
            MajorOrder::ColumnMajor => Some(MajorAxis::Columns),
            MajorOrder::RowMajor => Some(MajorAxis::Rows),
        },
        MatrixData::Sparse(sparse) => match sparse.compression() {
            Compression::Csc => Some(MajorAxis::Columns),
            Compression::Csr => Some(MajorAxis::Rows),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DenseMatrix, ElementType};

    #[test]
    fn test_dense_major_axis() {
        let matrix = DenseMatrix::from_rows(ElementType::Float32, &[vec![1.0, 2.0]]).unwrap();
        let data = MatrixData::Dense(matrix);
        assert_eq!(major_axis(&data), Some(MajorAxis::Columns));
        assert_eq!(major_axis(&data.transposed()), Some(MajorAxis::Rows));
    }

    #[test]
    fn test_other_flips() {
        assert_eq!(MajorAxis::Rows.other(), MajorAxis::Columns);
        assert_eq!(MajorAxis::Columns.other().other(), MajorAxis::Columns);
    }
}
