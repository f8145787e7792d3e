use super::array::{IndexBuf, NumericBuf};
use super::element_type::{ElementType, IndexType};
use super::vector::{AxisLabels, DenseMut, IndexMut};

/// Storage order of a dense matrix buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorOrder {
    RowMajor,
    ColumnMajor,
}

impl MajorOrder {
    pub fn flipped(self) -> MajorOrder {
        match self {
            MajorOrder::RowMajor => MajorOrder::ColumnMajor,
            MajorOrder::ColumnMajor => MajorOrder::RowMajor,
        }
    }
}

/// Compression direction of a sparse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Column-compressed (CSC): `indptr` has one slot per column.
    Csc,
    /// Row-compressed (CSR): `indptr` has one slot per row.
    Csr,
}

impl Compression {
    pub fn flipped(self) -> Compression {
        match self {
            Compression::Csc => Compression::Csr,
            Compression::Csr => Compression::Csc,
        }
    }
}

/// Dense 2-D numeric array with an explicit storage order.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    nrows: usize,
    ncols: usize,
    order: MajorOrder,
    buf: NumericBuf,
}

impl DenseMatrix {
    pub fn new(
        nrows: usize,
        ncols: usize,
        order: MajorOrder,
        buf: NumericBuf,
    ) -> Result<Self, String> {
        let expected = nrows
            .checked_mul(ncols)
            .ok_or_else(|| "matrix size overflow".to_string())?;
        if buf.len() != expected {
            return Err(format!(
                "buffer has {} elements for a {}x{} matrix",
                buf.len(),
                nrows,
                ncols
            ));
        }
        Ok(Self {
            nrows,
            ncols,
            order,
            buf,
        })
    }

    /// Column-major matrix from per-row slices of `f64` values.
    pub fn from_rows(
        element_type: ElementType,
        rows: &[Vec<f64>],
    ) -> Result<Self, String> {
        let nrows = rows.len();
        let ncols = rows.first().map(|row| row.len()).unwrap_or(0);
        let mut values = vec![0.0f64; nrows * ncols];
        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err("ragged rows".to_string());
            }
            for (column_index, &value) in row.iter().enumerate() {
                values[column_index * nrows + row_index] = value;
            }
        }
        let buf = NumericBuf::from_f64_vec(element_type, values)
            .ok_or_else(|| "matrices cannot hold strings".to_string())?;
        Self::new(nrows, ncols, MajorOrder::ColumnMajor, buf)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn order(&self) -> MajorOrder {
        self.order
    }

    pub fn buf(&self) -> &NumericBuf {
        &self.buf
    }

    pub fn element_type(&self) -> ElementType {
        self.buf.element_type()
    }

    fn offset(&self, row: usize, column: usize) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => column * self.nrows + row,
            MajorOrder::RowMajor => row * self.ncols + column,
        }
    }

    pub fn get_f64(&self, row: usize, column: usize) -> f64 {
        self.buf.get_f64(self.offset(row, column))
    }

    /// O(1) transposed view: dimensions swap and the order flips while the
    /// buffer is shared.
    pub fn transposed(&self) -> DenseMatrix {
        DenseMatrix {
            nrows: self.ncols,
            ncols: self.nrows,
            order: self.order.flipped(),
            buf: self.buf.clone(),
        }
    }
}

/// Compressed sparse 2-D numeric array (CSC or CSR).
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    compression: Compression,
    indptr: IndexBuf,
    indices: IndexBuf,
    values: NumericBuf,
}

impl SparseMatrix {
    pub fn new(
        nrows: usize,
        ncols: usize,
        compression: Compression,
        indptr: IndexBuf,
        indices: IndexBuf,
        values: NumericBuf,
    ) -> Result<Self, String> {
        let major_count = match compression {
            Compression::Csc => ncols,
            Compression::Csr => nrows,
        };
        let minor_count = match compression {
            Compression::Csc => nrows,
            Compression::Csr => ncols,
        };
        if indptr.len() != major_count + 1 {
            return Err(format!(
                "indptr has {} slots for {} compressed slices",
                indptr.len(),
                major_count
            ));
        }
        if indices.len() != values.len() {
            return Err(format!(
                "sparse matrix has {} indices but {} values",
                indices.len(),
                values.len()
            ));
        }
        if indptr.get(0) != 0 || indptr.get(major_count) != indices.len() {
            return Err("indptr does not span the stored values".to_string());
        }
        for slice in 0..major_count {
            let start = indptr.get(slice);
            let stop = indptr.get(slice + 1);
            if stop < start {
                return Err("indptr is not monotonically non-decreasing".to_string());
            }
            let mut previous: Option<usize> = None;
            for position in start..stop {
                let minor = indices.get(position);
                if minor >= minor_count {
                    return Err(format!(
                        "sparse index {} is out of the minor axis length {}",
                        minor, minor_count
                    ));
                }
                if let Some(previous) = previous {
                    if minor <= previous {
                        return Err("sparse indices are not sorted within a slice".to_string());
                    }
                }
                previous = Some(minor);
            }
        }
        Ok(Self {
            nrows,
            ncols,
            compression,
            indptr,
            indices,
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn indptr(&self) -> &IndexBuf {
        &self.indptr
    }

    pub fn indices(&self) -> &IndexBuf {
        &self.indices
    }

    pub fn values(&self) -> &NumericBuf {
        &self.values
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }

    pub fn get_f64(&self, row: usize, column: usize) -> f64 {
        let (major, minor) = match self.compression {
            Compression::Csc => (column, row),
            Compression::Csr => (row, column),
        };
        let start = self.indptr.get(major);
        let stop = self.indptr.get(major + 1);
        let mut low = start;
        let mut high = stop;
        while low < high {
            let middle = (low + high) / 2;
            let at = self.indices.get(middle);
            if at == minor {
                return self.values.get_f64(middle);
            } else if at < minor {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        0.0
    }

    /// O(1) transposed view: CSC of the matrix is CSR of its transpose.
    pub fn transposed(&self) -> SparseMatrix {
        SparseMatrix {
            nrows: self.ncols,
            ncols: self.nrows,
            compression: self.compression.flipped(),
            indptr: self.indptr.clone(),
            indices: self.indices.clone(),
            values: self.values.clone(),
        }
    }
}

/// The value of a matrix property.
#[derive(Debug, Clone)]
pub enum MatrixData {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl MatrixData {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            MatrixData::Dense(dense) => (dense.nrows(), dense.ncols()),
            MatrixData::Sparse(sparse) => (sparse.nrows(), sparse.ncols()),
        }
    }

    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            MatrixData::Dense(dense) => dense.element_type(),
            MatrixData::Sparse(sparse) => sparse.element_type(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, MatrixData::Sparse(_))
    }

    /// Fraction of explicitly stored elements (1.0 for dense).
    pub fn density(&self) -> f64 {
        match self {
            MatrixData::Dense(_) => 1.0,
            MatrixData::Sparse(sparse) => {
                let size = sparse.nrows() * sparse.ncols();
                if size == 0 {
                    0.0
                } else {
                    sparse.nnz() as f64 / size as f64
                }
            }
        }
    }

    pub fn get_f64(&self, row: usize, column: usize) -> f64 {
        match self {
            MatrixData::Dense(dense) => dense.get_f64(row, column),
            MatrixData::Sparse(sparse) => sparse.get_f64(row, column),
        }
    }

    pub fn transposed(&self) -> MatrixData {
        match self {
            MatrixData::Dense(dense) => MatrixData::Dense(dense.transposed()),
            MatrixData::Sparse(sparse) => MatrixData::Sparse(sparse.transposed()),
        }
    }

    /// Owned dense submatrix at the given row and column indices, laid out
    /// column-major.
    pub fn gather(&self, row_indices: &[usize], column_indices: &[usize]) -> MatrixData {
        let nrows = row_indices.len();
        let ncols = column_indices.len();
        let mut values = vec![0.0f64; nrows * ncols];
        for (column_out, &column_in) in column_indices.iter().enumerate() {
            for (row_out, &row_in) in row_indices.iter().enumerate() {
                values[column_out * nrows + row_out] = self.get_f64(row_in, column_in);
            }
        }
        let buf = NumericBuf::from_f64_vec(self.element_type(), values)
            .unwrap_or_else(|| unreachable!("matrix values are always numeric"));
        MatrixData::Dense(
            DenseMatrix::new(nrows, ncols, MajorOrder::ColumnMajor, buf)
                .unwrap_or_else(|_| unreachable!("gathered shape always matches its buffer")),
        )
    }
}

/// A matrix together with its row and column axis labels.
#[derive(Debug, Clone)]
pub struct NamedMatrix {
    rows: AxisLabels,
    columns: AxisLabels,
    name: String,
    data: MatrixData,
}

impl NamedMatrix {
    pub fn new(
        rows: AxisLabels,
        columns: AxisLabels,
        name: impl Into<String>,
        data: MatrixData,
    ) -> Self {
        Self {
            rows,
            columns,
            name: name.into(),
            data,
        }
    }

    pub fn rows(&self) -> &AxisLabels {
        &self.rows
    }

    pub fn columns(&self) -> &AxisLabels {
        &self.columns
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &MatrixData {
        &self.data
    }

    pub fn into_data(self) -> MatrixData {
        self.data
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }
}

/// Writable buffer for an uncommitted dense matrix, always column-major.
#[derive(Debug)]
pub struct DenseMatrixMut {
    pub nrows: usize,
    pub ncols: usize,
    pub buf: DenseMut,
}

impl DenseMatrixMut {
    pub fn zeros(element_type: ElementType, nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            buf: DenseMut::zeros(element_type, nrows * ncols),
        }
    }

    pub fn set_f64(&mut self, row: usize, column: usize, value: f64) -> Result<(), String> {
        self.buf.set_f64(column * self.nrows + row, value)
    }

    pub fn freeze(self) -> Result<DenseMatrix, String> {
        let buf = match self.buf.freeze() {
            super::array::VectorBuf::Numeric(buf) => buf,
            super::array::VectorBuf::String(_) => {
                return Err("matrices cannot hold strings".to_string())
            }
        };
        DenseMatrix::new(self.nrows, self.ncols, MajorOrder::ColumnMajor, buf)
    }
}

/// Writable buffer for an uncommitted column-compressed sparse matrix.
#[derive(Debug)]
pub struct SparseMatrixMut {
    pub nrows: usize,
    pub ncols: usize,
    pub indptr: IndexMut,
    pub indices: IndexMut,
    pub values: DenseMut,
}

impl SparseMatrixMut {
    pub fn zeros(
        element_type: ElementType,
        nrows: usize,
        ncols: usize,
        nnz: usize,
        index_type: IndexType,
    ) -> Self {
        Self {
            nrows,
            ncols,
            indptr: IndexMut::zeros(index_type, ncols + 1),
            indices: IndexMut::zeros(index_type, nnz),
            values: DenseMut::zeros(element_type, nnz),
        }
    }

    pub fn freeze(self) -> Result<SparseMatrix, String> {
        let values = match self.values.freeze() {
            super::array::VectorBuf::Numeric(values) => values,
            super::array::VectorBuf::String(_) => {
                return Err("matrices cannot hold strings".to_string())
            }
        };
        SparseMatrix::new(
            self.nrows,
            self.ncols,
            Compression::Csc,
            self.indptr.freeze(),
            self.indices.freeze(),
            values,
        )
    }
}

/// Writable buffer for an uncommitted matrix property.
#[derive(Debug)]
pub enum MatrixDataMut {
    Dense(DenseMatrixMut),
    Sparse(SparseMatrixMut),
}

impl MatrixDataMut {
    pub fn shape(&self) -> (usize, usize) {
        match self {
            MatrixDataMut::Dense(dense) => (dense.nrows, dense.ncols),
            MatrixDataMut::Sparse(sparse) => (sparse.nrows, sparse.ncols),
        }
    }

    pub fn freeze(self) -> Result<MatrixData, String> {
        match self {
            MatrixDataMut::Dense(dense) => dense.freeze().map(MatrixData::Dense),
            MatrixDataMut::Sparse(sparse) => sparse.freeze().map(MatrixData::Sparse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn umis() -> DenseMatrix {
        // [[1, 2, 3], [4, 5, 6]] stored column-major.
        DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_dense_matrix_layout() {
        let matrix = umis();
        assert_eq!(matrix.nrows(), 2);
        assert_eq!(matrix.ncols(), 3);
        assert_eq!(matrix.order(), MajorOrder::ColumnMajor);
        assert_eq!(matrix.get_f64(0, 2), 3.0);
        assert_eq!(matrix.get_f64(1, 0), 4.0);
        assert_eq!(matrix.buf().packed_bytes(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_dense_transpose_is_a_view() {
        let matrix = umis();
        let transposed = matrix.transposed();
        assert_eq!(transposed.nrows(), 3);
        assert_eq!(transposed.order(), MajorOrder::RowMajor);
        assert_eq!(transposed.get_f64(2, 1), 6.0);
    }

    fn small_csc() -> SparseMatrix {
        // 3x2 matrix with entries (0,0)=1, (2,0)=2, (1,1)=3.
        SparseMatrix::new(
            3,
            2,
            Compression::Csc,
            IndexBuf::from_usizes(IndexType::UInt32, vec![0, 2, 3]),
            IndexBuf::from_usizes(IndexType::UInt32, vec![0, 2, 1]),
            NumericBuf::from_f64_vec(ElementType::Float64, vec![1.0, 2.0, 3.0]).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_sparse_matrix_lookup() {
        let matrix = small_csc();
        assert_eq!(matrix.nnz(), 3);
        assert_eq!(matrix.get_f64(0, 0), 1.0);
        assert_eq!(matrix.get_f64(2, 0), 2.0);
        assert_eq!(matrix.get_f64(1, 1), 3.0);
        assert_eq!(matrix.get_f64(0, 1), 0.0);
    }

    #[test]
    fn test_sparse_transpose_flips_compression() {
        let matrix = small_csc();
        let transposed = matrix.transposed();
        assert_eq!(transposed.compression(), Compression::Csr);
        assert_eq!(transposed.get_f64(0, 2), 2.0);
        assert_eq!(transposed.get_f64(1, 1), 3.0);
    }

    #[test]
    fn test_sparse_validation() {
        // indptr not spanning the values.
        assert!(SparseMatrix::new(
            3,
            2,
            Compression::Csc,
            IndexBuf::from_usizes(IndexType::UInt32, vec![0, 2, 2]),
            IndexBuf::from_usizes(IndexType::UInt32, vec![0, 2, 1]),
            NumericBuf::from_f64_vec(ElementType::Float64, vec![1.0, 2.0, 3.0]).unwrap(),
        )
        .is_err());
    }

    #[test]
    fn test_matrix_data_gather() {
        let data = MatrixData::Dense(umis());
        let subset = data.gather(&[1], &[0, 2]);
        assert_eq!(subset.shape(), (1, 2));
        assert_eq!(subset.get_f64(0, 0), 4.0);
        assert_eq!(subset.get_f64(0, 1), 6.0);
    }

    #[test]
    fn test_empty_sparse_matrix() {
        let matrix = SparseMatrix::new(
            0,
            0,
            Compression::Csc,
            IndexBuf::from_usizes(IndexType::UInt32, vec![0]),
            IndexBuf::from_usizes(IndexType::UInt32, vec![]),
            NumericBuf::from_f64_vec(ElementType::Float64, vec![]).unwrap(),
        )
        .unwrap();
        assert_eq!(matrix.nnz(), 0);
    }
}
