use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::types::{
    ElementType, IndexType, MatrixData, MatrixDataMut, StorageScalar, VectorData, VectorDataMut,
};

/// The minimal key-value contract a storage backend must satisfy.
///
/// The backend may trust its callers: axes exist when referenced, properties
/// exist when fetched or deleted, sizes match the axes, and names refer to
/// the correct namespace. All of that is verified above it by the store
/// (see [`crate::store`]). `set` silently overwrites; `delete` does not
/// cascade. Matrices are always stored column-major for the `(rows, columns)`
/// order they are listed under.
pub trait FormatBackend: Send + Sync {
    /// Implementation tag, such as `memory` or `files`.
    fn backend_kind(&self) -> &'static str;

    /// The unique human-readable name of the data set.
    fn daf_name(&self) -> &str;

    fn has_scalar(&self, name: &str) -> bool;
    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar>;
    fn set_scalar(&mut self, name: &str, value: StorageScalar) -> DafResult<()>;
    fn delete_scalar(&mut self, name: &str) -> DafResult<()>;
    fn scalar_names(&self) -> DafResult<Vec<String>>;

    fn has_axis(&self, axis: &str) -> bool;
    fn add_axis(&mut self, axis: &str, entries: Arc<Vec<String>>) -> DafResult<()>;
    fn delete_axis(&mut self, axis: &str) -> DafResult<()>;
    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>>;
    fn axis_length(&self, axis: &str) -> DafResult<usize>;
    fn axis_names(&self) -> DafResult<Vec<String>>;

    fn has_vector(&self, axis: &str, name: &str) -> bool;
    fn get_vector(&self, axis: &str, name: &str) -> DafResult<VectorData>;
    fn set_vector(&mut self, axis: &str, name: &str, data: VectorData) -> DafResult<()>;
    fn delete_vector(&mut self, axis: &str, name: &str) -> DafResult<()>;
    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>>;

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> bool;
    fn get_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<MatrixData>;
    fn set_matrix(
        &mut self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
    ) -> DafResult<()>;
    fn delete_matrix(&mut self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<()>;
    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>>;

    /// Allocate a zeroed dense vector buffer for the caller to fill.
    /// The filled buffer is sealed into storage by [`commit_vector`].
    ///
    /// [`commit_vector`]: FormatBackend::commit_vector
    fn create_dense_vector_empty(
        &mut self,
        _axis: &str,
        _name: &str,
        element_type: ElementType,
        len: usize,
    ) -> DafResult<VectorDataMut> {
        Ok(VectorDataMut::dense(element_type, len))
    }

    /// Allocate a zeroed sparse vector buffer with room for `nnz` entries.
    fn create_sparse_vector_empty(
        &mut self,
        _axis: &str,
        _name: &str,
        element_type: ElementType,
        len: usize,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<VectorDataMut> {
        Ok(VectorDataMut::sparse(element_type, len, nnz, index_type))
    }

    fn commit_vector(&mut self, axis: &str, name: &str, buffer: VectorDataMut) -> DafResult<()> {
        let data = buffer.freeze().map_err(|reason| DafError::Corrupt {
            path: format!("{}/{}", axis, name),
            reason,
        })?;
        self.set_vector(axis, name, data)
    }

    /// Allocate a zeroed column-major dense matrix buffer.
    fn create_dense_matrix_empty(
        &mut self,
        _rows_axis: &str,
        _columns_axis: &str,
        _name: &str,
        element_type: ElementType,
        nrows: usize,
        ncols: usize,
    ) -> DafResult<MatrixDataMut> {
        Ok(MatrixDataMut::Dense(crate::types::DenseMatrixMut::zeros(
            element_type,
            nrows,
            ncols,
        )))
    }

    /// Allocate a zeroed column-compressed sparse matrix buffer.
    #[allow(clippy::too_many_arguments)]
    fn create_sparse_matrix_empty(
        &mut self,
        _rows_axis: &str,
        _columns_axis: &str,
        _name: &str,
        element_type: ElementType,
        nrows: usize,
        ncols: usize,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<MatrixDataMut> {
        Ok(MatrixDataMut::Sparse(crate::types::SparseMatrixMut::zeros(
            element_type,
            nrows,
            ncols,
            nnz,
            index_type,
        )))
    }

    fn commit_matrix(
        &mut self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        buffer: MatrixDataMut,
    ) -> DafResult<()> {
        let data = buffer.freeze().map_err(|reason| DafError::Corrupt {
            path: format!("{}/{}/{}", rows_axis, columns_axis, name),
            reason,
        })?;
        self.set_matrix(rows_axis, columns_axis, name, data)
    }
}
