use super::reader::DafReader;
use crate::errors::DafResult;
use crate::types::{
    ElementType, IndexType, MatrixData, MatrixDataMut, StorageScalar, VectorData, VectorDataMut,
};

/// Write access to a daf data set.
///
/// Every mutation validates its preconditions, takes the store's exclusive
/// write lock, bumps the relevant version counters, and invalidates cached
/// artifacts whose dependencies moved.
pub trait DafWriter: DafReader {
    /// Store a scalar. An existing value is replaced only with `overwrite`.
    fn set_scalar(&self, name: &str, value: StorageScalar, overwrite: bool) -> DafResult<()>;
    fn delete_scalar(&self, name: &str, must_exist: bool) -> DafResult<()>;

    /// Create an axis from unique non-empty entries. The length is fixed for
    /// the life of the axis.
    fn add_axis(&self, axis: &str, entries: Vec<String>) -> DafResult<()>;
    /// Delete an axis; fails while vectors or matrices still reference it.
    fn delete_axis(&self, axis: &str, must_exist: bool) -> DafResult<()>;

    fn set_vector(
        &self,
        axis: &str,
        name: &str,
        data: VectorData,
        overwrite: bool,
    ) -> DafResult<()>;
    fn delete_vector(&self, axis: &str, name: &str, must_exist: bool) -> DafResult<()>;

    /// Store a matrix under `(rows, columns)`. The value must be
    /// column-major for that orientation.
    fn set_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
        overwrite: bool,
    ) -> DafResult<()>;
    /// Delete the matrix in both stored orientations.
    fn delete_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        must_exist: bool,
    ) -> DafResult<()>;

    /// Persist the flipped-orientation rendition of a stored matrix, so both
    /// layouts are served without recomputation.
    fn relayout_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        overwrite: bool,
    ) -> DafResult<()>;

    /// Allocate a zeroed dense vector buffer sized by the axis, to be filled
    /// and sealed with [`commit_vector`].
    ///
    /// [`commit_vector`]: DafWriter::commit_vector
    fn create_dense_vector(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
    ) -> DafResult<VectorDataMut>;
    fn create_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<VectorDataMut>;
    fn commit_vector(
        &self,
        axis: &str,
        name: &str,
        buffer: VectorDataMut,
        overwrite: bool,
    ) -> DafResult<()>;

    fn create_dense_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
    ) -> DafResult<MatrixDataMut>;
    #[allow(clippy::too_many_arguments)]
    fn create_sparse_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<MatrixDataMut>;
    fn commit_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        buffer: MatrixDataMut,
        overwrite: bool,
    ) -> DafResult<()>;

    /// Fill-then-seal convenience over create/commit for dense vectors.
    fn with_empty_dense_vector<R>(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
        overwrite: bool,
        fill: impl FnOnce(&mut VectorDataMut) -> DafResult<R>,
    ) -> DafResult<R>
    where
        Self: Sized,
    {
        let mut buffer = self.create_dense_vector(axis, name, element_type)?;
        let result = fill(&mut buffer)?;
        self.commit_vector(axis, name, buffer, overwrite)?;
        Ok(result)
    }

    /// Fill-then-seal convenience over create/commit for sparse vectors.
    fn with_empty_sparse_vector<R>(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
        overwrite: bool,
        fill: impl FnOnce(&mut VectorDataMut) -> DafResult<R>,
    ) -> DafResult<R>
    where
        Self: Sized,
    {
        let mut buffer = self.create_sparse_vector(axis, name, element_type, nnz, index_type)?;
        let result = fill(&mut buffer)?;
        self.commit_vector(axis, name, buffer, overwrite)?;
        Ok(result)
    }

    /// Fill-then-seal convenience over create/commit for dense matrices.
    fn with_empty_dense_matrix<R>(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
        overwrite: bool,
        fill: impl FnOnce(&mut MatrixDataMut) -> DafResult<R>,
    ) -> DafResult<R>
    where
        Self: Sized,
    {
        let mut buffer = self.create_dense_matrix(rows_axis, columns_axis, name, element_type)?;
        let result = fill(&mut buffer)?;
        self.commit_matrix(rows_axis, columns_axis, name, buffer, overwrite)?;
        Ok(result)
    }

    /// Fill-then-seal convenience over create/commit for sparse matrices.
    #[allow(clippy::too_many_arguments)]
    fn with_empty_sparse_matrix<R>(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
        overwrite: bool,
        fill: impl FnOnce(&mut MatrixDataMut) -> DafResult<R>,
    ) -> DafResult<R>
    where
        Self: Sized,
    {
        let mut buffer =
            self.create_sparse_matrix(rows_axis, columns_axis, name, element_type, nnz, index_type)?;
        let result = fill(&mut buffer)?;
        self.commit_matrix(rows_axis, columns_axis, name, buffer, overwrite)?;
        Ok(result)
    }
}
