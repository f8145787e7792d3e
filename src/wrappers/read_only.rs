use std::sync::Arc;

use crate::errors::DafResult;
use crate::store::DafReader;
use crate::types::{NamedMatrix, NamedVector, StorageScalar};

/// A thin delegating reader that forbids mutation by construction.
pub struct ReadOnlyDaf {
    inner: Arc<dyn DafReader>,
}

/// Wrap a reader so it can be shared without mutation rights. Wrapping an
/// already read-only reader is the identity (no extra layer is added).
pub fn read_only(reader: Arc<dyn DafReader>) -> Arc<dyn DafReader> {
    if reader.is_read_only() {
        reader
    } else {
        Arc::new(ReadOnlyDaf { inner: reader })
    }
}

impl DafReader for ReadOnlyDaf {
    fn name(&self) -> String {
        format!("{}.read_only", self.inner.name())
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn has_scalar(&self, name: &str) -> DafResult<bool> {
        self.inner.has_scalar(name)
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        self.inner.get_scalar(name)
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        self.inner.scalar_names()
    }

    fn has_axis(&self, axis: &str) -> DafResult<bool> {
        self.inner.has_axis(axis)
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        self.inner.axis_names()
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        self.inner.axis_length(axis)
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        self.inner.axis_entries(axis)
    }

    fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>> {
        self.inner.axis_entry_index(axis, entry)
    }

    fn axis_version(&self, axis: &str) -> DafResult<u64> {
        self.inner.axis_version(axis)
    }

    fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool> {
        self.inner.has_vector(axis, name)
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        self.inner.vector_names(axis)
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector> {
        self.inner.get_vector(axis, name)
    }

    fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64> {
        self.inner.vector_version(axis, name)
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool> {
        self.inner.has_matrix(rows_axis, columns_axis, name)
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        self.inner.matrix_names(rows_axis, columns_axis)
    }

    fn get_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<NamedMatrix> {
        self.inner.get_matrix(rows_axis, columns_axis, name)
    }

    fn matrix_version(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<u64> {
        self.inner.matrix_version(rows_axis, columns_axis, name)
    }

    fn matrix_requires_relayout(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<bool> {
        self.inner.matrix_requires_relayout(rows_axis, columns_axis, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DafWriter, MemoryDaf};
    use crate::types::VectorData;

    #[test]
    fn test_read_only_delegates_reads() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1u8, 2]), false)
            .unwrap();
        let frozen = read_only(Arc::new(daf));
        assert!(frozen.is_read_only());
        assert_eq!(frozen.name(), "memory!.read_only");
        assert_eq!(frozen.get_vector("cell", "age").unwrap().len(), 2);
    }

    #[test]
    fn test_double_wrapping_is_identity() {
        let daf: Arc<dyn DafReader> = Arc::new(MemoryDaf::new("memory!"));
        let once = read_only(daf);
        let twice = read_only(Arc::clone(&once));
        assert!(Arc::ptr_eq(&once, &twice));
        assert_eq!(once.name(), twice.name());
    }
}
