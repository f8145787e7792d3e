use std::sync::Arc;

use crate::errors::DafResult;
use crate::types::{NamedMatrix, NamedVector, StorageScalar};

/// Read access to a daf data set.
///
/// Implemented by the cached store over every backend and by the composition
/// wrappers (read-only, chain, view). All methods take `&self`; implementors
/// guard shared state with the store lock, so readers may be freely shared
/// across threads behind an [`Arc`].
///
/// Returned vectors and matrices are read-only views that share the storage
/// buffers; overwriting a property replaces the shared value, it never
/// mutates it in place.
pub trait DafReader: Send + Sync {
    /// The unique human-readable name of the data set.
    fn name(&self) -> String;

    /// Whether this reader rejects all mutation (wrappers and `r`-mode
    /// stores do).
    fn is_read_only(&self) -> bool;

    fn has_scalar(&self, name: &str) -> DafResult<bool>;
    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar>;
    fn scalar_names(&self) -> DafResult<Vec<String>>;

    fn has_axis(&self, axis: &str) -> DafResult<bool>;
    fn axis_names(&self) -> DafResult<Vec<String>>;
    fn axis_length(&self, axis: &str) -> DafResult<usize>;
    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>>;
    /// Position of `entry` in the axis, or `None` when absent.
    fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>>;
    /// Monotonic counter bumped whenever the axis entry set changes.
    fn axis_version(&self, axis: &str) -> DafResult<u64>;

    fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool>;
    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>>;
    fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector>;
    /// Monotonic counter bumped on every overwrite of the vector.
    fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64>;

    /// Whether the matrix exists under `(rows, columns)` in either stored
    /// orientation; the flipped orientation is served through relayout.
    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool>;
    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>>;
    fn get_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str)
        -> DafResult<NamedMatrix>;
    /// Monotonic counter bumped on every overwrite of the matrix (in either
    /// orientation).
    fn matrix_version(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<u64>;
    /// Whether fetching the matrix under this orientation requires computing
    /// a relayout (it is stored only under the flipped orientation).
    fn matrix_requires_relayout(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<bool>;

    /// Pretty-printed listing of the data set contents.
    fn description(&self) -> String
    where
        Self: Sized,
    {
        super::describe::description(self)
    }
}
