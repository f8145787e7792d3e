use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::cache::{CacheArtifact, CacheKey, DepKey, StoreCache, VersionTable};
use super::reader::DafReader;
use super::writer::DafWriter;
use crate::backends::{ContainerBackend, FilesBackend, MemoryBackend};
use crate::concurrency::ReentrantRwLock;
use crate::errors::{DafError, DafResult};
use crate::format::FormatBackend;
use crate::layout::{major_axis, relayout, MajorAxis};
use crate::types::{
    AxisLabels, ElementType, IndexType, MatrixData, MatrixDataMut, NamedMatrix, NamedVector,
    StorageScalar, VectorData, VectorDataMut,
};

/// Open mode for the disk-backed stores, written the way file modes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// `r`: open an existing store, reject all mutation.
    ReadOnly,
    /// `r+`: open an existing store for reading and writing.
    ReadWrite,
    /// `w`: create a store, truncating one that is already there.
    Truncate,
    /// `w+`: open a store, creating it when missing.
    CreateIfMissing,
}

impl AccessMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "r" => Ok(AccessMode::ReadOnly),
            "r+" => Ok(AccessMode::ReadWrite),
            "w" => Ok(AccessMode::Truncate),
            "w+" => Ok(AccessMode::CreateIfMissing),
            other => Err(format!("invalid access mode: {}", other)),
        }
    }
}

struct StoreState<B> {
    backend: B,
    versions: VersionTable,
}

/// The cached, validated, locked store over a storage backend.
///
/// This layer adds everything the backend is allowed to trust: existence and
/// shape validation with typed errors, version counters for every axis and
/// property, the artifact cache (axis dictionaries and automatic relayouts),
/// and the re-entrant read/write locking discipline. Each public read takes
/// the shared lock; each mutation takes the exclusive lock.
pub struct DafStore<B: FormatBackend> {
    state: ReentrantRwLock<StoreState<B>>,
    cache: StoreCache,
    read_only: bool,
}

pub type MemoryDaf = DafStore<MemoryBackend>;
pub type FilesDaf = DafStore<FilesBackend>;
pub type ContainerDaf = DafStore<ContainerBackend>;

impl MemoryDaf {
    pub fn new(name: impl Into<String>) -> Self {
        DafStore::from_backend(MemoryBackend::new(name), false)
    }
}

fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "daf".to_string())
}

impl FilesDaf {
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> DafResult<Self> {
        let path = path.as_ref();
        let backend = match mode {
            AccessMode::ReadOnly | AccessMode::ReadWrite => FilesBackend::open(path)?,
            AccessMode::Truncate => FilesBackend::create(path, name_from_path(path), true)?,
            AccessMode::CreateIfMissing => {
                if path.join("daf.json").is_file() {
                    FilesBackend::open(path)?
                } else {
                    FilesBackend::create(path, name_from_path(path), false)?
                }
            }
        };
        Ok(DafStore::from_backend(backend, !mode.is_writable()))
    }
}

impl ContainerDaf {
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> DafResult<Self> {
        let path = path.as_ref();
        let backend = match mode {
            AccessMode::ReadOnly | AccessMode::ReadWrite => ContainerBackend::open(path)?,
            AccessMode::Truncate => ContainerBackend::create(path, name_from_path(path), true)?,
            AccessMode::CreateIfMissing => {
                ContainerBackend::create(path, name_from_path(path), false)?
            }
        };
        Ok(DafStore::from_backend(backend, !mode.is_writable()))
    }
}

impl<B: FormatBackend> DafStore<B> {
    pub fn from_backend(backend: B, read_only: bool) -> Self {
        let label = backend.daf_name().to_string();
        Self {
            state: ReentrantRwLock::new(
                label,
                StoreState {
                    backend,
                    versions: VersionTable::new(),
                },
            ),
            cache: StoreCache::new(),
            read_only,
        }
    }

    fn require_writable(&self) -> DafResult<()> {
        if self.read_only {
            Err(DafError::ReadOnly {
                daf: self.state.label().to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn unknown_axis(&self, state: &StoreState<B>, axis: &str) -> DafError {
        DafError::UnknownAxis {
            daf: state.backend.daf_name().to_string(),
            axis: axis.to_string(),
        }
    }

    fn require_axis(&self, state: &StoreState<B>, axis: &str) -> DafResult<()> {
        if state.backend.has_axis(axis) {
            Ok(())
        } else {
            Err(self.unknown_axis(state, axis))
        }
    }

    fn axis_labels(&self, state: &StoreState<B>, axis: &str) -> DafResult<AxisLabels> {
        Ok(AxisLabels::new(axis, state.backend.axis_entries(axis)?))
    }

    /// Count the vectors and matrices that still reference `axis`.
    fn axis_dependents(&self, state: &StoreState<B>, axis: &str) -> DafResult<usize> {
        let mut dependents = state.backend.vector_names(axis)?.len();
        let mut axes = state.backend.axis_names()?;
        if !axes.iter().any(|other| other == axis) {
            axes.push(axis.to_string());
        }
        for other in &axes {
            dependents += state.backend.matrix_names(axis, other)?.len();
            if other != axis {
                dependents += state.backend.matrix_names(other, axis)?.len();
            }
        }
        Ok(dependents)
    }

    /// The stored orientation serving `(rows, columns, name)`: `false` when
    /// stored as listed, `true` when only the flipped orientation exists.
    fn stored_flipped(
        &self,
        state: &StoreState<B>,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<bool> {
        if state.backend.has_matrix(rows_axis, columns_axis, name) {
            Ok(false)
        } else if state.backend.has_matrix(columns_axis, rows_axis, name) {
            Ok(true)
        } else {
            Err(DafError::UnknownMatrix {
                daf: state.backend.daf_name().to_string(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            })
        }
    }

    fn axis_dict(
        &self,
        state: &StoreState<B>,
        axis: &str,
    ) -> DafResult<Arc<HashMap<String, usize>>> {
        let key = CacheKey::AxisDict(axis.to_string());
        if let Some(CacheArtifact::AxisDict(dict)) =
            self.cache.lookup(&key, |dep| state.versions.of(dep))
        {
            return Ok(dict);
        }
        let entries = state.backend.axis_entries(axis)?;
        let dict: Arc<HashMap<String, usize>> = Arc::new(
            entries
                .iter()
                .enumerate()
                .map(|(index, entry)| (entry.clone(), index))
                .collect(),
        );
        self.cache.publish(
            key,
            CacheArtifact::AxisDict(Arc::clone(&dict)),
            vec![(DepKey::Axis(axis.to_string()), state.versions.axis(axis))],
        );
        Ok(dict)
    }

    fn validate_new_axis_entries(&self, daf: &str, axis: &str, entries: &[String]) -> DafResult<()> {
        let mut seen = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            if entry.is_empty() {
                return Err(DafError::EmptyEntry {
                    daf: daf.to_string(),
                    axis: axis.to_string(),
                    index,
                });
            }
            if seen.insert(entry.clone(), index).is_some() {
                return Err(DafError::DuplicateEntry {
                    daf: daf.to_string(),
                    axis: axis.to_string(),
                    entry: entry.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<B: FormatBackend> DafReader for DafStore<B> {
    fn name(&self) -> String {
        self.state.read().backend.daf_name().to_string()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn has_scalar(&self, name: &str) -> DafResult<bool> {
        Ok(self.state.read().backend.has_scalar(name))
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        self.state.read().backend.get_scalar(name)
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        self.state.read().backend.scalar_names()
    }

    fn has_axis(&self, axis: &str) -> DafResult<bool> {
        Ok(self.state.read().backend.has_axis(axis))
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        self.state.read().backend.axis_names()
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        self.state.read().backend.axis_length(axis)
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        self.state.read().backend.axis_entries(axis)
    }

    fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>> {
        let state = self.state.read();
        self.require_axis(&state, axis)?;
        let dict = self.axis_dict(&state, axis)?;
        Ok(dict.get(entry).copied())
    }

    fn axis_version(&self, axis: &str) -> DafResult<u64> {
        let state = self.state.read();
        self.require_axis(&state, axis)?;
        Ok(state.versions.axis(axis))
    }

    fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool> {
        let state = self.state.read();
        self.require_axis(&state, axis)?;
        Ok(state.backend.has_vector(axis, name))
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        let state = self.state.read();
        self.require_axis(&state, axis)?;
        state.backend.vector_names(axis)
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector> {
        let state = self.state.read();
        self.require_axis(&state, axis)?;
        let data = state.backend.get_vector(axis, name)?;
        let labels = self.axis_labels(&state, axis)?;
        if data.len() != labels.len() {
            return Err(DafError::LengthMismatch {
                daf: state.backend.daf_name().to_string(),
                axis: axis.to_string(),
                name: name.to_string(),
                expected: labels.len(),
                actual: data.len(),
            });
        }
        Ok(NamedVector::new(labels, name, data))
    }

    fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64> {
        let state = self.state.read();
        self.require_axis(&state, axis)?;
        Ok(state.versions.vector(axis, name))
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool> {
        let state = self.state.read();
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        Ok(state.backend.has_matrix(rows_axis, columns_axis, name)
            || state.backend.has_matrix(columns_axis, rows_axis, name))
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        let state = self.state.read();
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        let mut names = state.backend.matrix_names(rows_axis, columns_axis)?;
        for name in state.backend.matrix_names(columns_axis, rows_axis)? {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn get_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<NamedMatrix> {
        let state = self.state.read();
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        let rows = self.axis_labels(&state, rows_axis)?;
        let columns = self.axis_labels(&state, columns_axis)?;

        let data = if !self.stored_flipped(&state, rows_axis, columns_axis, name)? {
            state.backend.get_matrix(rows_axis, columns_axis, name)?
        } else {
            let key = CacheKey::Relayout(
                rows_axis.to_string(),
                columns_axis.to_string(),
                name.to_string(),
            );
            let dep = DepKey::Matrix(
                columns_axis.to_string(),
                rows_axis.to_string(),
                name.to_string(),
            );
            match self.cache.lookup(&key, |dep| state.versions.of(dep)) {
                Some(CacheArtifact::Matrix(data)) => data,
                _ => {
                    let stored = state.backend.get_matrix(columns_axis, rows_axis, name)?;
                    log::debug!(
                        "relayout matrix: {} from the axes: {}, {} to the axes: {}, {}",
                        name,
                        columns_axis,
                        rows_axis,
                        rows_axis,
                        columns_axis
                    );
                    let computed = relayout(&stored.transposed());
                    let version = state.versions.of(&dep);
                    self.cache.publish(
                        key,
                        CacheArtifact::Matrix(computed.clone()),
                        vec![(dep, version)],
                    );
                    computed
                }
            }
        };

        if data.shape() != (rows.len(), columns.len()) {
            return Err(DafError::ShapeMismatch {
                daf: state.backend.daf_name().to_string(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
                expected_rows: rows.len(),
                expected_columns: columns.len(),
                actual_rows: data.nrows(),
                actual_columns: data.ncols(),
            });
        }
        Ok(NamedMatrix::new(rows, columns, name, data))
    }

    fn matrix_version(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<u64> {
        let state = self.state.read();
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        Ok(state.versions.matrix(rows_axis, columns_axis, name))
    }

    fn matrix_requires_relayout(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<bool> {
        let state = self.state.read();
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        self.stored_flipped(&state, rows_axis, columns_axis, name)
    }
}

impl<B: FormatBackend> DafWriter for DafStore<B> {
    fn set_scalar(&self, name: &str, value: StorageScalar, overwrite: bool) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        if !overwrite && state.backend.has_scalar(name) {
            return Err(DafError::PropertyExists {
                daf: state.backend.daf_name().to_string(),
                kind: "scalar".to_string(),
                name: name.to_string(),
            });
        }
        state.backend.set_scalar(name, value)
    }

    fn delete_scalar(&self, name: &str, must_exist: bool) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        if !state.backend.has_scalar(name) {
            if must_exist {
                return Err(DafError::UnknownScalar {
                    daf: state.backend.daf_name().to_string(),
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
        state.backend.delete_scalar(name)
    }

    fn add_axis(&self, axis: &str, entries: Vec<String>) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        if state.backend.has_axis(axis) {
            return Err(DafError::DuplicateAxis {
                daf: state.backend.daf_name().to_string(),
                axis: axis.to_string(),
            });
        }
        let daf = state.backend.daf_name().to_string();
        self.validate_new_axis_entries(&daf, axis, &entries)?;
        state.backend.add_axis(axis, Arc::new(entries))?;
        state.versions.bump_axis(axis);
        Ok(())
    }

    fn delete_axis(&self, axis: &str, must_exist: bool) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        if !state.backend.has_axis(axis) {
            if must_exist {
                return Err(self.unknown_axis(&state, axis));
            }
            return Ok(());
        }
        let dependents = self.axis_dependents(&state, axis)?;
        if dependents > 0 {
            return Err(DafError::AxisInUse {
                daf: state.backend.daf_name().to_string(),
                axis: axis.to_string(),
                dependents,
            });
        }
        state.backend.delete_axis(axis)?;
        state.versions.bump_axis(axis);
        self.cache.evict_dependents(&DepKey::Axis(axis.to_string()));
        Ok(())
    }

    fn set_vector(
        &self,
        axis: &str,
        name: &str,
        data: VectorData,
        overwrite: bool,
    ) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, axis)?;
        let expected = state.backend.axis_length(axis)?;
        if data.len() != expected {
            return Err(DafError::LengthMismatch {
                daf: state.backend.daf_name().to_string(),
                axis: axis.to_string(),
                name: name.to_string(),
                expected,
                actual: data.len(),
            });
        }
        if !overwrite && state.backend.has_vector(axis, name) {
            return Err(DafError::PropertyExists {
                daf: state.backend.daf_name().to_string(),
                kind: "vector".to_string(),
                name: format!("{}/{}", axis, name),
            });
        }
        state.backend.set_vector(axis, name, data)?;
        state.versions.bump_vector(axis, name);
        Ok(())
    }

    fn delete_vector(&self, axis: &str, name: &str, must_exist: bool) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, axis)?;
        if !state.backend.has_vector(axis, name) {
            if must_exist {
                return Err(DafError::UnknownVector {
                    daf: state.backend.daf_name().to_string(),
                    axis: axis.to_string(),
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
        state.backend.delete_vector(axis, name)?;
        state.versions.bump_vector(axis, name);
        self.cache
            .evict_dependents(&DepKey::Vector(axis.to_string(), name.to_string()));
        Ok(())
    }

    fn set_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
        overwrite: bool,
    ) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        let expected_rows = state.backend.axis_length(rows_axis)?;
        let expected_columns = state.backend.axis_length(columns_axis)?;
        if data.shape() != (expected_rows, expected_columns) {
            return Err(DafError::ShapeMismatch {
                daf: state.backend.daf_name().to_string(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
                expected_rows,
                expected_columns,
                actual_rows: data.nrows(),
                actual_columns: data.ncols(),
            });
        }
        match major_axis(&data) {
            Some(MajorAxis::Columns) => {}
            Some(MajorAxis::Rows) => {
                return Err(DafError::LayoutMismatch {
                    reason: format!(
                        "the matrix: {} must be stored column-major for the axes: {}, {} (relayout it first)",
                        name, rows_axis, columns_axis
                    ),
                })
            }
            None => {
                return Err(DafError::NoMajorAxis {
                    name: name.to_string(),
                })
            }
        }
        if !overwrite && state.backend.has_matrix(rows_axis, columns_axis, name) {
            return Err(DafError::PropertyExists {
                daf: state.backend.daf_name().to_string(),
                kind: "matrix".to_string(),
                name: format!("{}/{}/{}", rows_axis, columns_axis, name),
            });
        }
        state.backend.set_matrix(rows_axis, columns_axis, name, data)?;
        state.versions.bump_matrix(rows_axis, columns_axis, name);
        Ok(())
    }

    fn delete_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        must_exist: bool,
    ) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        let as_listed = state.backend.has_matrix(rows_axis, columns_axis, name);
        let flipped = state.backend.has_matrix(columns_axis, rows_axis, name);
        if !as_listed && !flipped {
            if must_exist {
                return Err(DafError::UnknownMatrix {
                    daf: state.backend.daf_name().to_string(),
                    rows_axis: rows_axis.to_string(),
                    columns_axis: columns_axis.to_string(),
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
        if as_listed {
            state.backend.delete_matrix(rows_axis, columns_axis, name)?;
        }
        if flipped {
            state.backend.delete_matrix(columns_axis, rows_axis, name)?;
        }
        state.versions.bump_matrix(rows_axis, columns_axis, name);
        for dep in [
            DepKey::Matrix(
                rows_axis.to_string(),
                columns_axis.to_string(),
                name.to_string(),
            ),
            DepKey::Matrix(
                columns_axis.to_string(),
                rows_axis.to_string(),
                name.to_string(),
            ),
        ] {
            self.cache.evict_dependents(&dep);
        }
        Ok(())
    }

    fn relayout_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        overwrite: bool,
    ) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        if !state.backend.has_matrix(rows_axis, columns_axis, name) {
            return Err(DafError::UnknownMatrix {
                daf: state.backend.daf_name().to_string(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            });
        }
        if !overwrite && state.backend.has_matrix(columns_axis, rows_axis, name) {
            return Err(DafError::PropertyExists {
                daf: state.backend.daf_name().to_string(),
                kind: "matrix".to_string(),
                name: format!("{}/{}/{}", columns_axis, rows_axis, name),
            });
        }
        let stored = state.backend.get_matrix(rows_axis, columns_axis, name)?;
        let flipped = relayout(&stored.transposed());
        state
            .backend
            .set_matrix(columns_axis, rows_axis, name, flipped)?;
        state.versions.bump_matrix(rows_axis, columns_axis, name);
        Ok(())
    }

    fn create_dense_vector(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
    ) -> DafResult<VectorDataMut> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, axis)?;
        let len = state.backend.axis_length(axis)?;
        state
            .backend
            .create_dense_vector_empty(axis, name, element_type, len)
    }

    fn create_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<VectorDataMut> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, axis)?;
        if element_type == ElementType::String {
            return Err(DafError::UnsupportedElementType {
                holder: format!("the sparse vector: {}/{}", axis, name),
                element_type,
            });
        }
        let len = state.backend.axis_length(axis)?;
        state
            .backend
            .create_sparse_vector_empty(axis, name, element_type, len, nnz, index_type)
    }

    fn commit_vector(
        &self,
        axis: &str,
        name: &str,
        buffer: VectorDataMut,
        overwrite: bool,
    ) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, axis)?;
        let expected = state.backend.axis_length(axis)?;
        if buffer.len() != expected {
            return Err(DafError::LengthMismatch {
                daf: state.backend.daf_name().to_string(),
                axis: axis.to_string(),
                name: name.to_string(),
                expected,
                actual: buffer.len(),
            });
        }
        if !overwrite && state.backend.has_vector(axis, name) {
            return Err(DafError::PropertyExists {
                daf: state.backend.daf_name().to_string(),
                kind: "vector".to_string(),
                name: format!("{}/{}", axis, name),
            });
        }
        state.backend.commit_vector(axis, name, buffer)?;
        state.versions.bump_vector(axis, name);
        Ok(())
    }

    fn create_dense_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
    ) -> DafResult<MatrixDataMut> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        if !element_type.is_numeric() {
            return Err(DafError::UnsupportedElementType {
                holder: format!("the matrix: {}/{}/{}", rows_axis, columns_axis, name),
                element_type,
            });
        }
        let nrows = state.backend.axis_length(rows_axis)?;
        let ncols = state.backend.axis_length(columns_axis)?;
        state.backend.create_dense_matrix_empty(
            rows_axis,
            columns_axis,
            name,
            element_type,
            nrows,
            ncols,
        )
    }

    fn create_sparse_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<MatrixDataMut> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        if !element_type.is_numeric() {
            return Err(DafError::UnsupportedElementType {
                holder: format!("the matrix: {}/{}/{}", rows_axis, columns_axis, name),
                element_type,
            });
        }
        let nrows = state.backend.axis_length(rows_axis)?;
        let ncols = state.backend.axis_length(columns_axis)?;
        state.backend.create_sparse_matrix_empty(
            rows_axis,
            columns_axis,
            name,
            element_type,
            nrows,
            ncols,
            nnz,
            index_type,
        )
    }

    fn commit_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        buffer: MatrixDataMut,
        overwrite: bool,
    ) -> DafResult<()> {
        self.require_writable()?;
        let mut state = self.state.write()?;
        self.require_axis(&state, rows_axis)?;
        self.require_axis(&state, columns_axis)?;
        let expected_rows = state.backend.axis_length(rows_axis)?;
        let expected_columns = state.backend.axis_length(columns_axis)?;
        if buffer.shape() != (expected_rows, expected_columns) {
            return Err(DafError::ShapeMismatch {
                daf: state.backend.daf_name().to_string(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
                expected_rows,
                expected_columns,
                actual_rows: buffer.shape().0,
                actual_columns: buffer.shape().1,
            });
        }
        if !overwrite && state.backend.has_matrix(rows_axis, columns_axis, name) {
            return Err(DafError::PropertyExists {
                daf: state.backend.daf_name().to_string(),
                kind: "matrix".to_string(),
                name: format!("{}/{}/{}", rows_axis, columns_axis, name),
            });
        }
        state
            .backend
            .commit_matrix(rows_axis, columns_axis, name, buffer)?;
        state.versions.bump_matrix(rows_axis, columns_axis, name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DenseMatrix;

    fn entries(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_create_and_read() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("cell", entries(&["c0", "c1", "c2"])).unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![10i64, 20, 30]), false)
            .unwrap();

        let vector = daf.get_vector("cell", "age").unwrap();
        assert_eq!(vector.len(), 3);
        assert_eq!(vector.data().get(0), StorageScalar::Int64(10));
        assert_eq!(vector.data().get(2), StorageScalar::Int64(30));
        assert!(daf.scalar_names().unwrap().is_empty());
        assert_eq!(daf.vector_names("cell").unwrap(), vec!["age"]);
    }

    #[test]
    fn test_axis_validation() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("cell", entries(&["c0", "c1"])).unwrap();
        assert!(matches!(
            daf.add_axis("cell", entries(&["x"])),
            Err(DafError::DuplicateAxis { .. })
        ));
        assert!(matches!(
            daf.add_axis("gene", entries(&["g0", "g0"])),
            Err(DafError::DuplicateEntry { .. })
        ));
        assert!(matches!(
            daf.add_axis("batch", entries(&["b0", ""])),
            Err(DafError::EmptyEntry { .. })
        ));
        assert!(matches!(
            daf.set_vector("gene", "noise", VectorData::from(vec![1.0f32]), false),
            Err(DafError::UnknownAxis { .. })
        ));
    }

    #[test]
    fn test_length_validation_and_overwrite() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("cell", entries(&["c0", "c1"])).unwrap();
        assert!(matches!(
            daf.set_vector("cell", "age", VectorData::from(vec![1i64]), false),
            Err(DafError::LengthMismatch { .. })
        ));
        daf.set_vector("cell", "age", VectorData::from(vec![1i64, 2]), false)
            .unwrap();
        assert!(matches!(
            daf.set_vector("cell", "age", VectorData::from(vec![3i64, 4]), false),
            Err(DafError::PropertyExists { .. })
        ));
        let before = daf.vector_version("cell", "age").unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![3i64, 4]), true)
            .unwrap();
        assert!(daf.vector_version("cell", "age").unwrap() > before);
    }

    #[test]
    fn test_axis_in_use_guard() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("cell", entries(&["c0", "c1"])).unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1u8, 2]), false)
            .unwrap();
        assert!(matches!(
            daf.delete_axis("cell", true),
            Err(DafError::AxisInUse { .. })
        ));
        daf.delete_vector("cell", "age", true).unwrap();
        daf.delete_axis("cell", true).unwrap();
        assert!(!daf.has_axis("cell").unwrap());
    }

    #[test]
    fn test_auto_relayout_and_cache() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("gene", entries(&["g0", "g1"])).unwrap();
        daf.add_axis("cell", entries(&["c0", "c1", "c2"])).unwrap();
        let matrix = DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
            .unwrap();

        assert!(daf.has_matrix("cell", "gene", "UMIs").unwrap());
        assert!(daf.matrix_requires_relayout("cell", "gene", "UMIs").unwrap());
        assert!(!daf.matrix_requires_relayout("gene", "cell", "UMIs").unwrap());

        let flipped = daf.get_matrix("cell", "gene", "UMIs").unwrap();
        assert_eq!(flipped.shape(), (3, 2));
        assert_eq!(flipped.data().get_f64(0, 1), 4.0);
        assert_eq!(
            major_axis(flipped.data()),
            Some(crate::layout::MajorAxis::Columns)
        );

        // Second fetch is served from the cache and compares equal.
        let again = daf.get_matrix("cell", "gene", "UMIs").unwrap();
        assert_eq!(again.data().get_f64(2, 0), 3.0);
        assert_eq!(daf.matrix_names("cell", "gene").unwrap(), vec!["UMIs"]);
    }

    #[test]
    fn test_row_major_set_is_rejected() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("gene", entries(&["g0", "g1"])).unwrap();
        daf.add_axis("cell", entries(&["c0", "c1", "c2"])).unwrap();
        let matrix = DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        )
        .unwrap();
        // A transposed view is row-major for the listed orientation.
        let row_major = MatrixData::Dense(matrix).transposed();
        assert!(matches!(
            daf.set_matrix("gene", "cell", "UMIs", row_major, false),
            Err(DafError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_relayout_matrix_persists_both_orientations() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("gene", entries(&["g0", "g1"])).unwrap();
        daf.add_axis("cell", entries(&["c0", "c1", "c2"])).unwrap();
        let matrix = DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
            .unwrap();
        daf.relayout_matrix("gene", "cell", "UMIs", false).unwrap();
        assert!(!daf.matrix_requires_relayout("cell", "gene", "UMIs").unwrap());
        let flipped = daf.get_matrix("cell", "gene", "UMIs").unwrap();
        assert_eq!(flipped.data().get_f64(1, 1), 5.0);
    }

    #[test]
    fn test_empty_creation_round_trip() {
        let daf = MemoryDaf::new("memory!");
        daf.add_axis("cell", entries(&["c0", "c1", "c2"])).unwrap();
        daf.with_empty_dense_vector("cell", "age", ElementType::Int32, false, |buffer| {
            if let VectorDataMut::Dense(dense) = buffer {
                dense.as_i32_mut().unwrap().copy_from_slice(&[7, 8, 9]);
            }
            Ok(())
        })
        .unwrap();
        let vector = daf.get_vector("cell", "age").unwrap();
        assert_eq!(vector.data().get(1), StorageScalar::Int32(8));
    }

    #[test]
    fn test_read_only_mode_rejects_mutation() {
        let backend = MemoryBackend::new("frozen!");
        let daf = DafStore::from_backend(backend, true);
        assert!(matches!(
            daf.set_scalar("x", StorageScalar::Bool(true), false),
            Err(DafError::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_scalar_overwrite_policy() {
        let daf = MemoryDaf::new("memory!");
        daf.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        assert!(matches!(
            daf.set_scalar("organism", StorageScalar::from("mouse"), false),
            Err(DafError::PropertyExists { .. })
        ));
        daf.set_scalar("organism", StorageScalar::from("mouse"), true)
            .unwrap();
        assert_eq!(
            daf.get_scalar("organism").unwrap(),
            StorageScalar::from("mouse")
        );
        daf.delete_scalar("organism", true).unwrap();
        assert!(matches!(
            daf.delete_scalar("organism", true),
            Err(DafError::UnknownScalar { .. })
        ));
    }
}
