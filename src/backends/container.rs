use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{DafError, DafResult};
use crate::format::FormatBackend;
use crate::types::{
    Compression, DenseMatrix, ElementType, IndexBuf, IndexType, MajorOrder, MatrixData, NumericBuf,
    SparseMatrix, SparseVector, StorageScalar, VectorBuf, VectorData,
};

const MAGIC: &[u8; 4] = b"DAF\x01";

/// Serialized form of one vector property inside the container.
#[derive(Debug, Serialize, Deserialize)]
enum StoredVector {
    DenseNumeric {
        element_type: ElementType,
        len: usize,
        bytes: Vec<u8>,
    },
    DenseString {
        values: Vec<String>,
    },
    Sparse {
        element_type: ElementType,
        len: usize,
        nnz: usize,
        index_type: IndexType,
        indices: Vec<u8>,
        values: Vec<u8>,
    },
}

/// Serialized form of one matrix property inside the container.
#[derive(Debug, Serialize, Deserialize)]
enum StoredMatrix {
    Dense {
        element_type: ElementType,
        nrows: usize,
        ncols: usize,
        bytes: Vec<u8>,
    },
    Sparse {
        element_type: ElementType,
        nrows: usize,
        ncols: usize,
        nnz: usize,
        index_type: IndexType,
        indptr: Vec<u8>,
        indices: Vec<u8>,
        values: Vec<u8>,
    },
}

/// One sub-group per namespace: a scalars group, one group per axis for its
/// entries and vectors, and one group per `(rows, columns)` pair for matrices.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ContainerGroups {
    name: String,
    scalars: BTreeMap<String, StorageScalar>,
    axes: BTreeMap<String, Vec<String>>,
    vectors: BTreeMap<String, BTreeMap<String, StoredVector>>,
    matrices: BTreeMap<String, BTreeMap<String, BTreeMap<String, StoredMatrix>>>,
}

/// Single-file hierarchical container backend.
///
/// The whole group tree is loaded eagerly on open and re-encoded atomically
/// on every mutation; the on-disk encoding (a magic tag plus a bincode
/// payload) is an implementation detail of this backend, not part of the
/// storage contract.
#[derive(Debug)]
pub struct ContainerBackend {
    path: PathBuf,
    groups: ContainerGroups,
}

impl ContainerBackend {
    pub fn create(path: impl Into<PathBuf>, name: impl Into<String>, truncate: bool) -> DafResult<Self> {
        let path = path.into();
        if !truncate && path.exists() {
            return Self::open(path);
        }
        let backend = Self {
            path,
            groups: ContainerGroups {
                name: name.into(),
                ..Default::default()
            },
        };
        backend.flush()?;
        log::debug!(
            "created container daf: {} at {}",
            backend.groups.name,
            backend.path.display()
        );
        Ok(backend)
    }

    pub fn open(path: impl Into<PathBuf>) -> DafResult<Self> {
        let path = path.into();
        let mut file =
            File::open(&path).map_err(|error| DafError::io(path.display().to_string(), error))?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|error| DafError::io(path.display().to_string(), error))?;
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(DafError::corrupt(
                path.display().to_string(),
                "missing container magic",
            ));
        }
        let groups: ContainerGroups = bincode::deserialize(&bytes[MAGIC.len()..])
            .map_err(|error| DafError::corrupt(path.display().to_string(), error.to_string()))?;
        Ok(Self { path, groups })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> DafResult<()> {
        let payload = bincode::serialize(&self.groups)
            .map_err(|error| DafError::corrupt(self.path.display().to_string(), error.to_string()))?;
        let temporary = self.path.with_file_name(format!(
            "{}.tmp",
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default()
        ));
        {
            let mut file = File::create(&temporary)
                .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
            file.write_all(MAGIC)
                .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
            file.write_all(&payload)
                .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
            file.sync_all()
                .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
        }
        fs::rename(&temporary, &self.path)
            .map_err(|error| DafError::io(self.path.display().to_string(), error))
    }

    fn encode_vector(data: &VectorData) -> StoredVector {
        match data {
            VectorData::Dense(VectorBuf::Numeric(buf)) => StoredVector::DenseNumeric {
                element_type: buf.element_type(),
                len: buf.len(),
                bytes: buf.packed_bytes(),
            },
            VectorData::Dense(VectorBuf::String(values)) => StoredVector::DenseString {
                values: values.as_ref().clone(),
            },
            VectorData::Sparse(sparse) => StoredVector::Sparse {
                element_type: sparse.element_type(),
                len: sparse.len(),
                nnz: sparse.nnz(),
                index_type: sparse.indices().index_type(),
                indices: sparse.indices().packed_bytes(),
                values: sparse.values().packed_bytes(),
            },
        }
    }

    fn decode_vector(&self, stored: &StoredVector) -> DafResult<VectorData> {
        let path = self.path.display().to_string();
        match stored {
            StoredVector::DenseNumeric {
                element_type,
                len,
                bytes,
            } => {
                let buf = NumericBuf::from_packed_bytes(*element_type, bytes, *len)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                Ok(VectorData::Dense(VectorBuf::Numeric(buf)))
            }
            StoredVector::DenseString { values } => {
                Ok(VectorData::Dense(VectorBuf::from_strings(values.clone())))
            }
            StoredVector::Sparse {
                element_type,
                len,
                nnz,
                index_type,
                indices,
                values,
            } => {
                let indices = IndexBuf::from_packed_bytes(*index_type, indices, *nnz)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                let values = NumericBuf::from_packed_bytes(*element_type, values, *nnz)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                let sparse = SparseVector::new(*len, indices, values)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                Ok(VectorData::Sparse(sparse))
            }
        }
    }

    fn encode_matrix(data: &MatrixData) -> StoredMatrix {
        match data {
            MatrixData::Dense(dense) => StoredMatrix::Dense {
                element_type: dense.element_type(),
                nrows: dense.nrows(),
                ncols: dense.ncols(),
                bytes: dense.buf().packed_bytes(),
            },
            MatrixData::Sparse(sparse) => StoredMatrix::Sparse {
                element_type: sparse.element_type(),
                nrows: sparse.nrows(),
                ncols: sparse.ncols(),
                nnz: sparse.nnz(),
                index_type: sparse.indices().index_type(),
                indptr: sparse.indptr().packed_bytes(),
                indices: sparse.indices().packed_bytes(),
                values: sparse.values().packed_bytes(),
            },
        }
    }

    fn decode_matrix(&self, stored: &StoredMatrix) -> DafResult<MatrixData> {
        let path = self.path.display().to_string();
        match stored {
            StoredMatrix::Dense {
                element_type,
                nrows,
                ncols,
                bytes,
            } => {
                let buf = NumericBuf::from_packed_bytes(*element_type, bytes, nrows * ncols)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                let dense = DenseMatrix::new(*nrows, *ncols, MajorOrder::ColumnMajor, buf)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                Ok(MatrixData::Dense(dense))
            }
            StoredMatrix::Sparse {
                element_type,
                nrows,
                ncols,
                nnz,
                index_type,
                indptr,
                indices,
                values,
            } => {
                let indptr = IndexBuf::from_packed_bytes(*index_type, indptr, ncols + 1)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                let indices = IndexBuf::from_packed_bytes(*index_type, indices, *nnz)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                let values = NumericBuf::from_packed_bytes(*element_type, values, *nnz)
                    .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                let sparse = SparseMatrix::new(
                    *nrows,
                    *ncols,
                    Compression::Csc,
                    indptr,
                    indices,
                    values,
                )
                .map_err(|reason| DafError::corrupt(path.clone(), reason))?;
                Ok(MatrixData::Sparse(sparse))
            }
        }
    }
}

impl FormatBackend for ContainerBackend {
    fn backend_kind(&self) -> &'static str {
        "container"
    }

    fn daf_name(&self) -> &str {
        &self.groups.name
    }

    fn has_scalar(&self, name: &str) -> bool {
        self.groups.scalars.contains_key(name)
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        self.groups
            .scalars
            .get(name)
            .cloned()
            .ok_or_else(|| DafError::UnknownScalar {
                daf: self.groups.name.clone(),
                name: name.to_string(),
            })
    }

    fn set_scalar(&mut self, name: &str, value: StorageScalar) -> DafResult<()> {
        self.groups.scalars.insert(name.to_string(), value);
        self.flush()
    }

    fn delete_scalar(&mut self, name: &str) -> DafResult<()> {
        self.groups.scalars.remove(name);
        self.flush()
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        Ok(self.groups.scalars.keys().cloned().collect())
    }

    fn has_axis(&self, axis: &str) -> bool {
        self.groups.axes.contains_key(axis)
    }

    fn add_axis(&mut self, axis: &str, entries: Arc<Vec<String>>) -> DafResult<()> {
        self.groups
            .axes
            .insert(axis.to_string(), entries.as_ref().clone());
        self.groups.vectors.entry(axis.to_string()).or_default();
        self.flush()
    }

    fn delete_axis(&mut self, axis: &str) -> DafResult<()> {
        self.groups.axes.remove(axis);
        self.groups.vectors.remove(axis);
        self.groups.matrices.remove(axis);
        for per_rows in self.groups.matrices.values_mut() {
            per_rows.remove(axis);
        }
        self.flush()
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        self.groups
            .axes
            .get(axis)
            .map(|entries| Arc::new(entries.clone()))
            .ok_or_else(|| DafError::UnknownAxis {
                daf: self.groups.name.clone(),
                axis: axis.to_string(),
            })
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        Ok(self.axis_entries(axis)?.len())
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        Ok(self.groups.axes.keys().cloned().collect())
    }

    fn has_vector(&self, axis: &str, name: &str) -> bool {
        self.groups
            .vectors
            .get(axis)
            .map(|per_axis| per_axis.contains_key(name))
            .unwrap_or(false)
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<VectorData> {
        let stored = self
            .groups
            .vectors
            .get(axis)
            .and_then(|per_axis| per_axis.get(name))
            .ok_or_else(|| DafError::UnknownVector {
                daf: self.groups.name.clone(),
                axis: axis.to_string(),
                name: name.to_string(),
            })?;
        self.decode_vector(stored)
    }

    fn set_vector(&mut self, axis: &str, name: &str, data: VectorData) -> DafResult<()> {
        self.groups
            .vectors
            .entry(axis.to_string())
            .or_default()
            .insert(name.to_string(), Self::encode_vector(&data));
        self.flush()
    }

    fn delete_vector(&mut self, axis: &str, name: &str) -> DafResult<()> {
        if let Some(per_axis) = self.groups.vectors.get_mut(axis) {
            per_axis.remove(name);
        }
        self.flush()
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        Ok(self
            .groups
            .vectors
            .get(axis)
            .map(|per_axis| per_axis.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> bool {
        self.groups
            .matrices
            .get(rows_axis)
            .and_then(|per_rows| per_rows.get(columns_axis))
            .map(|per_pair| per_pair.contains_key(name))
            .unwrap_or(false)
    }

    fn get_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<MatrixData> {
        let stored = self
            .groups
            .matrices
            .get(rows_axis)
            .and_then(|per_rows| per_rows.get(columns_axis))
            .and_then(|per_pair| per_pair.get(name))
            .ok_or_else(|| DafError::UnknownMatrix {
                daf: self.groups.name.clone(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            })?;
        self.decode_matrix(stored)
    }

    fn set_matrix(
        &mut self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
    ) -> DafResult<()> {
        self.groups
            .matrices
            .entry(rows_axis.to_string())
            .or_default()
            .entry(columns_axis.to_string())
            .or_default()
            .insert(name.to_string(), Self::encode_matrix(&data));
        self.flush()
    }

    fn delete_matrix(&mut self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<()> {
        if let Some(per_pair) = self
            .groups
            .matrices
            .get_mut(rows_axis)
            .and_then(|per_rows| per_rows.get_mut(columns_axis))
        {
            per_pair.remove(name);
        }
        self.flush()
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        Ok(self
            .groups
            .matrices
            .get(rows_axis)
            .and_then(|per_rows| per_rows.get(columns_axis))
            .map(|per_pair| per_pair.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_container_round_trip() {
        let dir = TempDir::new("container_daf").unwrap();
        let path = dir.path().join("store.daf");
        {
            let mut backend = ContainerBackend::create(&path, "packed!", false).unwrap();
            backend
                .set_scalar("depth", StorageScalar::UInt32(17))
                .unwrap();
            backend
                .add_axis("gene", Arc::new(vec!["g0".into(), "g1".into()]))
                .unwrap();
            backend
                .set_vector("gene", "is_marker", VectorData::from(vec![true, false]))
                .unwrap();
            let matrix = DenseMatrix::from_rows(
                ElementType::Float32,
                &[vec![0.5, 1.5], vec![2.5, 3.5]],
            )
            .unwrap();
            backend
                .set_matrix("gene", "gene", "similarity", MatrixData::Dense(matrix))
                .unwrap();
        }
        let backend = ContainerBackend::open(&path).unwrap();
        assert_eq!(backend.daf_name(), "packed!");
        assert_eq!(
            backend.get_scalar("depth").unwrap(),
            StorageScalar::UInt32(17)
        );
        assert_eq!(
            backend.get_vector("gene", "is_marker").unwrap().get(0),
            StorageScalar::Bool(true)
        );
        let matrix = backend.get_matrix("gene", "gene", "similarity").unwrap();
        assert_eq!(matrix.get_f64(1, 0), 2.5);
    }

    #[test]
    fn test_container_rejects_noise() {
        let dir = TempDir::new("container_daf").unwrap();
        let path = dir.path().join("noise.daf");
        fs::write(&path, b"not a container").unwrap();
        assert!(matches!(
            ContainerBackend::open(&path),
            Err(DafError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_container_sparse_matrix() {
        let dir = TempDir::new("container_daf").unwrap();
        let path = dir.path().join("sparse.daf");
        let mut backend = ContainerBackend::create(&path, "packed!", false).unwrap();
        backend
            .add_axis("gene", Arc::new(vec!["g0".into(), "g1".into(), "g2".into()]))
            .unwrap();
        backend
            .add_axis("cell", Arc::new(vec!["c0".into(), "c1".into()]))
            .unwrap();
        let sparse = SparseMatrix::new(
            3,
            2,
            Compression::Csc,
            IndexBuf::from_usizes(IndexType::UInt32, vec![0, 1, 3]),
            IndexBuf::from_usizes(IndexType::UInt32, vec![2, 0, 1]),
            NumericBuf::from_f64_vec(ElementType::Float64, vec![7.0, 8.0, 9.0]).unwrap(),
        )
        .unwrap();
        backend
            .set_matrix("gene", "cell", "UMIs", MatrixData::Sparse(sparse))
            .unwrap();
        let reopened = ContainerBackend::open(&path).unwrap();
        let matrix = reopened.get_matrix("gene", "cell", "UMIs").unwrap();
        assert_eq!(matrix.get_f64(2, 0), 7.0);
        assert_eq!(matrix.get_f64(1, 1), 9.0);
        assert_eq!(matrix.get_f64(2, 1), 0.0);
    }
}
