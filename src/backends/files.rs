use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::errors::{DafError, DafResult};
use crate::format::FormatBackend;
use crate::types::{
    ElementType, IndexBuf, IndexType, MatrixData, NumericBuf, SparseMatrix, SparseVector,
    StorageScalar, VectorBuf, VectorData,
};
use crate::types::{Compression, DenseMatrix, MajorOrder};

const HEADER_FILE: &str = "daf.json";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    version: [u32; 2],
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScalarFile {
    #[serde(rename = "type")]
    element_type: ElementType,
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VectorMeta {
    #[serde(rename = "type")]
    element_type: ElementType,
    len: usize,
    sparse: bool,
    #[serde(default)]
    nnz: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index_type: Option<IndexType>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MatrixMeta {
    #[serde(rename = "type")]
    element_type: ElementType,
    nrows: usize,
    ncols: usize,
    sparse: bool,
    #[serde(default)]
    nnz: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index_type: Option<IndexType>,
}

/// Directory-of-files backend with a fixed filesystem convention:
///
/// ```text
/// daf.json                          version header and store name
/// scalars/<name>                    typed scalar (type tag + value)
/// axes/<axis>/entries               newline-delimited escaped strings
/// vectors/<axis>/<name>             packed buffer (+ .meta sidecar;
///                                   sparse adds .indices/.values siblings)
/// matrices/<rows>/<cols>/<name>     column-major packed buffer (+ .meta;
///                                   sparse adds .indptr/.indices/.values)
/// ```
///
/// Numeric payloads are memory-mapped read-only and served zero-copy; all
/// writes go through a temporary file and an atomic rename.
#[derive(Debug)]
pub struct FilesBackend {
    root: PathBuf,
    name: String,
}

impl FilesBackend {
    /// Create a fresh (or truncated) store directory.
    pub fn create(root: impl Into<PathBuf>, name: impl Into<String>, truncate: bool) -> DafResult<Self> {
        let root = root.into();
        let name = name.into();
        if truncate && root.join(HEADER_FILE).exists() {
            for namespace in ["scalars", "axes", "vectors", "matrices"] {
                let dir = root.join(namespace);
                if dir.exists() {
                    fs::remove_dir_all(&dir).map_err(|error| DafError::io(dir.display().to_string(), error))?;
                }
            }
        }
        for namespace in ["scalars", "axes", "vectors", "matrices"] {
            let dir = root.join(namespace);
            fs::create_dir_all(&dir).map_err(|error| DafError::io(dir.display().to_string(), error))?;
        }
        let header = Header {
            version: [1, 0],
            name: name.clone(),
        };
        write_json_atomic(&root.join(HEADER_FILE), &header)?;
        log::debug!("created files daf: {} at {}", name, root.display());
        Ok(Self { root, name })
    }

    /// Open an existing store directory.
    pub fn open(root: impl Into<PathBuf>) -> DafResult<Self> {
        let root = root.into();
        let header: Header = read_json(&root.join(HEADER_FILE))?;
        if header.version[0] != 1 {
            return Err(DafError::corrupt(
                root.display().to_string(),
                format!("unsupported format version: {}.{}", header.version[0], header.version[1]),
            ));
        }
        Ok(Self {
            name: header.name,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scalar_path(&self, name: &str) -> PathBuf {
        self.root.join("scalars").join(name)
    }

    fn axis_dir(&self, axis: &str) -> PathBuf {
        self.root.join("axes").join(axis)
    }

    fn vector_path(&self, axis: &str, name: &str) -> PathBuf {
        self.root.join("vectors").join(axis).join(name)
    }

    fn matrix_path(&self, rows_axis: &str, columns_axis: &str, name: &str) -> PathBuf {
        self.root
            .join("matrices")
            .join(rows_axis)
            .join(columns_axis)
            .join(name)
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> DafResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|error| DafError::corrupt(path.display().to_string(), error.to_string()))?;
    write_bytes_atomic(path, text.as_bytes())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> DafResult<T> {
    let text =
        fs::read_to_string(path).map_err(|error| DafError::io(path.display().to_string(), error))?;
    serde_json::from_str(&text)
        .map_err(|error| DafError::corrupt(path.display().to_string(), error.to_string()))
}

/// Sidecar path `<file>.<suffix>` that appends rather than replaces an
/// extension, so dotted property names keep their data file distinct.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}", suffix));
    path.with_file_name(name)
}

fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> DafResult<()> {
    let temporary = sibling(path, "tmp");
    {
        let mut file = File::create(&temporary)
            .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
        file.write_all(bytes)
            .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
        file.sync_all()
            .map_err(|error| DafError::io(temporary.display().to_string(), error))?;
    }
    fs::rename(&temporary, path).map_err(|error| DafError::io(path.display().to_string(), error))
}

fn map_file(path: &Path) -> DafResult<Arc<Mmap>> {
    let file =
        File::open(path).map_err(|error| DafError::io(path.display().to_string(), error))?;
    // Safety: the file is opened read-only and replaced only via rename, so
    // the mapped bytes are never mutated in place.
    let map = unsafe { Mmap::map(&file) }
        .map_err(|error| DafError::io(path.display().to_string(), error))?;
    Ok(Arc::new(map))
}

fn read_numeric(path: &Path, element_type: ElementType, len: usize) -> DafResult<NumericBuf> {
    let map = map_file(path)?;
    NumericBuf::from_mmap(element_type, map, 0, len)
        .map_err(|reason| DafError::corrupt(path.display().to_string(), reason))
}

fn read_indices(path: &Path, index_type: IndexType, len: usize) -> DafResult<IndexBuf> {
    let map = map_file(path)?;
    IndexBuf::from_mmap(index_type, map, 0, len)
        .map_err(|reason| DafError::corrupt(path.display().to_string(), reason))
}

fn escape_line(line: &str) -> String {
    line.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape_line(line: &str) -> String {
    let mut unescaped = String::with_capacity(line.len());
    let mut characters = line.chars();
    while let Some(character) = characters.next() {
        if character == '\\' {
            match characters.next() {
                Some('n') => unescaped.push('\n'),
                Some(other) => unescaped.push(other),
                None => {}
            }
        } else {
            unescaped.push(character);
        }
    }
    unescaped
}

fn write_lines(path: &Path, lines: &[String]) -> DafResult<()> {
    let mut text = String::new();
    for line in lines {
        text.push_str(&escape_line(line));
        text.push('\n');
    }
    write_bytes_atomic(path, text.as_bytes())
}

fn read_lines(path: &Path, expected: Option<usize>) -> DafResult<Vec<String>> {
    let text =
        fs::read_to_string(path).map_err(|error| DafError::io(path.display().to_string(), error))?;
    let lines: Vec<String> = text.lines().map(unescape_line).collect();
    if let Some(expected) = expected {
        if lines.len() != expected {
            return Err(DafError::corrupt(
                path.display().to_string(),
                format!("{} lines but {} were expected", lines.len(), expected),
            ));
        }
    }
    Ok(lines)
}

fn list_entries(dir: &Path, directories: bool) -> DafResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let entries =
        fs::read_dir(dir).map_err(|error| DafError::io(dir.display().to_string(), error))?;
    for entry in entries {
        let entry = entry.map_err(|error| DafError::io(dir.display().to_string(), error))?;
        let path = entry.path();
        if path.is_dir() != directories {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if directories {
            names.push(name);
            continue;
        }
        if name.ends_with(".meta")
            || name.ends_with(".tmp")
            || name.ends_with(".indices")
            || name.ends_with(".values")
            || name.ends_with(".indptr")
        {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

fn remove_file_if_present(path: &Path) -> DafResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(DafError::io(path.display().to_string(), error)),
    }
}

impl FilesBackend {
    fn write_vector_files(&self, path: &Path, data: &VectorData) -> DafResult<()> {
        match data {
            VectorData::Dense(VectorBuf::Numeric(buf)) => {
                let meta = VectorMeta {
                    element_type: buf.element_type(),
                    len: buf.len(),
                    sparse: false,
                    nnz: 0,
                    index_type: None,
                };
                write_bytes_atomic(path, &buf.packed_bytes())?;
                write_json_atomic(&sibling(path, "meta"), &meta)
            }
            VectorData::Dense(VectorBuf::String(values)) => {
                let meta = VectorMeta {
                    element_type: ElementType::String,
                    len: values.len(),
                    sparse: false,
                    nnz: 0,
                    index_type: None,
                };
                write_lines(path, values)?;
                write_json_atomic(&sibling(path, "meta"), &meta)
            }
            VectorData::Sparse(sparse) => {
                let meta = VectorMeta {
                    element_type: sparse.element_type(),
                    len: sparse.len(),
                    sparse: true,
                    nnz: sparse.nnz(),
                    index_type: Some(sparse.indices().index_type()),
                };
                write_bytes_atomic(path, &[])?;
                write_bytes_atomic(
                    &sibling(path, "indices"),
                    &sparse.indices().packed_bytes(),
                )?;
                write_bytes_atomic(
                    &sibling(path, "values"),
                    &sparse.values().packed_bytes(),
                )?;
                write_json_atomic(&sibling(path, "meta"), &meta)
            }
        }
    }

    fn read_vector_files(&self, path: &Path) -> DafResult<VectorData> {
        let meta: VectorMeta = read_json(&sibling(path, "meta"))?;
        if meta.sparse {
            let index_type = meta.index_type.unwrap_or(IndexType::UInt64);
            let indices = read_indices(&sibling(path, "indices"), index_type, meta.nnz)?;
            let values = read_numeric(&sibling(path, "values"), meta.element_type, meta.nnz)?;
            let sparse = SparseVector::new(meta.len, indices, values)
                .map_err(|reason| DafError::corrupt(path.display().to_string(), reason))?;
            return Ok(VectorData::Sparse(sparse));
        }
        if meta.element_type == ElementType::String {
            let lines = read_lines(path, Some(meta.len))?;
            return Ok(VectorData::Dense(VectorBuf::from_strings(lines)));
        }
        let buf = read_numeric(path, meta.element_type, meta.len)?;
        Ok(VectorData::Dense(VectorBuf::Numeric(buf)))
    }

    fn write_matrix_files(&self, path: &Path, data: &MatrixData) -> DafResult<()> {
        match data {
            MatrixData::Dense(dense) => {
                debug_assert_eq!(dense.order(), MajorOrder::ColumnMajor);
                let meta = MatrixMeta {
                    element_type: dense.element_type(),
                    nrows: dense.nrows(),
                    ncols: dense.ncols(),
                    sparse: false,
                    nnz: 0,
                    index_type: None,
                };
                write_bytes_atomic(path, &dense.buf().packed_bytes())?;
                write_json_atomic(&sibling(path, "meta"), &meta)
            }
            MatrixData::Sparse(sparse) => {
                debug_assert_eq!(sparse.compression(), Compression::Csc);
                let meta = MatrixMeta {
                    element_type: sparse.element_type(),
                    nrows: sparse.nrows(),
                    ncols: sparse.ncols(),
                    sparse: true,
                    nnz: sparse.nnz(),
                    index_type: Some(sparse.indices().index_type()),
                };
                write_bytes_atomic(path, &[])?;
                write_bytes_atomic(&sibling(path, "indptr"), &sparse.indptr().packed_bytes())?;
                write_bytes_atomic(
                    &sibling(path, "indices"),
                    &sparse.indices().packed_bytes(),
                )?;
                write_bytes_atomic(
                    &sibling(path, "values"),
                    &sparse.values().packed_bytes(),
                )?;
                write_json_atomic(&sibling(path, "meta"), &meta)
            }
        }
    }

    fn read_matrix_files(&self, path: &Path) -> DafResult<MatrixData> {
        let meta: MatrixMeta = read_json(&sibling(path, "meta"))?;
        if meta.sparse {
            let index_type = meta.index_type.unwrap_or(IndexType::UInt64);
            let indptr = read_indices(&sibling(path, "indptr"), index_type, meta.ncols + 1)?;
            let indices = read_indices(&sibling(path, "indices"), index_type, meta.nnz)?;
            let values = read_numeric(&sibling(path, "values"), meta.element_type, meta.nnz)?;
            let sparse = SparseMatrix::new(
                meta.nrows,
                meta.ncols,
                Compression::Csc,
                indptr,
                indices,
                values,
            )
            .map_err(|reason| DafError::corrupt(path.display().to_string(), reason))?;
            return Ok(MatrixData::Sparse(sparse));
        }
        let buf = read_numeric(path, meta.element_type, meta.nrows * meta.ncols)?;
        let dense = DenseMatrix::new(meta.nrows, meta.ncols, MajorOrder::ColumnMajor, buf)
            .map_err(|reason| DafError::corrupt(path.display().to_string(), reason))?;
        Ok(MatrixData::Dense(dense))
    }

    fn delete_property_files(&self, path: &Path) -> DafResult<()> {
        remove_file_if_present(path)?;
        for extension in ["meta", "indices", "values", "indptr"] {
            remove_file_if_present(&sibling(path, extension))?;
        }
        Ok(())
    }
}

impl FormatBackend for FilesBackend {
    fn backend_kind(&self) -> &'static str {
        "files"
    }

    fn daf_name(&self) -> &str {
        &self.name
    }

    fn has_scalar(&self, name: &str) -> bool {
        self.scalar_path(name).is_file()
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        let path = self.scalar_path(name);
        if !path.is_file() {
            return Err(DafError::UnknownScalar {
                daf: self.name.clone(),
                name: name.to_string(),
            });
        }
        let file: ScalarFile = read_json(&path)?;
        StorageScalar::parse(file.element_type, &file.value)
            .map_err(|reason| DafError::corrupt(path.display().to_string(), reason))
    }

    fn set_scalar(&mut self, name: &str, value: StorageScalar) -> DafResult<()> {
        let file = ScalarFile {
            element_type: value.element_type(),
            value: value.to_string(),
        };
        write_json_atomic(&self.scalar_path(name), &file)
    }

    fn delete_scalar(&mut self, name: &str) -> DafResult<()> {
        remove_file_if_present(&self.scalar_path(name))
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        list_entries(&self.root.join("scalars"), false)
    }

    fn has_axis(&self, axis: &str) -> bool {
        self.axis_dir(axis).join("entries").is_file()
    }

    fn add_axis(&mut self, axis: &str, entries: Arc<Vec<String>>) -> DafResult<()> {
        let dir = self.axis_dir(axis);
        fs::create_dir_all(&dir).map_err(|error| DafError::io(dir.display().to_string(), error))?;
        write_lines(&dir.join("entries"), &entries)?;
        let vectors_dir = self.root.join("vectors").join(axis);
        fs::create_dir_all(&vectors_dir)
            .map_err(|error| DafError::io(vectors_dir.display().to_string(), error))
    }

    fn delete_axis(&mut self, axis: &str) -> DafResult<()> {
        for dir in [self.axis_dir(axis), self.root.join("vectors").join(axis)] {
            if dir.exists() {
                fs::remove_dir_all(&dir)
                    .map_err(|error| DafError::io(dir.display().to_string(), error))?;
            }
        }
        let matrices = self.root.join("matrices");
        let rows_dir = matrices.join(axis);
        if rows_dir.exists() {
            fs::remove_dir_all(&rows_dir)
                .map_err(|error| DafError::io(rows_dir.display().to_string(), error))?;
        }
        for rows_axis in list_entries(&matrices, true)? {
            let columns_dir = matrices.join(&rows_axis).join(axis);
            if columns_dir.exists() {
                fs::remove_dir_all(&columns_dir)
                    .map_err(|error| DafError::io(columns_dir.display().to_string(), error))?;
            }
        }
        Ok(())
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        let path = self.axis_dir(axis).join("entries");
        if !path.is_file() {
            return Err(DafError::UnknownAxis {
                daf: self.name.clone(),
                axis: axis.to_string(),
            });
        }
        Ok(Arc::new(read_lines(&path, None)?))
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        Ok(self.axis_entries(axis)?.len())
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        list_entries(&self.root.join("axes"), true)
    }

    fn has_vector(&self, axis: &str, name: &str) -> bool {
        sibling(&self.vector_path(axis, name), "meta").is_file()
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<VectorData> {
        if !self.has_vector(axis, name) {
            return Err(DafError::UnknownVector {
                daf: self.name.clone(),
                axis: axis.to_string(),
                name: name.to_string(),
            });
        }
        self.read_vector_files(&self.vector_path(axis, name))
    }

    fn set_vector(&mut self, axis: &str, name: &str, data: VectorData) -> DafResult<()> {
        let path = self.vector_path(axis, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| DafError::io(parent.display().to_string(), error))?;
        }
        self.write_vector_files(&path, &data)
    }

    fn delete_vector(&mut self, axis: &str, name: &str) -> DafResult<()> {
        self.delete_property_files(&self.vector_path(axis, name))
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        let mut names = Vec::new();
        let dir = self.root.join("vectors").join(axis);
        for name in list_entries(&dir, false)? {
            if dir.join(format!("{}.meta", name)).is_file() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> bool {
        sibling(&self.matrix_path(rows_axis, columns_axis, name), "meta").is_file()
    }

    fn get_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<MatrixData> {
        if !self.has_matrix(rows_axis, columns_axis, name) {
            return Err(DafError::UnknownMatrix {
                daf: self.name.clone(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            });
        }
        self.read_matrix_files(&self.matrix_path(rows_axis, columns_axis, name))
    }

    fn set_matrix(
        &mut self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
    ) -> DafResult<()> {
        let path = self.matrix_path(rows_axis, columns_axis, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| DafError::io(parent.display().to_string(), error))?;
        }
        self.write_matrix_files(&path, &data)
    }

    fn delete_matrix(&mut self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<()> {
        self.delete_property_files(&self.matrix_path(rows_axis, columns_axis, name))
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        let mut names = Vec::new();
        let dir = self.root.join("matrices").join(rows_axis).join(columns_axis);
        for name in list_entries(&dir, false)? {
            if dir.join(format!("{}.meta", name)).is_file() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_create_open_round_trip() {
        let dir = TempDir::new("files_daf").unwrap();
        {
            let mut backend = FilesBackend::create(dir.path(), "disk!", false).unwrap();
            backend
                .set_scalar("organism", StorageScalar::from("human"))
                .unwrap();
            backend
                .add_axis("cell", Arc::new(vec!["c0".into(), "c1".into()]))
                .unwrap();
            backend
                .set_vector("cell", "age", VectorData::from(vec![3i32, 5]))
                .unwrap();
        }
        let backend = FilesBackend::open(dir.path()).unwrap();
        assert_eq!(backend.daf_name(), "disk!");
        assert_eq!(
            backend.get_scalar("organism").unwrap(),
            StorageScalar::from("human")
        );
        assert_eq!(backend.axis_length("cell").unwrap(), 2);
        let vector = backend.get_vector("cell", "age").unwrap();
        assert_eq!(vector.get(1), StorageScalar::Int32(5));
        assert_eq!(backend.vector_names("cell").unwrap(), vec!["age"]);
    }

    #[test]
    fn test_string_vector_survives_newlines() {
        let dir = TempDir::new("files_daf").unwrap();
        let mut backend = FilesBackend::create(dir.path(), "disk!", false).unwrap();
        backend
            .add_axis("cell", Arc::new(vec!["c0".into(), "c1".into()]))
            .unwrap();
        backend
            .set_vector(
                "cell",
                "note",
                VectorData::from(vec!["line\nbreak".to_string(), "plain".to_string()]),
            )
            .unwrap();
        let vector = backend.get_vector("cell", "note").unwrap();
        assert_eq!(vector.get(0), StorageScalar::String("line\nbreak".into()));
    }

    #[test]
    fn test_dense_matrix_mmap_round_trip() {
        let dir = TempDir::new("files_daf").unwrap();
        let mut backend = FilesBackend::create(dir.path(), "disk!", false).unwrap();
        backend
            .add_axis("gene", Arc::new(vec!["g0".into(), "g1".into()]))
            .unwrap();
        backend
            .add_axis(
                "cell",
                Arc::new(vec!["c0".into(), "c1".into(), "c2".into()]),
            )
            .unwrap();
        let matrix = DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
        .unwrap();
        backend
            .set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix))
            .unwrap();
        let read = backend.get_matrix("gene", "cell", "UMIs").unwrap();
        assert_eq!(read.shape(), (2, 3));
        assert_eq!(read.get_f64(1, 2), 6.0);
        assert_eq!(backend.matrix_names("gene", "cell").unwrap(), vec!["UMIs"]);
    }

    #[test]
    fn test_sparse_vector_siblings() {
        let dir = TempDir::new("files_daf").unwrap();
        let mut backend = FilesBackend::create(dir.path(), "disk!", false).unwrap();
        backend
            .add_axis(
                "cell",
                Arc::new(vec!["c0".into(), "c1".into(), "c2".into()]),
            )
            .unwrap();
        let sparse = SparseVector::new(
            3,
            IndexBuf::from_usizes(IndexType::UInt32, vec![1]),
            NumericBuf::from_f32_vec(vec![2.5]),
        )
        .unwrap();
        backend
            .set_vector("cell", "signal", VectorData::Sparse(sparse))
            .unwrap();
        let read = backend.get_vector("cell", "signal").unwrap();
        assert!(read.is_sparse());
        assert_eq!(read.get(1), StorageScalar::Float32(2.5));
        assert!(dir
            .path()
            .join("vectors")
            .join("cell")
            .join("signal.indices")
            .is_file());
    }

    #[test]
    fn test_delete_axis_removes_dependent_directories() {
        let dir = TempDir::new("files_daf").unwrap();
        let mut backend = FilesBackend::create(dir.path(), "disk!", false).unwrap();
        backend
            .add_axis("cell", Arc::new(vec!["c0".into()]))
            .unwrap();
        backend
            .set_vector("cell", "age", VectorData::from(vec![1u8]))
            .unwrap();
        backend.delete_vector("cell", "age").unwrap();
        assert!(!backend.has_vector("cell", "age"));
        backend.delete_axis("cell").unwrap();
        assert!(!backend.has_axis("cell"));
    }
}
