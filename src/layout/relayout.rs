use rayon::prelude::*;

use crate::errors::{DafError, DafResult};
use crate::types::array::map_numeric_buf;
use crate::types::{
    DenseMatrix, DenseMatrixMut, IndexBuf, MatrixData, MatrixDataMut, NamedMatrix, NumericBuf,
    Pod, SparseMatrix, SparseMatrixMut,
};

/// Tile edge for the blocked dense transpose.
const TRANSPOSE_BLOCK: usize = 64;

/// Element count above which the dense transpose runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 1 << 22;

/// Produce the same logical matrix with its major axis flipped.
///
/// Dense values get a blocked transpose-copy into a buffer of the opposite
/// order; sparse values convert their compression direction (the CSC of a
/// matrix is the CSR of its transpose, re-compressed). Values and shape are
/// preserved exactly; applying relayout twice restores the original major
/// axis and compares element-wise equal.
pub fn relayout(matrix: &MatrixData) -> MatrixData {
    match matrix {
        MatrixData::Dense(dense) => MatrixData::Dense(relayout_dense(dense)),
        MatrixData::Sparse(sparse) => MatrixData::Sparse(relayout_sparse(sparse)),
    }
}

/// Relayout preserving the entry-label metadata of the source.
pub fn relayout_named(matrix: &NamedMatrix) -> NamedMatrix {
    NamedMatrix::new(
        matrix.rows().clone(),
        matrix.columns().clone(),
        matrix.name(),
        relayout(matrix.data()),
    )
}

/// Relayout `src` into a pre-allocated destination buffer.
///
/// The destination must have the same shape and the same density class as the
/// source (dense into dense, sparse into sparse with matching `nnz`).
pub fn relayout_into(dst: &mut MatrixDataMut, src: &MatrixData) -> DafResult<()> {
    match (dst, src) {
        (MatrixDataMut::Dense(dst), MatrixData::Dense(src)) => {
            if (dst.nrows, dst.ncols) != (src.nrows(), src.ncols()) {
                return Err(DafError::LayoutMismatch {
                    reason: format!(
                        "destination is {}x{} but source is {}x{}",
                        dst.nrows,
                        dst.ncols,
                        src.nrows(),
                        src.ncols()
                    ),
                });
            }
            copy_dense_into(dst, src);
            Ok(())
        }
        (MatrixDataMut::Sparse(dst), MatrixData::Sparse(src)) => {
            if (dst.nrows, dst.ncols) != (src.nrows(), src.ncols()) {
                return Err(DafError::LayoutMismatch {
                    reason: format!(
                        "destination is {}x{} but source is {}x{}",
                        dst.nrows,
                        dst.ncols,
                        src.nrows(),
                        src.ncols()
                    ),
                });
            }
            if dst.indices.len() != src.nnz() {
                return Err(DafError::LayoutMismatch {
                    reason: format!(
                        "destination holds {} stored entries but source has {}",
                        dst.indices.len(),
                        src.nnz()
                    ),
                });
            }
            copy_sparse_into(dst, src);
            Ok(())
        }
        (MatrixDataMut::Dense(_), MatrixData::Sparse(_)) => Err(DafError::LayoutMismatch {
            reason: "sparse source requires a sparse destination".to_string(),
        }),
        (MatrixDataMut::Sparse(_), MatrixData::Dense(_)) => Err(DafError::LayoutMismatch {
            reason: "dense source requires a dense destination".to_string(),
        }),
    }
}

fn relayout_dense(dense: &DenseMatrix) -> DenseMatrix {
    let (major_len, minor_len) = match dense.order() {
        crate::types::MajorOrder::ColumnMajor => (dense.ncols(), dense.nrows()),
        crate::types::MajorOrder::RowMajor => (dense.nrows(), dense.ncols()),
    };
    let buf = map_numeric_buf!(dense.buf(), |array| transpose_copy(
        array.as_slice(),
        major_len,
        minor_len
    ));
    DenseMatrix::new(
        dense.nrows(),
        dense.ncols(),
        dense.order().flipped(),
        buf,
    )
    .unwrap_or_else(|_| unreachable!("transpose preserves the element count"))
}

/// Transpose a contiguous `major_len` x `minor_len` buffer (major index
/// outer) into a `minor_len` x `major_len` buffer, tile by tile.
fn transpose_copy<T: Pod>(src: &[T], major_len: usize, minor_len: usize) -> Vec<T> {
    if src.is_empty() {
        return Vec::new();
    }
    let mut dst = vec![src[0]; src.len()];
    if src.len() >= PARALLEL_THRESHOLD && minor_len > 1 {
        // One band of TRANSPOSE_BLOCK destination-major slices per task.
        dst.par_chunks_mut(TRANSPOSE_BLOCK * major_len)
            .enumerate()
            .for_each(|(band, chunk)| {
                let minor_start = band * TRANSPOSE_BLOCK;
                let minor_stop = (minor_start + TRANSPOSE_BLOCK).min(minor_len);
                transpose_band(src, chunk, major_len, minor_start, minor_stop);
            });
    } else {
        transpose_band(src, &mut dst, major_len, 0, minor_len);
    }
    dst
}

fn transpose_band<T: Pod>(
    src: &[T],
    dst: &mut [T],
    major_len: usize,
    minor_start: usize,
    minor_stop: usize,
) {
    let minor_len = src.len() / major_len.max(1);
    for major_block in (0..major_len).step_by(TRANSPOSE_BLOCK) {
        let major_stop = (major_block + TRANSPOSE_BLOCK).min(major_len);
        for minor in minor_start..minor_stop {
            let dst_row = minor - minor_start;
            for major in major_block..major_stop {
                dst[dst_row * major_len + major] = src[major * minor_len + minor];
            }
        }
    }
}

fn relayout_sparse(sparse: &SparseMatrix) -> SparseMatrix {
    let (major_count, minor_count) = match sparse.compression() {
        crate::types::Compression::Csc => (sparse.ncols(), sparse.nrows()),
        crate::types::Compression::Csr => (sparse.nrows(), sparse.ncols()),
    };
    let nnz = sparse.nnz();

    // Counting pass: how many stored entries land in each new slice.
    let mut counts = vec![0usize; minor_count + 1];
    for position in 0..nnz {
        counts[sparse.indices().get(position) + 1] += 1;
    }
    for slice in 0..minor_count {
        counts[slice + 1] += counts[slice];
    }
    let new_indptr = counts.clone();

    // Scatter pass: place each entry at its slot in the flipped compression.
    let mut cursor = counts;
    let mut new_indices = vec![0usize; nnz];
    let mut placement = vec![0usize; nnz];
    for major in 0..major_count {
        let start = sparse.indptr().get(major);
        let stop = sparse.indptr().get(major + 1);
        for position in start..stop {
            let minor = sparse.indices().get(position);
            let slot = cursor[minor];
            cursor[minor] += 1;
            new_indices[slot] = major;
            placement[slot] = position;
        }
    }

    let index_type = sparse.indices().index_type();
    let values = map_numeric_buf!(sparse.values(), |array| {
        let slice = array.as_slice();
        placement.iter().map(|&position| slice[position]).collect()
    });
    SparseMatrix::new(
        sparse.nrows(),
        sparse.ncols(),
        sparse.compression().flipped(),
        IndexBuf::from_usizes(index_type, new_indptr),
        IndexBuf::from_usizes(index_type, new_indices),
        values,
    )
    .unwrap_or_else(|_| unreachable!("compression conversion preserves the invariants"))
}

fn copy_dense_into(dst: &mut DenseMatrixMut, src: &DenseMatrix) {
    for column in 0..src.ncols() {
        for row in 0..src.nrows() {
            let _ = dst.buf.set_f64(column * dst.nrows + row, src.get_f64(row, column));
        }
    }
}

fn copy_sparse_into(dst: &mut SparseMatrixMut, src: &SparseMatrix) {
    let converted = match src.compression() {
        crate::types::Compression::Csr => relayout_sparse(src),
        crate::types::Compression::Csc => src.clone(),
    };
    for slot in 0..=dst.ncols {
        dst.indptr.set(slot, converted.indptr().get(slot));
    }
    for position in 0..converted.nnz() {
        dst.indices.set(position, converted.indices().get(position));
        let _ = dst
            .values
            .set_f64(position, converted.values().get_f64(position));
    }
}
