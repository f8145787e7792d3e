//! Element types, typed buffers and the scalar/vector/matrix value model.

pub mod array;
pub mod element_type;
pub mod matrix;
pub mod scalar;
pub mod vector;

pub use array::{IndexBuf, NumericBuf, Pod, PodArray, VectorBuf};
pub use element_type::{ElementType, IndexType};
pub use matrix::{
    Compression, DenseMatrix, DenseMatrixMut, MajorOrder, MatrixData, MatrixDataMut, NamedMatrix,
    SparseMatrix, SparseMatrixMut,
};
pub use scalar::StorageScalar;
pub use vector::{
    AxisLabels, DenseMut, IndexMut, NamedVector, SparseVector, SparseVectorMut, VectorData,
    VectorDataMut,
};
