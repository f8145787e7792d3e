use std::sync::Arc;

use super::array::{IndexBuf, NumericBuf, VectorBuf};
use super::element_type::{ElementType, IndexType};
use super::scalar::StorageScalar;

/// Lightweight descriptor tying a returned view to the axis it is indexed by.
/// Entry labels are shared from the axis, never copied per property.
#[derive(Debug, Clone)]
pub struct AxisLabels {
    name: String,
    entries: Arc<Vec<String>>,
}

impl AxisLabels {
    pub fn new(name: impl Into<String>, entries: Arc<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &Arc<Vec<String>> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> &str {
        &self.entries[index]
    }
}

/// Sparse vector: sorted unique indices into the axis plus their values.
/// Entries not listed are implicit zeros. `nnz == 0` is a valid value.
#[derive(Debug, Clone)]
pub struct SparseVector {
    len: usize,
    indices: IndexBuf,
    values: NumericBuf,
}

impl SparseVector {
    pub fn new(len: usize, indices: IndexBuf, values: NumericBuf) -> Result<Self, String> {
        if indices.len() != values.len() {
            return Err(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            ));
        }
        let mut previous: Option<usize> = None;
        for position in 0..indices.len() {
            let index = indices.get(position);
            if index >= len {
                return Err(format!(
                    "sparse index {} is out of the vector length {}",
                    index, len
                ));
            }
            if let Some(previous) = previous {
                if index <= previous {
                    return Err("sparse indices are not strictly increasing".to_string());
                }
            }
            previous = Some(index);
        }
        Ok(Self {
            len,
            indices,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }

    pub fn indices(&self) -> &IndexBuf {
        &self.indices
    }

    pub fn values(&self) -> &NumericBuf {
        &self.values
    }

    pub fn get_f64(&self, index: usize) -> f64 {
        match self.position_of(index) {
            Some(position) => self.values.get_f64(position),
            None => 0.0,
        }
    }

    fn position_of(&self, index: usize) -> Option<usize> {
        let mut low = 0usize;
        let mut high = self.indices.len();
        while low < high {
            let middle = (low + high) / 2;
            let at = self.indices.get(middle);
            if at == index {
                return Some(middle);
            } else if at < index {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        None
    }

    pub fn to_dense(&self) -> NumericBuf {
        let mut values = vec![0.0f64; self.len];
        for position in 0..self.nnz() {
            values[self.indices.get(position)] = self.values.get_f64(position);
        }
        NumericBuf::from_f64_vec(self.element_type(), values)
            .unwrap_or_else(|| unreachable!("sparse values are always numeric"))
    }
}

/// The value of a vector property: dense typed buffer or sparse pairs.
#[derive(Debug, Clone)]
pub enum VectorData {
    Dense(VectorBuf),
    Sparse(SparseVector),
}

impl VectorData {
    pub fn element_type(&self) -> ElementType {
        match self {
            VectorData::Dense(buf) => buf.element_type(),
            VectorData::Sparse(sparse) => sparse.element_type(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorData::Dense(buf) => buf.len(),
            VectorData::Sparse(sparse) => sparse.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, VectorData::Sparse(_))
    }

    /// Fraction of explicitly stored entries (1.0 for dense).
    pub fn density(&self) -> f64 {
        match self {
            VectorData::Dense(_) => 1.0,
            VectorData::Sparse(sparse) => {
                if sparse.len() == 0 {
                    0.0
                } else {
                    sparse.nnz() as f64 / sparse.len() as f64
                }
            }
        }
    }

    pub fn get(&self, index: usize) -> StorageScalar {
        match self {
            VectorData::Dense(buf) => buf.get(index),
            VectorData::Sparse(sparse) => match sparse.position_of(index) {
                Some(position) => sparse.values.get(position),
                None => zero_of(sparse.values.element_type()),
            },
        }
    }

    /// Dense rendition, materializing implicit zeros of a sparse value.
    pub fn to_dense_buf(&self) -> VectorBuf {
        match self {
            VectorData::Dense(buf) => buf.clone(),
            VectorData::Sparse(sparse) => VectorBuf::Numeric(sparse.to_dense()),
        }
    }

    /// Owned subset at `indices`, in order. Sparse values densify.
    pub fn gather(&self, indices: &[usize]) -> VectorData {
        VectorData::Dense(self.to_dense_buf().gather(indices))
    }

    pub fn as_strings(&self) -> Option<&Arc<Vec<String>>> {
        match self {
            VectorData::Dense(buf) => buf.as_strings(),
            VectorData::Sparse(_) => None,
        }
    }
}

fn zero_of(element_type: ElementType) -> StorageScalar {
    match StorageScalar::parse(element_type, "0") {
        Ok(value) => value,
        Err(_) => StorageScalar::String(String::new()),
    }
}

impl<T> From<Vec<T>> for VectorData
where
    VectorBuf: From<Vec<T>>,
{
    fn from(values: Vec<T>) -> Self {
        VectorData::Dense(VectorBuf::from(values))
    }
}

/// A vector together with its axis labels, as returned by readers.
#[derive(Debug, Clone)]
pub struct NamedVector {
    axis: AxisLabels,
    name: String,
    data: VectorData,
}

impl NamedVector {
    pub fn new(axis: AxisLabels, name: impl Into<String>, data: VectorData) -> Self {
        Self {
            axis,
            name: name.into(),
            data,
        }
    }

    pub fn axis(&self) -> &AxisLabels {
        &self.axis
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &VectorData {
        &self.data
    }

    pub fn into_data(self) -> VectorData {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }
}

/// Mutable dense buffer handed out by the empty-creation writers.
#[derive(Debug)]
pub enum DenseMut {
    Bool(Vec<u8>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

macro_rules! dense_mut_typed_access {
    ($($rust_type:ident => $variant:ident),* $(,)?) => {
        impl DenseMut {
            $(
                paste::paste! {
                    pub fn [<as_ $rust_type _mut>](&mut self) -> Option<&mut [$rust_type]> {
                        match self {
                            DenseMut::$variant(values) => Some(values.as_mut_slice()),
                            _ => None,
                        }
                    }
                }
            )*
        }
    };
}

dense_mut_typed_access! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
}

impl DenseMut {
    pub fn zeros(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::Bool => DenseMut::Bool(vec![0; len]),
            ElementType::Int8 => DenseMut::Int8(vec![0; len]),
            ElementType::Int16 => DenseMut::Int16(vec![0; len]),
            ElementType::Int32 => DenseMut::Int32(vec![0; len]),
            ElementType::Int64 => DenseMut::Int64(vec![0; len]),
            ElementType::UInt8 => DenseMut::UInt8(vec![0; len]),
            ElementType::UInt16 => DenseMut::UInt16(vec![0; len]),
            ElementType::UInt32 => DenseMut::UInt32(vec![0; len]),
            ElementType::UInt64 => DenseMut::UInt64(vec![0; len]),
            ElementType::Float32 => DenseMut::Float32(vec![0.0; len]),
            ElementType::Float64 => DenseMut::Float64(vec![0.0; len]),
            ElementType::String => DenseMut::String(vec![String::new(); len]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            DenseMut::Bool(_) => ElementType::Bool,
            DenseMut::Int8(_) => ElementType::Int8,
            DenseMut::Int16(_) => ElementType::Int16,
            DenseMut::Int32(_) => ElementType::Int32,
            DenseMut::Int64(_) => ElementType::Int64,
            DenseMut::UInt8(_) => ElementType::UInt8,
            DenseMut::UInt16(_) => ElementType::UInt16,
            DenseMut::UInt32(_) => ElementType::UInt32,
            DenseMut::UInt64(_) => ElementType::UInt64,
            DenseMut::Float32(_) => ElementType::Float32,
            DenseMut::Float64(_) => ElementType::Float64,
            DenseMut::String(_) => ElementType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DenseMut::Bool(values) => values.len(),
            DenseMut::Int8(values) => values.len(),
            DenseMut::Int16(values) => values.len(),
            DenseMut::Int32(values) => values.len(),
            DenseMut::Int64(values) => values.len(),
            DenseMut::UInt8(values) => values.len(),
            DenseMut::UInt16(values) => values.len(),
            DenseMut::UInt32(values) => values.len(),
            DenseMut::UInt64(values) => values.len(),
            DenseMut::Float32(values) => values.len(),
            DenseMut::Float64(values) => values.len(),
            DenseMut::String(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set(&mut self, index: usize, value: StorageScalar) -> Result<(), String> {
        match (self, value) {
            (DenseMut::Bool(values), StorageScalar::Bool(value)) => values[index] = value as u8,
            (DenseMut::Int8(values), StorageScalar::Int8(value)) => values[index] = value,
            (DenseMut::Int16(values), StorageScalar::Int16(value)) => values[index] = value,
            (DenseMut::Int32(values), StorageScalar::Int32(value)) => values[index] = value,
            (DenseMut::Int64(values), StorageScalar::Int64(value)) => values[index] = value,
            (DenseMut::UInt8(values), StorageScalar::UInt8(value)) => values[index] = value,
            (DenseMut::UInt16(values), StorageScalar::UInt16(value)) => values[index] = value,
            (DenseMut::UInt32(values), StorageScalar::UInt32(value)) => values[index] = value,
            (DenseMut::UInt64(values), StorageScalar::UInt64(value)) => values[index] = value,
            (DenseMut::Float32(values), StorageScalar::Float32(value)) => values[index] = value,
            (DenseMut::Float64(values), StorageScalar::Float64(value)) => values[index] = value,
            (DenseMut::String(values), StorageScalar::String(value)) => values[index] = value,
            (this, value) => {
                return Err(format!(
                    "cannot store a {} value into a {} buffer",
                    value.element_type(),
                    this.element_type()
                ))
            }
        }
        Ok(())
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<(), String> {
        self.set(index, StorageScalar::Bool(value))
    }

    /// Store a numeric value, casting to the buffer's element type.
    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<(), String> {
        match self {
            DenseMut::Bool(values) => values[index] = (value != 0.0) as u8,
            DenseMut::Int8(values) => values[index] = value as i8,
            DenseMut::Int16(values) => values[index] = value as i16,
            DenseMut::Int32(values) => values[index] = value as i32,
            DenseMut::Int64(values) => values[index] = value as i64,
            DenseMut::UInt8(values) => values[index] = value as u8,
            DenseMut::UInt16(values) => values[index] = value as u16,
            DenseMut::UInt32(values) => values[index] = value as u32,
            DenseMut::UInt64(values) => values[index] = value as u64,
            DenseMut::Float32(values) => values[index] = value as f32,
            DenseMut::Float64(values) => values[index] = value,
            DenseMut::String(_) => return Err("cannot store a number into strings".to_string()),
        }
        Ok(())
    }

    pub fn set_string(&mut self, index: usize, value: impl Into<String>) -> Result<(), String> {
        self.set(index, StorageScalar::String(value.into()))
    }

    /// Seal the buffer into an immutable vector value.
    pub fn freeze(self) -> VectorBuf {
        match self {
            DenseMut::Bool(values) => VectorBuf::Numeric(NumericBuf::Bool(
                super::array::PodArray::from_vec(values),
            )),
            DenseMut::Int8(values) => VectorBuf::from(values),
            DenseMut::Int16(values) => VectorBuf::from(values),
            DenseMut::Int32(values) => VectorBuf::from(values),
            DenseMut::Int64(values) => VectorBuf::from(values),
            DenseMut::UInt8(values) => VectorBuf::from(values),
            DenseMut::UInt16(values) => VectorBuf::from(values),
            DenseMut::UInt32(values) => VectorBuf::from(values),
            DenseMut::UInt64(values) => VectorBuf::from(values),
            DenseMut::Float32(values) => VectorBuf::from(values),
            DenseMut::Float64(values) => VectorBuf::from(values),
            DenseMut::String(values) => VectorBuf::from(values),
        }
    }
}

/// Mutable index buffer for sparse fills.
#[derive(Debug)]
pub enum IndexMut {
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
}

impl IndexMut {
    pub fn zeros(index_type: IndexType, len: usize) -> Self {
        match index_type {
            IndexType::UInt32 => IndexMut::UInt32(vec![0; len]),
            IndexType::UInt64 => IndexMut::UInt64(vec![0; len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexMut::UInt32(values) => values.len(),
            IndexMut::UInt64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set(&mut self, position: usize, index: usize) {
        match self {
            IndexMut::UInt32(values) => values[position] = index as u32,
            IndexMut::UInt64(values) => values[position] = index as u64,
        }
    }

    pub fn freeze(self) -> IndexBuf {
        match self {
            IndexMut::UInt32(values) => {
                IndexBuf::UInt32(super::array::PodArray::from_vec(values))
            }
            IndexMut::UInt64(values) => {
                IndexBuf::UInt64(super::array::PodArray::from_vec(values))
            }
        }
    }
}

/// Writable buffer for an uncommitted sparse vector.
#[derive(Debug)]
pub struct SparseVectorMut {
    pub len: usize,
    pub indices: IndexMut,
    pub values: DenseMut,
}

/// Writable buffer for an uncommitted vector property.
#[derive(Debug)]
pub enum VectorDataMut {
    Dense(DenseMut),
    Sparse(SparseVectorMut),
}

impl VectorDataMut {
    pub fn dense(element_type: ElementType, len: usize) -> Self {
        VectorDataMut::Dense(DenseMut::zeros(element_type, len))
    }

    pub fn sparse(element_type: ElementType, len: usize, nnz: usize, index_type: IndexType) -> Self {
        VectorDataMut::Sparse(SparseVectorMut {
            len,
            indices: IndexMut::zeros(index_type, nnz),
            values: DenseMut::zeros(element_type, nnz),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            VectorDataMut::Dense(buf) => buf.len(),
            VectorDataMut::Sparse(sparse) => sparse.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            VectorDataMut::Dense(buf) => buf.element_type(),
            VectorDataMut::Sparse(sparse) => sparse.values.element_type(),
        }
    }

    pub fn freeze(self) -> Result<VectorData, String> {
        match self {
            VectorDataMut::Dense(buf) => Ok(VectorData::Dense(buf.freeze())),
            VectorDataMut::Sparse(sparse) => {
                let values = match sparse.values.freeze() {
                    VectorBuf::Numeric(values) => values,
                    VectorBuf::String(_) => {
                        return Err("sparse vectors cannot hold strings".to_string())
                    }
                };
                Ok(VectorData::Sparse(SparseVector::new(
                    sparse.len,
                    sparse.indices.freeze(),
                    values,
                )?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> AxisLabels {
        AxisLabels::new(
            "cell",
            Arc::new(names.iter().map(|s| s.to_string()).collect()),
        )
    }

    #[test]
    fn test_dense_vector_basics() {
        let data = VectorData::from(vec![10i64, 20, 30]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.element_type(), ElementType::Int64);
        assert_eq!(data.get(1), StorageScalar::Int64(20));
        assert_eq!(data.density(), 1.0);
    }

    #[test]
    fn test_sparse_vector_lookup_and_densify() {
        let sparse = SparseVector::new(
            5,
            IndexBuf::from_usizes(IndexType::UInt32, vec![1, 4]),
            NumericBuf::from_f32_vec(vec![2.5, -1.0]),
        )
        .unwrap();
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.get_f64(4), -1.0);
        assert_eq!(sparse.get_f64(0), 0.0);

        let data = VectorData::Sparse(sparse);
        assert_eq!(data.get(1), StorageScalar::Float32(2.5));
        assert_eq!(data.get(2), StorageScalar::Float32(0.0));
        assert!((data.density() - 0.4).abs() < 1e-12);

        let dense = data.to_dense_buf();
        assert_eq!(dense.len(), 5);
        assert_eq!(dense.get(4), StorageScalar::Float32(-1.0));
    }

    #[test]
    fn test_sparse_vector_rejects_disorder() {
        assert!(SparseVector::new(
            5,
            IndexBuf::from_usizes(IndexType::UInt32, vec![3, 1]),
            NumericBuf::from_f32_vec(vec![1.0, 2.0]),
        )
        .is_err());
        assert!(SparseVector::new(
            2,
            IndexBuf::from_usizes(IndexType::UInt32, vec![5]),
            NumericBuf::from_f32_vec(vec![1.0]),
        )
        .is_err());
    }

    #[test]
    fn test_empty_sparse_is_valid() {
        let sparse = SparseVector::new(
            4,
            IndexBuf::from_usizes(IndexType::UInt32, vec![]),
            NumericBuf::from_f64_vec(ElementType::Float64, vec![]).unwrap(),
        )
        .unwrap();
        assert_eq!(sparse.nnz(), 0);
        assert_eq!(sparse.get_f64(3), 0.0);
    }

    #[test]
    fn test_named_vector_carries_labels() {
        let vector = NamedVector::new(labels(&["c0", "c1"]), "age", VectorData::from(vec![1u8, 2]));
        assert_eq!(vector.axis().name(), "cell");
        assert_eq!(vector.axis().entry(1), "c1");
        assert_eq!(vector.len(), 2);
    }

    #[test]
    fn test_dense_mut_fill_and_freeze() {
        let mut buffer = DenseMut::zeros(ElementType::Int32, 3);
        buffer.as_i32_mut().unwrap().copy_from_slice(&[7, 8, 9]);
        let frozen = buffer.freeze();
        assert_eq!(frozen.get(2), StorageScalar::Int32(9));
    }

    #[test]
    fn test_sparse_mut_freeze_round_trip() {
        let mut buffer = VectorDataMut::sparse(ElementType::Float64, 6, 2, IndexType::UInt32);
        if let VectorDataMut::Sparse(sparse) = &mut buffer {
            sparse.indices.set(0, 2);
            sparse.indices.set(1, 5);
            sparse.values.as_f64_mut().unwrap().copy_from_slice(&[0.5, 1.5]);
        }
        let data = buffer.freeze().unwrap();
        assert!(data.is_sparse());
        assert_eq!(data.get(5), StorageScalar::Float64(1.5));
    }

    #[test]
    fn test_type_mismatch_on_set() {
        let mut buffer = DenseMut::zeros(ElementType::UInt8, 1);
        assert!(buffer.set(0, StorageScalar::Int64(1)).is_err());
    }
}
