use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use memmap2::Mmap;

use super::element_type::{ElementType, IndexType};
use super::scalar::StorageScalar;

/// Marker for element types that may be reinterpreted from raw storage bytes.
///
/// # Safety
///
/// Implementors must be plain-old-data: no padding, no invalid bit patterns,
/// `Copy`, and layout-stable across the process.
pub unsafe trait Pod: Copy + Send + Sync + 'static {}

unsafe impl Pod for i8 {}
unsafe impl Pod for i16 {}
unsafe impl Pod for i32 {}
unsafe impl Pod for i64 {}
unsafe impl Pod for u8 {}
unsafe impl Pod for u16 {}
unsafe impl Pod for u32 {}
unsafe impl Pod for u64 {}
unsafe impl Pod for f32 {}
unsafe impl Pod for f64 {}

#[derive(Clone)]
enum Backing<T: Pod> {
    Owned(Arc<Vec<T>>),
    Mapped {
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
    },
}

/// An immutable typed array over either owned memory or a shared read-only
/// memory map. Clones are cheap (both backings are reference counted), which
/// is what makes returned vectors and matrices borrowed views rather than
/// copies.
#[derive(Clone)]
pub struct PodArray<T: Pod> {
    backing: Backing<T>,
}

impl<T: Pod> PodArray<T> {
    pub fn from_vec(values: Vec<T>) -> Self {
        Self {
            backing: Backing::Owned(Arc::new(values)),
        }
    }

    /// View `len` elements of `map` starting at byte `offset`.
    /// Fails when the range is out of bounds or misaligned for `T`.
    pub fn from_mmap(map: Arc<Mmap>, offset: usize, len: usize) -> Result<Self, String> {
        let size = std::mem::size_of::<T>();
        let end = offset
            .checked_add(len.checked_mul(size).ok_or("length overflow")?)
            .ok_or("offset overflow")?;
        if end > map.len() {
            return Err(format!(
                "mapped range {}..{} exceeds file size {}",
                offset,
                end,
                map.len()
            ));
        }
        let address = map.as_ptr() as usize + offset;
        if address % std::mem::align_of::<T>() != 0 {
            return Err(format!("mapped offset {} is misaligned", offset));
        }
        Ok(Self {
            backing: Backing::Mapped { map, offset, len },
        })
    }

    pub fn as_slice(&self) -> &[T] {
        match &self.backing {
            Backing::Owned(values) => values.as_slice(),
            Backing::Mapped { map, offset, len } => {
                // Safety: bounds and alignment were checked in from_mmap and the
                // map is immutable for its whole lifetime.
                unsafe {
                    std::slice::from_raw_parts(map.as_ptr().add(*offset) as *const T, *len)
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Owned(values) => values.len(),
            Backing::Mapped { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// New owned array with the elements at `indices`, in order.
    pub fn gather(&self, indices: &[usize]) -> Self {
        let slice = self.as_slice();
        Self::from_vec(indices.iter().map(|&index| slice[index]).collect())
    }
}

impl<T: Pod> Deref for PodArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for PodArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mapped = matches!(self.backing, Backing::Mapped { .. });
        f.debug_struct("PodArray")
            .field("len", &self.len())
            .field("mapped", &mapped)
            .finish()
    }
}

/// A typed numeric buffer; booleans are packed as one byte per value so the
/// buffer can be served straight from storage bytes.
#[derive(Debug, Clone)]
pub enum NumericBuf {
    Bool(PodArray<u8>),
    Int8(PodArray<i8>),
    Int16(PodArray<i16>),
    Int32(PodArray<i32>),
    Int64(PodArray<i64>),
    UInt8(PodArray<u8>),
    UInt16(PodArray<u16>),
    UInt32(PodArray<u32>),
    UInt64(PodArray<u64>),
    Float32(PodArray<f32>),
    Float64(PodArray<f64>),
}

/// Dispatch over the typed variants of a [`NumericBuf`].
macro_rules! with_numeric_buf {
    ($value:expr, |$array:ident| $body:expr) => {
        match $value {
            NumericBuf::Bool($array) => $body,
            NumericBuf::Int8($array) => $body,
            NumericBuf::Int16($array) => $body,
            NumericBuf::Int32($array) => $body,
            NumericBuf::Int64($array) => $body,
            NumericBuf::UInt8($array) => $body,
            NumericBuf::UInt16($array) => $body,
            NumericBuf::UInt32($array) => $body,
            NumericBuf::UInt64($array) => $body,
            NumericBuf::Float32($array) => $body,
            NumericBuf::Float64($array) => $body,
        }
    };
}

pub(crate) use with_numeric_buf;

/// Rebuild a [`NumericBuf`] of the same variant from a typed body producing a
/// `Vec` of the variant's element type.
macro_rules! map_numeric_buf {
    ($value:expr, |$array:ident| $body:expr) => {
        match $value {
            NumericBuf::Bool($array) => {
                NumericBuf::Bool($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::Int8($array) => {
                NumericBuf::Int8($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::Int16($array) => {
                NumericBuf::Int16($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::Int32($array) => {
                NumericBuf::Int32($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::Int64($array) => {
                NumericBuf::Int64($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::UInt8($array) => {
                NumericBuf::UInt8($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::UInt16($array) => {
                NumericBuf::UInt16($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::UInt32($array) => {
                NumericBuf::UInt32($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::UInt64($array) => {
                NumericBuf::UInt64($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::Float32($array) => {
                NumericBuf::Float32($crate::types::array::PodArray::from_vec($body))
            }
            NumericBuf::Float64($array) => {
                NumericBuf::Float64($crate::types::array::PodArray::from_vec($body))
            }
        }
    };
}

pub(crate) use map_numeric_buf;

macro_rules! numeric_buf_from_vec {
    ($($rust_type:ident => $variant:ident),* $(,)?) => {
        $(
            paste::paste! {
                impl NumericBuf {
                    pub fn [<from_ $rust_type _vec>](values: Vec<$rust_type>) -> Self {
                        NumericBuf::$variant(PodArray::from_vec(values))
                    }
                }
            }
        )*
    };
}

numeric_buf_from_vec! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
}

impl NumericBuf {
    pub fn from_bools(values: Vec<bool>) -> Self {
        NumericBuf::Bool(PodArray::from_vec(
            values.into_iter().map(|value| value as u8).collect(),
        ))
    }

    pub fn from_u8_vec(values: Vec<u8>) -> Self {
        NumericBuf::UInt8(PodArray::from_vec(values))
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            NumericBuf::Bool(_) => ElementType::Bool,
            NumericBuf::Int8(_) => ElementType::Int8,
            NumericBuf::Int16(_) => ElementType::Int16,
            NumericBuf::Int32(_) => ElementType::Int32,
            NumericBuf::Int64(_) => ElementType::Int64,
            NumericBuf::UInt8(_) => ElementType::UInt8,
            NumericBuf::UInt16(_) => ElementType::UInt16,
            NumericBuf::UInt32(_) => ElementType::UInt32,
            NumericBuf::UInt64(_) => ElementType::UInt64,
            NumericBuf::Float32(_) => ElementType::Float32,
            NumericBuf::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        with_numeric_buf!(self, |array| array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> StorageScalar {
        match self {
            NumericBuf::Bool(array) => StorageScalar::Bool(array[index] != 0),
            NumericBuf::Int8(array) => StorageScalar::Int8(array[index]),
            NumericBuf::Int16(array) => StorageScalar::Int16(array[index]),
            NumericBuf::Int32(array) => StorageScalar::Int32(array[index]),
            NumericBuf::Int64(array) => StorageScalar::Int64(array[index]),
            NumericBuf::UInt8(array) => StorageScalar::UInt8(array[index]),
            NumericBuf::UInt16(array) => StorageScalar::UInt16(array[index]),
            NumericBuf::UInt32(array) => StorageScalar::UInt32(array[index]),
            NumericBuf::UInt64(array) => StorageScalar::UInt64(array[index]),
            NumericBuf::Float32(array) => StorageScalar::Float32(array[index]),
            NumericBuf::Float64(array) => StorageScalar::Float64(array[index]),
        }
    }

    pub fn get_f64(&self, index: usize) -> f64 {
        match self {
            NumericBuf::Bool(array) => (array[index] != 0) as u8 as f64,
            NumericBuf::Int8(array) => array[index] as f64,
            NumericBuf::Int16(array) => array[index] as f64,
            NumericBuf::Int32(array) => array[index] as f64,
            NumericBuf::Int64(array) => array[index] as f64,
            NumericBuf::UInt8(array) => array[index] as f64,
            NumericBuf::UInt16(array) => array[index] as f64,
            NumericBuf::UInt32(array) => array[index] as f64,
            NumericBuf::UInt64(array) => array[index] as f64,
            NumericBuf::Float32(array) => array[index] as f64,
            NumericBuf::Float64(array) => array[index],
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.len()).map(|index| self.get_f64(index)).collect()
    }

    /// Build a buffer of `element_type` from `f64` values, truncating floats
    /// toward zero when the target is an integer type.
    pub fn from_f64_vec(element_type: ElementType, values: Vec<f64>) -> Option<Self> {
        let buf = match element_type {
            ElementType::Bool => Self::from_bools(values.into_iter().map(|v| v != 0.0).collect()),
            ElementType::Int8 => Self::from_i8_vec(values.into_iter().map(|v| v as i8).collect()),
            ElementType::Int16 => {
                Self::from_i16_vec(values.into_iter().map(|v| v as i16).collect())
            }
            ElementType::Int32 => {
                Self::from_i32_vec(values.into_iter().map(|v| v as i32).collect())
            }
            ElementType::Int64 => {
                Self::from_i64_vec(values.into_iter().map(|v| v as i64).collect())
            }
            ElementType::UInt8 => Self::from_u8_vec(values.into_iter().map(|v| v as u8).collect()),
            ElementType::UInt16 => {
                Self::from_u16_vec(values.into_iter().map(|v| v as u16).collect())
            }
            ElementType::UInt32 => {
                Self::from_u32_vec(values.into_iter().map(|v| v as u32).collect())
            }
            ElementType::UInt64 => {
                Self::from_u64_vec(values.into_iter().map(|v| v as u64).collect())
            }
            ElementType::Float32 => {
                Self::from_f32_vec(values.into_iter().map(|v| v as f32).collect())
            }
            ElementType::Float64 => Self::from_f64_vec_raw(values),
            ElementType::String => return None,
        };
        Some(buf)
    }

    fn from_f64_vec_raw(values: Vec<f64>) -> Self {
        NumericBuf::Float64(PodArray::from_vec(values))
    }

    pub fn gather(&self, indices: &[usize]) -> Self {
        match self {
            NumericBuf::Bool(array) => NumericBuf::Bool(array.gather(indices)),
            NumericBuf::Int8(array) => NumericBuf::Int8(array.gather(indices)),
            NumericBuf::Int16(array) => NumericBuf::Int16(array.gather(indices)),
            NumericBuf::Int32(array) => NumericBuf::Int32(array.gather(indices)),
            NumericBuf::Int64(array) => NumericBuf::Int64(array.gather(indices)),
            NumericBuf::UInt8(array) => NumericBuf::UInt8(array.gather(indices)),
            NumericBuf::UInt16(array) => NumericBuf::UInt16(array.gather(indices)),
            NumericBuf::UInt32(array) => NumericBuf::UInt32(array.gather(indices)),
            NumericBuf::UInt64(array) => NumericBuf::UInt64(array.gather(indices)),
            NumericBuf::Float32(array) => NumericBuf::Float32(array.gather(indices)),
            NumericBuf::Float64(array) => NumericBuf::Float64(array.gather(indices)),
        }
    }

    /// All-zeros buffer of the given type and length.
    pub fn zeros(element_type: ElementType, len: usize) -> Option<Self> {
        Self::from_f64_vec(element_type, vec![0.0; len])
    }

    /// Raw little-endian-native bytes of the packed buffer.
    pub fn packed_bytes(&self) -> Vec<u8> {
        fn bytes_of<T: Pod>(array: &PodArray<T>) -> Vec<u8> {
            let slice = array.as_slice();
            // Safety: T is plain-old-data with no padding.
            unsafe {
                std::slice::from_raw_parts(
                    slice.as_ptr() as *const u8,
                    std::mem::size_of_val(slice),
                )
            }
            .to_vec()
        }
        with_numeric_buf!(self, |array| bytes_of(array))
    }

    /// Decode a packed byte payload into an owned buffer of `element_type`.
    pub fn from_packed_bytes(
        element_type: ElementType,
        bytes: &[u8],
        len: usize,
    ) -> Result<Self, String> {
        fn decode<T: Pod>(bytes: &[u8], len: usize) -> Result<Vec<T>, String> {
            let size = std::mem::size_of::<T>();
            if bytes.len() != len * size {
                return Err(format!(
                    "{} payload bytes for {} elements of {} bytes",
                    bytes.len(),
                    len,
                    size
                ));
            }
            let mut values = Vec::with_capacity(len);
            for chunk in bytes.chunks_exact(size) {
                // Safety: T is plain-old-data and the chunk holds exactly one value.
                values.push(unsafe { std::ptr::read_unaligned(chunk.as_ptr() as *const T) });
            }
            Ok(values)
        }
        let buf = match element_type {
            ElementType::Bool => NumericBuf::Bool(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::Int8 => NumericBuf::Int8(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::Int16 => NumericBuf::Int16(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::Int32 => NumericBuf::Int32(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::Int64 => NumericBuf::Int64(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::UInt8 => NumericBuf::UInt8(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::UInt16 => NumericBuf::UInt16(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::UInt32 => NumericBuf::UInt32(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::UInt64 => NumericBuf::UInt64(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::Float32 => NumericBuf::Float32(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::Float64 => NumericBuf::Float64(PodArray::from_vec(decode(bytes, len)?)),
            ElementType::String => return Err("strings have no packed form".to_string()),
        };
        Ok(buf)
    }

    /// Reinterpret a shared memory map region as a buffer of `element_type`.
    pub fn from_mmap(
        element_type: ElementType,
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
    ) -> Result<Self, String> {
        let buf = match element_type {
            ElementType::Bool => NumericBuf::Bool(PodArray::from_mmap(map, offset, len)?),
            ElementType::Int8 => NumericBuf::Int8(PodArray::from_mmap(map, offset, len)?),
            ElementType::Int16 => NumericBuf::Int16(PodArray::from_mmap(map, offset, len)?),
            ElementType::Int32 => NumericBuf::Int32(PodArray::from_mmap(map, offset, len)?),
            ElementType::Int64 => NumericBuf::Int64(PodArray::from_mmap(map, offset, len)?),
            ElementType::UInt8 => NumericBuf::UInt8(PodArray::from_mmap(map, offset, len)?),
            ElementType::UInt16 => NumericBuf::UInt16(PodArray::from_mmap(map, offset, len)?),
            ElementType::UInt32 => NumericBuf::UInt32(PodArray::from_mmap(map, offset, len)?),
            ElementType::UInt64 => NumericBuf::UInt64(PodArray::from_mmap(map, offset, len)?),
            ElementType::Float32 => NumericBuf::Float32(PodArray::from_mmap(map, offset, len)?),
            ElementType::Float64 => NumericBuf::Float64(PodArray::from_mmap(map, offset, len)?),
            ElementType::String => return Err("strings have no packed form".to_string()),
        };
        Ok(buf)
    }
}

/// Index buffer for sparse storage, in one of the two supported widths.
#[derive(Debug, Clone)]
pub enum IndexBuf {
    UInt32(PodArray<u32>),
    UInt64(PodArray<u64>),
}

impl IndexBuf {
    pub fn from_usizes(index_type: IndexType, values: impl IntoIterator<Item = usize>) -> Self {
        match index_type {
            IndexType::UInt32 => {
                IndexBuf::UInt32(PodArray::from_vec(values.into_iter().map(|v| v as u32).collect()))
            }
            IndexType::UInt64 => {
                IndexBuf::UInt64(PodArray::from_vec(values.into_iter().map(|v| v as u64).collect()))
            }
        }
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexBuf::UInt32(_) => IndexType::UInt32,
            IndexBuf::UInt64(_) => IndexType::UInt64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuf::UInt32(array) => array.len(),
            IndexBuf::UInt64(array) => array.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> usize {
        match self {
            IndexBuf::UInt32(array) => array[index] as usize,
            IndexBuf::UInt64(array) => array[index] as usize,
        }
    }

    pub fn to_usize_vec(&self) -> Vec<usize> {
        (0..self.len()).map(|index| self.get(index)).collect()
    }

    pub fn packed_bytes(&self) -> Vec<u8> {
        fn bytes_of<T: Pod>(array: &PodArray<T>) -> Vec<u8> {
            let slice = array.as_slice();
            // Safety: T is plain-old-data with no padding.
            unsafe {
                std::slice::from_raw_parts(
                    slice.as_ptr() as *const u8,
                    std::mem::size_of_val(slice),
                )
            }
            .to_vec()
        }
        match self {
            IndexBuf::UInt32(array) => bytes_of(array),
            IndexBuf::UInt64(array) => bytes_of(array),
        }
    }

    pub fn from_mmap(
        index_type: IndexType,
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
    ) -> Result<Self, String> {
        Ok(match index_type {
            IndexType::UInt32 => IndexBuf::UInt32(PodArray::from_mmap(map, offset, len)?),
            IndexType::UInt64 => IndexBuf::UInt64(PodArray::from_mmap(map, offset, len)?),
        })
    }

    /// Decode a packed byte payload into an owned index buffer.
    pub fn from_packed_bytes(
        index_type: IndexType,
        bytes: &[u8],
        len: usize,
    ) -> Result<Self, String> {
        let element_type = match index_type {
            IndexType::UInt32 => ElementType::UInt32,
            IndexType::UInt64 => ElementType::UInt64,
        };
        match NumericBuf::from_packed_bytes(element_type, bytes, len)? {
            NumericBuf::UInt32(array) => Ok(IndexBuf::UInt32(array)),
            NumericBuf::UInt64(array) => Ok(IndexBuf::UInt64(array)),
            _ => Err("unexpected index payload".to_string()),
        }
    }
}

/// A typed buffer for vector data: the numeric types plus strings.
#[derive(Debug, Clone)]
pub enum VectorBuf {
    Numeric(NumericBuf),
    String(Arc<Vec<String>>),
}

impl VectorBuf {
    pub fn from_strings(values: Vec<String>) -> Self {
        VectorBuf::String(Arc::new(values))
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            VectorBuf::Numeric(buf) => buf.element_type(),
            VectorBuf::String(_) => ElementType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VectorBuf::Numeric(buf) => buf.len(),
            VectorBuf::String(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> StorageScalar {
        match self {
            VectorBuf::Numeric(buf) => buf.get(index),
            VectorBuf::String(values) => StorageScalar::String(values[index].clone()),
        }
    }

    pub fn as_numeric(&self) -> Option<&NumericBuf> {
        match self {
            VectorBuf::Numeric(buf) => Some(buf),
            VectorBuf::String(_) => None,
        }
    }

    pub fn as_strings(&self) -> Option<&Arc<Vec<String>>> {
        match self {
            VectorBuf::String(values) => Some(values),
            VectorBuf::Numeric(_) => None,
        }
    }

    pub fn gather(&self, indices: &[usize]) -> Self {
        match self {
            VectorBuf::Numeric(buf) => VectorBuf::Numeric(buf.gather(indices)),
            VectorBuf::String(values) => VectorBuf::String(Arc::new(
                indices.iter().map(|&index| values[index].clone()).collect(),
            )),
        }
    }

    /// Build a buffer from uniformly typed scalars; fails on a type mix.
    pub fn from_scalars(
        element_type: ElementType,
        values: &[StorageScalar],
    ) -> Result<Self, String> {
        if element_type == ElementType::String {
            let mut strings = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    StorageScalar::String(text) => strings.push(text.clone()),
                    other => {
                        return Err(format!(
                            "expected a String value, found: {}",
                            other.element_type()
                        ))
                    }
                }
            }
            return Ok(VectorBuf::from_strings(strings));
        }
        let mut floats = Vec::with_capacity(values.len());
        for value in values {
            if value.element_type() != element_type {
                return Err(format!(
                    "expected a {} value, found: {}",
                    element_type,
                    value.element_type()
                ));
            }
            floats.push(value.to_f64().unwrap_or(0.0));
        }
        NumericBuf::from_f64_vec(element_type, floats)
            .map(VectorBuf::Numeric)
            .ok_or_else(|| "strings have no numeric buffer".to_string())
    }
}

macro_rules! vector_buf_from {
    ($($rust_type:ident),* $(,)?) => {
        $(
            paste::paste! {
                impl From<Vec<$rust_type>> for VectorBuf {
                    fn from(values: Vec<$rust_type>) -> Self {
                        VectorBuf::Numeric(NumericBuf::[<from_ $rust_type _vec>](values))
                    }
                }
            }
        )*
    };
}

vector_buf_from!(i8, i16, i32, i64, u8, u16, u32, u64, f32);

impl From<Vec<f64>> for VectorBuf {
    fn from(values: Vec<f64>) -> Self {
        VectorBuf::Numeric(NumericBuf::Float64(PodArray::from_vec(values)))
    }
}

impl From<Vec<bool>> for VectorBuf {
    fn from(values: Vec<bool>) -> Self {
        VectorBuf::Numeric(NumericBuf::from_bools(values))
    }
}

impl From<Vec<String>> for VectorBuf {
    fn from(values: Vec<String>) -> Self {
        VectorBuf::from_strings(values)
    }
}

impl From<Vec<&str>> for VectorBuf {
    fn from(values: Vec<&str>) -> Self {
        VectorBuf::from_strings(values.into_iter().map(|s| s.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_array_round_trip() {
        let array = PodArray::from_vec(vec![1i64, 2, 3]);
        assert_eq!(array.len(), 3);
        assert_eq!(array.as_slice(), &[1, 2, 3]);
        assert_eq!(array.gather(&[2, 0]).as_slice(), &[3, 1]);
    }

    #[test]
    fn test_numeric_buf_accessors() {
        let buf = NumericBuf::from_i32_vec(vec![10, -20, 30]);
        assert_eq!(buf.element_type(), ElementType::Int32);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get(1), StorageScalar::Int32(-20));
        assert_eq!(buf.get_f64(2), 30.0);
    }

    #[test]
    fn test_bool_buf_packs_bytes() {
        let buf = NumericBuf::from_bools(vec![true, false, true]);
        assert_eq!(buf.packed_bytes(), vec![1, 0, 1]);
        assert_eq!(buf.get(0), StorageScalar::Bool(true));
    }

    #[test]
    fn test_from_f64_round_trips_dtype() {
        let buf = NumericBuf::from_f64_vec(ElementType::UInt16, vec![1.0, 2.0]).unwrap();
        assert_eq!(buf.element_type(), ElementType::UInt16);
        assert!(NumericBuf::from_f64_vec(ElementType::String, vec![]).is_none());
    }

    #[test]
    fn test_vector_buf_strings() {
        let buf = VectorBuf::from(vec!["a", "", "c"]);
        assert_eq!(buf.element_type(), ElementType::String);
        assert_eq!(buf.get(2), StorageScalar::String("c".into()));
        let subset = buf.gather(&[0, 2]);
        assert_eq!(subset.len(), 2);
    }

    #[test]
    fn test_from_scalars_rejects_mixed_types() {
        let values = vec![StorageScalar::Int32(1), StorageScalar::Float64(2.0)];
        assert!(VectorBuf::from_scalars(ElementType::Int32, &values).is_err());
    }

    #[test]
    fn test_index_buf_widths() {
        let indices = IndexBuf::from_usizes(IndexType::UInt32, vec![0, 5, 7]);
        assert_eq!(indices.index_type(), IndexType::UInt32);
        assert_eq!(indices.get(1), 5);
        assert_eq!(indices.to_usize_vec(), vec![0, 5, 7]);
    }
}
