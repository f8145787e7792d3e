use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The element types storable in a daf data set.
///
/// Scalars and vectors may use any of these; matrices are restricted to the
/// numeric types (everything except `String`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
}

impl ElementType {
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Bool => "Bool",
            ElementType::Int8 => "Int8",
            ElementType::Int16 => "Int16",
            ElementType::Int32 => "Int32",
            ElementType::Int64 => "Int64",
            ElementType::UInt8 => "UInt8",
            ElementType::UInt16 => "UInt16",
            ElementType::UInt32 => "UInt32",
            ElementType::UInt64 => "UInt64",
            ElementType::Float32 => "Float32",
            ElementType::Float64 => "Float64",
            ElementType::String => "String",
        }
    }

    /// Whether values of this type may appear in matrices.
    pub fn is_numeric(self) -> bool {
        !matches!(self, ElementType::String)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ElementType::Int8
                | ElementType::Int16
                | ElementType::Int32
                | ElementType::Int64
                | ElementType::UInt8
                | ElementType::UInt16
                | ElementType::UInt32
                | ElementType::UInt64
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            ElementType::UInt8 | ElementType::UInt16 | ElementType::UInt32 | ElementType::UInt64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }

    /// Size in bytes of one packed element, or `None` for `String`.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => Some(1),
            ElementType::Int16 | ElementType::UInt16 => Some(2),
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float32 => Some(4),
            ElementType::Int64 | ElementType::UInt64 | ElementType::Float64 => Some(8),
            ElementType::String => None,
        }
    }

    pub const ALL: [ElementType; 12] = [
        ElementType::Bool,
        ElementType::Int8,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::UInt8,
        ElementType::UInt16,
        ElementType::UInt32,
        ElementType::UInt64,
        ElementType::Float32,
        ElementType::Float64,
        ElementType::String,
    ];
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "Bool" => Ok(ElementType::Bool),
            "Int8" => Ok(ElementType::Int8),
            "Int16" => Ok(ElementType::Int16),
            "Int32" => Ok(ElementType::Int32),
            "Int64" => Ok(ElementType::Int64),
            "UInt8" => Ok(ElementType::UInt8),
            "UInt16" => Ok(ElementType::UInt16),
            "UInt32" => Ok(ElementType::UInt32),
            "UInt64" => Ok(ElementType::UInt64),
            "Float32" => Ok(ElementType::Float32),
            "Float64" => Ok(ElementType::Float64),
            "String" => Ok(ElementType::String),
            other => Err(format!("unknown element type: {}", other)),
        }
    }
}

/// The index types allowed for sparse vectors and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    UInt32,
    UInt64,
}

impl IndexType {
    pub fn name(self) -> &'static str {
        match self {
            IndexType::UInt32 => "UInt32",
            IndexType::UInt64 => "UInt64",
        }
    }

    pub fn fixed_size(self) -> usize {
        match self {
            IndexType::UInt32 => 4,
            IndexType::UInt64 => 8,
        }
    }

    /// Smallest index type that can address `len` entries.
    pub fn for_length(len: usize) -> IndexType {
        if len <= u32::MAX as usize {
            IndexType::UInt32
        } else {
            IndexType::UInt64
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndexType {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "UInt32" => Ok(IndexType::UInt32),
            "UInt64" => Ok(IndexType::UInt64),
            other => Err(format!("unknown index type: {}", other)),
        }
    }
}
