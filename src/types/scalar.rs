use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::element_type::ElementType;

/// A single typed value, as stored for scalars and vector entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StorageScalar {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl StorageScalar {
    pub fn element_type(&self) -> ElementType {
        match self {
            StorageScalar::Bool(_) => ElementType::Bool,
            StorageScalar::Int8(_) => ElementType::Int8,
            StorageScalar::Int16(_) => ElementType::Int16,
            StorageScalar::Int32(_) => ElementType::Int32,
            StorageScalar::Int64(_) => ElementType::Int64,
            StorageScalar::UInt8(_) => ElementType::UInt8,
            StorageScalar::UInt16(_) => ElementType::UInt16,
            StorageScalar::UInt32(_) => ElementType::UInt32,
            StorageScalar::UInt64(_) => ElementType::UInt64,
            StorageScalar::Float32(_) => ElementType::Float32,
            StorageScalar::Float64(_) => ElementType::Float64,
            StorageScalar::String(_) => ElementType::String,
        }
    }

    /// Numeric view as `f64`, or `None` for strings.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            StorageScalar::Bool(value) => Some(*value as u8 as f64),
            StorageScalar::Int8(value) => Some(*value as f64),
            StorageScalar::Int16(value) => Some(*value as f64),
            StorageScalar::Int32(value) => Some(*value as f64),
            StorageScalar::Int64(value) => Some(*value as f64),
            StorageScalar::UInt8(value) => Some(*value as f64),
            StorageScalar::UInt16(value) => Some(*value as f64),
            StorageScalar::UInt32(value) => Some(*value as f64),
            StorageScalar::UInt64(value) => Some(*value as f64),
            StorageScalar::Float32(value) => Some(*value as f64),
            StorageScalar::Float64(value) => Some(*value),
            StorageScalar::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StorageScalar::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Parse `text` as a value of `element_type`.
    pub fn parse(element_type: ElementType, text: &str) -> Result<StorageScalar, String> {
        fn parse_as<T: std::str::FromStr>(text: &str, name: &str) -> Result<T, String> {
            text.parse::<T>()
                .map_err(|_| format!("invalid {} value: {}", name, text))
        }
        match element_type {
            ElementType::Bool => match text {
                "true" | "1" => Ok(StorageScalar::Bool(true)),
                "false" | "0" => Ok(StorageScalar::Bool(false)),
                _ => Err(format!("invalid Bool value: {}", text)),
            },
            ElementType::Int8 => parse_as(text, "Int8").map(StorageScalar::Int8),
            ElementType::Int16 => parse_as(text, "Int16").map(StorageScalar::Int16),
            ElementType::Int32 => parse_as(text, "Int32").map(StorageScalar::Int32),
            ElementType::Int64 => parse_as(text, "Int64").map(StorageScalar::Int64),
            ElementType::UInt8 => parse_as(text, "UInt8").map(StorageScalar::UInt8),
            ElementType::UInt16 => parse_as(text, "UInt16").map(StorageScalar::UInt16),
            ElementType::UInt32 => parse_as(text, "UInt32").map(StorageScalar::UInt32),
            ElementType::UInt64 => parse_as(text, "UInt64").map(StorageScalar::UInt64),
            ElementType::Float32 => parse_as(text, "Float32").map(StorageScalar::Float32),
            ElementType::Float64 => parse_as(text, "Float64").map(StorageScalar::Float64),
            ElementType::String => Ok(StorageScalar::String(text.to_string())),
        }
    }

    /// Ordering between two values of the same element type.
    /// Values of different types are ordered by type name (stable but arbitrary).
    pub fn compare(&self, other: &StorageScalar) -> Ordering {
        match (self.to_f64(), other.to_f64()) {
            (Some(left), Some(right)) => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
            (None, None) => self.as_str().cmp(&other.as_str()),
            _ => self.element_type().name().cmp(other.element_type().name()),
        }
    }
}

impl fmt::Display for StorageScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageScalar::Bool(value) => write!(f, "{}", value),
            StorageScalar::Int8(value) => write!(f, "{}", value),
            StorageScalar::Int16(value) => write!(f, "{}", value),
            StorageScalar::Int32(value) => write!(f, "{}", value),
            StorageScalar::Int64(value) => write!(f, "{}", value),
            StorageScalar::UInt8(value) => write!(f, "{}", value),
            StorageScalar::UInt16(value) => write!(f, "{}", value),
            StorageScalar::UInt32(value) => write!(f, "{}", value),
            StorageScalar::UInt64(value) => write!(f, "{}", value),
            StorageScalar::Float32(value) => write!(f, "{}", value),
            StorageScalar::Float64(value) => write!(f, "{}", value),
            StorageScalar::String(value) => f.write_str(value),
        }
    }
}

macro_rules! storage_scalar_from {
    ($($rust_type:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$rust_type> for StorageScalar {
                fn from(value: $rust_type) -> Self {
                    StorageScalar::$variant(value)
                }
            }
        )*
    };
}

storage_scalar_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
}

impl From<&str> for StorageScalar {
    fn from(value: &str) -> Self {
        StorageScalar::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_type_of_values() {
        assert_eq!(StorageScalar::from(1u8).element_type(), ElementType::UInt8);
        assert_eq!(
            StorageScalar::from("human").element_type(),
            ElementType::String
        );
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        let value = StorageScalar::parse(ElementType::Int32, "-17").unwrap();
        assert_eq!(value, StorageScalar::Int32(-17));
        assert_eq!(value.to_string(), "-17");

        assert!(StorageScalar::parse(ElementType::UInt8, "-1").is_err());
        assert!(StorageScalar::parse(ElementType::Bool, "maybe").is_err());
    }

    #[test]
    fn test_numeric_comparison_crosses_widths() {
        let narrow = StorageScalar::UInt8(7);
        let wide = StorageScalar::Int64(9);
        assert_eq!(narrow.compare(&wide), Ordering::Less);
    }
}
