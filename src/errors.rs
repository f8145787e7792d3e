use thiserror::Error;

use crate::layout::MajorAxis;
use crate::types::ElementType;

/// Error type shared by every public operation of the data layer.
///
/// Each variant carries enough context to locate the offending operand
/// (store, axis, property names) without consulting external state.
#[derive(Error, Debug)]
pub enum DafError {
    #[error("missing scalar: {name} in the daf data: {daf}")]
    UnknownScalar { daf: String, name: String },

    #[error("missing axis: {axis} in the daf data: {daf}")]
    UnknownAxis { daf: String, axis: String },

    #[error("missing vector: {name} for the axis: {axis} in the daf data: {daf}")]
    UnknownVector {
        daf: String,
        axis: String,
        name: String,
    },

    #[error(
        "missing matrix: {name} for the rows axis: {rows_axis} and the columns axis: {columns_axis} in the daf data: {daf}"
    )]
    UnknownMatrix {
        daf: String,
        rows_axis: String,
        columns_axis: String,
        name: String,
    },

    #[error("existing axis: {axis} in the daf data: {daf}")]
    DuplicateAxis { daf: String, axis: String },

    #[error("duplicated entry: {entry} in the axis: {axis} in the daf data: {daf}")]
    DuplicateEntry {
        daf: String,
        axis: String,
        entry: String,
    },

    #[error("empty entry at index {index} in the axis: {axis} in the daf data: {daf}")]
    EmptyEntry {
        daf: String,
        axis: String,
        index: usize,
    },

    #[error("axis in use: {axis} has {dependents} dependent propert(ies) in the daf data: {daf}")]
    AxisInUse {
        daf: String,
        axis: String,
        dependents: usize,
    },

    #[error(
        "length mismatch: the vector: {name} has {actual} entries but the axis: {axis} has {expected} in the daf data: {daf}"
    )]
    LengthMismatch {
        daf: String,
        axis: String,
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "shape mismatch: the matrix: {name} is {actual_rows}x{actual_columns} but the axes: {rows_axis}, {columns_axis} are {expected_rows}x{expected_columns} in the daf data: {daf}"
    )]
    ShapeMismatch {
        daf: String,
        rows_axis: String,
        columns_axis: String,
        name: String,
        expected_rows: usize,
        expected_columns: usize,
        actual_rows: usize,
        actual_columns: usize,
    },

    #[error("unsupported element type: {element_type} for {holder}")]
    UnsupportedElementType {
        holder: String,
        element_type: ElementType,
    },

    #[error("the matrix: {name} has no major axis (ambiguous strided layout)")]
    NoMajorAxis { name: String },

    #[error("layout mismatch between relayout source and destination: {reason}")]
    LayoutMismatch { reason: String },

    #[error(
        "inefficient action: {action} for the {operand}: {name} which is stored with major axis: {major_axis} but is iterated along the axis: {requested_axis}"
    )]
    InefficientAction {
        action: String,
        operand: String,
        name: String,
        major_axis: MajorAxis,
        requested_axis: MajorAxis,
    },

    #[error(
        "chain axis mismatch: the axis: {axis} disagrees between the chained stores: {earlier} and: {later} ({reason})"
    )]
    ChainAxisMismatch {
        axis: String,
        earlier: String,
        later: String,
        reason: String,
    },

    #[error("contract violation for {direction} {key}: {reason} in the computation: {computation}")]
    ContractViolation {
        computation: String,
        direction: String,
        key: String,
        reason: String,
    },

    #[error("query syntax error at position {position}: {reason} in the query: {query}")]
    QuerySyntaxError {
        query: String,
        position: usize,
        reason: String,
    },

    #[error("query evaluation error in the operation: {operation}: {reason}")]
    QueryEvaluationError { operation: String, reason: String },

    #[error(
        "ungrouped entry: {entry} of the axis: {axis} has no group and no default was provided"
    )]
    UngroupedEntry { axis: String, entry: String },

    #[error("unknown group: {group} (not an entry of the axis: {group_axis})")]
    UnknownGroup { group: String, group_axis: String },

    #[error(
        "inconsistent reconstruction: the property: {property} has values: {values} for the implicit entry: {entry}"
    )]
    InconsistentReconstruction {
        property: String,
        entry: String,
        values: String,
    },

    #[error("forbidden lock upgrade from read to write of the daf data: {daf}")]
    LockUpgradeForbidden { daf: String },

    #[error("existing {kind}: {name} in the daf data: {daf} (overwrite is not set)")]
    PropertyExists {
        daf: String,
        kind: String,
        name: String,
    },

    #[error("read-only daf data: {daf}")]
    ReadOnly { daf: String },

    #[error("storage I/O failure at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt storage at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

pub type DafResult<T> = Result<T, DafError>;

impl DafError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        DafError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DafError::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
