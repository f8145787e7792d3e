use std::str::FromStr;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::major_axis::{major_axis, MajorAxis};
use crate::errors::{DafError, DafResult};
use crate::types::MatrixData;

/// Policy for reacting to a recoverable operational anomaly, such as
/// iterating a matrix against its grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InefficientActionHandler {
    Ignore,
    Warn,
    Error,
}

impl FromStr for InefficientActionHandler {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "ignore" => Ok(InefficientActionHandler::Ignore),
            "warn" => Ok(InefficientActionHandler::Warn),
            "error" => Ok(InefficientActionHandler::Error),
            other => Err(format!("unknown handler: {}", other)),
        }
    }
}

static DEFAULT_HANDLER: Lazy<Mutex<InefficientActionHandler>> =
    Lazy::new(|| Mutex::new(InefficientActionHandler::Warn));

pub fn default_inefficient_action_handler() -> InefficientActionHandler {
    *DEFAULT_HANDLER.lock()
}

/// Replace the process-wide default handler, returning the previous one.
pub fn set_inefficient_action_handler(
    handler: InefficientActionHandler,
) -> InefficientActionHandler {
    std::mem::replace(&mut DEFAULT_HANDLER.lock(), handler)
}

/// Verify that `action` iterating the `operand` named `name` along
/// `requested_axis` goes with the grain of the matrix. Against the grain the
/// configured handler decides: silently proceed, log a warning, or fail.
pub fn check_efficient_action(
    handler: InefficientActionHandler,
    action: &str,
    operand: &str,
    name: &str,
    matrix: &MatrixData,
    requested_axis: MajorAxis,
) -> DafResult<()> {
    let actual_axis = match major_axis(matrix) {
        Some(axis) => axis,
        None => {
            return Err(DafError::NoMajorAxis {
                name: name.to_string(),
            })
        }
    };
    if actual_axis == requested_axis {
        return Ok(());
    }
    match handler {
        InefficientActionHandler::Ignore => Ok(()),
        InefficientActionHandler::Warn => {
            log::warn!(
                "inefficient action: {} for the {}: {} which is stored with major axis: {} but is iterated along the axis: {}",
                action,
                operand,
                name,
                actual_axis,
                requested_axis
            );
            Ok(())
        }
        InefficientActionHandler::Error => Err(DafError::InefficientAction {
            action: action.to_string(),
            operand: operand.to_string(),
            name: name.to_string(),
            major_axis: actual_axis,
            requested_axis,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DenseMatrix, ElementType};

    fn column_major() -> MatrixData {
        MatrixData::Dense(
            DenseMatrix::from_rows(ElementType::Float64, &[vec![1.0, 2.0], vec![3.0, 4.0]])
                .unwrap(),
        )
    }

    #[test]
    fn test_with_the_grain_is_silent() {
        let matrix = column_major();
        assert!(check_efficient_action(
            InefficientActionHandler::Error,
            "sum",
            "matrix",
            "UMIs",
            &matrix,
            MajorAxis::Columns,
        )
        .is_ok());
    }

    #[test]
    fn test_against_the_grain_with_error_handler() {
        let matrix = column_major();
        let result = check_efficient_action(
            InefficientActionHandler::Error,
            "sum",
            "matrix",
            "UMIs",
            &matrix,
            MajorAxis::Rows,
        );
        assert!(matches!(result, Err(DafError::InefficientAction { .. })));
    }

    #[test]
    fn test_against_the_grain_with_ignore_handler() {
        let matrix = column_major();
        assert!(check_efficient_action(
            InefficientActionHandler::Ignore,
            "sum",
            "matrix",
            "UMIs",
            &matrix,
            MajorAxis::Rows,
        )
        .is_ok());
    }

    #[test]
    fn test_handler_parsing() {
        assert_eq!(
            "warn".parse::<InefficientActionHandler>(),
            Ok(InefficientActionHandler::Warn)
        );
        assert!("loud".parse::<InefficientActionHandler>().is_err());
    }
}
