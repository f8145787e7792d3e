use crate::errors::{DafError, DafResult};

/// Element comparison turning a vector into a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Match,
    NotMatch,
}

/// How a mask clause folds into the axis mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskCombine {
    And,
    Or,
    Xor,
}

/// Element-wise operation preserving shape.
#[derive(Debug, Clone, PartialEq)]
pub enum EltwiseOp {
    Abs,
    Neg,
    Sqrt,
    Ceil,
    Floor,
    Round,
    /// Fractions of the total (per vector, or per matrix row-reduction slice).
    Fraction,
    Log {
        base: f64,
        eps: f64,
    },
    Clamp {
        min: Option<f64>,
        max: Option<f64>,
    },
}

/// Reduction of a matrix into a vector (one value per column) or of a vector
/// into a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ReductionOp {
    Sum,
    Min,
    Max,
    Mean,
    Median,
    Std,
    Var,
    Quantile { p: f64 },
    Count,
}

/// One step of a query pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOp {
    /// `/ name`: select an axis (first the vector/rows axis, then the
    /// columns axis).
    Axis(String),
    /// `: name`: look up a property in the current axis context.
    Lookup(String),
    /// `? token` directly after a lookup or reduction: default value.
    IfMissing(String),
    /// `! token`: substitute for empty strings.
    IfNot(String),
    /// `=> name`: follow axis labels into a property of the labeled axis.
    Fetch(String),
    /// `# name`: reinterpret a string vector as entries of the named axis.
    AsAxis(String),
    /// `= value` and friends: compare elements, producing a mask.
    Compare(CompareOp, String),
    /// `& name`, `|! name`, ...: open a mask clause on the current axis.
    Mask {
        combine: MaskCombine,
        negate: bool,
        name: String,
    },
    /// `; name = entry` / `\ name = entry`: one row/column of a square
    /// boolean matrix as an axis mask.
    SquareMask {
        name: String,
        entry: String,
        row: bool,
    },
    /// `@ name`: group the current vector by a string vector.
    GroupBy(String),
    /// `%# name`: count matrix of two string vectors.
    CountBy(String),
    /// `% Op ...`: element-wise operation.
    Eltwise(EltwiseOp),
    /// `%> Op ...`: reduction operation.
    Reduce(ReductionOp),
    /// `?` with no operand in a name position: enumerate the names of the
    /// current scope (scalars, vectors of an axis, or matrices of a pair).
    Names,
}

fn parse_f64(op: &str, name: &str, value: &str) -> DafResult<f64> {
    value.parse::<f64>().map_err(|_| DafError::QuerySyntaxError {
        query: op.to_string(),
        position: 0,
        reason: format!("invalid {} parameter: {}", name, value),
    })
}

impl EltwiseOp {
    /// Build from an operation name and `name value` parameter pairs.
    pub fn from_name(name: &str, params: &[(String, String)]) -> DafResult<EltwiseOp> {
        let unexpected = |parameter: &str| DafError::QuerySyntaxError {
            query: name.to_string(),
            position: 0,
            reason: format!("unexpected parameter: {}", parameter),
        };
        match name {
            "Abs" | "Neg" | "Sqrt" | "Ceil" | "Floor" | "Round" | "Fraction" => {
                if let Some((parameter, _)) = params.first() {
                    return Err(unexpected(parameter));
                }
                Ok(match name {
                    "Abs" => EltwiseOp::Abs,
                    "Neg" => EltwiseOp::Neg,
                    "Sqrt" => EltwiseOp::Sqrt,
                    "Ceil" => EltwiseOp::Ceil,
                    "Floor" => EltwiseOp::Floor,
                    "Round" => EltwiseOp::Round,
                    _ => EltwiseOp::Fraction,
                })
            }
            "Log" => {
                let mut base = std::f64::consts::E;
                let mut eps = 0.0;
                for (parameter, value) in params {
                    match parameter.as_str() {
                        "base" => base = parse_f64(name, parameter, value)?,
                        "eps" => eps = parse_f64(name, parameter, value)?,
                        other => return Err(unexpected(other)),
                    }
                }
                Ok(EltwiseOp::Log { base, eps })
            }
            "Clamp" => {
                let mut min = None;
                let mut max = None;
                for (parameter, value) in params {
                    match parameter.as_str() {
                        "min" => min = Some(parse_f64(name, parameter, value)?),
                        "max" => max = Some(parse_f64(name, parameter, value)?),
                        other => return Err(unexpected(other)),
                    }
                }
                Ok(EltwiseOp::Clamp { min, max })
            }
            other => Err(DafError::QuerySyntaxError {
                query: other.to_string(),
                position: 0,
                reason: "unknown element-wise operation".to_string(),
            }),
        }
    }
}

impl ReductionOp {
    /// Build from an operation name and `name value` parameter pairs.
    pub fn from_name(name: &str, params: &[(String, String)]) -> DafResult<ReductionOp> {
        let unexpected = |parameter: &str| DafError::QuerySyntaxError {
            query: name.to_string(),
            position: 0,
            reason: format!("unexpected parameter: {}", parameter),
        };
        match name {
            "Sum" | "Min" | "Max" | "Mean" | "Median" | "Std" | "Var" | "Count" => {
                if let Some((parameter, _)) = params.first() {
                    return Err(unexpected(parameter));
                }
                Ok(match name {
                    "Sum" => ReductionOp::Sum,
                    "Min" => ReductionOp::Min,
                    "Max" => ReductionOp::Max,
                    "Mean" => ReductionOp::Mean,
                    "Median" => ReductionOp::Median,
                    "Std" => ReductionOp::Std,
                    "Var" => ReductionOp::Var,
                    _ => ReductionOp::Count,
                })
            }
            "Quantile" => {
                let mut p = None;
                for (parameter, value) in params {
                    match parameter.as_str() {
                        "p" => p = Some(parse_f64(name, parameter, value)?),
                        other => return Err(unexpected(other)),
                    }
                }
                let p = p.ok_or_else(|| DafError::QuerySyntaxError {
                    query: name.to_string(),
                    position: 0,
                    reason: "Quantile requires a p parameter".to_string(),
                })?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(DafError::QuerySyntaxError {
                        query: name.to_string(),
                        position: 0,
                        reason: format!("quantile p: {} is out of [0, 1]", p),
                    });
                }
                Ok(ReductionOp::Quantile { p })
            }
            other => Err(DafError::QuerySyntaxError {
                query: other.to_string(),
                position: 0,
                reason: "unknown reduction operation".to_string(),
            }),
        }
    }

    /// Reduce a slice of numeric values. Empty slices return `None` except
    /// for `Sum` and `Count`, which are well-defined on nothing.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        match self {
            ReductionOp::Count => return Some(values.len() as f64),
            ReductionOp::Sum => return Some(values.iter().sum()),
            _ => {}
        }
        if values.is_empty() {
            return None;
        }
        Some(match self {
            ReductionOp::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            ReductionOp::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            ReductionOp::Mean => values.iter().sum::<f64>() / values.len() as f64,
            ReductionOp::Median => quantile_of(values, 0.5),
            ReductionOp::Quantile { p } => quantile_of(values, *p),
            ReductionOp::Var => variance_of(values),
            ReductionOp::Std => variance_of(values).sqrt(),
            ReductionOp::Sum | ReductionOp::Count => unreachable!(),
        })
    }
}

fn variance_of(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn quantile_of(values: &[f64], p: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|left, right| left.partial_cmp(right).unwrap_or(std::cmp::Ordering::Equal));
    let rank = p * (sorted.len() - 1) as f64;
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        sorted[low] + (sorted[high] - sorted[low]) * (rank - low as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_ops() {
        let values = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(ReductionOp::Sum.apply(&values), Some(14.0));
        assert_eq!(ReductionOp::Min.apply(&values), Some(1.0));
        assert_eq!(ReductionOp::Max.apply(&values), Some(5.0));
        assert_eq!(ReductionOp::Count.apply(&values), Some(5.0));
        assert_eq!(ReductionOp::Median.apply(&values), Some(3.0));
        assert_eq!(ReductionOp::Mean.apply(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn test_empty_reductions() {
        assert_eq!(ReductionOp::Sum.apply(&[]), Some(0.0));
        assert_eq!(ReductionOp::Count.apply(&[]), Some(0.0));
        assert_eq!(ReductionOp::Max.apply(&[]), None);
        assert_eq!(ReductionOp::Median.apply(&[]), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [0.0, 10.0];
        assert_eq!(
            ReductionOp::Quantile { p: 0.5 }.apply(&values),
            Some(5.0)
        );
    }

    #[test]
    fn test_op_construction() {
        assert_eq!(
            EltwiseOp::from_name("Log", &[("base".into(), "2".into())]).unwrap(),
            EltwiseOp::Log { base: 2.0, eps: 0.0 }
        );
        assert!(EltwiseOp::from_name("Banana", &[]).is_err());
        assert!(ReductionOp::from_name("Quantile", &[]).is_err());
        assert!(matches!(
            ReductionOp::from_name("Quantile", &[("p".into(), "0.25".into())]),
            Ok(ReductionOp::Quantile { .. })
        ));
    }
}
