use std::sync::Arc;

use regex::Regex;

use super::ops::{CompareOp, EltwiseOp, MaskCombine, QueryOp, ReductionOp};
use super::parse::Query;
use crate::errors::{DafError, DafResult};
use crate::groups::{cross_tabulate, property_axis_name};
use crate::layout::{check_efficient_action, default_inefficient_action_handler, MajorAxis};
use crate::store::DafReader;
use crate::types::{
    AxisLabels, DenseMatrix, ElementType, MajorOrder, MatrixData, NamedMatrix, NamedVector,
    NumericBuf, StorageScalar, VectorBuf, VectorData,
};

/// The typed outcome of a query.
#[derive(Debug, Clone)]
pub enum QueryResult {
    Names(Vec<String>),
    Scalar(StorageScalar),
    Vector(NamedVector),
    Matrix(NamedMatrix),
}

impl QueryResult {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryResult::Names(_) => "names",
            QueryResult::Scalar(_) => "scalar",
            QueryResult::Vector(_) => "vector",
            QueryResult::Matrix(_) => "matrix",
        }
    }

    pub fn into_scalar(self) -> DafResult<StorageScalar> {
        match self {
            QueryResult::Scalar(value) => Ok(value),
            other => Err(DafError::QueryEvaluationError {
                operation: "result".to_string(),
                reason: format!("expected a scalar result, got {}", other.kind()),
            }),
        }
    }

    pub fn into_vector(self) -> DafResult<NamedVector> {
        match self {
            QueryResult::Vector(vector) => Ok(vector),
            other => Err(DafError::QueryEvaluationError {
                operation: "result".to_string(),
                reason: format!("expected a vector result, got {}", other.kind()),
            }),
        }
    }

    pub fn into_matrix(self) -> DafResult<NamedMatrix> {
        match self {
            QueryResult::Matrix(matrix) => Ok(matrix),
            other => Err(DafError::QueryEvaluationError {
                operation: "result".to_string(),
                reason: format!("expected a matrix result, got {}", other.kind()),
            }),
        }
    }
}

/// An axis selected by the pipeline, with its accumulated mask.
struct AxisScope {
    axis: String,
    entries: Arc<Vec<String>>,
    mask: Vec<bool>,
}

impl AxisScope {
    fn selected_indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(index, keep)| keep.then_some(index))
            .collect()
    }

    fn selected_entries(&self) -> Vec<String> {
        self.selected_indices()
            .into_iter()
            .map(|index| self.entries[index].clone())
            .collect()
    }

    fn is_full(&self) -> bool {
        self.mask.iter().all(|keep| *keep)
    }

    fn labels(&self) -> AxisLabels {
        if self.is_full() {
            AxisLabels::new(self.axis.clone(), Arc::clone(&self.entries))
        } else {
            AxisLabels::new(self.axis.clone(), Arc::new(self.selected_entries()))
        }
    }
}

/// A mask clause under construction (`& name`, before its comparisons fold).
struct PendingClause {
    combine: MaskCombine,
    negate: bool,
    name: String,
    values: VectorData,
    resolved: Option<Vec<bool>>,
}

/// A group-by waiting for its reduction.
struct PendingGroup {
    name: String,
    labels: Vec<String>,
    alias: Option<String>,
}

/// The typed current value of the pipeline.
enum Current {
    None,
    Names(Vec<String>),
    Scalar(StorageScalar),
    Vector {
        name: String,
        data: VectorData,
        alias: Option<String>,
    },
    Matrix(NamedMatrix),
}

/// Single-pass interpreter over a query plan.
struct Evaluator<'a> {
    daf: &'a dyn DafReader,
    query: &'a Query,
    scopes: Vec<AxisScope>,
    current: Current,
    clause: Option<PendingClause>,
    group: Option<PendingGroup>,
    requires_relayout: bool,
}

fn eval_error(operation: impl Into<String>, reason: impl Into<String>) -> DafError {
    DafError::QueryEvaluationError {
        operation: operation.into(),
        reason: reason.into(),
    }
}

/// Parse a default-value token by shape: integer, float, or string.
fn parse_default(token: &str) -> StorageScalar {
    if let Ok(value) = token.parse::<i64>() {
        StorageScalar::Int64(value)
    } else if let Ok(value) = token.parse::<f64>() {
        StorageScalar::Float64(value)
    } else {
        StorageScalar::String(token.to_string())
    }
}

impl Query {
    /// Evaluate against a reader, producing the typed result.
    pub fn execute(&self, daf: &dyn DafReader) -> DafResult<QueryResult> {
        self.execute_traced(daf).map(|(result, _)| result)
    }

    /// Evaluate, also reporting whether any matrix lookup needed a relayout
    /// (so callers can pre-plan with `relayout_matrix`).
    pub fn execute_traced(&self, daf: &dyn DafReader) -> DafResult<(QueryResult, bool)> {
        let mut evaluator = Evaluator {
            daf,
            query: self,
            scopes: Vec::new(),
            current: Current::None,
            clause: None,
            group: None,
            requires_relayout: false,
        };
        evaluator.run()
    }

    /// Whether executing against `daf` would compute a relayout.
    pub fn requires_relayout(&self, daf: &dyn DafReader) -> DafResult<bool> {
        self.execute_traced(daf).map(|(_, relayout)| relayout)
    }
}

impl<'a> Evaluator<'a> {
    fn run(mut self) -> DafResult<(QueryResult, bool)> {
        let ops = self.query.ops().to_vec();
        let mut index = 0;
        while index < ops.len() {
            let op = &ops[index];
            let lookahead = ops.get(index + 1);
            let default = match lookahead {
                Some(QueryOp::IfMissing(token)) => Some(parse_default(token)),
                _ => None,
            };
            match op {
                QueryOp::Axis(axis) => self.op_axis(axis)?,
                QueryOp::Lookup(name) => self.op_lookup(name, default.as_ref())?,
                QueryOp::IfMissing(_) => {} // consumed by the preceding op
                QueryOp::IfNot(token) => self.op_if_not(token)?,
                QueryOp::Fetch(name) => self.op_fetch(name)?,
                QueryOp::AsAxis(axis) => self.op_as_axis(axis)?,
                QueryOp::Compare(op, value) => self.op_compare(*op, value)?,
                QueryOp::Mask {
                    combine,
                    negate,
                    name,
                } => self.op_mask(*combine, *negate, name)?,
                QueryOp::SquareMask { name, entry, row } => {
                    self.op_square_mask(name, entry, *row)?
                }
                QueryOp::GroupBy(name) => self.op_group_by(name)?,
                QueryOp::CountBy(name) => self.op_count_by(name)?,
                QueryOp::Eltwise(op) => self.op_eltwise(op)?,
                QueryOp::Reduce(op) => self.op_reduce(op, default.as_ref())?,
                QueryOp::Names => self.op_names()?,
            }
            index += 1;
        }
        self.flush_clause()?;
        if self.group.is_some() {
            return Err(eval_error(
                self.query.text(),
                "a group-by must be followed by a reduction",
            ));
        }
        let requires_relayout = self.requires_relayout;
        let result = self.finish()?;
        Ok((result, requires_relayout))
    }

    fn finish(self) -> DafResult<QueryResult> {
        match self.current {
            Current::None => match self.scopes.first() {
                Some(scope) => Ok(QueryResult::Names(scope.selected_entries())),
                None => Err(eval_error(self.query.text(), "the query selects nothing")),
            },
            Current::Names(names) => Ok(QueryResult::Names(names)),
            Current::Scalar(value) => Ok(QueryResult::Scalar(value)),
            Current::Vector { name, data, .. } => {
                let scope = self
                    .scopes
                    .first()
                    .ok_or_else(|| eval_error(self.query.text(), "vector value without an axis"))?;
                Ok(QueryResult::Vector(NamedVector::new(
                    scope.labels(),
                    name,
                    data,
                )))
            }
            Current::Matrix(matrix) => Ok(QueryResult::Matrix(matrix)),
        }
    }

    fn scope(&self, which: usize) -> DafResult<&AxisScope> {
        self.scopes
            .get(which)
            .ok_or_else(|| eval_error(self.query.text(), "no axis was selected"))
    }

    fn op_axis(&mut self, axis: &str) -> DafResult<()> {
        self.flush_clause()?;
        if self.scopes.len() >= 2 {
            return Err(eval_error(
                format!("/ {}", axis),
                "a query selects at most two axes",
            ));
        }
        if !matches!(self.current, Current::None) {
            return Err(eval_error(
                format!("/ {}", axis),
                "axes must be selected before any value",
            ));
        }
        let entries = self.daf.axis_entries(axis)?;
        let mask = vec![true; entries.len()];
        self.scopes.push(AxisScope {
            axis: axis.to_string(),
            entries,
            mask,
        });
        Ok(())
    }

    /// Fold the pending mask clause into the innermost axis scope.
    fn flush_clause(&mut self) -> DafResult<()> {
        let clause = match self.clause.take() {
            Some(clause) => clause,
            None => return Ok(()),
        };
        let bits = match clause.resolved {
            Some(bits) => bits,
            None => {
                // An uncompared clause must already be boolean.
                if clause.values.element_type() != ElementType::Bool {
                    return Err(eval_error(
                        format!("& {}", clause.name),
                        format!(
                            "a mask vector must be boolean, not {}",
                            clause.values.element_type()
                        ),
                    ));
                }
                (0..clause.values.len())
                    .map(|index| match clause.values.get(index) {
                        StorageScalar::Bool(value) => value,
                        _ => false,
                    })
                    .collect()
            }
        };
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| eval_error(format!("& {}", clause.name), "no axis was selected"))?;
        for (slot, bit) in scope.mask.iter_mut().zip(bits.into_iter()) {
            let bit = if clause.negate { !bit } else { bit };
            *slot = match clause.combine {
                MaskCombine::And => *slot && bit,
                MaskCombine::Or => *slot || bit,
                MaskCombine::Xor => *slot != bit,
            };
        }
        Ok(())
    }

    fn op_mask(&mut self, combine: MaskCombine, negate: bool, name: &str) -> DafResult<()> {
        self.flush_clause()?;
        if !matches!(self.current, Current::None) {
            return Err(eval_error(
                format!("& {}", name),
                "masks apply to the axis selection, before any lookup",
            ));
        }
        let scope = self
            .scopes
            .last()
            .ok_or_else(|| eval_error(format!("& {}", name), "no axis was selected"))?;
        let vector = self.daf.get_vector(&scope.axis, name)?;
        self.clause = Some(PendingClause {
            combine,
            negate,
            name: name.to_string(),
            values: vector.into_data(),
            resolved: None,
        });
        Ok(())
    }

    fn op_square_mask(&mut self, name: &str, entry: &str, row: bool) -> DafResult<()> {
        self.flush_clause()?;
        let scope = self
            .scopes
            .last()
            .ok_or_else(|| eval_error(format!("; {}", name), "no axis was selected"))?;
        let axis = scope.axis.clone();
        let matrix = self.daf.get_matrix(&axis, &axis, name)?;
        if matrix.element_type() != ElementType::Bool {
            return Err(eval_error(
                format!("; {} = {}", name, entry),
                format!("a square mask matrix must be boolean, not {}", matrix.element_type()),
            ));
        }
        let position = self
            .daf
            .axis_entry_index(&axis, entry)?
            .ok_or_else(|| eval_error(
                format!("; {} = {}", name, entry),
                format!("the entry: {} is not in the axis: {}", entry, axis),
            ))?;
        let length = matrix.data().ncols();
        let bits: Vec<bool> = (0..length)
            .map(|other| {
                let value = if row {
                    matrix.data().get_f64(position, other)
                } else {
                    matrix.data().get_f64(other, position)
                };
                value != 0.0
            })
            .collect();
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| eval_error(format!("; {}", name), "no axis was selected"))?;
        for (slot, bit) in scope.mask.iter_mut().zip(bits.into_iter()) {
            *slot = *slot && bit;
        }
        Ok(())
    }

    fn op_compare(&mut self, op: CompareOp, value: &str) -> DafResult<()> {
        if let Some(clause) = &mut self.clause {
            let bits = compare_values(&clause.values, op, value, self.query.text())?;
            clause.resolved = Some(match clause.resolved.take() {
                None => bits,
                Some(previous) => previous
                    .into_iter()
                    .zip(bits.into_iter())
                    .map(|(left, right)| left && right)
                    .collect(),
            });
            return Ok(());
        }
        match &self.current {
            Current::Vector { name, data, .. } => {
                let bits = compare_values(data, op, value, self.query.text())?;
                self.current = Current::Vector {
                    name: name.clone(),
                    data: VectorData::Dense(VectorBuf::from(bits)),
                    alias: None,
                };
                Ok(())
            }
            _ => Err(eval_error(
                self.query.text(),
                "a comparison needs a vector value or an open mask clause",
            )),
        }
    }

    fn op_lookup(&mut self, name: &str, default: Option<&StorageScalar>) -> DafResult<()> {
        self.flush_clause()?;
        if !matches!(self.current, Current::None) {
            return Err(eval_error(
                format!(": {}", name),
                "a lookup replaces nothing; the pipeline already has a value",
            ));
        }
        match self.scopes.len() {
            0 => {
                if !self.daf.has_scalar(name)? {
                    if let Some(default) = default {
                        self.current = Current::Scalar(default.clone());
                        return Ok(());
                    }
                }
                self.current = Current::Scalar(self.daf.get_scalar(name)?);
            }
            1 => {
                let scope = &self.scopes[0];
                if !self.daf.has_vector(&scope.axis, name)? {
                    if let Some(default) = default {
                        let count = scope.selected_indices().len();
                        let values = vec![default.clone(); count];
                        let buf = VectorBuf::from_scalars(default.element_type(), &values)
                            .map_err(|reason| eval_error(format!(": {}", name), reason))?;
                        self.current = Current::Vector {
                            name: name.to_string(),
                            data: VectorData::Dense(buf),
                            alias: None,
                        };
                        return Ok(());
                    }
                }
                let vector = self.daf.get_vector(&scope.axis, name)?;
                let data = if scope.is_full() {
                    vector.into_data()
                } else {
                    vector.data().gather(&scope.selected_indices())
                };
                self.current = Current::Vector {
                    name: name.to_string(),
                    data,
                    alias: None,
                };
            }
            _ => {
                let rows_axis = self.scopes[0].axis.clone();
                let columns_axis = self.scopes[1].axis.clone();
                if !self.daf.has_matrix(&rows_axis, &columns_axis, name)? {
                    if let Some(default) = default {
                        let value = default.to_f64().ok_or_else(|| {
                            eval_error(
                                format!(": {}", name),
                                "a matrix default must be numeric",
                            )
                        })?;
                        let nrows = self.scopes[0].selected_indices().len();
                        let ncols = self.scopes[1].selected_indices().len();
                        let buf = NumericBuf::from_f64_vec(
                            ElementType::Float64,
                            vec![value; nrows * ncols],
                        )
                        .unwrap_or_else(|| unreachable!("Float64 always has a buffer"));
                        let dense =
                            DenseMatrix::new(nrows, ncols, MajorOrder::ColumnMajor, buf)
                                .map_err(|reason| eval_error(format!(": {}", name), reason))?;
                        self.current = Current::Matrix(NamedMatrix::new(
                            self.scopes[0].labels(),
                            self.scopes[1].labels(),
                            name,
                            MatrixData::Dense(dense),
                        ));
                        return Ok(());
                    }
                }
                if self
                    .daf
                    .matrix_requires_relayout(&rows_axis, &columns_axis, name)
                    .unwrap_or(false)
                {
                    self.requires_relayout = true;
                }
                let matrix = self.daf.get_matrix(&rows_axis, &columns_axis, name)?;
                let data = if self.scopes[0].is_full() && self.scopes[1].is_full() {
                    matrix.data().clone()
                } else {
                    matrix.data().gather(
                        &self.scopes[0].selected_indices(),
                        &self.scopes[1].selected_indices(),
                    )
                };
                self.current = Current::Matrix(NamedMatrix::new(
                    self.scopes[0].labels(),
                    self.scopes[1].labels(),
                    name,
                    data,
                ));
            }
        }
        Ok(())
    }

    fn op_names(&mut self) -> DafResult<()> {
        self.flush_clause()?;
        let names = match self.scopes.len() {
            0 => self.daf.scalar_names()?,
            1 => self.daf.vector_names(&self.scopes[0].axis)?,
            _ => self
                .daf
                .matrix_names(&self.scopes[0].axis, &self.scopes[1].axis)?,
        };
        self.current = Current::Names(names);
        Ok(())
    }

    fn string_current(&self, operation: &str) -> DafResult<(String, Arc<Vec<String>>)> {
        match &self.current {
            Current::Vector { name, data, .. } => match data.as_strings() {
                Some(values) => Ok((name.clone(), Arc::clone(values))),
                None => Err(eval_error(
                    operation,
                    format!("the vector: {} is not a string vector", name),
                )),
            },
            _ => Err(eval_error(operation, "expected a string vector value")),
        }
    }

    fn op_if_not(&mut self, token: &str) -> DafResult<()> {
        let (name, values) = self.string_current(&format!("! {}", token))?;
        let alias = match &self.current {
            Current::Vector { alias, .. } => alias.clone(),
            _ => None,
        };
        let substituted: Vec<String> = values
            .iter()
            .map(|value| {
                if value.is_empty() {
                    token.to_string()
                } else {
                    value.clone()
                }
            })
            .collect();
        self.current = Current::Vector {
            name,
            data: VectorData::Dense(VectorBuf::from_strings(substituted)),
            alias,
        };
        Ok(())
    }

    fn op_as_axis(&mut self, axis: &str) -> DafResult<()> {
        if let Some(group) = &mut self.group {
            group.alias = Some(axis.to_string());
            return Ok(());
        }
        match &mut self.current {
            Current::Vector { alias, .. } => {
                *alias = Some(axis.to_string());
                Ok(())
            }
            _ => Err(eval_error(
                format!("# {}", axis),
                "as-axis needs a vector value or a pending group-by",
            )),
        }
    }

    fn op_fetch(&mut self, name: &str) -> DafResult<()> {
        let (current_name, values) = self.string_current(&format!("=> {}", name))?;
        let alias = match &self.current {
            Current::Vector { alias, .. } => alias.clone(),
            _ => None,
        };
        let target_axis = alias
            .unwrap_or_else(|| property_axis_name(&current_name).to_string());
        if !self.daf.has_axis(&target_axis)? {
            return Err(eval_error(
                format!("=> {}", name),
                format!("the values of: {} name no known axis: {}", current_name, target_axis),
            ));
        }
        let target = self.daf.get_vector(&target_axis, name)?;
        let mut fetched = Vec::with_capacity(values.len());
        for value in values.iter() {
            if value.is_empty() {
                return Err(eval_error(
                    format!("=> {}", name),
                    format!(
                        "an empty value of: {} has no entry in the axis: {} (use ! to substitute)",
                        current_name, target_axis
                    ),
                ));
            }
            match self.daf.axis_entry_index(&target_axis, value)? {
                Some(position) => fetched.push(target.data().get(position)),
                None => {
                    return Err(eval_error(
                        format!("=> {}", name),
                        format!(
                            "the value: {} of: {} is not an entry of the axis: {}",
                            value, current_name, target_axis
                        ),
                    ))
                }
            }
        }
        let buf = VectorBuf::from_scalars(target.element_type(), &fetched)
            .map_err(|reason| eval_error(format!("=> {}", name), reason))?;
        self.current = Current::Vector {
            name: name.to_string(),
            data: VectorData::Dense(buf),
            alias: None,
        };
        Ok(())
    }

    fn op_group_by(&mut self, name: &str) -> DafResult<()> {
        if !matches!(self.current, Current::Vector { .. }) {
            return Err(eval_error(
                format!("@ {}", name),
                "group-by applies to a vector value",
            ));
        }
        let scope = self.scope(0)?;
        let group_vector = self.daf.get_vector(&scope.axis, name)?;
        let labels = match group_vector.data().as_strings() {
            Some(values) => {
                if scope.is_full() {
                    values.as_ref().clone()
                } else {
                    scope
                        .selected_indices()
                        .into_iter()
                        .map(|index| values[index].clone())
                        .collect()
                }
            }
            None => {
                return Err(eval_error(
                    format!("@ {}", name),
                    format!("the group vector: {} is not a string vector", name),
                ))
            }
        };
        self.group = Some(PendingGroup {
            name: name.to_string(),
            labels,
            alias: None,
        });
        Ok(())
    }

    fn op_count_by(&mut self, name: &str) -> DafResult<()> {
        let (current_name, first_values) = self.string_current(&format!("%# {}", name))?;
        let scope = self.scope(0)?;
        let other = self.daf.get_vector(&scope.axis, name)?;
        let second_values: Vec<String> = match other.data().as_strings() {
            Some(values) => {
                if scope.is_full() {
                    values.as_ref().clone()
                } else {
                    scope
                        .selected_indices()
                        .into_iter()
                        .map(|index| values[index].clone())
                        .collect()
                }
            }
            None => {
                return Err(eval_error(
                    format!("%# {}", name),
                    format!("the vector: {} is not a string vector", name),
                ))
            }
        };

        let entries_of = |property: &str| -> DafResult<Option<Arc<Vec<String>>>> {
            let axis = property_axis_name(property);
            if self.daf.has_axis(axis)? {
                Ok(Some(self.daf.axis_entries(axis)?))
            } else {
                Ok(None)
            }
        };
        let (row_entries, column_entries, counts) = cross_tabulate(
            &first_values,
            &second_values,
            entries_of(&current_name)?,
            entries_of(name)?,
        );
        self.current = Current::Matrix(NamedMatrix::new(
            AxisLabels::new(property_axis_name(&current_name), Arc::new(row_entries)),
            AxisLabels::new(property_axis_name(name), Arc::new(column_entries)),
            format!("{}_by_{}", current_name, name),
            MatrixData::Dense(counts),
        ));
        Ok(())
    }

    fn op_eltwise(&mut self, op: &EltwiseOp) -> DafResult<()> {
        match std::mem::replace(&mut self.current, Current::None) {
            Current::Scalar(value) => {
                let input = value.to_f64().ok_or_else(|| {
                    eval_error("%", "element-wise operations need numeric values")
                })?;
                let output = apply_eltwise(op, &[input])[0];
                self.current = Current::Scalar(StorageScalar::Float64(output));
            }
            Current::Vector { name, data, .. } => {
                let buf = match data.to_dense_buf() {
                    VectorBuf::Numeric(buf) => buf,
                    VectorBuf::String(_) => {
                        return Err(eval_error(
                            "%",
                            format!("the vector: {} is not numeric", name),
                        ))
                    }
                };
                let output = apply_eltwise(op, &buf.to_f64_vec());
                let buf = NumericBuf::from_f64_vec(ElementType::Float64, output)
                    .unwrap_or_else(|| unreachable!("Float64 always has a buffer"));
                self.current = Current::Vector {
                    name,
                    data: VectorData::Dense(VectorBuf::Numeric(buf)),
                    alias: None,
                };
            }
            Current::Matrix(matrix) => {
                let (nrows, ncols) = matrix.shape();
                let mut values = Vec::with_capacity(nrows * ncols);
                for column in 0..ncols {
                    let slice: Vec<f64> = (0..nrows)
                        .map(|row| matrix.data().get_f64(row, column))
                        .collect();
                    values.extend(apply_eltwise(op, &slice));
                }
                let buf = NumericBuf::from_f64_vec(ElementType::Float64, values)
                    .unwrap_or_else(|| unreachable!("Float64 always has a buffer"));
                let dense = DenseMatrix::new(nrows, ncols, MajorOrder::ColumnMajor, buf)
                    .map_err(|reason| eval_error("%", reason))?;
                self.current = Current::Matrix(NamedMatrix::new(
                    matrix.rows().clone(),
                    matrix.columns().clone(),
                    matrix.name(),
                    MatrixData::Dense(dense),
                ));
            }
            other => {
                self.current = other;
                return Err(eval_error(
                    "%",
                    "element-wise operations need a scalar, vector or matrix",
                ));
            }
        }
        Ok(())
    }

    fn op_reduce(&mut self, op: &ReductionOp, default: Option<&StorageScalar>) -> DafResult<()> {
        if let Some(group) = self.group.take() {
            return self.reduce_grouped(group, op, default);
        }
        match std::mem::replace(&mut self.current, Current::None) {
            Current::Vector { name, data, .. } => {
                let buf = match data.to_dense_buf() {
                    VectorBuf::Numeric(buf) => buf,
                    VectorBuf::String(_) => {
                        return Err(eval_error(
                            "%>",
                            format!("the vector: {} is not numeric", name),
                        ))
                    }
                };
                let reduced = op.apply(&buf.to_f64_vec()).or_else(|| {
                    default.and_then(|value| value.to_f64())
                });
                match reduced {
                    Some(value) => self.current = Current::Scalar(StorageScalar::Float64(value)),
                    None => {
                        return Err(eval_error(
                            "%>",
                            "reduction of an empty vector requires a default",
                        ))
                    }
                }
            }
            Current::Matrix(matrix) => {
                check_efficient_action(
                    default_inefficient_action_handler(),
                    "reduce",
                    "matrix",
                    matrix.name(),
                    matrix.data(),
                    MajorAxis::Columns,
                )?;
                let (nrows, ncols) = matrix.shape();
                let mut reduced = Vec::with_capacity(ncols);
                for column in 0..ncols {
                    let slice: Vec<f64> = (0..nrows)
                        .map(|row| matrix.data().get_f64(row, column))
                        .collect();
                    match op.apply(&slice).or_else(|| default.and_then(|v| v.to_f64())) {
                        Some(value) => reduced.push(value),
                        None => {
                            return Err(eval_error(
                                "%>",
                                "reduction of an empty matrix slice requires a default",
                            ))
                        }
                    }
                }
                let buf = NumericBuf::from_f64_vec(ElementType::Float64, reduced)
                    .unwrap_or_else(|| unreachable!("Float64 always has a buffer"));
                // The result is one value per column entry.
                let columns = matrix.columns().clone();
                self.scopes = vec![AxisScope {
                    axis: columns.name().to_string(),
                    entries: Arc::clone(columns.entries()),
                    mask: vec![true; columns.len()],
                }];
                self.current = Current::Vector {
                    name: matrix.name().to_string(),
                    data: VectorData::Dense(VectorBuf::Numeric(buf)),
                    alias: None,
                };
            }
            other => {
                self.current = other;
                return Err(eval_error("%>", "a reduction needs a vector or a matrix"));
            }
        }
        Ok(())
    }

    fn reduce_grouped(
        &mut self,
        group: PendingGroup,
        op: &ReductionOp,
        default: Option<&StorageScalar>,
    ) -> DafResult<()> {
        let (name, buf) = match std::mem::replace(&mut self.current, Current::None) {
            Current::Vector { name, data, .. } => match data.to_dense_buf() {
                VectorBuf::Numeric(buf) => (name, buf),
                VectorBuf::String(_) => {
                    return Err(eval_error(
                        format!("@ {}", group.name),
                        format!("the grouped vector: {} is not numeric", name),
                    ))
                }
            },
            _ => {
                return Err(eval_error(
                    format!("@ {}", group.name),
                    "group-by applies to a vector value",
                ))
            }
        };
        let group_axis = group
            .alias
            .clone()
            .unwrap_or_else(|| property_axis_name(&group.name).to_string());
        if !self.daf.has_axis(&group_axis)? {
            return Err(eval_error(
                format!("@ {}", group.name),
                format!("the group values name no known axis: {}", group_axis),
            ));
        }
        let entries = self.daf.axis_entries(&group_axis)?;
        let mut per_group: Vec<Vec<f64>> = vec![Vec::new(); entries.len()];
        for (index, label) in group.labels.iter().enumerate() {
            if label.is_empty() {
                continue;
            }
            match self.daf.axis_entry_index(&group_axis, label)? {
                Some(position) => per_group[position].push(buf.get_f64(index)),
                None => {
                    return Err(DafError::UnknownGroup {
                        group: label.clone(),
                        group_axis,
                    })
                }
            }
        }
        let mut reduced = Vec::with_capacity(per_group.len());
        for (position, values) in per_group.iter().enumerate() {
            // A group with no members takes the default, never the reduction
            // of nothing (even for reductions defined on an empty slice).
            let value = if values.is_empty() {
                default.and_then(|v| v.to_f64())
            } else {
                op.apply(values)
            };
            match value {
                Some(value) => reduced.push(value),
                None => {
                    return Err(eval_error(
                        format!("@ {}", group.name),
                        format!(
                            "the group: {} is empty and no default was provided",
                            entries[position]
                        ),
                    ))
                }
            }
        }
        let buf = NumericBuf::from_f64_vec(ElementType::Float64, reduced)
            .unwrap_or_else(|| unreachable!("Float64 always has a buffer"));
        self.scopes = vec![AxisScope {
            axis: group_axis,
            mask: vec![true; entries.len()],
            entries,
        }];
        self.current = Current::Vector {
            name,
            data: VectorData::Dense(VectorBuf::Numeric(buf)),
            alias: None,
        };
        Ok(())
    }
}

fn apply_eltwise(op: &EltwiseOp, values: &[f64]) -> Vec<f64> {
    match op {
        EltwiseOp::Abs => values.iter().map(|value| value.abs()).collect(),
        EltwiseOp::Neg => values.iter().map(|value| -value).collect(),
        EltwiseOp::Sqrt => values.iter().map(|value| value.sqrt()).collect(),
        EltwiseOp::Ceil => values.iter().map(|value| value.ceil()).collect(),
        EltwiseOp::Floor => values.iter().map(|value| value.floor()).collect(),
        EltwiseOp::Round => values.iter().map(|value| value.round()).collect(),
        EltwiseOp::Fraction => {
            let total: f64 = values.iter().sum();
            if total == 0.0 {
                vec![0.0; values.len()]
            } else {
                values.iter().map(|value| value / total).collect()
            }
        }
        EltwiseOp::Log { base, eps } => values
            .iter()
            .map(|value| (value + eps).log(*base))
            .collect(),
        EltwiseOp::Clamp { min, max } => values
            .iter()
            .map(|value| {
                let mut value = *value;
                if let Some(min) = min {
                    value = value.max(*min);
                }
                if let Some(max) = max {
                    value = value.min(*max);
                }
                value
            })
            .collect(),
    }
}

fn compare_values(
    data: &VectorData,
    op: CompareOp,
    value: &str,
    query: &str,
) -> DafResult<Vec<bool>> {
    let length = data.len();
    if data.element_type() == ElementType::String {
        let pattern = match op {
            CompareOp::Match | CompareOp::NotMatch => {
                Some(Regex::new(value).map_err(|error| DafError::QueryEvaluationError {
                    operation: query.to_string(),
                    reason: format!("invalid pattern: {}", error),
                })?)
            }
            _ => None,
        };
        return Ok((0..length)
            .map(|index| {
                let element = match data.get(index) {
                    StorageScalar::String(text) => text,
                    other => other.to_string(),
                };
                match (&op, &pattern) {
                    (CompareOp::Equal, _) => element == value,
                    (CompareOp::NotEqual, _) => element != value,
                    (CompareOp::Less, _) => element.as_str() < value,
                    (CompareOp::LessOrEqual, _) => element.as_str() <= value,
                    (CompareOp::Greater, _) => element.as_str() > value,
                    (CompareOp::GreaterOrEqual, _) => element.as_str() >= value,
                    (CompareOp::Match, Some(pattern)) => pattern.is_match(&element),
                    (CompareOp::NotMatch, Some(pattern)) => !pattern.is_match(&element),
                    _ => false,
                }
            })
            .collect());
    }

    let threshold = value
        .parse::<f64>()
        .map_err(|_| DafError::QueryEvaluationError {
            operation: query.to_string(),
            reason: format!("the comparison value: {} is not numeric", value),
        })?;
    let buf = data.to_dense_buf();
    let numeric = buf
        .as_numeric()
        .ok_or_else(|| DafError::QueryEvaluationError {
            operation: query.to_string(),
            reason: "comparison of a non-numeric vector".to_string(),
        })?;
    Ok((0..length)
        .map(|index| {
            let element = numeric.get_f64(index);
            match op {
                CompareOp::Equal => element == threshold,
                CompareOp::NotEqual => element != threshold,
                CompareOp::Less => element < threshold,
                CompareOp::LessOrEqual => element <= threshold,
                CompareOp::Greater => element > threshold,
                CompareOp::GreaterOrEqual => element >= threshold,
                CompareOp::Match | CompareOp::NotMatch => false,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DafWriter, MemoryDaf};

    fn sample() -> MemoryDaf {
        let daf = MemoryDaf::new("query!");
        daf.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        daf.add_axis(
            "cell",
            vec!["c0".into(), "c1".into(), "c2".into(), "c3".into()],
        )
        .unwrap();
        daf.add_axis("type", vec!["B".into(), "T".into()]).unwrap();
        daf.set_vector(
            "cell",
            "type",
            VectorData::from(vec!["T", "T", "B", ""]),
            false,
        )
        .unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![3i64, 5, 7, 9]), false)
            .unwrap();
        daf.set_vector(
            "type",
            "color",
            VectorData::from(vec!["blue", "red"]),
            false,
        )
        .unwrap();
        daf
    }

    fn vector_of(daf: &MemoryDaf, query: &str) -> NamedVector {
        Query::parse(query)
            .unwrap()
            .execute(daf)
            .unwrap()
            .into_vector()
            .unwrap()
    }

    #[test]
    fn test_scalar_lookup() {
        let daf = sample();
        let result = Query::parse(": organism").unwrap().execute(&daf).unwrap();
        assert!(matches!(
            result,
            QueryResult::Scalar(StorageScalar::String(ref value)) if value == "human"
        ));
    }

    #[test]
    fn test_axis_names_result() {
        let daf = sample();
        let result = Query::parse("/ cell").unwrap().execute(&daf).unwrap();
        match result {
            QueryResult::Names(names) => assert_eq!(names, vec!["c0", "c1", "c2", "c3"]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_vector_lookup_with_mask() {
        let daf = sample();
        let ages = vector_of(&daf, "/ cell & type = T : age");
        assert_eq!(ages.len(), 2);
        assert_eq!(ages.data().get(0), StorageScalar::Int64(3));
        assert_eq!(ages.data().get(1), StorageScalar::Int64(5));
        assert_eq!(ages.axis().entries().as_ref(), &vec!["c0", "c1"]);
    }

    #[test]
    fn test_group_by_sum() {
        let daf = sample();
        let sums = vector_of(&daf, "/ cell : age @ type %> Sum");
        assert_eq!(sums.axis().name(), "type");
        assert_eq!(sums.len(), 2);
        assert_eq!(sums.data().get(0), StorageScalar::Float64(7.0)); // B: c2
        assert_eq!(sums.data().get(1), StorageScalar::Float64(8.0)); // T: c0+c1
    }

    #[test]
    fn test_fetch_through_axis() {
        let daf = sample();
        daf.set_vector(
            "cell",
            "type.fixed",
            VectorData::from(vec!["T", "T", "B", "B"]),
            false,
        )
        .unwrap();
        let colors = vector_of(&daf, "/ cell : type.fixed => color");
        assert_eq!(colors.data().get(0), StorageScalar::from("red"));
        assert_eq!(colors.data().get(2), StorageScalar::from("blue"));
    }

    #[test]
    fn test_if_not_substitution_before_fetch() {
        let daf = sample();
        daf.add_axis("kind", vec!["B".into(), "T".into(), "Outlier".into()])
            .unwrap();
        daf.set_vector(
            "kind",
            "score",
            VectorData::from(vec![1.0f64, 2.0, -1.0]),
            false,
        )
        .unwrap();
        let scores = vector_of(&daf, "/ cell : type # kind ! Outlier => score");
        assert_eq!(scores.data().get(3), StorageScalar::Float64(-1.0));
        assert_eq!(scores.data().get(0), StorageScalar::Float64(2.0));
    }

    #[test]
    fn test_if_missing_defaults() {
        let daf = sample();
        let result = Query::parse(": nope ? 17").unwrap().execute(&daf).unwrap();
        assert!(matches!(
            result,
            QueryResult::Scalar(StorageScalar::Int64(17))
        ));
        let filled = vector_of(&daf, "/ cell : nope ? 0.5");
        assert_eq!(filled.len(), 4);
        assert_eq!(filled.data().get(0), StorageScalar::Float64(0.5));
    }

    #[test]
    fn test_eltwise_and_reduce() {
        let daf = sample();
        let result = Query::parse("/ cell : age % Abs %> Max")
            .unwrap()
            .execute(&daf)
            .unwrap();
        assert!(matches!(
            result,
            QueryResult::Scalar(StorageScalar::Float64(value)) if value == 9.0
        ));
    }

    #[test]
    fn test_count_by() {
        let daf = sample();
        daf.set_vector(
            "cell",
            "batch",
            VectorData::from(vec!["b0", "b1", "b0", "b1"]),
            false,
        )
        .unwrap();
        let result = Query::parse("/ cell : type %# batch")
            .unwrap()
            .execute(&daf)
            .unwrap()
            .into_matrix()
            .unwrap();
        assert_eq!(result.rows().entries().as_ref(), &vec!["B", "T"]);
        assert_eq!(result.columns().entries().as_ref(), &vec!["b0", "b1"]);
        assert_eq!(result.data().get_f64(1, 0), 1.0);
        assert_eq!(result.data().get_f64(1, 1), 1.0);
        assert_eq!(result.data().get_f64(0, 0), 1.0);
    }

    #[test]
    fn test_matrix_lookup_and_reduction() {
        let daf = sample();
        daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
        let matrix = crate::types::DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]],
        )
        .unwrap();
        daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
            .unwrap();

        let sums = vector_of(&daf, "/ gene / cell : UMIs %> Sum");
        assert_eq!(sums.axis().name(), "cell");
        assert_eq!(sums.len(), 4);
        assert_eq!(sums.data().get(0), StorageScalar::Float64(6.0));
        assert_eq!(sums.data().get(3), StorageScalar::Float64(12.0));
    }

    #[test]
    fn test_relayout_tracking() {
        let daf = sample();
        daf.add_axis("gene", vec!["g0".into(), "g1".into()]).unwrap();
        let matrix = crate::types::DenseMatrix::from_rows(
            ElementType::UInt8,
            &[vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]],
        )
        .unwrap();
        daf.set_matrix("gene", "cell", "UMIs", MatrixData::Dense(matrix), false)
            .unwrap();
        assert!(!Query::parse("/ gene / cell : UMIs")
            .unwrap()
            .requires_relayout(&daf)
            .unwrap());
        assert!(Query::parse("/ cell / gene : UMIs")
            .unwrap()
            .requires_relayout(&daf)
            .unwrap());
    }

    #[test]
    fn test_errors_carry_context() {
        let daf = sample();
        let error = Query::parse("/ cell : age @ type")
            .unwrap()
            .execute(&daf)
            .unwrap_err();
        assert!(error.to_string().contains("reduction"));

        assert!(matches!(
            Query::parse("/ nope : age").unwrap().execute(&daf),
            Err(DafError::UnknownAxis { .. })
        ));
        assert!(matches!(
            Query::parse("/ cell : age = x").unwrap().execute(&daf),
            Err(DafError::QueryEvaluationError { .. })
        ));
    }

    #[test]
    fn test_regex_match() {
        let daf = sample();
        daf.set_vector(
            "cell",
            "note",
            VectorData::from(vec!["good", "bad", "good enough", ""]),
            false,
        )
        .unwrap();
        let mask = vector_of(&daf, "/ cell : note ~ '^good'");
        assert_eq!(mask.data().get(0), StorageScalar::Bool(true));
        assert_eq!(mask.data().get(1), StorageScalar::Bool(false));
        assert_eq!(mask.data().get(2), StorageScalar::Bool(true));
    }
}
