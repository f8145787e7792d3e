use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::layout::relayout;
use crate::query::{Query, QueryResult};
use crate::store::cache::{CacheArtifact, CacheKey, DepKey, StoreCache};
use crate::store::DafReader;
use crate::types::{
    AxisLabels, ElementType, NamedMatrix, NamedVector, StorageScalar, VectorData,
};

/// A key in a view's data selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKey {
    Scalar(String),
    /// External `(axis, name)`.
    Vector(String, String),
    /// External `(rows, columns, name)`.
    Matrix(String, String, String),
}

/// Declarative description of a view: renamed/subsetted axes plus the data
/// exposed through them.
///
/// Selector strings:
/// - for axes: `"="` exposes the same-named base axis unchanged; a bare name
///   renames a base axis; a `/`-query subsets a base axis by a mask or an
///   entry selection.
/// - for data: `"="` exposes the same-named base property; a bare name
///   renames a base property; a query string (starting with `/` or `:`)
///   draws the property from a query over the base; `None` hides it.
///
/// `"*"` as an axis or property name expands to everything the base (or the
/// selected axis) defines; later entries override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct ViewSpec {
    axes: Vec<(String, String)>,
    data: Vec<(ViewKey, Option<String>)>,
}

impl ViewSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(mut self, external: impl Into<String>, selector: impl Into<String>) -> Self {
        self.axes.push((external.into(), selector.into()));
        self
    }

    pub fn scalar(mut self, name: impl Into<String>, selector: impl Into<String>) -> Self {
        self.data
            .push((ViewKey::Scalar(name.into()), Some(selector.into())));
        self
    }

    pub fn hide_scalar(mut self, name: impl Into<String>) -> Self {
        self.data.push((ViewKey::Scalar(name.into()), None));
        self
    }

    pub fn vector(
        mut self,
        axis: impl Into<String>,
        name: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        self.data.push((
            ViewKey::Vector(axis.into(), name.into()),
            Some(selector.into()),
        ));
        self
    }

    pub fn hide_vector(mut self, axis: impl Into<String>, name: impl Into<String>) -> Self {
        self.data
            .push((ViewKey::Vector(axis.into(), name.into()), None));
        self
    }

    pub fn matrix(
        mut self,
        rows_axis: impl Into<String>,
        columns_axis: impl Into<String>,
        name: impl Into<String>,
        selector: impl Into<String>,
    ) -> Self {
        self.data.push((
            ViewKey::Matrix(rows_axis.into(), columns_axis.into(), name.into()),
            Some(selector.into()),
        ));
        self
    }

    pub fn hide_matrix(
        mut self,
        rows_axis: impl Into<String>,
        columns_axis: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.data.push((
            ViewKey::Matrix(rows_axis.into(), columns_axis.into(), name.into()),
            None,
        ));
        self
    }

    fn definition_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (external, selector) in &self.axes {
            external.hash(&mut hasher);
            selector.hash(&mut hasher);
        }
        for (key, selector) in &self.data {
            key.hash(&mut hasher);
            selector.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// A resolved view axis: the base axis it projects plus the selected entry
/// positions (`None` selects the whole axis).
struct ViewAxis {
    internal: String,
    indices: Option<Arc<Vec<usize>>>,
    entries: Arc<Vec<String>>,
    entry_index: HashMap<String, usize>,
}

impl ViewAxis {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn labels(&self, external: &str) -> AxisLabels {
        AxisLabels::new(external, Arc::clone(&self.entries))
    }
}

/// How one exposed property is produced from the base.
#[derive(Debug, Clone)]
enum DataSource {
    /// Base property of this name (possibly the same).
    Property(String),
    /// Result of a query over the base.
    Query(String),
}

/// A read-only projection of a base reader with renamed axes, subsetted
/// axes, and renamed/hidden/query-drawn properties. Exposed values are
/// materialized on first access and cached against the base versions.
pub struct DafView {
    name: String,
    base: Arc<dyn DafReader>,
    axes: BTreeMap<String, ViewAxis>,
    scalars: BTreeMap<String, DataSource>,
    vectors: BTreeMap<(String, String), DataSource>,
    matrices: BTreeMap<(String, String, String), DataSource>,
    cache: StoreCache,
    definition_hash: u64,
}

impl DafView {
    pub fn new(base: Arc<dyn DafReader>, spec: &ViewSpec) -> DafResult<Self> {
        let name = format!("{}.view", base.name());
        Self::with_name(name, base, spec)
    }

    pub fn with_name(
        name: impl Into<String>,
        base: Arc<dyn DafReader>,
        spec: &ViewSpec,
    ) -> DafResult<Self> {
        let definition_hash = spec.definition_hash() | 1;
        let mut view = Self {
            name: name.into(),
            base,
            axes: BTreeMap::new(),
            scalars: BTreeMap::new(),
            vectors: BTreeMap::new(),
            matrices: BTreeMap::new(),
            cache: StoreCache::new(),
            definition_hash,
        };
        view.resolve_axes(spec)?;
        view.resolve_data(spec)?;
        Ok(view)
    }

    fn resolve_axes(&mut self, spec: &ViewSpec) -> DafResult<()> {
        for (external, selector) in &spec.axes {
            if external == "*" {
                if selector != "=" {
                    return Err(DafError::QueryEvaluationError {
                        operation: format!("view axis: {}", external),
                        reason: "a wildcard axis only takes the selector =".to_string(),
                    });
                }
                for internal in self.base.axis_names()? {
                    let axis = self.full_axis(&internal)?;
                    self.axes.insert(internal, axis);
                }
                continue;
            }
            let axis = if selector == "=" {
                self.full_axis(external)?
            } else if selector.trim_start().starts_with('/') {
                self.queried_axis(selector)?
            } else {
                self.full_axis(selector)?
            };
            self.axes.insert(external.clone(), axis);
        }
        Ok(())
    }

    fn full_axis(&self, internal: &str) -> DafResult<ViewAxis> {
        let entries = self.base.axis_entries(internal)?;
        let entry_index = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.clone(), index))
            .collect();
        Ok(ViewAxis {
            internal: internal.to_string(),
            indices: None,
            entries,
            entry_index,
        })
    }

    fn queried_axis(&self, selector: &str) -> DafResult<ViewAxis> {
        let query = Query::parse(selector)?;
        let internal = query
            .ops()
            .iter()
            .find_map(|op| match op {
                crate::query::QueryOp::Axis(axis) => Some(axis.clone()),
                _ => None,
            })
            .ok_or_else(|| DafError::QueryEvaluationError {
                operation: selector.to_string(),
                reason: "an axis selector query must select an axis".to_string(),
            })?;
        let base_entries = self.base.axis_entries(&internal)?;
        let indices: Vec<usize> = match query.execute(self.base.as_ref())? {
            QueryResult::Names(entries) => {
                let mut indices = Vec::with_capacity(entries.len());
                for entry in &entries {
                    match self.base.axis_entry_index(&internal, entry)? {
                        Some(index) => indices.push(index),
                        None => {
                            return Err(DafError::QueryEvaluationError {
                                operation: selector.to_string(),
                                reason: format!(
                                    "the entry: {} is not in the axis: {}",
                                    entry, internal
                                ),
                            })
                        }
                    }
                }
                indices
            }
            QueryResult::Vector(vector) => {
                if vector.element_type() != ElementType::Bool
                    || vector.len() != base_entries.len()
                {
                    return Err(DafError::QueryEvaluationError {
                        operation: selector.to_string(),
                        reason: "an axis selector query must produce entries or a full mask"
                            .to_string(),
                    });
                }
                (0..vector.len())
                    .filter(|&index| {
                        matches!(vector.data().get(index), StorageScalar::Bool(true))
                    })
                    .collect()
            }
            other => {
                return Err(DafError::QueryEvaluationError {
                    operation: selector.to_string(),
                    reason: format!(
                        "an axis selector query must produce entries or a mask, not a {}",
                        other.kind()
                    ),
                })
            }
        };
        let entries: Arc<Vec<String>> = Arc::new(
            indices
                .iter()
                .map(|&index| base_entries[index].clone())
                .collect(),
        );
        let entry_index = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.clone(), index))
            .collect();
        Ok(ViewAxis {
            internal,
            indices: Some(Arc::new(indices)),
            entries,
            entry_index,
        })
    }

    fn view_axis(&self, external: &str) -> DafResult<&ViewAxis> {
        self.axes.get(external).ok_or_else(|| DafError::UnknownAxis {
            daf: self.name.clone(),
            axis: external.to_string(),
        })
    }

    fn source_of(selector: &str) -> DataSource {
        let trimmed = selector.trim_start();
        if trimmed.starts_with('/') || trimmed.starts_with(':') {
            DataSource::Query(selector.to_string())
        } else {
            DataSource::Property(selector.to_string())
        }
    }

    fn resolve_data(&mut self, spec: &ViewSpec) -> DafResult<()> {
        for (key, selector) in &spec.data {
            match key {
                ViewKey::Scalar(name) => {
                    if name == "*" {
                        match selector {
                            None => self.scalars.clear(),
                            Some(selector) if selector == "=" => {
                                for base_name in self.base.scalar_names()? {
                                    self.scalars
                                        .insert(base_name.clone(), DataSource::Property(base_name));
                                }
                            }
                            Some(_) => {
                                return Err(DafError::QueryEvaluationError {
                                    operation: "view scalar: *".to_string(),
                                    reason: "a wildcard only takes the selector =".to_string(),
                                })
                            }
                        }
                        continue;
                    }
                    match selector {
                        None => {
                            self.scalars.remove(name);
                        }
                        Some(selector) if selector == "=" => {
                            self.scalars
                                .insert(name.clone(), DataSource::Property(name.clone()));
                        }
                        Some(selector) => {
                            self.scalars.insert(name.clone(), Self::source_of(selector));
                        }
                    }
                }
                ViewKey::Vector(axis, name) => {
                    let internal = self.view_axis(axis)?.internal.clone();
                    if name == "*" {
                        match selector {
                            None => self.vectors.retain(|(a, _), _| a != axis),
                            Some(selector) if selector == "=" => {
                                for base_name in self.base.vector_names(&internal)? {
                                    self.vectors.insert(
                                        (axis.clone(), base_name.clone()),
                                        DataSource::Property(base_name),
                                    );
                                }
                            }
                            Some(_) => {
                                return Err(DafError::QueryEvaluationError {
                                    operation: format!("view vector: {}/*", axis),
                                    reason: "a wildcard only takes the selector =".to_string(),
                                })
                            }
                        }
                        continue;
                    }
                    match selector {
                        None => {
                            self.vectors.remove(&(axis.clone(), name.clone()));
                        }
                        Some(selector) if selector == "=" => {
                            self.vectors.insert(
                                (axis.clone(), name.clone()),
                                DataSource::Property(name.clone()),
                            );
                        }
                        Some(selector) => {
                            self.vectors
                                .insert((axis.clone(), name.clone()), Self::source_of(selector));
                        }
                    }
                }
                ViewKey::Matrix(rows_axis, columns_axis, name) => {
                    let internal_rows = self.view_axis(rows_axis)?.internal.clone();
                    let internal_columns = self.view_axis(columns_axis)?.internal.clone();
                    if name == "*" {
                        match selector {
                            None => self
                                .matrices
                                .retain(|(r, c, _), _| r != rows_axis || c != columns_axis),
                            Some(selector) if selector == "=" => {
                                for base_name in
                                    self.base.matrix_names(&internal_rows, &internal_columns)?
                                {
                                    self.matrices.insert(
                                        (
                                            rows_axis.clone(),
                                            columns_axis.clone(),
                                            base_name.clone(),
                                        ),
                                        DataSource::Property(base_name),
                                    );
                                }
                            }
                            Some(_) => {
                                return Err(DafError::QueryEvaluationError {
                                    operation: format!(
                                        "view matrix: {}/{}/*",
                                        rows_axis, columns_axis
                                    ),
                                    reason: "a wildcard only takes the selector =".to_string(),
                                })
                            }
                        }
                        continue;
                    }
                    let key = (rows_axis.clone(), columns_axis.clone(), name.clone());
                    match selector {
                        None => {
                            self.matrices.remove(&key);
                        }
                        Some(selector) if selector == "=" => {
                            self.matrices
                                .insert(key, DataSource::Property(name.clone()));
                        }
                        Some(selector) => {
                            self.matrices.insert(key, Self::source_of(selector));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn base_version(&self, dep: &DepKey) -> u64 {
        match dep {
            DepKey::Axis(axis) => self.base.axis_version(axis).unwrap_or(u64::MAX),
            DepKey::Vector(axis, name) => {
                self.base.vector_version(axis, name).unwrap_or(u64::MAX)
            }
            DepKey::Matrix(rows_axis, columns_axis, name) => self
                .base
                .matrix_version(rows_axis, columns_axis, name)
                .unwrap_or(u64::MAX),
        }
    }

    fn materialize_vector(&self, external_axis: &str, name: &str) -> DafResult<VectorData> {
        let source = self
            .vectors
            .get(&(external_axis.to_string(), name.to_string()))
            .ok_or_else(|| DafError::UnknownVector {
                daf: self.name.clone(),
                axis: external_axis.to_string(),
                name: name.to_string(),
            })?;
        let axis = self.view_axis(external_axis)?;

        let key = CacheKey::ViewVector(external_axis.to_string(), name.to_string());
        if let Some(CacheArtifact::Vector(data)) =
            self.cache.lookup(&key, |dep| self.base_version(dep))
        {
            return Ok(data);
        }

        let mut deps = vec![(
            DepKey::Axis(axis.internal.clone()),
            self.base_version(&DepKey::Axis(axis.internal.clone())),
        )];
        let data = match source {
            DataSource::Property(base_name) => {
                let dep = DepKey::Vector(axis.internal.clone(), base_name.clone());
                deps.push((dep.clone(), self.base_version(&dep)));
                let vector = self.base.get_vector(&axis.internal, base_name)?;
                match &axis.indices {
                    None => vector.into_data(),
                    Some(indices) => vector.data().gather(indices),
                }
            }
            DataSource::Query(text) => {
                let query = Query::parse(text)?;
                let vector = query.execute(self.base.as_ref())?.into_vector()?;
                let base_length = self.base.axis_length(&axis.internal)?;
                if vector.len() == axis.len() {
                    vector.into_data()
                } else if vector.len() == base_length {
                    match &axis.indices {
                        None => vector.into_data(),
                        Some(indices) => vector.data().gather(indices),
                    }
                } else {
                    return Err(DafError::QueryEvaluationError {
                        operation: text.clone(),
                        reason: format!(
                            "the view vector: {}/{} has {} entries instead of {}",
                            external_axis,
                            name,
                            vector.len(),
                            axis.len()
                        ),
                    });
                }
            }
        };
        self.cache
            .publish(key, CacheArtifact::Vector(data.clone()), deps);
        Ok(data)
    }

    fn listed_matrix_source(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> Option<(&DataSource, bool)> {
        if let Some(source) = self.matrices.get(&(
            rows_axis.to_string(),
            columns_axis.to_string(),
            name.to_string(),
        )) {
            return Some((source, false));
        }
        self.matrices
            .get(&(
                columns_axis.to_string(),
                rows_axis.to_string(),
                name.to_string(),
            ))
            .map(|source| (source, true))
    }

    fn materialize_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<crate::types::MatrixData> {
        let (source, flipped) = self
            .listed_matrix_source(rows_axis, columns_axis, name)
            .ok_or_else(|| DafError::UnknownMatrix {
                daf: self.name.clone(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            })?;
        let (listed_rows, listed_columns) = if flipped {
            (columns_axis, rows_axis)
        } else {
            (rows_axis, columns_axis)
        };
        let rows = self.view_axis(listed_rows)?;
        let columns = self.view_axis(listed_columns)?;

        let key = CacheKey::ViewMatrix(
            listed_rows.to_string(),
            listed_columns.to_string(),
            name.to_string(),
        );
        let cached = match self.cache.lookup(&key, |dep| self.base_version(dep)) {
            Some(CacheArtifact::Matrix(data)) => Some(data),
            _ => None,
        };
        let data = match cached {
            Some(data) => data,
            None => {
                let mut deps = vec![
                    (
                        DepKey::Axis(rows.internal.clone()),
                        self.base_version(&DepKey::Axis(rows.internal.clone())),
                    ),
                    (
                        DepKey::Axis(columns.internal.clone()),
                        self.base_version(&DepKey::Axis(columns.internal.clone())),
                    ),
                ];
                let data = match source {
                    DataSource::Property(base_name) => {
                        let dep = DepKey::Matrix(
                            rows.internal.clone(),
                            columns.internal.clone(),
                            base_name.clone(),
                        );
                        deps.push((dep.clone(), self.base_version(&dep)));
                        let matrix =
                            self.base
                                .get_matrix(&rows.internal, &columns.internal, base_name)?;
                        match (&rows.indices, &columns.indices) {
                            (None, None) => matrix.into_data(),
                            (rows_indices, columns_indices) => {
                                let all_rows: Vec<usize>;
                                let all_columns: Vec<usize>;
                                let rows_slice: &[usize] = match rows_indices {
                                    Some(indices) => indices,
                                    None => {
                                        all_rows = (0..matrix.data().nrows()).collect();
                                        &all_rows
                                    }
                                };
                                let columns_slice: &[usize] = match columns_indices {
                                    Some(indices) => indices,
                                    None => {
                                        all_columns = (0..matrix.data().ncols()).collect();
                                        &all_columns
                                    }
                                };
                                matrix.data().gather(rows_slice, columns_slice)
                            }
                        }
                    }
                    DataSource::Query(text) => {
                        let query = Query::parse(text)?;
                        let matrix = query.execute(self.base.as_ref())?.into_matrix()?;
                        if matrix.shape() != (rows.len(), columns.len()) {
                            return Err(DafError::QueryEvaluationError {
                                operation: text.clone(),
                                reason: format!(
                                    "the view matrix: {}/{}/{} is {}x{} instead of {}x{}",
                                    listed_rows,
                                    listed_columns,
                                    name,
                                    matrix.shape().0,
                                    matrix.shape().1,
                                    rows.len(),
                                    columns.len()
                                ),
                            });
                        }
                        matrix.into_data()
                    }
                };
                self.cache
                    .publish(key, CacheArtifact::Matrix(data.clone()), deps);
                data
            }
        };
        if flipped {
            Ok(relayout(&data.transposed()))
        } else {
            Ok(data)
        }
    }
}

impl DafReader for DafView {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn has_scalar(&self, name: &str) -> DafResult<bool> {
        Ok(self.scalars.contains_key(name))
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        let source = self.scalars.get(name).ok_or_else(|| DafError::UnknownScalar {
            daf: self.name.clone(),
            name: name.to_string(),
        })?;
        let key = CacheKey::ViewScalar(name.to_string());
        if let Some(CacheArtifact::Scalar(value)) =
            self.cache.lookup(&key, |dep| self.base_version(dep))
        {
            return Ok(value);
        }
        let value = match source {
            DataSource::Property(base_name) => self.base.get_scalar(base_name)?,
            DataSource::Query(text) => Query::parse(text)?
                .execute(self.base.as_ref())?
                .into_scalar()?,
        };
        self.cache
            .publish(key, CacheArtifact::Scalar(value.clone()), Vec::new());
        Ok(value)
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        Ok(self.scalars.keys().cloned().collect())
    }

    fn has_axis(&self, axis: &str) -> DafResult<bool> {
        Ok(self.axes.contains_key(axis))
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        Ok(self.axes.keys().cloned().collect())
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        Ok(self.view_axis(axis)?.len())
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        Ok(Arc::clone(&self.view_axis(axis)?.entries))
    }

    fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>> {
        Ok(self.view_axis(axis)?.entry_index.get(entry).copied())
    }

    fn axis_version(&self, axis: &str) -> DafResult<u64> {
        let view_axis = self.view_axis(axis)?;
        Ok(self
            .base
            .axis_version(&view_axis.internal)?
            .wrapping_add(self.definition_hash))
    }

    fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool> {
        self.view_axis(axis)?;
        Ok(self
            .vectors
            .contains_key(&(axis.to_string(), name.to_string())))
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        self.view_axis(axis)?;
        Ok(self
            .vectors
            .keys()
            .filter(|(vector_axis, _)| vector_axis == axis)
            .map(|(_, name)| name.clone())
            .collect())
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector> {
        let data = self.materialize_vector(axis, name)?;
        let labels = self.view_axis(axis)?.labels(axis);
        Ok(NamedVector::new(labels, name, data))
    }

    fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64> {
        let view_axis = self.view_axis(axis)?;
        let base = match self
            .vectors
            .get(&(axis.to_string(), name.to_string()))
        {
            Some(DataSource::Property(base_name)) => {
                self.base.vector_version(&view_axis.internal, base_name)?
            }
            _ => self.base.axis_version(&view_axis.internal)?,
        };
        Ok(base.wrapping_add(self.definition_hash))
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool> {
        self.view_axis(rows_axis)?;
        self.view_axis(columns_axis)?;
        Ok(self
            .listed_matrix_source(rows_axis, columns_axis, name)
            .is_some())
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        self.view_axis(rows_axis)?;
        self.view_axis(columns_axis)?;
        let mut names: Vec<String> = self
            .matrices
            .keys()
            .filter(|(r, c, _)| {
                (r == rows_axis && c == columns_axis) || (r == columns_axis && c == rows_axis)
            })
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn get_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<NamedMatrix> {
        let data = self.materialize_matrix(rows_axis, columns_axis, name)?;
        Ok(NamedMatrix::new(
            self.view_axis(rows_axis)?.labels(rows_axis),
            self.view_axis(columns_axis)?.labels(columns_axis),
            name,
            data,
        ))
    }

    fn matrix_version(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<u64> {
        let rows = self.view_axis(rows_axis)?;
        let columns = self.view_axis(columns_axis)?;
        let base = match self.listed_matrix_source(rows_axis, columns_axis, name) {
            Some((DataSource::Property(base_name), false)) => {
                self.base
                    .matrix_version(&rows.internal, &columns.internal, base_name)?
            }
            Some((DataSource::Property(base_name), true)) => {
                self.base
                    .matrix_version(&columns.internal, &rows.internal, base_name)?
            }
            _ => self
                .base
                .axis_version(&rows.internal)?
                .wrapping_add(self.base.axis_version(&columns.internal)?),
        };
        Ok(base.wrapping_add(self.definition_hash))
    }

    fn matrix_requires_relayout(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<bool> {
        match self.listed_matrix_source(rows_axis, columns_axis, name) {
            Some((_, flipped)) => Ok(flipped),
            None => Err(DafError::UnknownMatrix {
                daf: self.name.clone(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            }),
        }
    }
}
