use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::format::FormatBackend;
use crate::types::{MatrixData, StorageScalar, VectorData};

/// In-memory backend: plain maps holding reference-counted immutable values.
/// Overwrites replace the shared value, so previously returned views keep
/// reading the data they were created over (copy-on-write by replacement).
#[derive(Debug, Default)]
pub struct MemoryBackend {
    name: String,
    scalars: HashMap<String, StorageScalar>,
    axes: HashMap<String, Arc<Vec<String>>>,
    vectors: HashMap<String, HashMap<String, VectorData>>,
    matrices: HashMap<(String, String), HashMap<String, MatrixData>>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

impl FormatBackend for MemoryBackend {
    fn backend_kind(&self) -> &'static str {
        "memory"
    }

    fn daf_name(&self) -> &str {
        &self.name
    }

    fn has_scalar(&self, name: &str) -> bool {
        self.scalars.contains_key(name)
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        self.scalars
            .get(name)
            .cloned()
            .ok_or_else(|| DafError::UnknownScalar {
                daf: self.name.clone(),
                name: name.to_string(),
            })
    }

    fn set_scalar(&mut self, name: &str, value: StorageScalar) -> DafResult<()> {
        self.scalars.insert(name.to_string(), value);
        Ok(())
    }

    fn delete_scalar(&mut self, name: &str) -> DafResult<()> {
        self.scalars.remove(name);
        Ok(())
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        Ok(sorted(self.scalars.keys().cloned().collect()))
    }

    fn has_axis(&self, axis: &str) -> bool {
        self.axes.contains_key(axis)
    }

    fn add_axis(&mut self, axis: &str, entries: Arc<Vec<String>>) -> DafResult<()> {
        self.axes.insert(axis.to_string(), entries);
        self.vectors.entry(axis.to_string()).or_default();
        Ok(())
    }

    fn delete_axis(&mut self, axis: &str) -> DafResult<()> {
        self.axes.remove(axis);
        self.vectors.remove(axis);
        self.matrices
            .retain(|(rows, columns), _| rows != axis && columns != axis);
        Ok(())
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        self.axes
            .get(axis)
            .cloned()
            .ok_or_else(|| DafError::UnknownAxis {
                daf: self.name.clone(),
                axis: axis.to_string(),
            })
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        Ok(self.axis_entries(axis)?.len())
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        Ok(sorted(self.axes.keys().cloned().collect()))
    }

    fn has_vector(&self, axis: &str, name: &str) -> bool {
        self.vectors
            .get(axis)
            .map(|per_axis| per_axis.contains_key(name))
            .unwrap_or(false)
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<VectorData> {
        self.vectors
            .get(axis)
            .and_then(|per_axis| per_axis.get(name))
            .cloned()
            .ok_or_else(|| DafError::UnknownVector {
                daf: self.name.clone(),
                axis: axis.to_string(),
                name: name.to_string(),
            })
    }

    fn set_vector(&mut self, axis: &str, name: &str, data: VectorData) -> DafResult<()> {
        self.vectors
            .entry(axis.to_string())
            .or_default()
            .insert(name.to_string(), data);
        Ok(())
    }

    fn delete_vector(&mut self, axis: &str, name: &str) -> DafResult<()> {
        if let Some(per_axis) = self.vectors.get_mut(axis) {
            per_axis.remove(name);
        }
        Ok(())
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        Ok(sorted(
            self.vectors
                .get(axis)
                .map(|per_axis| per_axis.keys().cloned().collect())
                .unwrap_or_default(),
        ))
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> bool {
        self.matrices
            .get(&(rows_axis.to_string(), columns_axis.to_string()))
            .map(|per_pair| per_pair.contains_key(name))
            .unwrap_or(false)
    }

    fn get_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<MatrixData> {
        self.matrices
            .get(&(rows_axis.to_string(), columns_axis.to_string()))
            .and_then(|per_pair| per_pair.get(name))
            .cloned()
            .ok_or_else(|| DafError::UnknownMatrix {
                daf: self.name.clone(),
                rows_axis: rows_axis.to_string(),
                columns_axis: columns_axis.to_string(),
                name: name.to_string(),
            })
    }

    fn set_matrix(
        &mut self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
    ) -> DafResult<()> {
        self.matrices
            .entry((rows_axis.to_string(), columns_axis.to_string()))
            .or_default()
            .insert(name.to_string(), data);
        Ok(())
    }

    fn delete_matrix(&mut self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<()> {
        if let Some(per_pair) = self
            .matrices
            .get_mut(&(rows_axis.to_string(), columns_axis.to_string()))
        {
            per_pair.remove(name);
        }
        Ok(())
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        Ok(sorted(
            self.matrices
                .get(&(rows_axis.to_string(), columns_axis.to_string()))
                .map(|per_pair| per_pair.keys().cloned().collect())
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let mut backend = MemoryBackend::new("test!");
        assert!(!backend.has_scalar("organism"));
        backend
            .set_scalar("organism", StorageScalar::from("human"))
            .unwrap();
        assert!(backend.has_scalar("organism"));
        assert_eq!(
            backend.get_scalar("organism").unwrap(),
            StorageScalar::from("human")
        );
        assert_eq!(backend.scalar_names().unwrap(), vec!["organism"]);
        backend.delete_scalar("organism").unwrap();
        assert!(!backend.has_scalar("organism"));
    }

    #[test]
    fn test_axis_and_vector_round_trip() {
        let mut backend = MemoryBackend::new("test!");
        backend
            .add_axis(
                "cell",
                Arc::new(vec!["c0".into(), "c1".into(), "c2".into()]),
            )
            .unwrap();
        assert_eq!(backend.axis_length("cell").unwrap(), 3);
        backend
            .set_vector("cell", "age", VectorData::from(vec![10i64, 20, 30]))
            .unwrap();
        assert!(backend.has_vector("cell", "age"));
        assert_eq!(backend.get_vector("cell", "age").unwrap().len(), 3);
        assert_eq!(backend.vector_names("cell").unwrap(), vec!["age"]);
    }

    #[test]
    fn test_missing_lookups_report_the_name() {
        let backend = MemoryBackend::new("test!");
        let err = backend.get_scalar("nope").unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
