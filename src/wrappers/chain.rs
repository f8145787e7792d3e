use std::collections::BTreeSet;
use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::store::{DafReader, DafWriter};
use crate::types::{
    ElementType, IndexType, MatrixData, MatrixDataMut, NamedMatrix, NamedVector, StorageScalar,
    VectorData, VectorDataMut,
};

/// Verify that every axis defined by more than one layer has identical
/// entries in identical order. Chains fail fast at construction instead of
/// surfacing disagreements lazily on lookup.
fn validate_chain_axes(stores: &[Arc<dyn DafReader>]) -> DafResult<()> {
    for (later_index, later) in stores.iter().enumerate() {
        for axis in later.axis_names()? {
            for earlier in &stores[..later_index] {
                if !earlier.has_axis(&axis)? {
                    continue;
                }
                let earlier_entries = earlier.axis_entries(&axis)?;
                let later_entries = later.axis_entries(&axis)?;
                if earlier_entries.len() != later_entries.len() {
                    return Err(DafError::ChainAxisMismatch {
                        axis: axis.clone(),
                        earlier: earlier.name(),
                        later: later.name(),
                        reason: format!(
                            "{} entries vs. {} entries",
                            earlier_entries.len(),
                            later_entries.len()
                        ),
                    });
                }
                if earlier_entries != later_entries {
                    return Err(DafError::ChainAxisMismatch {
                        axis: axis.clone(),
                        earlier: earlier.name(),
                        later: later.name(),
                        reason: "different entries".to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn chain_name(stores: &[Arc<dyn DafReader>]) -> String {
    let names: Vec<String> = stores.iter().map(|store| store.name()).collect();
    format!("chain!({})", names.join(";"))
}

/// Read-only composition of layered stores: a lookup walks the layers in
/// reverse, so a later store shadows an earlier one; name enumeration is the
/// union after shadowing.
pub struct ChainReader {
    name: String,
    stores: Vec<Arc<dyn DafReader>>,
}

impl ChainReader {
    pub fn new(stores: Vec<Arc<dyn DafReader>>) -> DafResult<Self> {
        let name = chain_name(&stores);
        Self::with_name(name, stores)
    }

    pub fn with_name(name: impl Into<String>, stores: Vec<Arc<dyn DafReader>>) -> DafResult<Self> {
        validate_chain_axes(&stores)?;
        Ok(Self {
            name: name.into(),
            stores,
        })
    }

    fn layers(&self) -> &[Arc<dyn DafReader>] {
        &self.stores
    }
}

/// Writable composition of layered stores: reads consult the whole chain,
/// while every mutation is directed at the designated writable tail.
pub struct ChainWriter {
    name: String,
    heads: Vec<Arc<dyn DafReader>>,
    tail: Arc<dyn DafWriter>,
    tail_reader: TailReader,
}

impl ChainWriter {
    pub fn new(heads: Vec<Arc<dyn DafReader>>, tail: Arc<dyn DafWriter>) -> DafResult<Self> {
        let mut names: Vec<String> = heads.iter().map(|store| store.name()).collect();
        names.push(tail.name());
        Self::with_name(format!("chain!({})", names.join(";")), heads, tail)
    }

    pub fn with_name(
        name: impl Into<String>,
        heads: Vec<Arc<dyn DafReader>>,
        tail: Arc<dyn DafWriter>,
    ) -> DafResult<Self> {
        let tail_reader = TailReader {
            tail: Arc::clone(&tail),
        };
        {
            let mut all: Vec<Arc<dyn DafReader>> = heads.clone();
            all.push(Arc::new(TailReader {
                tail: Arc::clone(&tail),
            }));
            validate_chain_axes(&all)?;
        }
        Ok(Self {
            name: name.into(),
            heads,
            tail,
            tail_reader,
        })
    }

    pub fn tail(&self) -> &Arc<dyn DafWriter> {
        &self.tail
    }
}

/// Adapter presenting the writable tail as a plain reader layer.
struct TailReader {
    tail: Arc<dyn DafWriter>,
}

macro_rules! delegate_reader_to_tail {
    () => {
        fn name(&self) -> String {
            self.tail.name()
        }

        fn is_read_only(&self) -> bool {
            true
        }

        fn has_scalar(&self, name: &str) -> DafResult<bool> {
            self.tail.has_scalar(name)
        }

        fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
            self.tail.get_scalar(name)
        }

        fn scalar_names(&self) -> DafResult<Vec<String>> {
            self.tail.scalar_names()
        }

        fn has_axis(&self, axis: &str) -> DafResult<bool> {
            self.tail.has_axis(axis)
        }

        fn axis_names(&self) -> DafResult<Vec<String>> {
            self.tail.axis_names()
        }

        fn axis_length(&self, axis: &str) -> DafResult<usize> {
            self.tail.axis_length(axis)
        }

        fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
            self.tail.axis_entries(axis)
        }

        fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>> {
            self.tail.axis_entry_index(axis, entry)
        }

        fn axis_version(&self, axis: &str) -> DafResult<u64> {
            self.tail.axis_version(axis)
        }

        fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool> {
            self.tail.has_vector(axis, name)
        }

        fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
            self.tail.vector_names(axis)
        }

        fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector> {
            self.tail.get_vector(axis, name)
        }

        fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64> {
            self.tail.vector_version(axis, name)
        }

        fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool> {
            self.tail.has_matrix(rows_axis, columns_axis, name)
        }

        fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
            self.tail.matrix_names(rows_axis, columns_axis)
        }

        fn get_matrix(
            &self,
            rows_axis: &str,
            columns_axis: &str,
            name: &str,
        ) -> DafResult<NamedMatrix> {
            self.tail.get_matrix(rows_axis, columns_axis, name)
        }

        fn matrix_version(
            &self,
            rows_axis: &str,
            columns_axis: &str,
            name: &str,
        ) -> DafResult<u64> {
            self.tail.matrix_version(rows_axis, columns_axis, name)
        }

        fn matrix_requires_relayout(
            &self,
            rows_axis: &str,
            columns_axis: &str,
            name: &str,
        ) -> DafResult<bool> {
            self.tail
                .matrix_requires_relayout(rows_axis, columns_axis, name)
        }
    };
}

impl DafReader for TailReader {
    delegate_reader_to_tail!();
}

/// Shared lookup logic over an ordered list of layers (earliest first).
struct Layers<'a> {
    chain_name: &'a str,
    layers: Vec<&'a dyn DafReader>,
}

impl<'a> Layers<'a> {
    fn reversed(&self) -> impl Iterator<Item = &&'a dyn DafReader> {
        self.layers.iter().rev()
    }

    fn has_scalar(&self, name: &str) -> DafResult<bool> {
        for layer in self.reversed() {
            if layer.has_scalar(name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
        for layer in self.reversed() {
            if layer.has_scalar(name)? {
                return layer.get_scalar(name);
            }
        }
        Err(DafError::UnknownScalar {
            daf: self.chain_name.to_string(),
            name: name.to_string(),
        })
    }

    fn scalar_names(&self) -> DafResult<Vec<String>> {
        let mut names = BTreeSet::new();
        for layer in &self.layers {
            names.extend(layer.scalar_names()?);
        }
        Ok(names.into_iter().collect())
    }

    fn has_axis(&self, axis: &str) -> DafResult<bool> {
        for layer in self.reversed() {
            if layer.has_axis(axis)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn axis_names(&self) -> DafResult<Vec<String>> {
        let mut names = BTreeSet::new();
        for layer in &self.layers {
            names.extend(layer.axis_names()?);
        }
        Ok(names.into_iter().collect())
    }

    fn defining_layer(&self, axis: &str) -> DafResult<&'a dyn DafReader> {
        for layer in self.reversed() {
            if layer.has_axis(axis)? {
                return Ok(*layer);
            }
        }
        Err(DafError::UnknownAxis {
            daf: self.chain_name.to_string(),
            axis: axis.to_string(),
        })
    }

    fn axis_length(&self, axis: &str) -> DafResult<usize> {
        self.defining_layer(axis)?.axis_length(axis)
    }

    fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
        self.defining_layer(axis)?.axis_entries(axis)
    }

    fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>> {
        self.defining_layer(axis)?.axis_entry_index(axis, entry)
    }

    fn axis_version(&self, axis: &str) -> DafResult<u64> {
        let mut version = 0;
        let mut found = false;
        for layer in &self.layers {
            if layer.has_axis(axis)? {
                version += layer.axis_version(axis)?;
                found = true;
            }
        }
        if found {
            Ok(version)
        } else {
            Err(DafError::UnknownAxis {
                daf: self.chain_name.to_string(),
                axis: axis.to_string(),
            })
        }
    }

    fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool> {
        self.defining_layer(axis)?;
        for layer in self.reversed() {
            if layer.has_axis(axis)? && layer.has_vector(axis, name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
        self.defining_layer(axis)?;
        let mut names = BTreeSet::new();
        for layer in &self.layers {
            if layer.has_axis(axis)? {
                names.extend(layer.vector_names(axis)?);
            }
        }
        Ok(names.into_iter().collect())
    }

    fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector> {
        self.defining_layer(axis)?;
        for layer in self.reversed() {
            if layer.has_axis(axis)? && layer.has_vector(axis, name)? {
                return layer.get_vector(axis, name);
            }
        }
        Err(DafError::UnknownVector {
            daf: self.chain_name.to_string(),
            axis: axis.to_string(),
            name: name.to_string(),
        })
    }

    fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64> {
        self.defining_layer(axis)?;
        let mut version = 0;
        for layer in &self.layers {
            if layer.has_axis(axis)? && layer.has_vector(axis, name)? {
                version += layer.vector_version(axis, name)?;
            }
        }
        Ok(version)
    }

    fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool> {
        self.defining_layer(rows_axis)?;
        self.defining_layer(columns_axis)?;
        for layer in self.reversed() {
            if layer.has_axis(rows_axis)?
                && layer.has_axis(columns_axis)?
                && layer.has_matrix(rows_axis, columns_axis, name)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
        self.defining_layer(rows_axis)?;
        self.defining_layer(columns_axis)?;
        let mut names = BTreeSet::new();
        for layer in &self.layers {
            if layer.has_axis(rows_axis)? && layer.has_axis(columns_axis)? {
                names.extend(layer.matrix_names(rows_axis, columns_axis)?);
            }
        }
        Ok(names.into_iter().collect())
    }

    fn get_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<NamedMatrix> {
        self.defining_layer(rows_axis)?;
        self.defining_layer(columns_axis)?;
        for layer in self.reversed() {
            if layer.has_axis(rows_axis)?
                && layer.has_axis(columns_axis)?
                && layer.has_matrix(rows_axis, columns_axis, name)?
            {
                return layer.get_matrix(rows_axis, columns_axis, name);
            }
        }
        Err(DafError::UnknownMatrix {
            daf: self.chain_name.to_string(),
            rows_axis: rows_axis.to_string(),
            columns_axis: columns_axis.to_string(),
            name: name.to_string(),
        })
    }

    fn matrix_version(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<u64> {
        let mut version = 0;
        for layer in &self.layers {
            if layer.has_axis(rows_axis)? && layer.has_axis(columns_axis)? {
                version += layer.matrix_version(rows_axis, columns_axis, name)?;
            }
        }
        Ok(version)
    }

    fn matrix_requires_relayout(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
    ) -> DafResult<bool> {
        for layer in self.reversed() {
            if layer.has_axis(rows_axis)?
                && layer.has_axis(columns_axis)?
                && layer.has_matrix(rows_axis, columns_axis, name)?
            {
                return layer.matrix_requires_relayout(rows_axis, columns_axis, name);
            }
        }
        Err(DafError::UnknownMatrix {
            daf: self.chain_name.to_string(),
            rows_axis: rows_axis.to_string(),
            columns_axis: columns_axis.to_string(),
            name: name.to_string(),
        })
    }
}

macro_rules! delegate_reader_to_layers {
    () => {
        fn has_scalar(&self, name: &str) -> DafResult<bool> {
            self.as_layers().has_scalar(name)
        }

        fn get_scalar(&self, name: &str) -> DafResult<StorageScalar> {
            self.as_layers().get_scalar(name)
        }

        fn scalar_names(&self) -> DafResult<Vec<String>> {
            self.as_layers().scalar_names()
        }

        fn has_axis(&self, axis: &str) -> DafResult<bool> {
            self.as_layers().has_axis(axis)
        }

        fn axis_names(&self) -> DafResult<Vec<String>> {
            self.as_layers().axis_names()
        }

        fn axis_length(&self, axis: &str) -> DafResult<usize> {
            self.as_layers().axis_length(axis)
        }

        fn axis_entries(&self, axis: &str) -> DafResult<Arc<Vec<String>>> {
            self.as_layers().axis_entries(axis)
        }

        fn axis_entry_index(&self, axis: &str, entry: &str) -> DafResult<Option<usize>> {
            self.as_layers().axis_entry_index(axis, entry)
        }

        fn axis_version(&self, axis: &str) -> DafResult<u64> {
            self.as_layers().axis_version(axis)
        }

        fn has_vector(&self, axis: &str, name: &str) -> DafResult<bool> {
            self.as_layers().has_vector(axis, name)
        }

        fn vector_names(&self, axis: &str) -> DafResult<Vec<String>> {
            self.as_layers().vector_names(axis)
        }

        fn get_vector(&self, axis: &str, name: &str) -> DafResult<NamedVector> {
            self.as_layers().get_vector(axis, name)
        }

        fn vector_version(&self, axis: &str, name: &str) -> DafResult<u64> {
            self.as_layers().vector_version(axis, name)
        }

        fn has_matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> DafResult<bool> {
            self.as_layers().has_matrix(rows_axis, columns_axis, name)
        }

        fn matrix_names(&self, rows_axis: &str, columns_axis: &str) -> DafResult<Vec<String>> {
            self.as_layers().matrix_names(rows_axis, columns_axis)
        }

        fn get_matrix(
            &self,
            rows_axis: &str,
            columns_axis: &str,
            name: &str,
        ) -> DafResult<NamedMatrix> {
            self.as_layers().get_matrix(rows_axis, columns_axis, name)
        }

        fn matrix_version(
            &self,
            rows_axis: &str,
            columns_axis: &str,
            name: &str,
        ) -> DafResult<u64> {
            self.as_layers().matrix_version(rows_axis, columns_axis, name)
        }

        fn matrix_requires_relayout(
            &self,
            rows_axis: &str,
            columns_axis: &str,
            name: &str,
        ) -> DafResult<bool> {
            self.as_layers()
                .matrix_requires_relayout(rows_axis, columns_axis, name)
        }
    };
}

impl ChainReader {
    fn as_layers(&self) -> Layers<'_> {
        Layers {
            chain_name: &self.name,
            layers: self.layers().iter().map(|store| store.as_ref()).collect(),
        }
    }
}

impl DafReader for ChainReader {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    delegate_reader_to_layers!();
}

impl ChainWriter {
    fn as_layers(&self) -> Layers<'_> {
        let mut layers: Vec<&dyn DafReader> =
            self.heads.iter().map(|store| store.as_ref()).collect();
        layers.push(&self.tail_reader);
        Layers {
            chain_name: &self.name,
            layers,
        }
    }
}

impl DafReader for ChainWriter {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_read_only(&self) -> bool {
        false
    }

    delegate_reader_to_layers!();
}

impl DafWriter for ChainWriter {
    fn set_scalar(&self, name: &str, value: StorageScalar, overwrite: bool) -> DafResult<()> {
        self.tail.set_scalar(name, value, overwrite)
    }

    fn delete_scalar(&self, name: &str, must_exist: bool) -> DafResult<()> {
        self.tail.delete_scalar(name, must_exist)
    }

    fn add_axis(&self, axis: &str, entries: Vec<String>) -> DafResult<()> {
        self.tail.add_axis(axis, entries)
    }

    fn delete_axis(&self, axis: &str, must_exist: bool) -> DafResult<()> {
        self.tail.delete_axis(axis, must_exist)
    }

    fn set_vector(
        &self,
        axis: &str,
        name: &str,
        data: VectorData,
        overwrite: bool,
    ) -> DafResult<()> {
        self.ensure_tail_axis(axis)?;
        self.tail.set_vector(axis, name, data, overwrite)
    }

    fn delete_vector(&self, axis: &str, name: &str, must_exist: bool) -> DafResult<()> {
        self.tail.delete_vector(axis, name, must_exist)
    }

    fn set_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        data: MatrixData,
        overwrite: bool,
    ) -> DafResult<()> {
        self.ensure_tail_axis(rows_axis)?;
        self.ensure_tail_axis(columns_axis)?;
        self.tail
            .set_matrix(rows_axis, columns_axis, name, data, overwrite)
    }

    fn delete_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        must_exist: bool,
    ) -> DafResult<()> {
        self.tail
            .delete_matrix(rows_axis, columns_axis, name, must_exist)
    }

    fn relayout_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        overwrite: bool,
    ) -> DafResult<()> {
        self.tail
            .relayout_matrix(rows_axis, columns_axis, name, overwrite)
    }

    fn create_dense_vector(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
    ) -> DafResult<VectorDataMut> {
        self.ensure_tail_axis(axis)?;
        self.tail.create_dense_vector(axis, name, element_type)
    }

    fn create_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<VectorDataMut> {
        self.ensure_tail_axis(axis)?;
        self.tail
            .create_sparse_vector(axis, name, element_type, nnz, index_type)
    }

    fn commit_vector(
        &self,
        axis: &str,
        name: &str,
        buffer: VectorDataMut,
        overwrite: bool,
    ) -> DafResult<()> {
        self.tail.commit_vector(axis, name, buffer, overwrite)
    }

    fn create_dense_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
    ) -> DafResult<MatrixDataMut> {
        self.ensure_tail_axis(rows_axis)?;
        self.ensure_tail_axis(columns_axis)?;
        self.tail
            .create_dense_matrix(rows_axis, columns_axis, name, element_type)
    }

    fn create_sparse_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        element_type: ElementType,
        nnz: usize,
        index_type: IndexType,
    ) -> DafResult<MatrixDataMut> {
        self.ensure_tail_axis(rows_axis)?;
        self.ensure_tail_axis(columns_axis)?;
        self.tail.create_sparse_matrix(
            rows_axis,
            columns_axis,
            name,
            element_type,
            nnz,
            index_type,
        )
    }

    fn commit_matrix(
        &self,
        rows_axis: &str,
        columns_axis: &str,
        name: &str,
        buffer: MatrixDataMut,
        overwrite: bool,
    ) -> DafResult<()> {
        self.tail
            .commit_matrix(rows_axis, columns_axis, name, buffer, overwrite)
    }
}

impl ChainWriter {
    /// Writing a property for an axis the tail does not define yet copies the
    /// axis into the tail first, so the tail stays self-describing.
    fn ensure_tail_axis(&self, axis: &str) -> DafResult<()> {
        if self.tail.has_axis(axis)? {
            return Ok(());
        }
        let entries = self.as_layers().axis_entries(axis)?;
        self.tail.add_axis(axis, entries.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDaf;

    fn base() -> Arc<MemoryDaf> {
        let daf = MemoryDaf::new("base!");
        daf.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        daf.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        daf.set_vector("cell", "age", VectorData::from(vec![1u8, 2]), false)
            .unwrap();
        Arc::new(daf)
    }

    #[test]
    fn test_later_shadows_earlier() {
        let earlier = base();
        let later = MemoryDaf::new("later!");
        later
            .set_scalar("organism", StorageScalar::from("mouse"), false)
            .unwrap();
        let chain = ChainReader::new(vec![earlier, Arc::new(later)]).unwrap();
        assert_eq!(
            chain.get_scalar("organism").unwrap(),
            StorageScalar::from("mouse")
        );
        assert_eq!(chain.scalar_names().unwrap(), vec!["organism"]);
    }

    #[test]
    fn test_fall_through_to_earlier() {
        let earlier = base();
        let later: Arc<dyn DafReader> = Arc::new(MemoryDaf::new("later!"));
        let chain = ChainReader::new(vec![earlier, later]).unwrap();
        assert_eq!(
            chain.get_scalar("organism").unwrap(),
            StorageScalar::from("human")
        );
        assert_eq!(chain.get_vector("cell", "age").unwrap().len(), 2);
    }

    #[test]
    fn test_axis_mismatch_fails_fast() {
        let earlier = base();
        let later = MemoryDaf::new("later!");
        later
            .add_axis("cell", vec!["c0".into(), "c1".into(), "c2".into()])
            .unwrap();
        assert!(matches!(
            ChainReader::new(vec![earlier, Arc::new(later)]),
            Err(DafError::ChainAxisMismatch { .. })
        ));
    }

    #[test]
    fn test_writer_chain_directs_writes_to_tail() {
        let earlier = base();
        let tail = Arc::new(MemoryDaf::new("tail!"));
        let chain = ChainWriter::new(vec![earlier.clone()], tail.clone()).unwrap();

        chain
            .set_vector("cell", "score", VectorData::from(vec![0.5f64, 1.5]), false)
            .unwrap();
        // The axis was copied into the tail and the vector lives there.
        assert!(tail.has_vector("cell", "score").unwrap());
        assert!(!earlier.has_vector("cell", "score").unwrap());
        // Reads consult the whole chain.
        assert_eq!(chain.get_vector("cell", "age").unwrap().len(), 2);
        assert_eq!(
            chain.get_scalar("organism").unwrap(),
            StorageScalar::from("human")
        );
    }

    #[test]
    fn test_union_of_names() {
        let earlier = base();
        let later = MemoryDaf::new("later!");
        later.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        later
            .set_vector("cell", "type", VectorData::from(vec!["T", "B"]), false)
            .unwrap();
        let chain = ChainReader::new(vec![earlier, Arc::new(later)]).unwrap();
        assert_eq!(chain.vector_names("cell").unwrap(), vec!["age", "type"]);
    }
}
