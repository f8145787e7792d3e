//! Opening a store together with its on-disk ancestry.
//!
//! A store may carry a scalar `base_daf_repository` whose value is the path
//! (relative to the store's own directory) of a parent store. The complete
//! helpers follow that chain to the root and compose the stores with the
//! leaf on top, so the leaf shadows its ancestors.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{DafError, DafResult};
use crate::store::{AccessMode, DafReader, DafWriter, FilesDaf};
use crate::wrappers::{ChainReader, ChainWriter};

/// The scalar naming a store's parent repository.
pub const BASE_REPOSITORY_SCALAR: &str = "base_daf_repository";

fn parent_of(store: &FilesDaf, directory: &Path) -> DafResult<Option<PathBuf>> {
    if !store.has_scalar(BASE_REPOSITORY_SCALAR)? {
        return Ok(None);
    }
    let relative = store.get_scalar(BASE_REPOSITORY_SCALAR)?.to_string();
    Ok(Some(directory.join(relative)))
}

/// Open the ancestry of the store at `path`: the returned list starts at the
/// root and ends with the direct parent of the leaf, all read-only.
fn open_ancestry(path: &Path) -> DafResult<Vec<Arc<dyn DafReader>>> {
    let mut visited = HashSet::new();
    let mut ancestry: Vec<Arc<dyn DafReader>> = Vec::new();
    let mut next = {
        let leaf = FilesDaf::open(path, AccessMode::ReadOnly)?;
        let parent = parent_of(&leaf, path)?;
        visited.insert(normalize(path));
        parent
    };
    while let Some(directory) = next {
        if !visited.insert(normalize(&directory)) {
            return Err(DafError::corrupt(
                directory.display().to_string(),
                "the base repository chain is cyclic",
            ));
        }
        let store = FilesDaf::open(&directory, AccessMode::ReadOnly)?;
        next = parent_of(&store, &directory)?;
        ancestry.insert(0, Arc::new(store));
    }
    Ok(ancestry)
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Open the store at `path` and every ancestor it names, as one read-only
/// chain with the leaf shadowing its ancestors.
pub fn complete_files_chain(path: impl AsRef<Path>) -> DafResult<ChainReader> {
    let path = path.as_ref();
    let mut stores = open_ancestry(path)?;
    stores.push(Arc::new(FilesDaf::open(path, AccessMode::ReadOnly)?));
    ChainReader::new(stores)
}

/// Like [`complete_files_chain`], but only the leaf is writable (mode `r+`);
/// every ancestor stays read-only and mutations land in the leaf.
pub fn complete_files_chain_writer(path: impl AsRef<Path>) -> DafResult<ChainWriter> {
    let path = path.as_ref();
    let ancestry = open_ancestry(path)?;
    let leaf: Arc<dyn DafWriter> = Arc::new(FilesDaf::open(path, AccessMode::ReadWrite)?);
    ChainWriter::new(ancestry, leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StorageScalar, VectorData};
    use tempdir::TempDir;

    fn create_store(path: &Path, name_hint: &str) -> FilesDaf {
        std::fs::create_dir_all(path).unwrap();
        let _ = name_hint;
        FilesDaf::open(path, AccessMode::Truncate).unwrap()
    }

    #[test]
    fn test_complete_chain_resolves_ancestry() {
        let dir = TempDir::new("complete_daf").unwrap();
        let root_dir = dir.path().join("root");
        let leaf_dir = dir.path().join("leaf");

        let root = create_store(&root_dir, "root");
        root.set_scalar("organism", StorageScalar::from("human"), false)
            .unwrap();
        root.add_axis("cell", vec!["c0".into(), "c1".into()]).unwrap();
        root.set_vector("cell", "age", VectorData::from(vec![1u8, 2]), false)
            .unwrap();

        let leaf = create_store(&leaf_dir, "leaf");
        leaf.set_scalar(
            BASE_REPOSITORY_SCALAR,
            StorageScalar::from("../root"),
            false,
        )
        .unwrap();
        leaf.set_scalar("organism", StorageScalar::from("mouse"), false)
            .unwrap();

        let chain = complete_files_chain(&leaf_dir).unwrap();
        // The leaf shadows its ancestor.
        assert_eq!(
            chain.get_scalar("organism").unwrap(),
            StorageScalar::from("mouse")
        );
        // The ancestor's data falls through.
        assert_eq!(chain.get_vector("cell", "age").unwrap().len(), 2);
    }

    #[test]
    fn test_complete_chain_writer_writes_to_leaf() {
        let dir = TempDir::new("complete_daf").unwrap();
        let root_dir = dir.path().join("root");
        let leaf_dir = dir.path().join("leaf");

        let root = create_store(&root_dir, "root");
        root.add_axis("cell", vec!["c0".into()]).unwrap();

        let leaf = create_store(&leaf_dir, "leaf");
        leaf.set_scalar(
            BASE_REPOSITORY_SCALAR,
            StorageScalar::from("../root"),
            false,
        )
        .unwrap();

        let chain = complete_files_chain_writer(&leaf_dir).unwrap();
        chain
            .set_vector("cell", "score", VectorData::from(vec![0.5f32]), false)
            .unwrap();
        drop(chain);

        let leaf = FilesDaf::open(&leaf_dir, AccessMode::ReadOnly).unwrap();
        assert!(leaf.has_vector("cell", "score").unwrap());
        let root = FilesDaf::open(&root_dir, AccessMode::ReadOnly).unwrap();
        assert!(!root.has_vector("cell", "score").unwrap());
    }

    #[test]
    fn test_cyclic_ancestry_is_detected() {
        let dir = TempDir::new("complete_daf").unwrap();
        let first_dir = dir.path().join("first");
        let second_dir = dir.path().join("second");

        let first = create_store(&first_dir, "first");
        first
            .set_scalar(
                BASE_REPOSITORY_SCALAR,
                StorageScalar::from("../second"),
                false,
            )
            .unwrap();
        let second = create_store(&second_dir, "second");
        second
            .set_scalar(
                BASE_REPOSITORY_SCALAR,
                StorageScalar::from("../first"),
                false,
            )
            .unwrap();

        assert!(matches!(
            complete_files_chain(&first_dir),
            Err(DafError::Corrupt { .. })
        ));
    }
}
