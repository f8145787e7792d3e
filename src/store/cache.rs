use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{MatrixData, StorageScalar, VectorData};

/// A dependency of a cached artifact, with the version it was computed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    Axis(String),
    Vector(String, String),
    Matrix(String, String, String),
}

/// Key of one cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Entry-name to index dictionary of an axis.
    AxisDict(String),
    /// Auto-computed relayout of a matrix stored in the flipped orientation,
    /// keyed by the requested `(rows, columns, name)`.
    Relayout(String, String, String),
    /// A view's materialized scalar.
    ViewScalar(String),
    /// A view's materialized vector, by external `(axis, name)`.
    ViewVector(String, String),
    /// A view's materialized matrix, by external `(rows, columns, name)`.
    ViewMatrix(String, String, String),
}

#[derive(Debug, Clone)]
pub enum CacheArtifact {
    AxisDict(Arc<HashMap<String, usize>>),
    Matrix(MatrixData),
    Vector(VectorData),
    Scalar(StorageScalar),
}

#[derive(Debug)]
struct CacheEntry {
    artifact: CacheArtifact,
    deps: Vec<(DepKey, u64)>,
}

/// Per-store artifact cache with lazy version-based invalidation.
///
/// Every entry records the `(dependency, version)` tuples it was computed
/// from; a lookup re-validates them against the current version table and
/// drops the entry on any mismatch. Published artifacts are immutable, so a
/// hit can be returned outside the mutex.
#[derive(Debug, Default)]
pub struct StoreCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl StoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a valid artifact, evicting it first when any dependency version
    /// moved since it was published.
    pub fn lookup(
        &self,
        key: &CacheKey,
        current_version: impl Fn(&DepKey) -> u64,
    ) -> Option<CacheArtifact> {
        let mut entries = self.entries.lock();
        let valid = match entries.get(key) {
            None => return None,
            Some(entry) => entry
                .deps
                .iter()
                .all(|(dep, version)| current_version(dep) == *version),
        };
        if !valid {
            log::debug!("cache invalidated: {:?}", key);
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.artifact.clone())
    }

    pub fn publish(&self, key: CacheKey, artifact: CacheArtifact, deps: Vec<(DepKey, u64)>) {
        self.entries
            .lock()
            .insert(key, CacheEntry { artifact, deps });
    }

    /// Eagerly drop every entry depending on `dep` (used on deletes, where
    /// lazy invalidation would keep dead names alive).
    pub fn evict_dependents(&self, dep: &DepKey) {
        self.entries
            .lock()
            .retain(|_, entry| !entry.deps.iter().any(|(entry_dep, _)| entry_dep == dep));
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Monotonic version counters per axis and per property.
///
/// Counters survive deletion so that a deleted-then-recreated name can never
/// revalidate a stale cache entry.
#[derive(Debug, Default)]
pub struct VersionTable {
    axes: HashMap<String, u64>,
    vectors: HashMap<(String, String), u64>,
    matrices: HashMap<(String, String, String), u64>,
}

impl VersionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(&self, axis: &str) -> u64 {
        self.axes.get(axis).copied().unwrap_or(0)
    }

    pub fn vector(&self, axis: &str, name: &str) -> u64 {
        self.vectors
            .get(&(axis.to_string(), name.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn matrix(&self, rows_axis: &str, columns_axis: &str, name: &str) -> u64 {
        self.matrices
            .get(&(
                rows_axis.to_string(),
                columns_axis.to_string(),
                name.to_string(),
            ))
            .copied()
            .unwrap_or(0)
    }

    pub fn of(&self, dep: &DepKey) -> u64 {
        match dep {
            DepKey::Axis(axis) => self.axis(axis),
            DepKey::Vector(axis, name) => self.vector(axis, name),
            DepKey::Matrix(rows_axis, columns_axis, name) => {
                self.matrix(rows_axis, columns_axis, name)
            }
        }
    }

    pub fn bump_axis(&mut self, axis: &str) {
        *self.axes.entry(axis.to_string()).or_insert(0) += 1;
    }

    pub fn bump_vector(&mut self, axis: &str, name: &str) {
        *self
            .vectors
            .entry((axis.to_string(), name.to_string()))
            .or_insert(0) += 1;
    }

    /// Bump the matrix in both orientations: overwriting one layout
    /// invalidates any cached rendition of the other.
    pub fn bump_matrix(&mut self, rows_axis: &str, columns_axis: &str, name: &str) {
        for (rows, columns) in [(rows_axis, columns_axis), (columns_axis, rows_axis)] {
            *self
                .matrices
                .entry((rows.to_string(), columns.to_string(), name.to_string()))
                .or_insert(0) += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_start_at_zero_and_bump() {
        let mut versions = VersionTable::new();
        assert_eq!(versions.axis("cell"), 0);
        versions.bump_axis("cell");
        assert_eq!(versions.axis("cell"), 1);
        versions.bump_vector("cell", "age");
        versions.bump_vector("cell", "age");
        assert_eq!(versions.vector("cell", "age"), 2);
    }

    #[test]
    fn test_matrix_bump_covers_both_orientations() {
        let mut versions = VersionTable::new();
        versions.bump_matrix("gene", "cell", "UMIs");
        assert_eq!(versions.matrix("gene", "cell", "UMIs"), 1);
        assert_eq!(versions.matrix("cell", "gene", "UMIs"), 1);
    }

    #[test]
    fn test_cache_hit_and_version_invalidation() {
        let cache = StoreCache::new();
        let mut versions = VersionTable::new();
        versions.bump_axis("cell");

        let dict = Arc::new(HashMap::from([("c0".to_string(), 0usize)]));
        cache.publish(
            CacheKey::AxisDict("cell".into()),
            CacheArtifact::AxisDict(dict),
            vec![(DepKey::Axis("cell".into()), versions.axis("cell"))],
        );

        let hit = cache.lookup(&CacheKey::AxisDict("cell".into()), |dep| versions.of(dep));
        assert!(hit.is_some());

        versions.bump_axis("cell");
        let miss = cache.lookup(&CacheKey::AxisDict("cell".into()), |dep| versions.of(dep));
        assert!(miss.is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_dependents() {
        let cache = StoreCache::new();
        cache.publish(
            CacheKey::Relayout("cell".into(), "gene".into(), "UMIs".into()),
            CacheArtifact::AxisDict(Arc::new(HashMap::new())),
            vec![(
                DepKey::Matrix("gene".into(), "cell".into(), "UMIs".into()),
                1,
            )],
        );
        cache.evict_dependents(&DepKey::Matrix("gene".into(), "cell".into(), "UMIs".into()));
        assert!(cache.is_empty());
    }
}
