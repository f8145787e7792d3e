//! The store layer: reader/writer traits and the cached, validated, locked
//! store over a storage backend.

pub mod cache;
pub mod describe;
pub mod reader;
pub mod store;
pub mod writer;

pub use cache::{CacheArtifact, CacheKey, DepKey, StoreCache, VersionTable};
pub use describe::description;
pub use reader::DafReader;
pub use store::{AccessMode, ContainerDaf, DafStore, FilesDaf, MemoryDaf};
pub use writer::DafWriter;
