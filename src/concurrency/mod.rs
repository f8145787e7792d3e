//! Concurrency primitives: the re-entrant read/write lock guarding each store.

pub mod reentrant_lock;

pub use reentrant_lock::{ReentrantReadGuard, ReentrantRwLock, ReentrantWriteGuard};
