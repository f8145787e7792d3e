//! Composition layer: read-only wrappers, chains of layered stores, and
//! renamed/subsetted views.

pub mod chain;
pub mod read_only;
pub mod view;

pub use chain::{ChainReader, ChainWriter};
pub use read_only::{read_only, ReadOnlyDaf};
pub use view::{DafView, ViewKey, ViewSpec};
