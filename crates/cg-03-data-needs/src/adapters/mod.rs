//! Catalog adapters.

pub mod memory_catalog;

pub use memory_catalog::InMemoryDataNeedCatalog;
