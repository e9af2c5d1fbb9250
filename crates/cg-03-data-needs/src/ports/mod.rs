//! Ports layer (hexagonal architecture).

pub mod outbound;

pub use outbound::DataNeedCatalog;
