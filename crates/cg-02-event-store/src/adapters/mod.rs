//! Ledger adapters.
//!
//! - `memory`: [`InMemoryEventLedger`] for tests and ephemeral deployments
//! - `file`: [`FileEventLedger`], append-only JSON lines on disk
//! - `history`: [`LedgerHistory`], the ledger seen through the projection port

pub mod file;
pub mod history;
#[cfg(feature = "locking")]
pub mod lock;
pub mod memory;

pub use file::FileEventLedger;
pub use history::LedgerHistory;
pub use memory::InMemoryEventLedger;
