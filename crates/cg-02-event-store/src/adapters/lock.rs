//! # Ledger Process Locking
//!
//! Only one process may append to a ledger file. Uses `fs2` (flock on Unix,
//! LockFile on Windows); the lock is released on drop.

use crate::domain::errors::LedgerError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    /// Lock `<ledger>.lock` next to the ledger file.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Locked` if another handle holds the lock.
    pub fn acquire(ledger_path: &Path) -> Result<Self, LedgerError> {
        let path = ledger_path.with_extension("lock");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(LedgerError::Locked { path });
        }

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self { file, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}
