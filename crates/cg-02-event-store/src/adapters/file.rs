//! # File Ledger
//!
//! Append-only JSON lines, one committed event per line. An append returns
//! only after the line has been written and `sync_data` succeeded.
//!
//! ## Recovery
//!
//! A crash mid-write can leave an unterminated last line. Such a line was
//! never acknowledged, so it is dropped and the file truncated on open. A
//! malformed line followed by more data is corruption and fails the open.
//!
//! ## Locking
//!
//! Appends lock the permission stream first and the writer second. Retention
//! compaction takes the writer only, then updates the streams after releasing
//! it, so the two orders never cross.

use crate::domain::append::AppendCondition;
use crate::domain::errors::{LedgerError, StoreError};
use crate::domain::streams::PermissionStreams;
use crate::ports::outbound::{EventLedger, RetentionCleanup};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared_types::{EventRecordId, PermissionEvent, PermissionId, PermissionRequest, PermissionStatus};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

struct Writer {
    file: File,
    /// Length of the file up to the last durable line.
    len: u64,
}

pub struct FileEventLedger {
    path: PathBuf,
    streams: PermissionStreams,
    writer: Mutex<Writer>,
    #[cfg(feature = "locking")]
    _lock: super::lock::LedgerLock,
}

impl FileEventLedger {
    /// Open or create the ledger at `path` and load its history.
    ///
    /// # Errors
    ///
    /// - `LedgerError::Locked` if another process has the ledger open
    /// - `LedgerError::Corrupt` if a committed line cannot be parsed
    /// - `LedgerError::Io` on filesystem failures
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        #[cfg(feature = "locking")]
        let lock = super::lock::LedgerLock::acquire(&path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let (events, durable_len) = parse_lines(&contents)?;

        if durable_len < contents.len() as u64 {
            warn!(
                path = %path.display(),
                dropped_bytes = contents.len() as u64 - durable_len,
                "Unterminated tail in event ledger dropped"
            );
            file.set_len(durable_len)?;
            file.sync_data()?;
        }

        info!(
            path = %path.display(),
            events = events.len(),
            "Event ledger opened"
        );

        Ok(Self {
            path,
            streams: PermissionStreams::from_events(events),
            writer: Mutex::new(Writer {
                file,
                len: durable_len,
            }),
            #[cfg(feature = "locking")]
            _lock: lock,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, event: &mut PermissionEvent) -> Result<(), StoreError> {
        let mut writer = self.writer.lock();
        // Allocated under the writer so file order matches sequence order
        event.sequence = self.streams.next_sequence();

        let mut line = serde_json::to_vec(event).map_err(LedgerError::from)?;
        line.push(b'\n');

        if let Err(e) = append_durably(&mut writer.file, &line) {
            let len = writer.len;
            if let Err(truncate) = writer.file.set_len(len) {
                warn!(error = %truncate, "Failed to roll back partial ledger write");
            }
            return Err(LedgerError::from(e).into());
        }

        writer.len += line.len() as u64;
        Ok(())
    }

    /// Rewrite the file without the given records.
    fn compact(&self, ids: &HashSet<u64>) -> Result<usize, LedgerError> {
        let mut writer = self.writer.lock();

        let contents = std::fs::read_to_string(&self.path)?;
        let mut kept = String::with_capacity(contents.len());
        let mut removed = 0;
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let event: PermissionEvent = serde_json::from_str(line)?;
            if ids.contains(&event.sequence) {
                removed += 1;
            } else {
                kept.push_str(line);
                kept.push('\n');
            }
        }

        if removed == 0 {
            return Ok(0);
        }

        let temp_path = self.path.with_extension("tmp");
        let mut temp = File::create(&temp_path)?;
        temp.write_all(kept.as_bytes())?;
        temp.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;

        writer.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        writer.len = kept.len() as u64;
        Ok(removed)
    }
}

fn append_durably(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line)?;
    file.sync_data()
}

/// Parse ledger contents. Returns the events and the byte length of the
/// durable prefix.
fn parse_lines(contents: &str) -> Result<(Vec<PermissionEvent>, u64), LedgerError> {
    let mut events = Vec::new();
    let mut offset = 0usize;

    for (index, segment) in contents.split_inclusive('\n').enumerate() {
        if !segment.ends_with('\n') {
            break;
        }
        let line = segment.trim_end();
        if !line.is_empty() {
            let event = serde_json::from_str(line).map_err(|e| LedgerError::Corrupt {
                line: index + 1,
                message: e.to_string(),
            })?;
            events.push(event);
        }
        offset += segment.len();
    }

    Ok((events, offset as u64))
}

impl RetentionCleanup for FileEventLedger {
    fn find_oldest_before(
        &self,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<EventRecordId>, LedgerError> {
        Ok(self.streams.oldest_before(before, limit))
    }

    fn delete_by_ids(&self, ids: &[EventRecordId]) -> Result<usize, LedgerError> {
        let ids: HashSet<u64> = ids.iter().map(|id| id.0).collect();
        let removed = self.compact(&ids)?;
        self.streams.delete(&ids);
        info!(removed, "Event ledger compacted");
        Ok(removed)
    }
}

impl EventLedger for FileEventLedger {
    fn append(
        &self,
        event: PermissionEvent,
        condition: AppendCondition,
    ) -> Result<PermissionEvent, StoreError> {
        self.streams
            .append(event, condition, |event| self.write_line(event))
    }

    fn history(&self, permission_id: &PermissionId) -> Result<Vec<PermissionEvent>, LedgerError> {
        Ok(self.streams.history(permission_id))
    }

    fn permission_ids(&self) -> Result<Vec<PermissionId>, LedgerError> {
        Ok(self.streams.permission_ids())
    }

    fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[PermissionStatus],
    ) -> Result<Vec<PermissionRequest>, LedgerError> {
        Ok(self.streams.find_stale(older_than, statuses))
    }
}
