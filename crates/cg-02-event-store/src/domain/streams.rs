//! # Permission Streams
//!
//! In-memory index of committed events, one stream per permission. Each
//! stream has its own lock, so appends to different permissions never wait
//! on each other. The outer map lock is only held to find or insert a stream.

use super::append::{check_append, AppendCondition};
use super::errors::StoreError;
use cg_01_permission_projection::project;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use shared_types::{EventRecordId, PermissionEvent, PermissionId, PermissionRequest, PermissionStatus};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Stream = Arc<Mutex<Vec<PermissionEvent>>>;

pub struct PermissionStreams {
    streams: RwLock<HashMap<PermissionId, Stream>>,
    next_sequence: AtomicU64,
}

impl Default for PermissionStreams {
    fn default() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            next_sequence: AtomicU64::new(1),
        }
    }
}

impl PermissionStreams {
    /// Rebuild from events read back from durable storage.
    pub fn from_events(events: Vec<PermissionEvent>) -> Self {
        let max_sequence = events.iter().map(|e| e.sequence).max().unwrap_or(0);
        let mut map: HashMap<PermissionId, Vec<PermissionEvent>> = HashMap::new();
        for event in events {
            map.entry(event.permission_id.clone()).or_default().push(event);
        }
        Self {
            streams: RwLock::new(
                map.into_iter()
                    .map(|(id, events)| (id, Arc::new(Mutex::new(events))))
                    .collect(),
            ),
            next_sequence: AtomicU64::new(max_sequence + 1),
        }
    }

    fn stream(&self, permission_id: &PermissionId) -> Option<Stream> {
        self.streams.read().get(permission_id).cloned()
    }

    fn stream_or_insert(&self, permission_id: &PermissionId) -> Stream {
        if let Some(stream) = self.stream(permission_id) {
            return stream;
        }
        self.streams
            .write()
            .entry(permission_id.clone())
            .or_default()
            .clone()
    }

    fn snapshot(&self) -> Vec<Stream> {
        self.streams.read().values().cloned().collect()
    }

    /// Guarded append.
    ///
    /// `persist` runs under the permission's lock once the guards passed. It
    /// assigns the sequence (see [`Self::next_sequence`]) and makes the event
    /// durable. The event only becomes visible if `persist` succeeds.
    pub fn append<P>(
        &self,
        mut event: PermissionEvent,
        condition: AppendCondition,
        persist: P,
    ) -> Result<PermissionEvent, StoreError>
    where
        P: FnOnce(&mut PermissionEvent) -> Result<(), StoreError>,
    {
        let stream = self.stream_or_insert(&event.permission_id);
        let mut history = stream.lock();

        check_append(&history, &event, condition)?;

        persist(&mut event)?;
        history.push(event.clone());
        Ok(event)
    }

    /// Allocate the next global sequence number.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub fn history(&self, permission_id: &PermissionId) -> Vec<PermissionEvent> {
        self.stream(permission_id)
            .map(|stream| stream.lock().clone())
            .unwrap_or_default()
    }

    pub fn permission_ids(&self) -> Vec<PermissionId> {
        let streams: Vec<(PermissionId, Stream)> = self
            .streams
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();
        let mut ids: Vec<PermissionId> = streams
            .into_iter()
            .filter(|(_, s)| !s.lock().is_empty())
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Requests whose projected status is in `statuses` and whose latest
    /// event is older than `older_than`.
    pub fn find_stale(
        &self,
        older_than: DateTime<Utc>,
        statuses: &[PermissionStatus],
    ) -> Vec<PermissionRequest> {
        let mut stale: Vec<PermissionRequest> = self
            .snapshot()
            .into_iter()
            .filter_map(|stream| {
                let history = stream.lock();
                let status = project(history.iter())?;
                if !statuses.contains(&status) {
                    return None;
                }
                let request = PermissionRequest::replay(history.iter())?;
                (request.last_updated < older_than).then_some(request)
            })
            .collect();
        stale.sort_by_key(|r| r.last_updated);
        stale
    }

    /// Up to `limit` record ids created before `before`, oldest first.
    pub fn oldest_before(&self, before: DateTime<Utc>, limit: usize) -> Vec<EventRecordId> {
        let mut candidates: Vec<(DateTime<Utc>, u64)> = self
            .snapshot()
            .into_iter()
            .flat_map(|stream| {
                stream
                    .lock()
                    .iter()
                    .filter(|e| e.event_created < before)
                    .map(PermissionEvent::ordering_key)
                    .collect::<Vec<_>>()
            })
            .collect();
        candidates.sort();
        candidates
            .into_iter()
            .take(limit)
            .map(|(_, sequence)| EventRecordId(sequence))
            .collect()
    }

    /// Remove records by id. Returns how many were removed.
    pub fn delete(&self, ids: &HashSet<u64>) -> usize {
        let mut removed = 0;
        for stream in self.snapshot() {
            let mut history = stream.lock();
            let before = history.len();
            history.retain(|e| !ids.contains(&e.sequence));
            removed += before - history.len();
        }
        // Streams emptied here look exactly like never-created ones
        removed
    }
}
