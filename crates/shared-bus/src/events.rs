//! # Event Filters
//!
//! Subscribers select the permission events they care about with an
//! [`EventFilter`]. All criteria are combined with AND; an empty list means
//! "any".

use shared_types::{EventVisibility, PermissionEvent, PermissionId, PermissionStatus};
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&PermissionEvent) -> bool + Send + Sync>;

/// Filter for subscribing to permission events.
#[derive(Clone, Default)]
pub struct EventFilter {
    /// Statuses to include. Empty means all statuses.
    pub statuses: Vec<PermissionStatus>,
    /// Visibility to include. `None` means both.
    pub visibility: Option<EventVisibility>,
    /// Permissions to include. Empty means all permissions.
    pub permission_ids: Vec<PermissionId>,
    predicate: Option<Predicate>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific statuses.
    #[must_use]
    pub fn statuses(statuses: Vec<PermissionStatus>) -> Self {
        Self {
            statuses,
            ..Self::default()
        }
    }

    /// Create a filter for externally visible events only.
    #[must_use]
    pub fn external() -> Self {
        Self {
            visibility: Some(EventVisibility::External),
            ..Self::default()
        }
    }

    /// Create a filter for events of specific permissions.
    #[must_use]
    pub fn permissions(permission_ids: Vec<PermissionId>) -> Self {
        Self {
            permission_ids,
            ..Self::default()
        }
    }

    /// Add an arbitrary predicate.
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PermissionEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PermissionEvent) -> bool {
        let status_match = self.statuses.is_empty() || self.statuses.contains(&event.status);

        let visibility_match = self.visibility.map_or(true, |v| v == event.visibility);

        let permission_match =
            self.permission_ids.is_empty() || self.permission_ids.contains(&event.permission_id);

        let predicate_match = self.predicate.as_ref().map_or(true, |p| p(event));

        status_match && visibility_match && permission_match && predicate_match
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFilter")
            .field("statuses", &self.statuses)
            .field("visibility", &self.visibility)
            .field("permission_ids", &self.permission_ids)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(id: &str, status: PermissionStatus) -> PermissionEvent {
        PermissionEvent::new(PermissionId::new(id), status, Utc::now())
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&event("p1", PermissionStatus::Created)));
    }

    #[test]
    fn test_filter_by_status() {
        let filter = EventFilter::statuses(vec![PermissionStatus::Accepted]);
        assert!(filter.matches(&event("p1", PermissionStatus::Accepted)));
        assert!(!filter.matches(&event("p1", PermissionStatus::Rejected)));
    }

    #[test]
    fn test_filter_by_visibility() {
        let filter = EventFilter::external();
        let internal = event("p1", PermissionStatus::Validated)
            .with_visibility(EventVisibility::Internal);
        assert!(!filter.matches(&internal));
        assert!(filter.matches(&event("p1", PermissionStatus::Validated)));
    }

    #[test]
    fn test_filter_criteria_combine() {
        let filter = EventFilter::permissions(vec![PermissionId::new("p1")])
            .with_predicate(|e| e.status.is_terminal());
        assert!(filter.matches(&event("p1", PermissionStatus::Revoked)));
        assert!(!filter.matches(&event("p1", PermissionStatus::Accepted)));
        assert!(!filter.matches(&event("p2", PermissionStatus::Revoked)));
    }
}
