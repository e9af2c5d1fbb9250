//! # Notification Extension
//!
//! Turns externally visible permission events into
//! [`ConnectionStatusMessage`]s and fans them out. Consumers either take the
//! full stream or the stream of a single connection.

use super::spawn_event_loop;
use crate::domain::errors::HistoryError;
use crate::domain::status_message::ConnectionStatusMessage;
use crate::ports::outbound::PermissionEventHistory;
use futures::stream::{BoxStream, StreamExt};
use shared_bus::Subscription;
use shared_types::{ConnectionId, PermissionEvent, PermissionRequest};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, warn};

/// Status messages buffered for slow consumers.
pub const DEFAULT_STATUS_CAPACITY: usize = 1000;

pub struct NotificationExtension {
    history: Arc<dyn PermissionEventHistory>,
    sender: broadcast::Sender<ConnectionStatusMessage>,
}

impl NotificationExtension {
    #[must_use]
    pub fn new(history: Arc<dyn PermissionEventHistory>) -> Self {
        Self::with_capacity(history, DEFAULT_STATUS_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(history: Arc<dyn PermissionEventHistory>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { history, sender }
    }

    /// Emit the status message for `event`, if it is externally visible.
    pub fn handle(
        &self,
        event: &PermissionEvent,
    ) -> Result<Option<ConnectionStatusMessage>, HistoryError> {
        if !event.is_external() {
            return Ok(None);
        }

        let events = self.history.history(&event.permission_id)?;
        let Some(request) = PermissionRequest::replay(&events) else {
            warn!(
                permission_id = %event.permission_id,
                "No Created event in history, status message skipped"
            );
            return Ok(None);
        };

        let message = ConnectionStatusMessage::from_event(&request, event);
        // No receivers is fine
        let _ = self.sender.send(message.clone());
        Ok(Some(message))
    }

    /// All status messages from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionStatusMessage> {
        self.sender.subscribe()
    }

    /// Status messages of one connection from now on.
    #[must_use]
    pub fn connection_status_stream(
        &self,
        connection_id: ConnectionId,
    ) -> BoxStream<'static, ConnectionStatusMessage> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(move |item| {
                let wanted = connection_id.clone();
                async move {
                    match item {
                        Ok(message) if message.connection_id == wanted => Some(message),
                        Ok(_) => None,
                        Err(BroadcastStreamRecvError::Lagged(count)) => {
                            warn!(
                                connection_id = %wanted,
                                lagged = count,
                                "Status consumer lagged, oldest messages dropped"
                            );
                            None
                        }
                    }
                }
            })
            .boxed()
    }

    /// Run against the bus until shutdown.
    pub fn spawn(
        self: Arc<Self>,
        subscription: Subscription,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        spawn_event_loop("notification", subscription, shutdown, move |event| {
            if let Err(e) = self.handle(&event) {
                error!(
                    permission_id = %event.permission_id,
                    error = %e,
                    "Failed to build connection status message"
                );
            }
        })
    }
}
