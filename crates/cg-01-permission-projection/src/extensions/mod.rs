//! # Event Bus Extensions
//!
//! Subscribers that react to every committed permission event.
//!
//! | Extension | Filter | Effect |
//! |-----------|--------|--------|
//! | `PersistenceExtension` | all events | re-project and upsert the read model |
//! | `NotificationExtension` | `External` events | emit a `ConnectionStatusMessage` |

pub mod notification;
pub mod persistence;

pub use notification::NotificationExtension;
pub use persistence::PersistenceExtension;

use shared_bus::Subscription;
use shared_types::PermissionEvent;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Drive `handler` with every event of `subscription` until the bus closes
/// or `shutdown` flips.
pub(crate) fn spawn_event_loop<F>(
    name: &'static str,
    mut subscription: Subscription,
    mut shutdown: watch::Receiver<bool>,
    mut handler: F,
) -> JoinHandle<()>
where
    F: FnMut(PermissionEvent) + Send + 'static,
{
    tokio::spawn(async move {
        info!(extension = name, "Extension started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = subscription.recv() => match event {
                    Some(event) => handler(event),
                    None => {
                        debug!(extension = name, "Event bus closed");
                        break;
                    }
                },
            }
        }
        info!(extension = name, "Extension stopped");
    })
}
