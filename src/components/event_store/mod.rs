mod actor;
mod handle;
pub mod models;
pub mod projection;
pub mod remote;
mod store;

pub use actor::{DELETE_FAILED, LOAD_FAILED, SAVE_FAILED, UPDATE_FAILED};
pub use handle::EventStoreHandle;
pub use models::{Event, EventDraft, EventId};
pub use projection::EventView;
pub use remote::{EventRemote, HttpEventRemote};
pub use store::{EventStore, Ticket};

use crate::config::Config;
use crate::error::{component_error, OrganiserResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::notifications::Notifier;

/// Event store component: the session's copy of the organiser's events
pub struct EventStoreComponent {
    handle: RwLock<Option<EventStoreHandle>>,
    notifier: Notifier,
}

impl EventStoreComponent {
    /// Create a new event store component reporting to the given notifier
    pub fn new(notifier: Notifier) -> Self {
        Self {
            handle: RwLock::new(None),
            notifier,
        }
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<EventStoreHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

#[async_trait]
impl super::Component for EventStoreComponent {
    fn name(&self) -> &'static str {
        "event_store"
    }

    async fn init(&self, config: Arc<RwLock<Config>>) -> OrganiserResult<()> {
        let (remote, highlight_for) = {
            let config_read = config.read().await;
            (
                HttpEventRemote::new(&config_read)?,
                config_read.notification_ttl(),
            )
        };

        let handle = {
            let mut handle_lock = self.handle.write().await;
            match handle_lock.as_ref() {
                Some(handle) => handle.clone(),
                None => {
                    let handle =
                        EventStoreHandle::new(Arc::new(remote), self.notifier.clone(), highlight_for);
                    *handle_lock = Some(handle.clone());
                    handle
                }
            }
        };

        // Initial population; a failure leaves the store empty but usable
        match handle.load().await {
            Ok(count) => info!("Event store ready with {} events", count),
            Err(e) => warn!("Initial event load failed: {}", e),
        }

        Ok(())
    }

    async fn shutdown(&self) -> OrganiserResult<()> {
        let handle_lock = self.handle.read().await;
        match &*handle_lock {
            Some(handle) => handle.shutdown().await,
            None => Err(component_error("Event store was never initialised")),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
