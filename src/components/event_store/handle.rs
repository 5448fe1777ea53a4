use super::actor::{EventStoreActor, EventStoreActorHandle};
use super::models::{Event, EventDraft, EventId};
use super::projection::EventView;
use super::remote::EventRemote;
use crate::components::notifications::Notifier;
use crate::error::OrganiserResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle for interacting with the event store actor
#[derive(Clone)]
pub struct EventStoreHandle {
    actor_handle: EventStoreActorHandle,
    actor_task: Arc<JoinHandle<()>>,
}

impl EventStoreHandle {
    /// Create a new EventStoreHandle and spawn the actor
    pub fn new(remote: Arc<dyn EventRemote>, notifier: Notifier, highlight_for: Duration) -> Self {
        let (mut actor, handle) = EventStoreActor::new(remote, notifier, highlight_for);

        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            actor_task: Arc::new(actor_task),
        }
    }

    /// Replace the local collection with the service's
    pub async fn load(&self) -> OrganiserResult<usize> {
        self.actor_handle.load().await
    }

    pub async fn create(&self, draft: EventDraft) -> OrganiserResult<Event> {
        self.actor_handle.create(draft).await
    }

    pub async fn update(&self, id: EventId, draft: EventDraft) -> OrganiserResult<Event> {
        self.actor_handle.update(id, draft).await
    }

    /// Delete an event. Asking the user first is up to the caller.
    pub async fn delete(&self, id: EventId) -> OrganiserResult<Option<Event>> {
        self.actor_handle.delete(id).await
    }

    /// Look up the local record, e.g. to pre-fill an edit form
    pub async fn get(&self, id: EventId) -> OrganiserResult<Option<Event>> {
        self.actor_handle.get(id).await
    }

    /// Current projection of the store, sorted by start
    pub async fn events(&self) -> OrganiserResult<Vec<EventView>> {
        self.actor_handle.events().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> OrganiserResult<()> {
        self.actor_handle.shutdown().await
    }

    /// Whether the actor has exited
    pub fn is_finished(&self) -> bool {
        self.actor_task.is_finished()
    }
}
