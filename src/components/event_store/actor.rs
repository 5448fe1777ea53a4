use super::models::{Event, EventDraft, EventId, EventList, MutationResponse};
use super::projection::EventView;
use super::remote::EventRemote;
use super::store::{EventStore, Ticket};
use crate::components::notifications::Notifier;
use crate::error::{component_error, Error, OrganiserResult};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub const LOAD_FAILED: &str = "Failed to load events";
pub const SAVE_FAILED: &str = "Failed to save event";
pub const UPDATE_FAILED: &str = "Failed to update event";
pub const DELETE_FAILED: &str = "Failed to delete event";

const CREATED: &str = "Event added successfully!";
const UPDATED: &str = "Event updated successfully!";
const DELETED: &str = "Event deleted successfully!";

/// Commands that can be sent to the event store actor
pub enum EventStoreCommand {
    Load(oneshot::Sender<OrganiserResult<usize>>),
    Create(EventDraft, oneshot::Sender<OrganiserResult<Event>>),
    Update(EventId, EventDraft, oneshot::Sender<OrganiserResult<Event>>),
    Delete(EventId, oneshot::Sender<OrganiserResult<Option<Event>>>),
    Get(EventId, oneshot::Sender<Option<Event>>),
    Events(oneshot::Sender<Vec<EventView>>),
    Shutdown,
}

/// What a request is for; at most one request per intent is in flight
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Intent {
    Load,
    Create(EventDraft),
    Update(EventId),
    Delete(EventId),
}

/// A finished request, waiting to be applied to the store
enum Completion {
    Loaded {
        ticket: Ticket,
        result: OrganiserResult<EventList>,
        reply: oneshot::Sender<OrganiserResult<usize>>,
    },
    Created {
        result: OrganiserResult<MutationResponse>,
        reply: oneshot::Sender<OrganiserResult<Event>>,
    },
    Updated {
        ticket: Ticket,
        result: OrganiserResult<MutationResponse>,
        reply: oneshot::Sender<OrganiserResult<Event>>,
    },
    Deleted {
        id: EventId,
        result: OrganiserResult<MutationResponse>,
        reply: oneshot::Sender<OrganiserResult<Option<Event>>>,
    },
}

/// Handle for communicating with the event store actor
#[derive(Clone)]
pub struct EventStoreActorHandle {
    command_tx: mpsc::Sender<EventStoreCommand>,
}

impl EventStoreActorHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> EventStoreCommand,
    ) -> OrganiserResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(command(response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| component_error("Response channel closed"))
    }

    pub async fn load(&self) -> OrganiserResult<usize> {
        self.request(EventStoreCommand::Load).await?
    }

    pub async fn create(&self, draft: EventDraft) -> OrganiserResult<Event> {
        self.request(|tx| EventStoreCommand::Create(draft, tx)).await?
    }

    pub async fn update(&self, id: EventId, draft: EventDraft) -> OrganiserResult<Event> {
        self.request(|tx| EventStoreCommand::Update(id, draft, tx))
            .await?
    }

    pub async fn delete(&self, id: EventId) -> OrganiserResult<Option<Event>> {
        self.request(|tx| EventStoreCommand::Delete(id, tx)).await?
    }

    pub async fn get(&self, id: EventId) -> OrganiserResult<Option<Event>> {
        self.request(|tx| EventStoreCommand::Get(id, tx)).await
    }

    pub async fn events(&self) -> OrganiserResult<Vec<EventView>> {
        self.request(EventStoreCommand::Events).await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> OrganiserResult<()> {
        let _ = self.command_tx.send(EventStoreCommand::Shutdown).await;
        Ok(())
    }
}

/// The event store actor: owns the store and applies request outcomes in turn
pub struct EventStoreActor {
    store: EventStore,
    remote: Arc<dyn EventRemote>,
    notifier: Notifier,
    command_rx: mpsc::Receiver<EventStoreCommand>,
    in_flight: FuturesUnordered<BoxFuture<'static, (Intent, Completion)>>,
    pending: HashSet<Intent>,
    /// Tickets of updates still in flight, by id
    update_tickets: HashMap<EventId, Ticket>,
}

impl EventStoreActor {
    /// Create a new actor and return its handle
    pub fn new(
        remote: Arc<dyn EventRemote>,
        notifier: Notifier,
        highlight_for: Duration,
    ) -> (Self, EventStoreActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            store: EventStore::new(highlight_for),
            remote,
            notifier,
            command_rx,
            in_flight: FuturesUnordered::new(),
            pending: HashSet::new(),
            update_tickets: HashMap::new(),
        };

        (actor, EventStoreActorHandle { command_tx })
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Event store actor started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(EventStoreCommand::Shutdown) | None => {
                        info!("Event store actor shutting down");
                        break;
                    }
                    Some(cmd) => self.dispatch(cmd),
                },
                Some((intent, done)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.finish(intent, done);
                }
            }
        }

        // Requests already sent are not cancelled
        while let Some((intent, done)) = self.in_flight.next().await {
            self.finish(intent, done);
        }

        info!("Event store actor shut down");
    }

    fn dispatch(&mut self, cmd: EventStoreCommand) {
        match cmd {
            EventStoreCommand::Load(reply) => {
                let intent = Intent::Load;
                if !self.claim(&intent) {
                    self.reject(reply, "Events are already loading");
                    return;
                }

                let ticket = self.store.ticket();
                let remote = Arc::clone(&self.remote);
                self.in_flight.push(Box::pin(async move {
                    let result = remote.list().await;
                    (intent, Completion::Loaded { ticket, result, reply })
                }));
            }
            EventStoreCommand::Create(draft, reply) => {
                if let Err(e) = draft.validate() {
                    self.fail(reply, e);
                    return;
                }
                let intent = Intent::Create(draft.clone());
                if !self.claim(&intent) {
                    self.reject(reply, "This event is already being saved");
                    return;
                }

                let remote = Arc::clone(&self.remote);
                self.in_flight.push(Box::pin(async move {
                    let result = remote.create(&draft).await;
                    (intent, Completion::Created { result, reply })
                }));
            }
            EventStoreCommand::Update(id, draft, reply) => {
                if let Err(e) = draft.validate() {
                    self.fail(reply, e);
                    return;
                }
                let intent = Intent::Update(id.clone());
                if !self.claim(&intent) {
                    self.reject(reply, "This event is already being updated");
                    return;
                }

                let ticket = self.store.ticket();
                self.update_tickets.insert(id.clone(), ticket);
                let remote = Arc::clone(&self.remote);
                self.in_flight.push(Box::pin(async move {
                    let result = remote.update(&id, &draft).await;
                    (intent, Completion::Updated { ticket, result, reply })
                }));
            }
            EventStoreCommand::Delete(id, reply) => {
                let intent = Intent::Delete(id.clone());
                if !self.claim(&intent) {
                    self.reject(reply, "This event is already being deleted");
                    return;
                }

                let remote = Arc::clone(&self.remote);
                self.in_flight.push(Box::pin(async move {
                    let result = remote.delete(&id).await;
                    (intent, Completion::Deleted { id, result, reply })
                }));
            }
            EventStoreCommand::Get(id, reply) => {
                let _ = reply.send(self.store.get(&id).cloned());
            }
            EventStoreCommand::Events(reply) => {
                let _ = reply.send(self.store.projection(Instant::now()));
            }
            // Handled by the run loop
            EventStoreCommand::Shutdown => {}
        }
    }

    fn finish(&mut self, intent: Intent, done: Completion) {
        self.pending.remove(&intent);
        if let Intent::Update(id) = &intent {
            self.update_tickets.remove(id);
        }
        self.complete(done);
        self.store
            .prune_tombstones(self.update_tickets.values().min().copied());
    }

    fn complete(&mut self, done: Completion) {
        match done {
            Completion::Loaded {
                ticket,
                result,
                reply,
            } => {
                let outcome = match result {
                    Ok(list) => self.store.apply_loaded(ticket, list.events),
                    Err(e) => {
                        error!("Error fetching events: {}", e);
                        Err(Error::LoadFailed(LOAD_FAILED.to_string()))
                    }
                };
                if let Ok(count) = &outcome {
                    self.notifier.success(format!("Loaded {} events", count));
                }
                self.settle(reply, outcome);
            }
            Completion::Created { result, reply } => {
                let outcome = accepted(result, Error::CreateFailed, SAVE_FAILED).and_then(
                    |(event, message)| {
                        let event =
                            event.ok_or_else(|| Error::CreateFailed(SAVE_FAILED.to_string()))?;
                        debug!("Created event {}", event.id);
                        self.store.apply_created(event.clone());
                        self.notifier.success(message.unwrap_or_else(|| CREATED.to_string()));
                        Ok(event)
                    },
                );
                self.settle(reply, outcome);
            }
            Completion::Updated {
                ticket,
                result,
                reply,
            } => {
                let outcome = accepted(result, Error::UpdateFailed, UPDATE_FAILED).and_then(
                    |(event, message)| {
                        let event =
                            event.ok_or_else(|| Error::UpdateFailed(UPDATE_FAILED.to_string()))?;
                        self.store.apply_updated(ticket, event.clone())?;
                        debug!("Updated event {}", event.id);
                        self.notifier.success(message.unwrap_or_else(|| UPDATED.to_string()));
                        Ok(event)
                    },
                );
                self.settle(reply, outcome);
            }
            Completion::Deleted { id, result, reply } => {
                let outcome = accepted(result, Error::DeleteFailed, DELETE_FAILED).map(
                    |(_, message)| {
                        let removed = self.store.apply_deleted(&id);
                        if removed.is_none() {
                            debug!("Deleted event {} was not held locally", id);
                        }
                        self.notifier.success(message.unwrap_or_else(|| DELETED.to_string()));
                        removed
                    },
                );
                self.settle(reply, outcome);
            }
        }
    }

    fn claim(&mut self, intent: &Intent) -> bool {
        if self.pending.contains(intent) {
            warn!("Rejecting duplicate request: {:?}", intent);
            return false;
        }
        self.pending.insert(intent.clone());
        true
    }

    fn reject<T>(&self, reply: oneshot::Sender<OrganiserResult<T>>, message: &str) {
        self.fail(reply, Error::InFlight(message.to_string()));
    }

    fn fail<T>(&self, reply: oneshot::Sender<OrganiserResult<T>>, error: Error) {
        self.settle(reply, Err(error));
    }

    /// Report a failed outcome to the user and hand the outcome to the caller
    fn settle<T>(&self, reply: oneshot::Sender<OrganiserResult<T>>, outcome: OrganiserResult<T>) {
        if let Err(e) = &outcome {
            self.notifier.error(e.to_string());
        }
        // The caller may have gone away; the store is already up to date
        let _ = reply.send(outcome);
    }
}

/// Unpack a mutation response, surfacing the service's message on failure
fn accepted(
    result: OrganiserResult<MutationResponse>,
    failed: fn(String) -> Error,
    fallback: &str,
) -> OrganiserResult<(Option<Event>, Option<String>)> {
    match result {
        Ok(response) => {
            let message = response.message.filter(|m| !m.trim().is_empty());
            if response.success {
                Ok((response.event, message))
            } else {
                Err(failed(message.unwrap_or_else(|| fallback.to_string())))
            }
        }
        Err(e) => {
            error!("{}: {}", fallback, e);
            Err(failed(fallback.to_string()))
        }
    }
}
