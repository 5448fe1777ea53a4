use super::models::{Event, EventId};
use super::projection::{project, EventView};
use crate::error::{Error, OrganiserResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Generation at which a request was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// The session's local copy of the organiser's events.
///
/// Only the four outcome methods below mutate the collection. Every applied
/// mutation bumps the generation, which lets outcomes of requests issued
/// before a conflicting change be recognised and dropped.
#[derive(Debug)]
pub struct EventStore {
    events: Vec<Event>,
    generation: u64,
    /// Deleted ids and the generation their removal was applied at
    tombstones: HashMap<EventId, u64>,
    highlights: HashMap<EventId, Instant>,
    highlight_for: Duration,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_NOTIFICATION_TTL_MS))
    }
}

impl EventStore {
    pub fn new(highlight_for: Duration) -> Self {
        Self {
            events: Vec::new(),
            generation: 0,
            tombstones: HashMap::new(),
            highlights: HashMap::new(),
            highlight_for,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| &e.id == id)
    }

    /// Record the generation a request goes out at
    pub fn ticket(&self) -> Ticket {
        Ticket(self.generation)
    }

    /// Replace the whole collection with the service's list
    pub fn apply_loaded(&mut self, ticket: Ticket, events: Vec<Event>) -> OrganiserResult<usize> {
        if ticket.0 != self.generation {
            warn!(
                "Dropping event list issued at generation {} (now {})",
                ticket.0, self.generation
            );
            return Err(Error::Stale(
                "events changed while the list was loading".to_string(),
            ));
        }

        let mut deduped: Vec<Event> = Vec::with_capacity(events.len());
        for event in events {
            match deduped.iter_mut().find(|e| e.id == event.id) {
                Some(existing) => *existing = event,
                None => deduped.push(event),
            }
        }

        self.events = deduped;
        self.highlights.clear();
        self.bump();
        debug!("Loaded {} events", self.events.len());
        Ok(self.events.len())
    }

    /// Append a record the service just created
    pub fn apply_created(&mut self, event: Event) {
        self.highlight(&event.id);
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
        self.bump();
    }

    /// Insert or replace a record the service just updated
    pub fn apply_updated(&mut self, ticket: Ticket, event: Event) -> OrganiserResult<()> {
        if let Some(&deleted_at) = self.tombstones.get(&event.id) {
            if deleted_at > ticket.0 {
                warn!("Dropping update of event {}: deleted while in flight", event.id);
                return Err(Error::Stale(format!(
                    "event {} was deleted before the update completed",
                    event.id
                )));
            }
        }

        self.highlight(&event.id);
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => {
                debug!("Updated event {} was not held locally, inserting", event.id);
                self.events.push(event);
            }
        }
        self.bump();
        Ok(())
    }

    /// Remove a record the service just deleted
    pub fn apply_deleted(&mut self, id: &EventId) -> Option<Event> {
        self.bump();
        self.tombstones.insert(id.clone(), self.generation);
        self.highlights.remove(id);

        let position = self.events.iter().position(|e| &e.id == id)?;
        Some(self.events.remove(position))
    }

    /// Forget deletions no outstanding update could conflict with.
    ///
    /// `oldest` is the earliest ticket among updates still in flight.
    pub fn prune_tombstones(&mut self, oldest: Option<Ticket>) {
        match oldest {
            Some(ticket) => self.tombstones.retain(|_, deleted_at| *deleted_at > ticket.0),
            None => self.tombstones.clear(),
        }
    }

    /// Sorted view of the collection with highlights that are still live
    pub fn projection(&self, now: Instant) -> Vec<EventView> {
        let live: Vec<EventId> = self
            .highlights
            .iter()
            .filter(|(_, until)| **until > now)
            .map(|(id, _)| id.clone())
            .collect();
        project(&self.events, &live)
    }

    fn highlight(&mut self, id: &EventId) {
        let now = Instant::now();
        self.highlights.retain(|_, until| *until > now);
        self.highlights.insert(id.clone(), now + self.highlight_for);
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}
