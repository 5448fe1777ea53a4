#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use organiser::components::event_store::models::{EventList, MutationResponse};
use organiser::components::event_store::{Event, EventDraft, EventId, EventRemote};
use organiser::error::{remote_error, OrganiserResult};
use organiser::utils::time::{parse_date, parse_time};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Remote operations the store can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
}

/// A canned reply for the next call of an operation
pub enum Scripted {
    Respond(MutationResponse),
    Unreachable,
}

#[derive(Default)]
struct Server {
    events: Vec<Event>,
    next_id: u64,
}

/// In-memory stand-in for the organiser service.
///
/// Behaves like the real service unless a reply is scripted, and calls of an
/// operation can be held back until the test releases them.
#[derive(Default)]
pub struct MockRemote {
    server: Mutex<Server>,
    calls: Mutex<Vec<Op>>,
    scripted: Mutex<HashMap<Op, VecDeque<Scripted>>>,
    failing_lists: AtomicUsize,
    gates: Mutex<HashMap<Op, Arc<Semaphore>>>,
}

/// Event record as the service would hand it out
pub fn service_event(id: u64, title: &str, date: &str, time: &str) -> Event {
    let date = parse_date(date).unwrap();
    let time = parse_time(time).unwrap();
    Event {
        id: EventId::from(id),
        title: title.to_string(),
        date,
        time,
        datetime: display_datetime(date, time),
        description: None,
    }
}

fn display_datetime(date: NaiveDate, time: NaiveTime) -> String {
    NaiveDateTime::new(date, time)
        .format("%b %d, %Y, %I:%M %p")
        .to_string()
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with events already stored on the service
    pub fn with_events(events: Vec<Event>) -> Self {
        let remote = Self::new();
        {
            let mut server = remote.server.lock().unwrap();
            server.next_id = events
                .iter()
                .filter_map(|e| e.id.as_str().parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            server.events = events;
        }
        remote
    }

    pub fn script(&self, op: Op, reply: Scripted) {
        self.scripted
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(reply);
    }

    pub fn fail_next_list(&self) {
        self.failing_lists.fetch_add(1, Ordering::SeqCst);
    }

    /// Hold back calls of `op` until `release` is called
    pub fn hold(&self, op: Op) {
        self.gates
            .lock()
            .unwrap()
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let one held call of `op` through
    pub fn release(&self, op: Op) {
        if let Some(gate) = self.gates.lock().unwrap().get(&op) {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<Op> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| **c == op).count()
    }

    /// Wait until `op` has been called `times` times
    pub async fn wait_for(&self, op: Op, times: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(op) < times {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("remote call never arrived");
    }

    pub fn server_events(&self) -> Vec<Event> {
        self.server.lock().unwrap().events.clone()
    }

    async fn enter(&self, op: Op) -> Option<Scripted> {
        self.calls.lock().unwrap().push(op);

        let gate = self.gates.lock().unwrap().get(&op).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        self.scripted
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(|queue| queue.pop_front())
    }

    fn record(id: u64, draft: &EventDraft) -> Option<Event> {
        let date = parse_date(&draft.date)?;
        let time = parse_time(&draft.time)?;
        Some(Event {
            id: EventId::from(id),
            title: draft.title.clone(),
            date,
            time,
            datetime: display_datetime(date, time),
            description: Some(draft.description.clone()).filter(|d| !d.is_empty()),
        })
    }
}

fn scripted_reply(reply: Scripted) -> OrganiserResult<MutationResponse> {
    match reply {
        Scripted::Respond(response) => Ok(response),
        Scripted::Unreachable => Err(remote_error("connection refused")),
    }
}

#[async_trait]
impl EventRemote for MockRemote {
    async fn list(&self) -> OrganiserResult<EventList> {
        self.enter(Op::List).await;

        if self
            .failing_lists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(remote_error("Failed to fetch events: HTTP 500"));
        }

        Ok(EventList {
            events: self.server_events(),
        })
    }

    async fn create(&self, draft: &EventDraft) -> OrganiserResult<MutationResponse> {
        if let Some(reply) = self.enter(Op::Create).await {
            return scripted_reply(reply);
        }

        let mut server = self.server.lock().unwrap();
        server.next_id += 1;
        let id = server.next_id;
        match Self::record(id, draft) {
            Some(event) => {
                server.events.push(event.clone());
                Ok(MutationResponse::ok(Some(event), "Event added successfully!"))
            }
            None => Ok(MutationResponse::failed("Error: invalid date or time")),
        }
    }

    async fn update(&self, id: &EventId, draft: &EventDraft) -> OrganiserResult<MutationResponse> {
        if let Some(reply) = self.enter(Op::Update).await {
            return scripted_reply(reply);
        }

        let mut server = self.server.lock().unwrap();
        let Some(position) = server.events.iter().position(|e| &e.id == id) else {
            return Ok(MutationResponse::failed("Not found"));
        };
        let numeric = id.as_str().parse::<u64>().unwrap_or_default();
        match Self::record(numeric, draft) {
            Some(event) => {
                server.events[position] = event.clone();
                Ok(MutationResponse::ok(Some(event), "Event updated successfully!"))
            }
            None => Ok(MutationResponse::failed("Error: invalid date or time")),
        }
    }

    async fn delete(&self, id: &EventId) -> OrganiserResult<MutationResponse> {
        if let Some(reply) = self.enter(Op::Delete).await {
            return scripted_reply(reply);
        }

        let mut server = self.server.lock().unwrap();
        let before = server.events.len();
        server.events.retain(|e| &e.id != id);
        if server.events.len() == before {
            return Ok(MutationResponse::failed("Not found"));
        }
        Ok(MutationResponse::ok(None, "Event deleted successfully!"))
    }
}
