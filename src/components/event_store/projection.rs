use super::models::{Event, EventId};
use std::fmt::Write;

/// Placeholder rendered when there is nothing scheduled
pub const EMPTY_LIST_MESSAGE: &str =
    "No events scheduled. Use \"add\" to create one.";

/// A row of the rendered event list
#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    pub id: EventId,
    pub title: String,
    pub datetime: String,
    pub description: Option<String>,
    /// Recently created or updated
    pub highlighted: bool,
}

/// Sort the store's events by start date and time.
///
/// The sort is stable, so events starting at the same moment keep the order
/// they have in the store.
pub fn project(events: &[Event], highlighted: &[EventId]) -> Vec<EventView> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|event| event.starts_at());

    sorted
        .into_iter()
        .map(|event| EventView {
            id: event.id.clone(),
            title: event.title.clone(),
            datetime: event.datetime.clone(),
            description: event.description.clone(),
            highlighted: highlighted.contains(&event.id),
        })
        .collect()
}

/// Render the projection as console text
pub fn render(views: &[EventView]) -> String {
    if views.is_empty() {
        return format!("{}\n", EMPTY_LIST_MESSAGE);
    }

    let mut out = String::new();
    for view in views {
        let marker = if view.highlighted { "*" } else { " " };
        let _ = writeln!(out, "{} [{}] {} - {}", marker, view.id, view.title, view.datetime);
        if let Some(description) = &view.description {
            let _ = writeln!(out, "      {}", description);
        }
    }
    out
}
