use crate::error::{Error, OrganiserResult};
use crate::utils::time::{serde_date, serde_time};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Message shown when a draft misses a required field
pub const MISSING_FIELDS_MESSAGE: &str = "Please fill in all required fields";

/// Identifier assigned by the organiser service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // The service hands out integers, but the id stays opaque to us
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => EventId(n.to_string()),
            RawId::Text(s) => EventId(s),
        })
    }
}

/// A scheduled event as returned by the organiser service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(with = "serde_date")]
    pub date: NaiveDate,
    #[serde(with = "serde_time")]
    pub time: NaiveTime,
    /// Display string formatted by the service
    #[serde(default)]
    pub datetime: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub description: Option<String>,
}

impl Event {
    /// Key the projection sorts on
    pub fn starts_at(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.time)
    }

    /// Draft pre-filled from this event, the starting point of an edit
    pub fn to_draft(&self) -> EventDraft {
        EventDraft {
            title: self.title.clone(),
            date: self.date.format(crate::utils::time::DATE_FORMAT).to_string(),
            time: crate::utils::time::format_time(&self.time),
            description: self.description.clone().unwrap_or_default(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Fields a user submits to create or update an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub date: String,
    pub time: String,
    pub description: String,
}

impl EventDraft {
    /// Build a draft from raw form input; title and description are trimmed
    pub fn new(
        title: impl AsRef<str>,
        date: impl Into<String>,
        time: impl Into<String>,
        description: impl AsRef<str>,
    ) -> Self {
        Self {
            title: title.as_ref().trim().to_string(),
            date: date.into(),
            time: time.into(),
            description: description.as_ref().trim().to_string(),
        }
    }

    /// Title, date and time are required
    pub fn validate(&self) -> OrganiserResult<()> {
        if self.title.trim().is_empty() || self.date.is_empty() || self.time.is_empty() {
            return Err(Error::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        }
        Ok(())
    }
}

/// Response body of the list endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventList {
    pub events: Vec<Event>,
}

/// Response body of the add, update and delete endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MutationResponse {
    pub fn ok(event: Option<Event>, message: &str) -> Self {
        Self {
            success: true,
            event,
            message: Some(message.to_string()),
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            success: false,
            event: None,
            message: Some(message.to_string()),
        }
    }
}
