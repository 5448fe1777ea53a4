use super::models::{EventDraft, EventId, EventList, MutationResponse};
use crate::config::Config;
use crate::error::{remote_error, OrganiserResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

/// Header the organiser service reads the CSRF token from
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// The four capabilities the store needs from the organiser service
#[async_trait]
pub trait EventRemote: Send + Sync {
    async fn list(&self) -> OrganiserResult<EventList>;

    async fn create(&self, draft: &EventDraft) -> OrganiserResult<MutationResponse>;

    async fn update(&self, id: &EventId, draft: &EventDraft) -> OrganiserResult<MutationResponse>;

    async fn delete(&self, id: &EventId) -> OrganiserResult<MutationResponse>;
}

/// JSON-over-HTTP client for the organiser service
#[derive(Clone)]
pub struct HttpEventRemote {
    client: Client,
    events_url: Url,
    csrf_token: String,
}

impl HttpEventRemote {
    pub fn new(config: &Config) -> OrganiserResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| remote_error(&format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            events_url: config.events_url()?,
            csrf_token: config.csrf_token.clone(),
        })
    }

    /// Endpoint under the events URL; each segment is percent-encoded as a
    /// single path segment and the trailing slash is kept
    fn endpoint(&self, segments: &[&str]) -> OrganiserResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(remote_error(&format!("Invalid path segment '{}'", bad)));
        }

        let mut url = self.events_url.clone();
        url.path_segments_mut()
            .map_err(|_| remote_error(&format!("Cannot build endpoints under {}", self.events_url)))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> OrganiserResult<MutationResponse> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(CSRF_HEADER, &self.csrf_token)
            .json(body)
            .send()
            .await
            .map_err(|e| remote_error(&format!("Request failed: {}", e)))?;

        read_mutation(response).await
    }
}

/// Read an add/update/delete response.
///
/// Error statuses are tolerated as long as the body is still the service's
/// envelope, so its message can reach the user.
async fn read_mutation(response: Response) -> OrganiserResult<MutationResponse> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| remote_error(&format!("Failed to read response: {}", e)))?;

    match serde_json::from_str::<MutationResponse>(&body) {
        Ok(parsed) => Ok(parsed),
        Err(_) if !status.is_success() => Err(remote_error(&format!(
            "HTTP {} - {}",
            status, body
        ))),
        Err(e) => Err(remote_error(&format!("Failed to parse response: {}", e))),
    }
}

#[async_trait]
impl EventRemote for HttpEventRemote {
    async fn list(&self) -> OrganiserResult<EventList> {
        debug!("GET {}", self.events_url);

        let response = self
            .client
            .get(self.events_url.clone())
            .send()
            .await
            .map_err(|e| remote_error(&format!("Failed to fetch events: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(remote_error(&format!(
                "Failed to fetch events: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| remote_error(&format!("Failed to parse events response: {}", e)))
    }

    async fn create(&self, draft: &EventDraft) -> OrganiserResult<MutationResponse> {
        self.post(&["add"], draft).await
    }

    async fn update(&self, id: &EventId, draft: &EventDraft) -> OrganiserResult<MutationResponse> {
        self.post(&["update", id.as_str()], draft).await
    }

    async fn delete(&self, id: &EventId) -> OrganiserResult<MutationResponse> {
        self.post(&["delete", id.as_str()], &serde_json::json!({}))
            .await
    }
}
