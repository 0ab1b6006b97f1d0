//! HTTP client for the hosted store.
//!
//! This module provides the [`StoreRequester`] struct for querying the store's
//! REST endpoints and its long-poll change feed.

use log::{debug, info};
use mockall::automock;
use reqwest::{Client, RequestBuilder, Response};

use crate::store::{
    EMERGENCY_TABLE, STUDENT_TABLE, TransportError,
    response_structs::{ChangeBatch, EmergencyRow, ProfileRow},
};

/// HTTP client for requesting data from the hosted store.
///
/// Every request carries the project api key both as `apikey` header and as
/// bearer token, which is what the store expects for anonymous project access.
///
/// # Examples
///
/// ```no_run
/// let store_requester = StoreRequester::new("https://project.example.co", "anon-key", 25);
/// let emergencies = store_requester.list_active_emergencies().await?;
/// println!("Emergencies: {:?}", emergencies);
/// ```
pub struct StoreRequester {
    /// Store base url, without trailing slash
    url: String,
    /// Project api key
    api_key: String,
    /// Seconds the change feed may hold a request open before answering empty
    feed_wait: u64,
    /// HTTP client
    client: Client,
}

/// Trait for making requests to the hosted store.
///
/// This trait abstracts the HTTP operations for easier testing with mocks.
#[automock]
pub trait Requester {
    /// Fetches unresolved emergencies, most recent first.
    async fn list_active_emergencies(&self) -> Result<Vec<EmergencyRow>, TransportError>;
    /// Fetches the profile of a student, `None` if the student does not exist.
    async fn get_subject_profile(
        &self,
        subject_ref: &str,
    ) -> Result<Option<ProfileRow>, TransportError>;
    /// Marks an emergency as resolved.
    async fn set_resolved(&self, emergency_id: &str) -> Result<(), TransportError>;
    /// Waits for the next batch of changes on a table.
    ///
    /// Without cursor, the feed starts from the current position.
    async fn poll_changes(
        &self,
        table: &str,
        cursor: Option<String>,
    ) -> Result<ChangeBatch, TransportError>;
    /// Fetches every record of a collection as raw JSON.
    async fn list_records(&self, collection: &str)
    -> Result<Vec<serde_json::Value>, TransportError>;
}

impl StoreRequester {
    /// Create a new [StoreRequester].
    ///
    /// # Arguments
    ///
    /// * `url` - The base URL of the store.
    /// * `api_key` - The project api key.
    /// * `feed_wait` - How long, in seconds, the change feed may hold a request.
    pub fn new(url: &str, api_key: &str, feed_wait: u64) -> Self {
        let client = reqwest::Client::new();
        StoreRequester {
            url: url.to_string(),
            api_key: api_key.to_string(),
            feed_wait,
            client,
        }
    }

    /// Adds the authentication headers to a request.
    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Turns a non-2xx answer into [`TransportError::Rejected`].
    async fn check(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(TransportError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl Requester for StoreRequester {
    /// Request `/rest/v1/emergencies` filtered on `resolved=false`.
    ///
    /// This api call returns a json array of rows:
    /// ```
    /// [
    ///   { id: 12, student_id: 3, location: "Gym", created_at: "2024-03-01T10:00:00+00:00", resolved: false }
    /// ]
    /// ```
    async fn list_active_emergencies(&self) -> Result<Vec<EmergencyRow>, TransportError> {
        let url = format!("{}/rest/v1/{}", &self.url, EMERGENCY_TABLE);
        debug!("request {} for unresolved emergencies", &url);

        let response = self
            .authenticated(self.client.get(&url))
            .query(&[
                ("select", "*"),
                ("resolved", "eq.false"),
                ("order", "created_at.desc"),
            ])
            .send()
            .await?;
        let rows: Vec<EmergencyRow> = Self::check(response).await?.json().await?;

        debug!("response from {} -> {:?}", &url, &rows);

        Ok(rows)
    }

    /// Request `/rest/v1/students?id=eq.{ref}` with the profile columns.
    ///
    /// The store answers an array of zero or one row.
    async fn get_subject_profile(
        &self,
        subject_ref: &str,
    ) -> Result<Option<ProfileRow>, TransportError> {
        let url = format!("{}/rest/v1/{}", &self.url, STUDENT_TABLE);
        debug!("request profile of student {}", subject_ref);

        let response = self
            .authenticated(self.client.get(&url))
            .query(&[
                (
                    "select",
                    "first_name,middle_name,last_name,student_id,avatar_url".to_string(),
                ),
                ("id", format!("eq.{}", subject_ref)),
            ])
            .send()
            .await?;
        let rows: Vec<ProfileRow> = Self::check(response).await?.json().await?;

        Ok(rows.into_iter().next())
    }

    /// Request `PATCH /rest/v1/emergencies?id=eq.{id}` with `{"resolved": true}`.
    async fn set_resolved(&self, emergency_id: &str) -> Result<(), TransportError> {
        let url = format!("{}/rest/v1/{}", &self.url, EMERGENCY_TABLE);
        info!("mark emergency {} as resolved", emergency_id);

        let response = self
            .authenticated(self.client.patch(&url))
            .query(&[("id", format!("eq.{}", emergency_id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "resolved": true }))
            .send()
            .await?;
        Self::check(response).await?;

        Ok(())
    }

    /// Request `/realtime/v1/changes?table={table}` and wait for the next batch.
    ///
    /// This api call returns the changes since `cursor`:
    /// ```
    /// {
    ///   cursor: "c42",
    ///   changes: [{ type: "INSERT", new: { id: 12, ... }, old: {} }]
    /// }
    /// ```
    async fn poll_changes(
        &self,
        table: &str,
        cursor: Option<String>,
    ) -> Result<ChangeBatch, TransportError> {
        let url = format!("{}/realtime/v1/changes", &self.url);
        debug!("request {}?table={} cursor={:?}", &url, table, cursor);

        let mut query = vec![
            ("table", table.to_string()),
            ("wait", self.feed_wait.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let response = self
            .authenticated(self.client.get(&url))
            .query(&query)
            .send()
            .await?;
        let batch: ChangeBatch = Self::check(response).await?.json().await?;

        debug!("response from {} -> {:?}", &url, &batch);

        Ok(batch)
    }

    /// Request `/rest/v1/{collection}?select=*`.
    async fn list_records(
        &self,
        collection: &str,
    ) -> Result<Vec<serde_json::Value>, TransportError> {
        let url = format!("{}/rest/v1/{}", &self.url, collection);
        info!("request records of {}", collection);

        let response = self
            .authenticated(self.client.get(&url))
            .query(&[("select", "*")])
            .send()
            .await?;
        let records: Vec<serde_json::Value> = Self::check(response).await?.json().await?;

        Ok(records)
    }
}
