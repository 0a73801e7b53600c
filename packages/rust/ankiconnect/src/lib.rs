//! AnkiConnect client.
//!
//! Talks to the local automation endpoint exposed by the AnkiConnect add-on.
//! Each call is a single JSON round trip with a fixed timeout; there is no
//! retry. The [`AnkiApi`] trait is the seam the update pipeline is generic
//! over, so it can run against a fake in tests.

mod protocol;

use std::future::Future;
use std::time::Duration;

use cardfeed_shared::{CardfeedError, NoteUpdate, Result, TargetId};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

pub use protocol::{NoteInfo, exact_field_query};

/// AnkiConnect API version spoken by default.
pub const DEFAULT_API_VERSION: u32 = 6;

/// Default timeout in seconds for a single request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for endpoint requests.
const USER_AGENT: &str = concat!("cardfeed/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// AnkiApi
// ---------------------------------------------------------------------------

/// The four actions the pipelines need from the flashcard application.
pub trait AnkiApi {
    /// API version reported by the endpoint; doubles as a reachability check.
    fn version(&self) -> impl Future<Output = Result<u32>> + Send;

    /// Ids of notes matching a search query, in the order returned.
    fn find_notes(&self, query: &str) -> impl Future<Output = Result<Vec<TargetId>>> + Send;

    /// Current fields of the given notes; unknown ids are absent from the result.
    fn notes_info(&self, ids: &[TargetId]) -> impl Future<Output = Result<Vec<NoteInfo>>> + Send;

    /// Overwrite the listed fields of one note.
    fn update_note_fields(&self, update: &NoteUpdate) -> impl Future<Output = Result<()>> + Send;
}

// ---------------------------------------------------------------------------
// Client options
// ---------------------------------------------------------------------------

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// `version` field sent with every request.
    pub api_version: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_version: DEFAULT_API_VERSION,
        }
    }
}

// ---------------------------------------------------------------------------
// AnkiConnectClient
// ---------------------------------------------------------------------------

/// HTTP client for one AnkiConnect endpoint.
#[derive(Debug, Clone)]
pub struct AnkiConnectClient {
    client: Client,
    url: Url,
    api_version: u32,
}

impl AnkiConnectClient {
    /// Build a client for `url`.
    pub fn new(url: Url, opts: &ClientOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(opts.timeout)
            .build()
            .map_err(|e| CardfeedError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_version: opts.api_version,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one action and decode its `result`.
    #[instrument(skip(self, params), fields(url = %self.url))]
    pub async fn request<T: DeserializeOwned>(&self, action: &str, params: Option<Value>) -> Result<T> {
        let envelope = protocol::RequestEnvelope {
            action,
            version: self.api_version,
            params,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| CardfeedError::Network(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CardfeedError::Network(format!("{}: HTTP {status}", self.url)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CardfeedError::protocol(action, format!("response is not JSON: {e}")))?;

        let result = protocol::unwrap_envelope(action, body)?;
        debug!(action, "request complete");

        serde_json::from_value(result)
            .map_err(|e| CardfeedError::protocol(action, format!("malformed result: {e}")))
    }
}

impl AnkiApi for AnkiConnectClient {
    async fn version(&self) -> Result<u32> {
        self.request("version", None).await
    }

    async fn find_notes(&self, query: &str) -> Result<Vec<TargetId>> {
        let ids: Option<Vec<TargetId>> = self
            .request("findNotes", Some(json!({ "query": query })))
            .await?;
        Ok(ids.unwrap_or_default())
    }

    async fn notes_info(&self, ids: &[TargetId]) -> Result<Vec<NoteInfo>> {
        let result: Value = self
            .request("notesInfo", Some(json!({ "notes": ids })))
            .await?;
        protocol::parse_notes_info(result)
    }

    async fn update_note_fields(&self, update: &NoteUpdate) -> Result<()> {
        let params = json!({
            "note": {
                "id": update.target_id,
                "fields": update.fields,
            }
        });
        let _: Value = self.request("updateNoteFields", Some(params)).await?;
        Ok(())
    }
}
