//! Web search provider client.
//!
//! Runs one full-text search against the configured provider and renders the
//! response into a bounded, numbered report. [`SearchClient::try_search`]
//! returns structured errors; [`SearchClient::search`] is the always-textual
//! variant whose failures come back as descriptive strings.

mod format;

use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use deepresearch_shared::{ResearchError, Result, SearchSettings};

pub use format::{NO_RESULTS, format_results, truncate_snippet};

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("deepresearch/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Request body sent to the provider.
#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    depth: &'a str,
    #[serde(rename = "outputType")]
    output_type: &'a str,
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Client for the external web search provider.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SearchClient {
    settings: SearchSettings,
    client: Client,
}

impl SearchClient {
    /// Create a client from resolved settings.
    pub fn new(settings: SearchSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// The settings this client was built with.
    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Whether a usable API credential is configured.
    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    /// Run a search and return the formatted report.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn try_search(&self, query: &str) -> Result<String> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            ResearchError::config(format!(
                "search API key not configured. Please set the {} environment variable.",
                self.settings.api_key_env
            ))
        })?;

        let payload = SearchRequest {
            q: query,
            depth: &self.settings.depth,
            output_type: &self.settings.output_type,
        };

        info!(endpoint = %self.settings.endpoint, "searching");

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| network_error(&e, &self.settings))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error(&e, &self.settings))?;

        if !status.is_success() {
            error!(status = status.as_u16(), %body, "search provider returned an error");
            return Err(ResearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ResearchError::parse(format!("search response is not JSON: {e}")))?;

        format_results(&data, self.settings.max_results, self.settings.snippet_chars)
    }

    /// Run a search; every failure is returned as descriptive text.
    pub async fn search(&self, query: &str) -> String {
        match self.try_search(query).await {
            Ok(report) => report,
            Err(e) => describe_error(&e),
        }
    }
}

/// Render a search failure the way the textual contract reports it.
pub fn describe_error(err: &ResearchError) -> String {
    match err {
        ResearchError::Config { message } => format!("Error: {message}"),
        ResearchError::Http { status, body } => {
            format!("Search failed with status {status}: {body}")
        }
        ResearchError::Network(message) => format!("Network error during search: {message}"),
        ResearchError::Parse { message } => format!("Error formatting search results: {message}"),
        other => format!("Unexpected error during search: {other}"),
    }
}

fn network_error(err: &reqwest::Error, settings: &SearchSettings) -> ResearchError {
    let message = if err.is_timeout() {
        format!("request timed out after {}s", settings.timeout.as_secs())
    } else {
        err.to_string()
    };
    error!(error = %message, "network error during search");
    ResearchError::Network(message)
}
