//! Local model server client.
//!
//! Talks to an Ollama-compatible HTTP API: non-streaming generation,
//! model listing, and model provisioning. The three operations are
//! independent; callers that want reliable generation check availability
//! (and pull if needed) first.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use deepresearch_shared::{GenerateOptions, ModelSettings, ResearchError, Result};

/// User-Agent string for model server requests.
const USER_AGENT: &str = concat!("deepresearch/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of a successful `/api/generate` call.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Body of `/api/tags`.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// One locally available model as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    /// Full model identifier, including tag (e.g. `phi3:latest`).
    pub name: String,
    /// On-disk size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

// ---------------------------------------------------------------------------
// ModelClient
// ---------------------------------------------------------------------------

/// Client for the locally hosted language model.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ModelClient {
    settings: ModelSettings,
    client: Client,
}

impl ModelClient {
    /// Create a client from resolved settings.
    pub fn new(settings: ModelSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ResearchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { settings, client })
    }

    /// The settings this client was built with.
    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    /// Configured model identifier.
    pub fn model_name(&self) -> &str {
        &self.settings.model
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/{endpoint}", self.settings.base_url)
    }

    /// Build the generation payload. Configured options are applied first,
    /// then per-call `options`, so later keys win.
    fn generate_payload(&self, prompt: &str, options: &GenerateOptions) -> Value {
        let mut payload = GenerateOptions::new();
        payload.insert("model".into(), json!(self.settings.model));
        payload.insert("prompt".into(), json!(prompt));
        payload.insert("stream".into(), json!(false));
        payload.extend(self.settings.options.clone());
        payload.extend(options.clone());
        Value::Object(payload)
    }

    /// Generate text for `prompt`, returning structured errors.
    #[instrument(skip_all, fields(model = %self.settings.model, prompt_len = prompt.len()))]
    pub async fn try_generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let response = self
            .client
            .post(self.url("generate"))
            .timeout(self.settings.generate_timeout)
            .json(&self.generate_payload(prompt, options))
            .send()
            .await
            .map_err(|e| network_error(&e, self.settings.generate_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "generation failed");
            return Err(ResearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::parse(format!("invalid generate response: {e}")))?;

        Ok(body.response)
    }

    /// Generate text for `prompt`; failures come back as an error string.
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> String {
        match self.try_generate(prompt, options).await {
            Ok(text) => text,
            Err(ResearchError::Http { status, .. }) => format!("Error generating text: {status}"),
            Err(e) => {
                error!(error = %e, "error generating text");
                format!("Error generating text: {e}")
            }
        }
    }

    /// List models available on the server.
    #[instrument(skip_all)]
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.url("tags"))
            .timeout(self.settings.tags_timeout)
            .send()
            .await
            .map_err(|e| network_error(&e, self.settings.tags_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::parse(format!("invalid tags response: {e}")))?;

        Ok(tags.models)
    }

    /// Whether the configured model is present locally (exact name match).
    pub async fn check_model_availability(&self) -> bool {
        match self.list_models().await {
            Ok(models) => models.iter().any(|m| m.name == self.settings.model),
            Err(e) => {
                error!(error = %e, "failed to check model availability");
                false
            }
        }
    }

    /// Ask the server to download the configured model. Returns `true` on success.
    #[instrument(skip_all, fields(model = %self.settings.model))]
    pub async fn pull_model(&self) -> bool {
        info!("pulling model");

        let result = self
            .client
            .post(self.url("pull"))
            .timeout(self.settings.pull_timeout)
            .json(&json!({ "name": self.settings.model }))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let err = network_error(&e, self.settings.pull_timeout);
                error!(error = %err, "error pulling model");
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(status = status.as_u16(), "failed to pull model");
            return false;
        }

        // The server reports progress in the body; it ends when the pull does.
        if let Err(e) = response.bytes().await {
            warn!(error = %e, "pull response ended early");
            return false;
        }

        info!("model pulled successfully");
        true
    }
}

fn network_error(err: &reqwest::Error, timeout: Duration) -> ResearchError {
    if err.is_timeout() {
        ResearchError::Network(format!("request timed out after {}s", timeout.as_secs()))
    } else {
        ResearchError::Network(err.to_string())
    }
}
