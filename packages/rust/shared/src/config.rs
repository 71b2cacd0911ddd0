//! Application configuration for deepresearch.
//!
//! User config lives at `~/.deepresearch/deepresearch.toml`.
//! Environment overrides beat config file values, which beat defaults.
//! Clients never read the environment themselves: [`AppConfig::resolve`]
//! produces [`SearchSettings`] and [`ModelSettings`] that are passed into
//! their constructors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ResearchError, Result};
use crate::types::GenerateOptions;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "deepresearch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".deepresearch";

/// Prefix of the placeholder value shipped in `.env` templates.
const PLACEHOLDER_PREFIX: &str = "your_";

// ---------------------------------------------------------------------------
// Config structs (matching deepresearch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Local model provider settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Names of the environment variables that override file values.
    #[serde(default)]
    pub env: EnvConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Search depth sent with every request.
    #[serde(default = "default_depth")]
    pub depth: String,

    /// Output mode sent with every request.
    #[serde(default = "default_output_type")]
    pub output_type: String,

    /// Request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    /// Number of results rendered into a report.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Snippet length (in characters) before truncation.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_api_key_env(),
            depth: default_depth(),
            output_type: default_output_type(),
            timeout_secs: default_search_timeout(),
            max_results: default_max_results(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.linkup.so/v1/search".into()
}
fn default_api_key_env() -> String {
    "LINKUP_API_KEY".into()
}
fn default_depth() -> String {
    "deep".into()
}
fn default_output_type() -> String {
    "searchResults".into()
}
fn default_search_timeout() -> u64 {
    30
}
fn default_max_results() -> usize {
    10
}
fn default_snippet_chars() -> usize {
    300
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the local model server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier used for every generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Timeout for a single non-streaming generation.
    #[serde(default = "default_generate_timeout")]
    pub generate_timeout_secs: u64,

    /// Timeout for listing local models.
    #[serde(default = "default_tags_timeout")]
    pub tags_timeout_secs: u64,

    /// Timeout for pulling a model (downloads are large).
    #[serde(default = "default_pull_timeout")]
    pub pull_timeout_secs: u64,

    /// Extra decoding parameters merged into every generation request.
    #[serde(default)]
    pub options: GenerateOptions,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            generate_timeout_secs: default_generate_timeout(),
            tags_timeout_secs: default_tags_timeout(),
            pull_timeout_secs: default_pull_timeout(),
            options: GenerateOptions::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "phi3:latest".into()
}
fn default_generate_timeout() -> u64 {
    120
}
fn default_tags_timeout() -> u64 {
    10
}
fn default_pull_timeout() -> u64 {
    300
}

/// `[env]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Env var overriding `model.base_url`.
    #[serde(default = "default_base_url_var")]
    pub base_url_var: String,

    /// Env var overriding `model.model`.
    #[serde(default = "default_model_var")]
    pub model_var: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            base_url_var: default_base_url_var(),
            model_var: default_model_var(),
        }
    }
}

fn default_base_url_var() -> String {
    "OLLAMA_BASE_URL".into()
}
fn default_model_var() -> String {
    "MODEL_NAME".into()
}

// ---------------------------------------------------------------------------
// Resolved settings (runtime, merged from config + environment)
// ---------------------------------------------------------------------------

/// Runtime search settings handed to the search client.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub endpoint: String,
    /// `None` when the credential is missing, empty, or still a placeholder.
    pub api_key: Option<String>,
    /// Env var the key is expected in, for "not configured" messages.
    pub api_key_env: String,
    pub depth: String,
    pub output_type: String,
    pub timeout: Duration,
    pub max_results: usize,
    pub snippet_chars: usize,
}

impl SearchSettings {
    /// Build settings from the file section and an already-looked-up key.
    pub fn from_config(config: &SearchConfig, api_key: Option<String>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key
                .map(|k| k.trim().to_string())
                .filter(|k| is_usable_credential(k)),
            api_key_env: config.api_key_env.clone(),
            depth: config.depth.clone(),
            output_type: config.output_type.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_results: config.max_results,
            snippet_chars: config.snippet_chars,
        }
    }

    /// Whether a usable credential is present.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Runtime model settings handed to the local model client.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub model: String,
    pub generate_timeout: Duration,
    pub tags_timeout: Duration,
    pub pull_timeout: Duration,
    pub options: GenerateOptions,
}

impl ModelSettings {
    /// Build settings from the file section, validating the base URL.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            ResearchError::config(format!("invalid model base_url '{base_url}': {e}"))
        })?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            generate_timeout: Duration::from_secs(config.generate_timeout_secs),
            tags_timeout: Duration::from_secs(config.tags_timeout_secs),
            pull_timeout: Duration::from_secs(config.pull_timeout_secs),
            options: config.options.clone(),
        })
    }
}

/// Settings for every client, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub search: SearchSettings,
    pub model: ModelSettings,
}

impl AppConfig {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve using `lookup` to read environment-style overrides.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut model = self.model.clone();
        if let Some(base_url) = lookup(&self.env.base_url_var).filter(|v| !v.trim().is_empty()) {
            model.base_url = base_url;
        }
        if let Some(name) = lookup(&self.env.model_var).filter(|v| !v.trim().is_empty()) {
            model.model = name;
        }

        let api_key = lookup(&self.search.api_key_env);
        let search = SearchSettings::from_config(&self.search, api_key);
        if !search.is_configured() {
            tracing::warn!(
                var = %self.search.api_key_env,
                "search API key not found, web search will report itself as not configured"
            );
        }

        Ok(ResolvedConfig {
            search,
            model: ModelSettings::from_config(&model)?,
        })
    }
}

/// A credential is usable when non-empty and not the template placeholder.
fn is_usable_credential(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with(PLACEHOLDER_PREFIX)
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.deepresearch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ResearchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.deepresearch/deepresearch.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ResearchError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ResearchError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ResearchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ResearchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ResearchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
