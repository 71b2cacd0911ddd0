//! Orchestration facade used by transport-facing callers.
//!
//! [`ResearchService::conduct_research`] and [`ResearchService::quick_search`]
//! are total: they always return a string, and failures are carried as
//! message prefixes. Work is handed to a background tokio task and awaited,
//! so a caller never blocks its own thread on the pipeline.

use std::sync::Arc;

use tracing::{error, info, instrument};

use deepresearch_llm::ModelClient;
use deepresearch_search::SearchClient;
use deepresearch_shared::{ResearchError, ResolvedConfig, Result};

use crate::crew;
use crate::pipeline::{Pipeline, ProgressReporter, Run, SilentProgress};

/// Returned for a blank query by both facade operations.
pub const MISSING_QUERY: &str = "Error: Query parameter is required";

/// Entry point for running research.
///
/// Cheap to clone. The pipeline is immutable and shared, so overlapping
/// calls each get their own [`Run`] with no coordination between them.
#[derive(Debug, Clone)]
pub struct ResearchService {
    pipeline: Arc<Pipeline>,
    search: SearchClient,
}

/// Result of [`ResearchService::diagnose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    pub search_configured: bool,
    pub model_server_reachable: bool,
    pub models_listed: usize,
    pub model: String,
    pub model_available: bool,
}

impl Diagnostics {
    /// Everything needed for a full research run is in place.
    pub fn is_ready(&self) -> bool {
        self.search_configured && self.model_server_reachable && self.model_available
    }
}

impl ResearchService {
    pub fn new(pipeline: Pipeline, search: SearchClient) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            search,
        }
    }

    /// Build clients and the research crew from resolved settings.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let search = SearchClient::new(config.search.clone())?;
        let llm = ModelClient::new(config.model.clone())?;
        let pipeline = crew::research_pipeline(search.clone(), llm)?;
        Ok(Self::new(pipeline, search))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the full pipeline on a background task and return the run record.
    ///
    /// A blank query is rejected before any provider is called.
    pub async fn run(&self, query: &str, progress: Arc<dyn ProgressReporter>) -> Result<Run> {
        if query.trim().is_empty() {
            return Err(ResearchError::config("Query parameter is required"));
        }

        let pipeline = Arc::clone(&self.pipeline);
        let query = query.to_string();

        tokio::spawn(async move { pipeline.run(&query, progress.as_ref()).await })
            .await
            .map_err(|e| ResearchError::Worker(e.to_string()))?
    }

    /// Research `query` and return the final artifact, or an error string.
    pub async fn conduct_research(&self, query: &str) -> String {
        self.conduct_research_with(query, Arc::new(SilentProgress)).await
    }

    /// [`conduct_research`](Self::conduct_research) with progress callbacks.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn conduct_research_with(
        &self,
        query: &str,
        progress: Arc<dyn ProgressReporter>,
    ) -> String {
        if query.trim().is_empty() {
            return MISSING_QUERY.to_string();
        }

        info!("starting research process");
        match self.run(query, progress).await {
            Ok(run) => {
                info!(run_id = %run.id(), "research process completed successfully");
                run.final_output().unwrap_or_default().to_string()
            }
            Err(e) => {
                error!(error = %e, "error in research process");
                format!("Error conducting research: {e}")
            }
        }
    }

    /// Search directly, skipping every agent and stage.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn quick_search(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return MISSING_QUERY.to_string();
        }

        info!("performing quick search");
        let search = self.search.clone();
        let owned = query.to_string();

        match tokio::spawn(async move { search.search(&owned).await }).await {
            Ok(results) => format!("Quick search results for '{query}':\n\n{results}"),
            Err(e) => {
                error!(error = %e, "error in quick search");
                format!("Error performing quick search: {e}")
            }
        }
    }

    /// Check credentials and the model server without running research.
    pub async fn diagnose(&self) -> Diagnostics {
        let llm = self.pipeline.llm();
        let (reachable, models) = match llm.list_models().await {
            Ok(models) => (true, models),
            Err(e) => {
                error!(error = %e, "model server check failed");
                (false, Vec::new())
            }
        };

        Diagnostics {
            search_configured: self.search.is_configured(),
            model_server_reachable: reachable,
            models_listed: models.len(),
            model: llm.model_name().to_string(),
            model_available: models.iter().any(|m| m.name == llm.model_name()),
        }
    }
}
