//! Agents and the tools they may call.
//!
//! An [`Agent`] is a descriptive record: a role, a goal, a backstory, and a
//! capability set of [`Tool`]s. It holds no execution state; the pipeline
//! hands it the model client when a stage runs.

use tracing::{debug, info, warn};

use deepresearch_llm::ModelClient;
use deepresearch_search::{SearchClient, describe_error};
use deepresearch_shared::{GenerateOptions, ResearchError, Result};

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// A capability an agent can invoke while working on its stage.
#[derive(Debug, Clone)]
pub enum Tool {
    /// Full-text web search.
    Search(SearchTool),
    /// Free-form generation against the local model.
    Generation(GenerationTool),
}

impl Tool {
    /// Web search backed by `client`.
    pub fn search(client: SearchClient) -> Self {
        Self::Search(SearchTool { client })
    }

    /// Text generation backed by `client` with per-call `options`.
    pub fn generation(client: ModelClient, options: GenerateOptions) -> Self {
        Self::Generation(GenerationTool { client, options })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => SearchTool::NAME,
            Self::Generation(_) => GenerationTool::NAME,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Search(_) => SearchTool::DESCRIPTION,
            Self::Generation(_) => GenerationTool::DESCRIPTION,
        }
    }

    /// Run the tool. Completes before the calling stage continues.
    pub async fn invoke(&self, input: &str) -> Result<String> {
        match self {
            Self::Search(tool) => tool.invoke(input).await,
            Self::Generation(tool) => tool.invoke(input).await,
        }
    }
}

/// Wraps the search client.
///
/// Configuration and provider-status problems come back inline as text so
/// later stages still run. Transport failures are returned as errors and
/// abort the run.
#[derive(Debug, Clone)]
pub struct SearchTool {
    client: SearchClient,
}

impl SearchTool {
    pub const NAME: &'static str = "Web Search";
    pub const DESCRIPTION: &'static str = "Search the web for current information on a topic";

    async fn invoke(&self, query: &str) -> Result<String> {
        match self.client.try_search(query).await {
            Ok(report) => Ok(report),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                warn!(error = %e, "search degraded, passing error text to the agent");
                Ok(describe_error(&e))
            }
        }
    }
}

/// Wraps the local model client. Every failure is an error.
#[derive(Debug, Clone)]
pub struct GenerationTool {
    client: ModelClient,
    options: GenerateOptions,
}

impl GenerationTool {
    pub const NAME: &'static str = "Local Model";
    pub const DESCRIPTION: &'static str = "Draft text about a topic with the local language model";

    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.client.try_generate(prompt, &self.options).await
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A named role bound to a capability set.
#[derive(Debug, Clone)]
pub struct Agent {
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<Tool>,
}

/// One tool call's result, as shown to the model.
#[derive(Debug)]
struct Observation {
    tool: &'static str,
    description: &'static str,
    text: String,
}

/// What an agent needs to produce one stage artifact.
#[derive(Debug, Clone, Copy)]
pub struct Assignment<'a> {
    /// The run's original query; tools are invoked with it.
    pub query: &'a str,
    /// Rendered instruction, including upstream context.
    pub instruction: &'a str,
    pub expected_output: &'a str,
}

impl Agent {
    /// Create an agent with no tools.
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
        }
    }

    /// Add a tool to the capability set.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Produce the stage artifact.
    ///
    /// Every tool is invoked once with the query, in declaration order, and
    /// its observation is folded into the prompt. The model's reply is the
    /// artifact; an empty reply is a failure.
    pub async fn execute(
        &self,
        assignment: Assignment<'_>,
        llm: &ModelClient,
        options: &GenerateOptions,
    ) -> Result<String> {
        let mut observations = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            info!(role = %self.role, tool = tool.name(), "invoking tool");
            let text = tool.invoke(assignment.query).await?;
            debug!(tool = tool.name(), len = text.len(), "tool returned");
            observations.push(Observation {
                tool: tool.name(),
                description: tool.description(),
                text,
            });
        }

        let prompt = self.build_prompt(&assignment, &observations);
        let output = llm.try_generate(&prompt, options).await?;

        if output.trim().is_empty() {
            return Err(ResearchError::agent(
                &self.role,
                format!("model returned an empty answer for {}", self.role),
            ));
        }

        Ok(output)
    }

    fn build_prompt(&self, assignment: &Assignment<'_>, observations: &[Observation]) -> String {
        let mut prompt = format!(
            "You are {}.\n{}\n\nYour personal goal is: {}\n\n# Task\n\n{}",
            self.role,
            self.backstory.trim(),
            self.goal,
            assignment.instruction.trim_end(),
        );

        if !observations.is_empty() {
            prompt.push_str("\n\n# Tool results");
            for obs in observations {
                prompt.push_str(&format!(
                    "\n\n## {}\n\n_{}_\n\n{}",
                    obs.tool, obs.description, obs.text
                ));
            }
        }

        prompt.push_str(&format!(
            "\n\nThis is the expected criteria for your final answer: {}\n\
             Return the complete content as your final answer, not a summary of it.",
            assignment.expected_output
        ));

        prompt
    }
}
