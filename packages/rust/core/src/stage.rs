//! Pipeline stages: an agent, an instruction template, and upstream dependencies.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use deepresearch_shared::{ResearchError, Result};

use crate::agent::Agent;

/// Matches `{name}` placeholders. JSON-like braces (`{"a": 1}`) do not match.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

// ---------------------------------------------------------------------------
// StageId
// ---------------------------------------------------------------------------

/// Identifier of a stage within one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(String);

impl StageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One unit of pipeline work.
#[derive(Debug, Clone)]
pub struct Stage {
    id: StageId,
    instruction_template: String,
    agent: Agent,
    expected_output: String,
    depends_on: Vec<StageId>,
}

impl Stage {
    /// Create a stage with no dependencies.
    pub fn new(
        id: impl Into<StageId>,
        instruction_template: impl Into<String>,
        agent: Agent,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            instruction_template: instruction_template.into(),
            agent,
            expected_output: expected_output.into(),
            depends_on: Vec::new(),
        }
    }

    /// Declare an upstream stage whose output this stage receives as context.
    /// Dependencies are injected in the order they are declared.
    pub fn depends_on(mut self, upstream: impl Into<StageId>) -> Self {
        self.depends_on.push(upstream.into());
        self
    }

    pub fn id(&self) -> &StageId {
        &self.id
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    pub fn dependencies(&self) -> &[StageId] {
        &self.depends_on
    }

    /// Placeholder names used by the template, in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(&self.instruction_template) {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Render the instruction: substitute `inputs`, then append each
    /// dependency's output as context, in the order given.
    pub fn render(
        &self,
        inputs: &HashMap<String, String>,
        context: &[(&StageId, &str)],
    ) -> Result<String> {
        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| !inputs.contains_key(*name))
        {
            return Err(ResearchError::Template {
                stage: self.id.to_string(),
                message: format!("no input bound for placeholder '{{{missing}}}'"),
            });
        }

        let mut rendered = PLACEHOLDER_RE
            .replace_all(&self.instruction_template, |caps: &regex::Captures<'_>| {
                inputs[&caps[1]].clone()
            })
            .into_owned();

        for (upstream, output) in context {
            rendered.push_str(&format!(
                "\n\n## Context from the `{upstream}` stage\n\n{output}"
            ));
        }

        Ok(rendered)
    }
}
