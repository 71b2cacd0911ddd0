//! Sequential pipeline: stages run in declaration order, each receiving its
//! declared upstream outputs as context.
//!
//! Declaration order is the execution order. [`Pipeline::new`] only accepts
//! dependencies on earlier stages, so that order is always topological and
//! every dependency has a committed output before its consumer starts.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use deepresearch_llm::ModelClient;
use deepresearch_shared::{ResearchError, Result, RunId};

use crate::agent::Assignment;
use crate::stage::{Stage, StageId};

/// Input name the query is bound to in instruction templates.
pub const QUERY_INPUT: &str = "query";

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Per-invocation state: the query and every artifact produced so far.
#[derive(Debug, Clone)]
pub struct Run {
    id: RunId,
    query: String,
    started_at: DateTime<Utc>,
    stage_outputs: HashMap<StageId, String>,
    completed: Vec<StageId>,
}

impl Run {
    fn new(query: &str) -> Self {
        Self {
            id: RunId::new(),
            query: query.to_string(),
            started_at: Utc::now(),
            stage_outputs: HashMap::new(),
            completed: Vec::new(),
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Artifact of `stage`, if it has completed.
    pub fn output(&self, stage: &StageId) -> Option<&str> {
        self.stage_outputs.get(stage).map(String::as_str)
    }

    /// Stage ids in the order their artifacts were committed.
    pub fn completed(&self) -> &[StageId] {
        &self.completed
    }

    /// Artifact of the last completed stage.
    pub fn final_output(&self) -> Option<&str> {
        self.completed.last().and_then(|id| self.output(id))
    }

    fn inputs(&self) -> HashMap<String, String> {
        HashMap::from([(QUERY_INPUT.to_string(), self.query.clone())])
    }

    fn commit(&mut self, stage: StageId, output: String) {
        self.stage_outputs.insert(stage.clone(), output);
        self.completed.push(stage);
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting stage status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage's agent is invoked. `index` is 1-based.
    fn stage_started(&self, stage: &StageId, role: &str, index: usize, total: usize);
    /// Called after a stage's artifact is committed.
    fn stage_completed(&self, stage: &StageId, index: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: &StageId, _role: &str, _index: usize, _total: usize) {}
    fn stage_completed(&self, _stage: &StageId, _index: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An ordered, acyclic set of stages executed one at a time.
///
/// Immutable once built; one pipeline can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
    llm: ModelClient,
}

impl Pipeline {
    /// Build a pipeline, validating the dependency wiring.
    ///
    /// Rejects an empty stage list, duplicate ids, and any dependency that
    /// is not an earlier stage.
    pub fn new(stages: Vec<Stage>, llm: ModelClient) -> Result<Self> {
        if stages.is_empty() {
            return Err(ResearchError::Pipeline("a pipeline needs at least one stage".into()));
        }

        let mut seen: HashSet<&StageId> = HashSet::with_capacity(stages.len());
        for stage in &stages {
            for dep in stage.dependencies() {
                if dep == stage.id() {
                    return Err(ResearchError::Pipeline(format!(
                        "stage '{dep}' depends on itself"
                    )));
                }
                if !seen.contains(dep) {
                    let later = stages.iter().any(|s| s.id() == dep);
                    return Err(ResearchError::Pipeline(if later {
                        format!(
                            "stage '{}' depends on '{dep}', which is declared after it",
                            stage.id()
                        )
                    } else {
                        format!("stage '{}' depends on unknown stage '{dep}'", stage.id())
                    }));
                }
            }
            if !seen.insert(stage.id()) {
                return Err(ResearchError::Pipeline(format!(
                    "duplicate stage id '{}'",
                    stage.id()
                )));
            }
        }

        Ok(Self { stages, llm })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The model every agent in this pipeline reasons with.
    pub fn llm(&self) -> &ModelClient {
        &self.llm
    }

    /// Run every stage for `query` and return the completed run.
    ///
    /// The first failing stage aborts the run; earlier artifacts are dropped
    /// with it.
    #[instrument(skip_all, fields(query = %query, stages = self.stages.len()))]
    pub async fn run(&self, query: &str, progress: &dyn ProgressReporter) -> Result<Run> {
        let start = Instant::now();
        let mut run = Run::new(query);
        let inputs = run.inputs();
        let total = self.stages.len();

        info!(run_id = %run.id, "starting pipeline run");

        for (i, stage) in self.stages.iter().enumerate() {
            let index = i + 1;
            progress.stage_started(stage.id(), stage.agent().role(), index, total);
            info!(stage = %stage.id(), role = stage.agent().role(), index, total, "stage started");

            let instruction = {
                let context = stage
                    .dependencies()
                    .iter()
                    .map(|dep| {
                        run.output(dep).map(|out| (dep, out)).ok_or_else(|| {
                            ResearchError::Pipeline(format!(
                                "stage '{}' started before '{dep}' produced output",
                                stage.id()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                stage.render(&inputs, &context)?
            };
            debug!(stage = %stage.id(), len = instruction.len(), "instruction rendered");

            let assignment = Assignment {
                query: run.query(),
                instruction: &instruction,
                expected_output: stage.expected_output(),
            };
            let output = stage
                .agent()
                .execute(assignment, &self.llm, &self.llm.settings().options)
                .await
                .map_err(|e| match e {
                    ResearchError::Agent { message, .. } => {
                        ResearchError::agent(stage.id().as_str(), message)
                    }
                    other => ResearchError::agent(stage.id().as_str(), other.to_string()),
                })?;

            info!(stage = %stage.id(), len = output.len(), "stage committed");
            run.commit(stage.id().clone(), output);
            progress.stage_completed(stage.id(), index, total);
        }

        info!(
            run_id = %run.id,
            elapsed_ms = start.elapsed().as_millis(),
            "pipeline run complete"
        );

        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::agent::Agent;
    use crate::testing::{EchoPrompt, model_client, model_client_at, received_prompts};

    fn agent(role: &str) -> Agent {
        Agent::new(role, format!("{role} goal"), format!("{role} backstory"))
    }

    fn stage(id: &str, role: &str) -> Stage {
        Stage::new(id, format!("Work on {{query}} as {role}."), agent(role), "text")
    }

    async fn echo_server(expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(EchoPrompt)
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    /// Records callbacks so tests can check ordering.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressReporter for Recorder {
        fn stage_started(&self, stage: &StageId, _role: &str, index: usize, total: usize) {
            self.0.lock().unwrap().push(format!("start {stage} {index}/{total}"));
        }
        fn stage_completed(&self, stage: &StageId, index: usize, total: usize) {
            self.0.lock().unwrap().push(format!("done {stage} {index}/{total}"));
        }
    }

    #[test]
    fn rejects_empty_pipeline() {
        let err = Pipeline::new(vec![], model_client_at("http://localhost:11434")).unwrap_err();
        assert!(matches!(err, ResearchError::Pipeline(_)));
    }

    #[test]
    fn rejects_forward_and_unknown_dependencies() {
        let llm = model_client_at("http://localhost:11434");

        let forward = vec![stage("a", "A").depends_on("b"), stage("b", "B")];
        let err = Pipeline::new(forward, llm.clone()).unwrap_err();
        assert!(err.to_string().contains("declared after it"));

        let unknown = vec![stage("a", "A"), stage("b", "B").depends_on("zzz")];
        let err = Pipeline::new(unknown, llm.clone()).unwrap_err();
        assert!(err.to_string().contains("unknown stage 'zzz'"));

        let cyclic = vec![stage("a", "A").depends_on("a")];
        let err = Pipeline::new(cyclic, llm).unwrap_err();
        assert!(err.to_string().contains("depends on itself"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let stages = vec![stage("a", "A"), stage("a", "Again")];
        let err = Pipeline::new(stages, model_client_at("http://localhost:11434")).unwrap_err();
        assert!(err.to_string().contains("duplicate stage id 'a'"));
    }

    #[tokio::test]
    async fn runs_each_stage_once_in_order() {
        let server = echo_server(4).await;
        let stages = vec![
            stage("one", "First"),
            stage("two", "Second").depends_on("one"),
            stage("three", "Third").depends_on("two"),
            stage("four", "Fourth").depends_on("three"),
        ];
        let pipeline = Pipeline::new(stages, model_client(&server)).unwrap();
        let recorder = Recorder::default();

        let run = pipeline.run("q", &recorder).await.unwrap();

        let ids: Vec<&str> = run.completed().iter().map(StageId::as_str).collect();
        assert_eq!(ids, vec!["one", "two", "three", "four"]);

        let prompts = received_prompts(&server).await;
        let roles = ["First", "Second", "Third", "Fourth"];
        for (prompt, role) in prompts.iter().zip(roles) {
            assert!(prompt.starts_with(&format!("You are {role}.")), "out of order: {prompt}");
        }

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(events[0], "start one 1/4");
        assert_eq!(events[1], "done one 1/4");
        assert_eq!(events[7], "done four 4/4");
    }

    #[tokio::test]
    async fn injects_only_declared_dependencies() {
        let server = echo_server(3).await;
        let stages = vec![
            stage("gather", "Gatherer"),
            stage("critique", "Critic").depends_on("gather"),
            stage("report", "Reporter").depends_on("gather"),
        ];
        let pipeline = Pipeline::new(stages, model_client(&server)).unwrap();

        let run = pipeline.run("solar power", &SilentProgress).await.unwrap();

        let gather = run.output(&"gather".into()).unwrap();
        let critique = run.output(&"critique".into()).unwrap();
        let report = run.output(&"report".into()).unwrap();

        assert!(critique.contains(gather));
        assert!(report.contains(gather));
        assert!(!report.contains("You are Critic."));
        assert_eq!(run.final_output(), Some(report));
        assert_eq!(run.query(), "solar power");
    }

    #[tokio::test]
    async fn context_follows_declared_dependency_order() {
        let server = echo_server(3).await;
        let stages = vec![
            stage("x", "Ex"),
            stage("y", "Why"),
            stage("z", "Zed").depends_on("y").depends_on("x"),
        ];
        let pipeline = Pipeline::new(stages, model_client(&server)).unwrap();

        let run = pipeline.run("q", &SilentProgress).await.unwrap();
        let z = run.output(&"z".into()).unwrap();

        let y_at = z.find("## Context from the `y` stage").unwrap();
        let x_at = z.find("## Context from the `x` stage").unwrap();
        assert!(y_at < x_at);
    }

    #[tokio::test]
    async fn failing_stage_aborts_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "oom" })))
            .expect(1)
            .mount(&server)
            .await;

        let stages = vec![stage("a", "A"), stage("b", "B").depends_on("a")];
        let pipeline = Pipeline::new(stages, model_client(&server)).unwrap();

        let err = pipeline.run("q", &SilentProgress).await.unwrap_err();
        match err {
            ResearchError::Agent { stage, message } => {
                assert_eq!(stage, "a");
                assert!(message.contains("HTTP 500"));
            }
            other => panic!("expected agent error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_answer_is_reported_once_under_the_stage_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "" })))
            .expect(1)
            .mount(&server)
            .await;

        let stages = vec![stage("draft", "Writer")];
        let pipeline = Pipeline::new(stages, model_client(&server)).unwrap();

        let err = pipeline.run("q", &SilentProgress).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "stage 'draft' failed: model returned an empty answer for Writer"
        );
    }

    #[tokio::test]
    async fn unbound_placeholder_fails_before_any_model_call() {
        let server = echo_server(0).await;
        let stages = vec![Stage::new("a", "Compare {query} to {baseline}", agent("A"), "text")];
        let pipeline = Pipeline::new(stages, model_client(&server)).unwrap();

        let err = pipeline.run("q", &SilentProgress).await.unwrap_err();
        assert!(matches!(err, ResearchError::Template { .. }));
    }
}
