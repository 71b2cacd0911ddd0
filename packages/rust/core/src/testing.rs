//! Test helpers: wiremock-backed clients and an echoing model.

use serde_json::{Value, json};
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

use deepresearch_llm::ModelClient;
use deepresearch_search::SearchClient;
use deepresearch_shared::{ModelConfig, ModelSettings, SearchConfig, SearchSettings};

/// Model responder that answers with the prompt it was given, under a heading.
///
/// Makes stage data-flow observable: every artifact contains the exact
/// instruction, context, and tool output its stage was run with.
pub(crate) struct EchoPrompt;

impl Respond for EchoPrompt {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let prompt = body["prompt"].as_str().unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({
            "model": body["model"],
            "response": format!("# Echo\n\n{prompt}"),
            "done": true,
        }))
    }
}

/// Search client pointed at `server` with a 1s timeout.
pub(crate) fn search_client(server: &MockServer, api_key: Option<&str>) -> SearchClient {
    let config = SearchConfig {
        endpoint: format!("{}/v1/search", server.uri()),
        timeout_secs: 1,
        ..Default::default()
    };
    SearchClient::new(SearchSettings::from_config(&config, api_key.map(String::from)))
        .expect("search client")
}

/// Model client pointed at `server`.
pub(crate) fn model_client(server: &MockServer) -> ModelClient {
    model_client_at(&server.uri())
}

pub(crate) fn model_client_at(base_url: &str) -> ModelClient {
    let config = ModelConfig {
        base_url: base_url.to_string(),
        generate_timeout_secs: 5,
        tags_timeout_secs: 2,
        ..Default::default()
    };
    ModelClient::new(ModelSettings::from_config(&config).expect("model settings"))
        .expect("model client")
}

/// Prompts sent to `/api/generate`, in arrival order.
pub(crate) async fn received_prompts(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api/generate")
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter_map(|body| body["prompt"].as_str().map(String::from))
        .collect()
}

/// A provider body with one result per title.
pub(crate) fn search_results(titles: &[&str]) -> Value {
    let results: Vec<Value> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            json!({
                "title": title,
                "url": format!("https://example.com/{i}"),
                "content": format!("Details about {title}."),
            })
        })
        .collect();
    json!({ "results": results })
}
