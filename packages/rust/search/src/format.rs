//! Rendering of provider responses into the human-readable search report.

use serde_json::Value;

use deepresearch_shared::{ResearchError, Result};

/// Literal report for an empty result list.
pub const NO_RESULTS: &str = "No search results found.";

const MISSING_TITLE: &str = "No title";
const MISSING_URL: &str = "No URL";
const MISSING_SNIPPET: &str = "No description available";
const ELLIPSIS: &str = "...";

/// Format a provider response body into a numbered report.
///
/// A missing `results` key is treated as an empty list. Any other shape
/// mismatch (non-array `results`, non-object entries) is a parse error.
pub fn format_results(data: &Value, max_results: usize, snippet_chars: usize) -> Result<String> {
    let results = match data.get("results") {
        None | Some(Value::Null) => return Ok(NO_RESULTS.to_string()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ResearchError::parse(format!(
                "expected `results` to be an array, got {}",
                type_name(other)
            )));
        }
    };

    if results.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }

    let mut lines = Vec::with_capacity(results.len().min(max_results) * 4 + 1);
    lines.push(format!(
        "Web Search Results ({} results found):\n",
        results.len()
    ));

    for (i, result) in results.iter().take(max_results).enumerate() {
        let entry = result.as_object().ok_or_else(|| {
            ResearchError::parse(format!(
                "result {} is {}, expected an object",
                i + 1,
                type_name(result)
            ))
        })?;

        let title = entry
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(MISSING_TITLE);
        let url = entry.get("url").and_then(Value::as_str).unwrap_or(MISSING_URL);
        let snippet = entry
            .get("content")
            .and_then(Value::as_str)
            .or_else(|| entry.get("snippet").and_then(Value::as_str))
            .unwrap_or(MISSING_SNIPPET);

        lines.push(format!("{}. **{title}**", i + 1));
        lines.push(format!("   URL: {url}"));
        lines.push(format!("   Summary: {}", truncate_snippet(snippet, snippet_chars)));
        lines.push(String::new());
    }

    Ok(lines.join("\n"))
}

/// Cut `snippet` to `max_chars` characters, appending `...` when it was longer.
pub fn truncate_snippet(snippet: &str, max_chars: usize) -> String {
    match snippet.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{ELLIPSIS}", &snippet[..byte_idx]),
        None => snippet.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn results(n: usize) -> Value {
        let items: Vec<Value> = (1..=n)
            .map(|i| {
                json!({
                    "title": format!("Result {i}"),
                    "url": format!("https://example.com/{i}"),
                    "content": "x".repeat(500),
                })
            })
            .collect();
        json!({ "results": items })
    }

    #[test]
    fn empty_results_is_literal_message() {
        let out = format_results(&json!({ "results": [] }), 10, 300).unwrap();
        assert_eq!(out, "No search results found.");
    }

    #[test]
    fn missing_results_key_is_empty() {
        let out = format_results(&json!({ "answer": "n/a" }), 10, 300).unwrap();
        assert_eq!(out, NO_RESULTS);
    }

    #[test]
    fn caps_at_ten_entries() {
        let out = format_results(&results(15), 10, 300).unwrap();

        assert!(out.starts_with("Web Search Results (15 results found):\n"));
        for i in 1..=10 {
            assert!(out.contains(&format!("\n{i}. **Result {i}**")), "missing entry {i}");
        }
        assert!(!out.contains("11. **"));

        let summaries: Vec<&str> = out
            .lines()
            .filter_map(|l| l.strip_prefix("   Summary: "))
            .collect();
        assert_eq!(summaries.len(), 10);
        for summary in summaries {
            assert_eq!(summary.chars().count(), 303);
            assert!(summary.ends_with("..."));
        }
    }

    #[test]
    fn entry_is_three_lines_and_a_blank() {
        let data = json!({ "results": [
            { "title": "Agentic AI", "url": "https://a.example", "content": "short" }
        ]});
        let out = format_results(&data, 10, 300).unwrap();
        assert_eq!(
            out,
            "Web Search Results (1 results found):\n\n\
             1. **Agentic AI**\n   URL: https://a.example\n   Summary: short\n"
        );
    }

    #[test]
    fn missing_fields_get_defaults() {
        let data = json!({ "results": [ {}, { "snippet": "from snippet" } ] });
        let out = format_results(&data, 10, 300).unwrap();
        assert!(out.contains("1. **No title**"));
        assert!(out.contains("URL: No URL"));
        assert!(out.contains("Summary: No description available"));
        assert!(out.contains("Summary: from snippet"));
    }

    #[test]
    fn content_wins_over_snippet() {
        let data = json!({ "results": [
            { "title": "t", "url": "u", "content": "body", "snippet": "teaser" }
        ]});
        let out = format_results(&data, 10, 300).unwrap();
        assert!(out.contains("Summary: body"));
        assert!(!out.contains("teaser"));
    }

    #[test]
    fn malformed_shapes_are_parse_errors() {
        let err = format_results(&json!({ "results": "nope" }), 10, 300).unwrap_err();
        assert!(matches!(err, ResearchError::Parse { .. }));

        let err = format_results(&json!({ "results": [1, 2] }), 10, 300).unwrap_err();
        assert!(err.to_string().contains("expected an object"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "é".repeat(301);
        let out = truncate_snippet(&text, 300);
        assert_eq!(out.chars().count(), 303);

        assert_eq!(truncate_snippet("exactly", 7), "exactly");
        assert_eq!(truncate_snippet("eight ch", 7), "eight c...");
    }
}
