use crate::domain::model::{ModelResponse, ResponseFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*\n([\s\S]*?)\n```").unwrap());
static RAW_JSON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\{[\s\S]*\}|\[[\s\S]*\])").unwrap());

/// Finds the JSON payload in free-form model output: a fenced block first,
/// then the widest brace or bracket span.
pub fn extract_json(output: &str) -> Option<&str> {
    if let Some(caps) = CODE_BLOCK_RE.captures(output) {
        return caps.get(1).map(|m| m.as_str());
    }
    RAW_JSON_RE.find(output).map(|m| m.as_str())
}

pub fn parse_response(output: &str, format: ResponseFormat) -> ModelResponse {
    match format {
        ResponseFormat::Text => ModelResponse::Text(output.to_string()),
        ResponseFormat::Json => {
            let Some(payload) = extract_json(output) else {
                tracing::debug!("No JSON found in model output");
                return ModelResponse::Json(Value::Array(Vec::new()));
            };

            match serde_json::from_str(payload) {
                Ok(value) => ModelResponse::Json(value),
                Err(e) => {
                    tracing::warn!("Failed to parse JSON from model output: {}", e);
                    ModelResponse::Json(json!([{
                        "error": "Failed to parse JSON",
                        "raw_output": output,
                    }]))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_wins() {
        let output = "説明です\n```json\n[{\"id\": \"QA-001\"}]\n```\n{\"ignored\": true}";
        assert_eq!(
            parse_response(output, ResponseFormat::Json),
            ModelResponse::Json(json!([{"id": "QA-001"}]))
        );
    }

    #[test]
    fn test_unlabelled_fence_is_accepted() {
        let output = "```\n{\"id\": \"T-1\"}\n```";
        assert_eq!(extract_json(output), Some("{\"id\": \"T-1\"}"));
    }

    #[test]
    fn test_raw_json_span() {
        let output = "Here you go: [{\"id\": 1}, {\"id\": 2}] Thanks!";
        assert_eq!(
            parse_response(output, ResponseFormat::Json),
            ModelResponse::Json(json!([{"id": 1}, {"id": 2}]))
        );
    }

    #[test]
    fn test_no_json_returns_empty_list() {
        assert_eq!(
            parse_response("I cannot help with that.", ResponseFormat::Json),
            ModelResponse::Json(json!([]))
        );
    }

    #[test]
    fn test_invalid_json_is_wrapped() {
        let output = "{ not: valid }";
        let ModelResponse::Json(value) = parse_response(output, ResponseFormat::Json) else {
            panic!("expected json");
        };
        assert_eq!(value[0]["error"], "Failed to parse JSON");
        assert_eq!(value[0]["raw_output"], output);
    }

    #[test]
    fn test_text_format_passes_through() {
        assert_eq!(
            parse_response("plain answer", ResponseFormat::Text),
            ModelResponse::Text("plain answer".to_string())
        );
    }
}
