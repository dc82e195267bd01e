use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use serde_json::json;
use sportmate::config::Config;

/// Path the Gemini provider posts completions to for the default model
#[allow(dead_code)]
pub const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Build a config pointing every upstream at a mock server
#[allow(dead_code)]
pub fn test_config(backend_url: &str, gemini_url: &str, tavily_url: &str) -> Config {
    let mut config = Config::default_config();

    config.backend.base_url = backend_url.to_string();
    config.backend.timeout_seconds = 2;

    config.provider.gemini.api_key = Some("gemini-test-key".to_string());
    config.provider.gemini.api_base = Some(gemini_url.to_string());
    config.provider.gemini.timeout_seconds = 5;

    config.search.api_key = Some("tavily-test-key".to_string());
    config.search.api_base = Some(tavily_url.to_string());
    config.search.timeout_seconds = 5;

    config
}

/// Gemini completion body with a plain text answer
#[allow(dead_code)]
pub fn gemini_text_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 10,
            "candidatesTokenCount": 5,
            "totalTokenCount": 15
        }
    })
}

/// Gemini completion body requesting a search tool call
#[allow(dead_code)]
pub fn gemini_tool_call_body(query: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{
                    "functionCall": {
                        "name": "tavily_search",
                        "args": { "query": query }
                    }
                }]
            }
        }]
    })
}

/// Tavily search response body
#[allow(dead_code)]
pub fn tavily_body(answer: &str) -> serde_json::Value {
    json!({
        "query": "ignored",
        "answer": answer,
        "results": [{
            "title": "Match report",
            "url": "https://example.com/report",
            "content": "Full coverage of the match.",
            "score": 0.9
        }]
    })
}
