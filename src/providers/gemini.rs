//! Gemini provider implementation
//!
//! This module implements the Provider trait for the Gemini
//! `generateContent` REST API, with function-calling support. The wire
//! format uses camelCase field names; messages are converted between the
//! bridge's role-based shape and Gemini's content/part structure.

use crate::config::GeminiConfig;
use crate::error::{Result, SportmateError};
use crate::providers::{
    validate_message_sequence, CompletionResponse, FunctionCall, Message, Provider, TokenUsage,
    ToolCall,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Public Gemini API endpoint, overridable via `api_base` for tests
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API provider
///
/// Connects to the Gemini `generateContent` endpoint to produce
/// completions with tool calling. The API key is sent in the
/// `x-goog-api-key` header.
///
/// # Examples
///
/// ```no_run
/// use sportmate::config::GeminiConfig;
/// use sportmate::providers::{GeminiProvider, Provider, Message};
///
/// # async fn example() -> sportmate::error::Result<()> {
/// let config = GeminiConfig {
///     api_key: Some("secret".to_string()),
///     ..Default::default()
/// };
/// let provider = GeminiProvider::new(config)?;
/// let messages = vec![Message::user("Hello!")];
/// let completion = provider.complete(&messages, &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

/// One content block in a Gemini conversation
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// A single part; exactly one of the fields is set
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

/// Function call emitted by the model
#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

/// Function result fed back to the model
#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

/// Tool declarations block
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolDeclarations {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

/// One declared function
#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Sampling configuration
#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

/// Request body for generateContent
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiToolDeclarations>,
    generation_config: GeminiGenerationConfig,
}

/// Response body from generateContent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

/// One response candidate
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Token accounting reported by the API
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    ///
    /// # Errors
    ///
    /// Returns `SportmateError::MissingCredentials` if no API key is
    /// configured, or a provider error if the HTTP client cannot be built
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SportmateError::MissingCredentials("gemini".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("sportmate/0.1.0")
            .build()
            .map_err(|e| {
                SportmateError::Provider(format!("Failed to create HTTP client: {}", e))
            })?;

        tracing::info!("Initialized Gemini provider: model={}", config.model);

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');
        format!(
            "{}/v1beta/models/{}:generateContent",
            base, self.config.model
        )
    }

    /// Convert bridge messages to Gemini contents
    ///
    /// System messages are folded into a single systemInstruction block.
    /// Tool results are matched back to the function name through the
    /// tool_call_id of the preceding assistant message.
    fn convert_messages(
        &self,
        messages: &[Message],
    ) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let validated = validate_message_sequence(messages);

        let mut call_names: HashMap<String, String> = HashMap::new();
        for message in &validated {
            if let Some(tool_calls) = &message.tool_calls {
                for tool_call in tool_calls {
                    call_names.insert(tool_call.id.clone(), tool_call.function.name.clone());
                }
            }
        }

        let mut system_parts: Vec<GeminiPart> = Vec::new();
        let mut contents: Vec<GeminiContent> = Vec::new();

        for message in &validated {
            match message.role.as_str() {
                "system" => {
                    if let Some(text) = &message.content {
                        system_parts.push(GeminiPart {
                            text: Some(text.clone()),
                            ..Default::default()
                        });
                    }
                }
                "user" => {
                    if let Some(text) = &message.content {
                        contents.push(GeminiContent {
                            role: Some("user".to_string()),
                            parts: vec![GeminiPart {
                                text: Some(text.clone()),
                                ..Default::default()
                            }],
                        });
                    }
                }
                "assistant" => {
                    let mut parts: Vec<GeminiPart> = Vec::new();
                    if let Some(text) = &message.content {
                        parts.push(GeminiPart {
                            text: Some(text.clone()),
                            ..Default::default()
                        });
                    }
                    if let Some(tool_calls) = &message.tool_calls {
                        for tool_call in tool_calls {
                            let args: serde_json::Value =
                                serde_json::from_str(&tool_call.function.arguments)
                                    .unwrap_or(serde_json::Value::Object(Default::default()));
                            parts.push(GeminiPart {
                                function_call: Some(GeminiFunctionCall {
                                    name: tool_call.function.name.clone(),
                                    args,
                                }),
                                ..Default::default()
                            });
                        }
                    }
                    if !parts.is_empty() {
                        contents.push(GeminiContent {
                            role: Some("model".to_string()),
                            parts,
                        });
                    }
                }
                "tool" => {
                    let name = message
                        .tool_call_id
                        .as_ref()
                        .and_then(|id| call_names.get(id))
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    let content = message.content.clone().unwrap_or_default();
                    contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts: vec![GeminiPart {
                            function_response: Some(GeminiFunctionResponse {
                                name,
                                response: serde_json::json!({ "content": content }),
                            }),
                            ..Default::default()
                        }],
                    });
                }
                other => {
                    tracing::warn!("Skipping message with unknown role: {}", other);
                }
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        (system_instruction, contents)
    }

    /// Convert tool schemas to Gemini function declarations
    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<GeminiToolDeclarations> {
        let declarations: Vec<GeminiFunctionDeclaration> = tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                let name = obj.get("name")?.as_str()?.to_string();
                let description = obj.get("description")?.as_str()?.to_string();
                let parameters = obj.get("parameters")?.clone();

                Some(GeminiFunctionDeclaration {
                    name,
                    description,
                    parameters,
                })
            })
            .collect();

        if declarations.is_empty() {
            Vec::new()
        } else {
            vec![GeminiToolDeclarations {
                function_declarations: declarations,
            }]
        }
    }

    /// Convert a Gemini candidate back to a bridge message
    fn convert_candidate(&self, content: GeminiContent) -> Message {
        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        for (idx, part) in content.parts.into_iter().enumerate() {
            if let Some(text) = part.text {
                text_parts.push(text);
            }
            if let Some(function_call) = part.function_call {
                // Gemini does not assign call ids; synthesize stable ones
                tool_calls.push(ToolCall {
                    id: format!(
                        "call_{}_{}",
                        std::time::SystemTime::now()
                            .duration_since(std::time::UNIX_EPOCH)
                            .unwrap_or_default()
                            .as_millis(),
                        idx
                    ),
                    function: FunctionCall {
                        name: function_call.name,
                        arguments: serde_json::to_string(&function_call.args)
                            .unwrap_or_else(|_| "{}".to_string()),
                    },
                });
            }
        }

        if !tool_calls.is_empty() {
            Message::assistant_with_tools(tool_calls)
        } else {
            Message::assistant(text_parts.join(""))
        }
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let (system_instruction, contents) = self.convert_messages(messages);

        let request = GeminiRequest {
            system_instruction,
            contents,
            tools: self.convert_tools(tools),
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let url = self.endpoint();
        tracing::debug!("Requesting Gemini completion: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Gemini request failed: {}", e);
                SportmateError::Provider(format!("Failed to reach Gemini API: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(SportmateError::Provider(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            SportmateError::Provider(format!("Failed to parse Gemini response: {}", e))
        })?;

        let usage = gemini_response.usage_metadata.map(|u| {
            TokenUsage::new(u.prompt_token_count, u.candidates_token_count)
        });

        let candidate = gemini_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| {
                SportmateError::Provider("Gemini returned no candidates".to_string())
            })?;

        if let Some(reason) = &candidate.finish_reason {
            tracing::debug!("Gemini finish reason: {}", reason);
        }

        let content = candidate.content.ok_or_else(|| {
            SportmateError::Provider("Gemini candidate has no content".to_string())
        })?;

        let message = self.convert_candidate(content);

        Ok(match usage {
            Some(usage) => CompletionResponse::with_usage(message, usage),
            None => CompletionResponse::new(message),
        })
    }

    fn model_name(&self) -> String {
        self.config.model.clone()
    }
}
