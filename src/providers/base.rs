//! Base provider trait and common types
//!
//! This module defines the Provider trait that all model providers must
//! implement, along with common message types, the completion response
//! structure, and the decision type the bridge pattern-matches on.

use crate::error::{Result, SportmateError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for conversation
///
/// Represents a message in the conversation with the model provider.
/// Messages can be from the user, assistant, system, or tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Optional tool calls in the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional tool call ID (for tool result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new tool result message
    ///
    /// # Arguments
    ///
    /// * `tool_call_id` - The ID of the tool call this result corresponds to
    /// * `content` - The tool execution result content
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message carrying tool calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }
}

/// Function call information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as JSON string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific
/// arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        let total_tokens = prompt_tokens + completion_tokens;
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }
}

/// Completion response with message and optional token usage
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The response message from the model
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a new CompletionResponse without usage information
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a new CompletionResponse with token usage
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// The model's decision for one completion round
///
/// A completion either answers the user directly or requests tool
/// invocations. The bridge pattern-matches on this instead of inspecting
/// raw message fields at the call site.
#[derive(Debug, Clone)]
pub enum ModelDecision {
    /// A final natural-language answer
    Answer(String),
    /// One or more tool invocations to execute before answering
    ToolRequests(Vec<ToolCall>),
}

impl ModelDecision {
    /// Classify a completion message
    ///
    /// Non-empty tool calls win over content; a message with neither is
    /// a provider contract violation.
    ///
    /// # Errors
    ///
    /// Returns `SportmateError::Provider` if the message carries neither
    /// content nor tool calls
    pub fn from_message(message: Message) -> Result<Self> {
        if let Some(tool_calls) = message.tool_calls {
            if !tool_calls.is_empty() {
                return Ok(Self::ToolRequests(tool_calls));
            }
        }

        match message.content {
            Some(text) => Ok(Self::Answer(text)),
            None => Err(SportmateError::Provider(
                "Provider returned invalid response (no content or tool calls)".to_string(),
            )
            .into()),
        }
    }
}

/// Provider trait for model providers
///
/// The trait provides a common interface for completing conversations
/// with tool support.
///
/// # Examples
///
/// ```no_run
/// use sportmate::providers::{Provider, Message, CompletionResponse};
/// use sportmate::error::Result;
/// use async_trait::async_trait;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     async fn complete(
///         &self,
///         messages: &[Message],
///         tools: &[serde_json::Value],
///     ) -> Result<CompletionResponse> {
///         Ok(CompletionResponse::new(Message::assistant("Response")))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Completes a conversation with the given messages and available tools
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation history
    /// * `tools` - Available tools for the assistant to use (as JSON schemas)
    ///
    /// # Returns
    ///
    /// Returns the model's response message along with token usage
    /// information when the API reports it
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the response is invalid
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;

    /// Name of the active model, for diagnostics
    fn model_name(&self) -> String {
        "unknown".to_string()
    }
}

/// Validates message sequence and removes orphan tool messages
///
/// Orphan tool messages are those that don't have a corresponding
/// preceding assistant message with matching tool_calls. Dropping them
/// prevents provider API errors on malformed sequences.
pub fn validate_message_sequence(messages: &[Message]) -> Vec<Message> {
    use std::collections::HashSet;

    let mut valid_tool_ids: HashSet<String> = HashSet::new();
    for message in messages {
        if message.role == "assistant" {
            if let Some(tool_calls) = &message.tool_calls {
                for tool_call in tool_calls {
                    valid_tool_ids.insert(tool_call.id.clone());
                }
            }
        }
    }

    messages
        .iter()
        .filter_map(|message| {
            if message.role == "tool" {
                if let Some(tool_call_id) = &message.tool_call_id {
                    if !valid_tool_ids.contains(tool_call_id) {
                        tracing::warn!(
                            "Dropping orphan tool message with tool_call_id: {}",
                            tool_call_id
                        );
                        return None;
                    }
                } else {
                    tracing::warn!("Dropping tool message without tool_call_id");
                    return None;
                }
            }

            Some(message.clone())
        })
        .collect()
}
