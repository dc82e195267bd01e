//! The turn pipeline: one user message in, one reply out
//!
//! This module implements the bridge between the backend stores and the
//! model provider. Each turn is independent and stateless except for the
//! externally persisted history it reads: fetch history (hard), fetch
//! profile (soft), assemble the context, let the model answer or invoke
//! tools for a bounded number of rounds, then dispatch the best-effort
//! history write and return the reply.

use crate::backend::{AppendExchange, BackendClient};
use crate::bridge::metrics::TurnMetrics;
use crate::bridge::Conversation;
use crate::config::BridgeConfig;
use crate::error::{Result, SportmateError};
use crate::prompts;
use crate::providers::{ModelDecision, Provider, ToolCall};
use crate::tools::{ToolRegistry, ToolResult};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Inputs for one turn
///
/// Mirrors the inbound wire object: the session is referenced by an
/// opaque UUID and the caller's bearer token is forwarded to the stores
/// for authorization. Session ownership is enforced by the backend
/// before the request reaches the bridge.
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Non-empty free-text user message
    pub message: String,
    /// Session the message belongs to
    pub session_id: Uuid,
    /// Owning user id
    pub user_id: i64,
    /// Opaque credential forwarded to the stores
    pub access_token: String,
}

/// Internal outcome of a turn, feeding telemetry
struct TurnOutcome {
    reply: String,
    tool_rounds: usize,
    tokens: usize,
}

/// The session bridge
///
/// Holds the process-wide pieces every turn shares: the model provider,
/// the tool registry, the backend client, and the turn limits. Built
/// once at startup and never mutated afterward.
pub struct Bridge {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    backend: BackendClient,
    config: BridgeConfig,
}

impl Bridge {
    /// Creates a new bridge
    ///
    /// # Errors
    ///
    /// Returns `SportmateError::Config` if the turn limits are invalid
    pub fn new(
        provider: Box<dyn Provider>,
        tools: ToolRegistry,
        backend: BackendClient,
        config: BridgeConfig,
    ) -> Result<Self> {
        if config.max_tool_rounds == 0 {
            return Err(
                SportmateError::Config("max_tool_rounds must be greater than 0".to_string())
                    .into(),
            );
        }

        Ok(Self {
            provider: Arc::from(provider),
            tools,
            backend,
            config,
        })
    }

    /// Turns one user message into one durable exchange
    ///
    /// Steps:
    /// 1. Fetch prior exchanges; failure is `UpstreamUnavailable` and no
    ///    model call is made.
    /// 2. Fetch the profile; failure degrades to placeholders.
    /// 3. Compose the input and assemble the bounded context.
    /// 4. Let the model answer directly or execute up to
    ///    `max_tool_rounds` rounds of tool calls.
    /// 5. Dispatch the fire-and-forget history write.
    /// 6. Return the final answer text.
    ///
    /// # Errors
    ///
    /// - `SportmateError::UpstreamUnavailable` if the history fetch fails
    /// - `SportmateError::Provider` / `SportmateError::Tool` if the model
    ///   call or a tool execution fails
    /// - `SportmateError::ToolRoundsExceeded` if the model keeps
    ///   requesting tools past the configured bound
    pub async fn handle_turn(&self, input: &TurnInput) -> Result<String> {
        let metrics = TurnMetrics::new();

        match self.execute_turn(input).await {
            Ok(outcome) => {
                metrics.record_completion(outcome.tool_rounds, outcome.tokens);
                info!(
                    session_id = %input.session_id,
                    tool_rounds = outcome.tool_rounds,
                    "Turn completed"
                );
                Ok(outcome.reply)
            }
            Err(e) => {
                metrics.record_error(classify_error(&e));
                Err(e)
            }
        }
    }

    async fn execute_turn(&self, input: &TurnInput) -> Result<TurnOutcome> {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        let history = self
            .backend
            .fetch_history(input.session_id, &input.access_token)
            .await?;

        let profile = self
            .backend
            .fetch_profile_or_default(&input.access_token)
            .await;

        let mut conversation = Conversation::new(
            self.config.conversation.max_tokens,
            self.config.conversation.min_retain_turns,
            self.config.conversation.prune_threshold.into(),
        );
        conversation.add_system_message(prompts::system_prompt());
        conversation.extend_from_exchanges(&history);
        conversation.add_user_message(prompts::compose_input(&input.message, &profile));

        let tool_definitions = self.tools.all_definitions();
        let mut tool_rounds = 0;

        let reply = loop {
            if start.elapsed() > timeout {
                warn!("Turn timed out after {:?}", start.elapsed());
                return Err(SportmateError::Provider(format!(
                    "Turn timed out after {} seconds",
                    self.config.timeout_seconds
                ))
                .into());
            }

            debug!(
                "Completion round {}, context tokens: {}",
                tool_rounds + 1,
                conversation.token_count()
            );

            let completion = self
                .provider
                .complete(conversation.messages(), &tool_definitions)
                .await?;

            if let Some(usage) = completion.usage {
                conversation.update_from_provider_usage(&usage);
            }

            match ModelDecision::from_message(completion.message)? {
                ModelDecision::Answer(text) => break text,
                ModelDecision::ToolRequests(tool_calls) => {
                    tool_rounds += 1;
                    if tool_rounds > self.config.max_tool_rounds {
                        warn!(
                            "Model requested tool round {} past limit {}",
                            tool_rounds, self.config.max_tool_rounds
                        );
                        return Err(SportmateError::ToolRoundsExceeded {
                            limit: self.config.max_tool_rounds,
                            message: format!(
                                "model requested tool round {} in one turn",
                                tool_rounds
                            ),
                        }
                        .into());
                    }

                    debug!("Executing {} tool calls", tool_calls.len());
                    conversation.add_assistant_tool_calls(tool_calls.clone());

                    for tool_call in &tool_calls {
                        let result = self.execute_tool_call(tool_call).await?;
                        conversation.add_tool_result(&tool_call.id, result.to_message());
                    }
                }
            }
        };

        // Dispatched only after the reply is computed; its failure is
        // unobservable to the caller.
        let _ = self.backend.spawn_append_exchange(
            AppendExchange {
                message: input.message.clone(),
                session_id: input.session_id,
                user: input.user_id,
            },
            input.access_token.clone(),
        );

        let tokens = conversation
            .provider_token_usage()
            .map(|u| u.total_tokens)
            .unwrap_or(0);

        Ok(TurnOutcome {
            reply,
            tool_rounds,
            tokens,
        })
    }

    /// Executes a single tool call
    ///
    /// # Errors
    ///
    /// Returns `SportmateError::Tool` if the tool is unknown, its
    /// arguments fail to parse, or execution fails
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        let tool_name = &tool_call.function.name;
        debug!("Executing tool: {}", tool_name);

        let executor = self
            .tools
            .get(tool_name)
            .ok_or_else(|| SportmateError::Tool(format!("Tool not found: {}", tool_name)))?;

        let args: serde_json::Value =
            serde_json::from_str(&tool_call.function.arguments).map_err(|e| {
                anyhow::Error::from(SportmateError::Tool(format!(
                    "Failed to parse tool arguments for '{}': {}",
                    tool_name, e
                )))
            })?;

        executor.execute(args).await.map_err(|e| {
            anyhow::Error::from(SportmateError::Tool(format!(
                "Tool '{}' execution failed: {}",
                tool_name, e
            )))
        })
    }

    /// Returns the name of the active model, for diagnostics
    pub fn model_name(&self) -> String {
        self.provider.model_name()
    }

    /// Returns the number of registered tools
    pub fn num_tools(&self) -> usize {
        self.tools.len()
    }
}

/// Maps an error to its telemetry label
fn classify_error(error: &anyhow::Error) -> &'static str {
    match error.downcast_ref::<SportmateError>() {
        Some(SportmateError::UpstreamUnavailable(_)) => "upstream_unavailable",
        Some(SportmateError::ToolRoundsExceeded { .. }) => "tool_rounds_exceeded",
        Some(SportmateError::Tool(_)) => "tool",
        Some(SportmateError::Provider(_)) => "provider",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::providers::{CompletionResponse, FunctionCall, Message};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock provider that replays scripted responses
    struct MockProvider {
        responses: Vec<Message>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockProvider {
        fn new(responses: Vec<Message>) -> Self {
            Self {
                responses,
                call_count: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[serde_json::Value],
        ) -> Result<CompletionResponse> {
            let mut count = self.call_count.lock().unwrap();
            let index = *count;
            *count += 1;

            if index < self.responses.len() {
                Ok(CompletionResponse::new(self.responses[index].clone()))
            } else {
                Ok(CompletionResponse::new(Message::assistant("Done")))
            }
        }
    }

    fn unreachable_backend() -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_seconds: 1,
        })
        .unwrap()
    }

    fn test_input() -> TurnInput {
        TurnInput {
            message: "Hello".to_string(),
            session_id: Uuid::nil(),
            user_id: 1,
            access_token: "token".to_string(),
        }
    }

    #[test]
    fn test_bridge_creation() {
        let provider = MockProvider::new(vec![]);
        let bridge = Bridge::new(
            Box::new(provider),
            ToolRegistry::new(),
            unreachable_backend(),
            BridgeConfig::default(),
        );
        assert!(bridge.is_ok());
    }

    #[test]
    fn test_bridge_creation_with_zero_rounds_fails() {
        let provider = MockProvider::new(vec![]);
        let config = BridgeConfig {
            max_tool_rounds: 0,
            ..Default::default()
        };
        let bridge = Bridge::new(
            Box::new(provider),
            ToolRegistry::new(),
            unreachable_backend(),
            config,
        );
        assert!(bridge.is_err());
    }

    #[tokio::test]
    async fn test_history_failure_skips_model_call() {
        let provider = MockProvider::new(vec![Message::assistant("never seen")]);
        let call_count = provider.call_count.clone();

        let bridge = Bridge::new(
            Box::new(provider),
            ToolRegistry::new(),
            unreachable_backend(),
            BridgeConfig::default(),
        )
        .unwrap();

        let err = bridge.handle_turn(&test_input()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SportmateError>(),
            Some(SportmateError::UpstreamUnavailable(_))
        ));
        assert_eq!(*call_count.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_execute_tool_call_unknown_tool() {
        let provider = MockProvider::new(vec![]);
        let bridge = Bridge::new(
            Box::new(provider),
            ToolRegistry::new(),
            unreachable_backend(),
            BridgeConfig::default(),
        )
        .unwrap();

        let tool_call = ToolCall {
            id: "call_1".to_string(),
            function: FunctionCall {
                name: "nonexistent".to_string(),
                arguments: "{}".to_string(),
            },
        };

        let err = bridge.execute_tool_call(&tool_call).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SportmateError>(),
            Some(SportmateError::Tool(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_tool_call_bad_arguments() {
        struct NoopTool;

        #[async_trait]
        impl crate::tools::ToolExecutor for NoopTool {
            fn tool_definition(&self) -> serde_json::Value {
                serde_json::json!({"name": "noop", "description": "", "parameters": {}})
            }
            async fn execute(&self, _args: serde_json::Value) -> Result<ToolResult> {
                Ok(ToolResult::success("ok".to_string()))
            }
        }

        let mut tools = ToolRegistry::new();
        tools.register("noop", Arc::new(NoopTool));

        let bridge = Bridge::new(
            Box::new(MockProvider::new(vec![])),
            tools,
            unreachable_backend(),
            BridgeConfig::default(),
        )
        .unwrap();

        let tool_call = ToolCall {
            id: "call_1".to_string(),
            function: FunctionCall {
                name: "noop".to_string(),
                arguments: "{not json".to_string(),
            },
        };

        assert!(bridge.execute_tool_call(&tool_call).await.is_err());
    }

    #[test]
    fn test_classify_error() {
        let upstream: anyhow::Error =
            SportmateError::UpstreamUnavailable("down".to_string()).into();
        assert_eq!(classify_error(&upstream), "upstream_unavailable");

        let rounds: anyhow::Error = SportmateError::ToolRoundsExceeded {
            limit: 1,
            message: "again".to_string(),
        }
        .into();
        assert_eq!(classify_error(&rounds), "tool_rounds_exceeded");

        let other = anyhow::anyhow!("misc");
        assert_eq!(classify_error(&other), "other");
    }
}
