//! Conversation context assembly with token tracking and pruning
//!
//! This module rebuilds the per-session conversation context from
//! persisted exchanges and keeps the assembled context bounded: when the
//! estimated token count crosses a threshold, older messages are pruned
//! while recent turns are kept and a summary of the removed content is
//! inserted.

use crate::backend::ExchangeRecord;
use crate::providers::{Message, TokenUsage, ToolCall};

/// Manages the per-turn conversation context
///
/// The conversation maintains an ordered list of messages and tracks the
/// estimated token count. Each turn assembles a fresh instance from the
/// fetched history; nothing is shared across turns.
///
/// # Token Counting
///
/// Uses a simple heuristic: characters / 4 (approximates tokenization
/// for English text). Provider-reported token counts are tracked
/// separately when available.
///
/// # Pruning Strategy
///
/// When the estimate exceeds `prune_threshold * max_tokens`:
/// 1. Keep system messages
/// 2. Keep the last `min_retain_turns` conversation turns
/// 3. Summarize and remove older messages
/// 4. Insert the summary as a new system message
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    token_count: usize,
    max_tokens: usize,
    min_retain_turns: usize,
    prune_threshold: f64,
    provider_token_usage: Option<TokenUsage>,
}

impl Conversation {
    /// Creates a new conversation with specified limits
    ///
    /// # Arguments
    ///
    /// * `max_tokens` - Maximum token count before pruning
    /// * `min_retain_turns` - Minimum conversation turns to keep during pruning
    /// * `prune_threshold` - Fraction of max_tokens that triggers pruning (0.0-1.0)
    pub fn new(max_tokens: usize, min_retain_turns: usize, prune_threshold: f64) -> Self {
        Self {
            messages: Vec::new(),
            token_count: 0,
            max_tokens,
            min_retain_turns,
            prune_threshold: prune_threshold.clamp(0.0, 1.0),
            provider_token_usage: None,
        }
    }

    /// Replays persisted exchanges into the context in store order
    ///
    /// Each exchange becomes a user message followed by an assistant
    /// message; exchanges whose bot reply was never set contribute only
    /// the user half.
    pub fn extend_from_exchanges(&mut self, exchanges: &[ExchangeRecord]) {
        for exchange in exchanges {
            self.add_user_message(exchange.user_message.clone());
            if let Some(bot_message) = &exchange.bot_message {
                self.add_assistant_message(bot_message.clone());
            }
        }
    }

    /// Adds a user message to the conversation
    pub fn add_user_message(&mut self, content: impl Into<String>) {
        let message = Message::user(content);
        self.update_token_count(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    /// Adds an assistant message to the conversation
    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        let message = Message::assistant(content);
        self.update_token_count(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    /// Adds an assistant message carrying tool calls
    ///
    /// Kept in the context so the following tool results can be matched
    /// back to their originating calls.
    pub fn add_assistant_tool_calls(&mut self, tool_calls: Vec<ToolCall>) {
        let message = Message::assistant_with_tools(tool_calls);
        self.update_token_count(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    /// Adds a tool result message to the conversation
    pub fn add_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        let message = Message::tool_result(tool_call_id, content);
        self.update_token_count(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    /// Adds a system message to the conversation
    pub fn add_system_message(&mut self, content: impl Into<String>) {
        let message = Message::system(content);
        self.update_token_count(&message);
        self.messages.push(message);
        self.prune_if_needed();
    }

    /// Updates the token count based on a new message
    fn update_token_count(&mut self, message: &Message) {
        let content_tokens = message
            .content
            .as_ref()
            .map(|s| estimate_tokens(s))
            .unwrap_or(0);

        let tool_calls_tokens = message
            .tool_calls
            .as_ref()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        estimate_tokens(&call.function.name)
                            + estimate_tokens(&call.function.arguments)
                    })
                    .sum()
            })
            .unwrap_or(0);

        self.token_count += content_tokens + tool_calls_tokens;
    }

    /// Prunes old messages if the token count exceeds the threshold
    ///
    /// Keeps system messages and the last `min_retain_turns` turns.
    /// Removed messages are summarized into a new system message.
    fn prune_if_needed(&mut self) {
        let threshold = (self.max_tokens as f64 * self.prune_threshold) as usize;

        if self.token_count <= threshold {
            return;
        }

        // Count backwards to find min_retain_turns user messages
        let mut keep_from_index = 0;
        let mut retained_turns = 0;

        for (idx, message) in self.messages.iter().enumerate().rev() {
            if message.role == "user" {
                retained_turns += 1;
                if retained_turns >= self.min_retain_turns {
                    keep_from_index = idx;
                    break;
                }
            }
        }

        if keep_from_index == 0 && !self.messages.is_empty() {
            return;
        }

        let mut system_messages = Vec::new();
        let mut to_prune = Vec::new();
        let mut to_keep = Vec::new();

        for (idx, message) in self.messages.drain(..).enumerate() {
            if message.role == "system" {
                system_messages.push(message);
            } else if idx < keep_from_index {
                to_prune.push(message);
            } else {
                to_keep.push(message);
            }
        }

        if !to_prune.is_empty() {
            let summary = create_summary(&to_prune);
            system_messages.push(Message::system(summary));
        }

        self.messages = system_messages;
        self.messages.extend(to_keep);

        self.recalculate_tokens();
    }

    /// Recalculates the total token count from all messages
    fn recalculate_tokens(&mut self) {
        self.token_count = 0;
        let messages = self.messages.clone();
        for message in &messages {
            self.update_token_count(message);
        }
    }

    /// Returns a reference to all messages in the conversation
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the current estimated token count
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Returns the number of messages in the conversation
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Accumulates provider-reported token usage across completions
    pub fn update_from_provider_usage(&mut self, usage: &TokenUsage) {
        if let Some(existing) = self.provider_token_usage {
            self.provider_token_usage = Some(TokenUsage::new(
                existing.prompt_tokens + usage.prompt_tokens,
                existing.completion_tokens + usage.completion_tokens,
            ));
        } else {
            self.provider_token_usage = Some(*usage);
        }
    }

    /// Returns accumulated provider token usage, if any was reported
    pub fn provider_token_usage(&self) -> Option<TokenUsage> {
        self.provider_token_usage
    }
}

/// Creates a summary of messages being pruned
fn create_summary(messages: &[Message]) -> String {
    let mut summary = String::from("Summary of earlier conversation:\n\n");

    let mut user_messages = 0;
    let mut assistant_messages = 0;
    let mut tool_calls = 0;

    for message in messages {
        match message.role.as_str() {
            "user" => user_messages += 1,
            "assistant" => {
                assistant_messages += 1;
                if let Some(calls) = &message.tool_calls {
                    tool_calls += calls.len();
                }
            }
            _ => {}
        }
    }

    summary.push_str(&format!("- {} user messages\n", user_messages));
    summary.push_str(&format!("- {} assistant responses\n", assistant_messages));
    if tool_calls > 0 {
        summary.push_str(&format!("- {} tool calls executed\n", tool_calls));
    }

    if let Some(first) = messages.first() {
        if let Some(content) = &first.content {
            summary.push_str(&format!("\nFirst message: {}\n", truncate_string(content, 100)));
        }
    }

    if messages.len() > 1 {
        if let Some(last) = messages.last() {
            if let Some(content) = &last.content {
                summary.push_str(&format!("Last message: {}\n", truncate_string(content, 100)));
            }
        }
    }

    summary
}

/// Estimates token count for a string using a simple heuristic
///
/// Uses characters / 4, which approximates tokenization for English text.
fn estimate_tokens(text: &str) -> usize {
    (text.chars().count() + 3) / 4
}

/// Truncates a string to a maximum length, adding ellipsis if truncated
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut truncated = s.chars().take(max_len - 3).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}
