//! Configuration management for the SportMate session bridge
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, SportmateError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the bridge service
///
/// Holds everything needed to run a turn: the model provider, the
/// backend stores, the search tool, bridge behavior limits, and the
/// inbound HTTP server. Built once at startup and passed by reference
/// into the per-turn handler; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model provider configuration
    pub provider: ProviderConfig,

    /// Backend (history/profile store) configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Search tool configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Turn handling configuration
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Inbound HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Provider configuration
///
/// Specifies which model provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

fn default_provider_type() -> String {
    "gemini".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to use
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// API key; normally supplied via the GEMINI_API_KEY environment
    /// variable rather than the config file
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional API base URL (useful for tests and local mocks)
    ///
    /// When set, this base replaces the public Gemini endpoint, which
    /// allows tests to point the provider at a mock server.
    #[serde(default)]
    pub api_base: Option<String>,

    /// Timeout for model calls (seconds)
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            temperature: default_temperature(),
            api_key: None,
            api_base: None,
            timeout_seconds: default_provider_timeout(),
        }
    }
}

/// Backend store configuration
///
/// The backend exposes the history read/write endpoints and the profile
/// endpoint, all bearer-token authorized with the caller's token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Timeout for backend calls (seconds)
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_backend_timeout() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_seconds: default_backend_timeout(),
        }
    }
}

/// Search tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API key; normally supplied via the TAVILY_API_KEY environment
    /// variable rather than the config file
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Maximum number of results per search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Timeout for search calls (seconds)
    #[serde(default = "default_search_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of search requests per minute
    #[serde(default = "default_max_searches_per_minute")]
    pub max_searches_per_minute: u32,
}

fn default_max_results() -> usize {
    5
}

fn default_search_timeout() -> u64 {
    30
}

fn default_max_searches_per_minute() -> u32 {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: None,
            max_results: default_max_results(),
            timeout_seconds: default_search_timeout(),
            max_searches_per_minute: default_max_searches_per_minute(),
        }
    }
}

/// Turn handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Maximum tool-call rounds honored in a single turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Timeout for an entire turn (seconds)
    #[serde(default = "default_turn_timeout")]
    pub timeout_seconds: u64,

    /// Conversation context settings
    #[serde(default)]
    pub conversation: ConversationConfig,
}

fn default_max_tool_rounds() -> usize {
    1
}

fn default_turn_timeout() -> u64 {
    300
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            timeout_seconds: default_turn_timeout(),
            conversation: ConversationConfig::default(),
        }
    }
}

/// Conversation context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum tokens allowed in the assembled context
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Minimum number of turns to retain when pruning
    #[serde(default = "default_min_retain")]
    pub min_retain_turns: usize,

    /// Token threshold to trigger pruning (fraction of max_tokens)
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f32,
}

fn default_max_tokens() -> usize {
    100_000
}

fn default_min_retain() -> usize {
    5
}

fn default_prune_threshold() -> f32 {
    0.8
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            min_retain_turns: default_min_retain(),
            prune_threshold: default_prune_threshold(),
        }
    }
}

/// Inbound HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SportmateError::Config(format!("Failed to read {}: {}", path, e)))?;
        let config: Config = serde_yaml::from_str(&contents)
            .map_err(|e| SportmateError::Config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Build a configuration with all defaults
    pub fn default_config() -> Self {
        Self {
            provider: ProviderConfig::default(),
            backend: BackendConfig::default(),
            search: SearchConfig::default(),
            bridge: BridgeConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Recognized variables:
    /// - `SPORTMATE_BACKEND_URL` - backend base URL
    /// - `SPORTMATE_MODEL` - Gemini model id
    /// - `GEMINI_API_KEY` - model provider credentials
    /// - `TAVILY_API_KEY` - search tool credentials
    pub fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("SPORTMATE_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if let Ok(model) = std::env::var("SPORTMATE_MODEL") {
            self.provider.gemini.model = model;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            self.provider.gemini.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            self.search.api_key = Some(key);
        }
    }

    /// Apply CLI argument overrides
    pub fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let crate::cli::Commands::Serve {
            host,
            port,
            provider,
        } = &cli.command
        {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
            if let Some(provider) = provider {
                self.provider.provider_type = provider.clone();
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `SportmateError::Config` if any field is out of range or
    /// any URL fails to parse
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type != "gemini" {
            return Err(SportmateError::Config(format!(
                "Unknown provider type: {}",
                self.provider.provider_type
            ))
            .into());
        }

        url::Url::parse(&self.backend.base_url).map_err(|e| {
            SportmateError::Config(format!(
                "Invalid backend base_url '{}': {}",
                self.backend.base_url, e
            ))
        })?;

        if let Some(base) = &self.provider.gemini.api_base {
            url::Url::parse(base).map_err(|e| {
                SportmateError::Config(format!("Invalid gemini api_base '{}': {}", base, e))
            })?;
        }

        if let Some(base) = &self.search.api_base {
            url::Url::parse(base).map_err(|e| {
                SportmateError::Config(format!("Invalid search api_base '{}': {}", base, e))
            })?;
        }

        if !(0.0..=2.0).contains(&self.provider.gemini.temperature) {
            return Err(SportmateError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.provider.gemini.temperature
            ))
            .into());
        }

        if self.bridge.max_tool_rounds == 0 {
            return Err(
                SportmateError::Config("max_tool_rounds must be greater than 0".to_string())
                    .into(),
            );
        }

        if self.search.max_results == 0 {
            return Err(
                SportmateError::Config("search max_results must be greater than 0".to_string())
                    .into(),
            );
        }

        Ok(())
    }
}
