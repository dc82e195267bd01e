//! Error types for the SportMate session bridge
//!
//! This module defines all error types used throughout the service,
//! using `thiserror` for ergonomic error handling. The taxonomy separates
//! hard dependencies (history fetch, model invocation) from soft ones
//! (profile enrichment, post-reply history write), which never surface
//! an error to the caller.

use thiserror::Error;

/// Main error type for bridge operations
///
/// Variants map onto the externally visible failure classes: a failed
/// history fetch is `UpstreamUnavailable` (HTTP 502 at the server layer),
/// while provider, tool and round-limit failures all surface as a model
/// invocation failure (HTTP 500).
#[derive(Error, Debug)]
pub enum SportmateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (model API calls, malformed completions)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// A required upstream store (history fetch) was unreachable or
    /// returned a non-success status. Never retried automatically.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The model requested more tool-call rounds than the turn allows
    #[error("Tool round limit exceeded: limit={limit}, {message}")]
    ToolRoundsExceeded {
        /// The configured per-turn round limit
        limit: usize,
        /// Additional context about the failure
        message: String,
    },

    /// Missing credentials for a provider or tool
    #[error("Missing credentials for: {0}")]
    MissingCredentials(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for bridge operations
///
/// Uses `anyhow::Error` as the error type, allowing rich context while
/// the HTTP layer downcasts to [`SportmateError`] for status mapping.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = SportmateError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_provider_error_display() {
        let error = SportmateError::Provider("API timeout".to_string());
        assert_eq!(error.to_string(), "Provider error: API timeout");
    }

    #[test]
    fn test_tool_error_display() {
        let error = SportmateError::Tool("query missing".to_string());
        assert_eq!(error.to_string(), "Tool execution error: query missing");
    }

    #[test]
    fn test_upstream_unavailable_display() {
        let error = SportmateError::UpstreamUnavailable("history fetch returned 500".to_string());
        assert_eq!(
            error.to_string(),
            "Upstream unavailable: history fetch returned 500"
        );
    }

    #[test]
    fn test_tool_rounds_exceeded_display() {
        let error = SportmateError::ToolRoundsExceeded {
            limit: 1,
            message: "model requested a second search".to_string(),
        };
        assert!(error.to_string().contains("limit=1"));
        assert!(error.to_string().contains("second search"));
    }

    #[test]
    fn test_missing_credentials_display() {
        let error = SportmateError::MissingCredentials("gemini".to_string());
        assert_eq!(error.to_string(), "Missing credentials for: gemini");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: SportmateError = io_error.into();
        assert!(matches!(error, SportmateError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let error: SportmateError = json_error.into();
        assert!(matches!(error, SportmateError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: SportmateError = yaml_error.into();
        assert!(matches!(error, SportmateError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SportmateError>();
    }

    #[test]
    fn test_downcast_from_anyhow() {
        let err: anyhow::Error =
            SportmateError::UpstreamUnavailable("connection refused".to_string()).into();
        assert!(matches!(
            err.downcast_ref::<SportmateError>(),
            Some(SportmateError::UpstreamUnavailable(_))
        ));
    }
}
