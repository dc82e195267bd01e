//! Wire types for the backend history and profile stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One prior exchange as served by the history read endpoint
///
/// Exchanges arrive ordered by creation time; that order is the
/// conversation history presented to the model. The bot message is
/// nullable upstream until the model call that produced it completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Verbatim user message text
    pub user_message: String,
    /// Produced bot reply text, if any
    #[serde(default)]
    pub bot_message: Option<String>,
    /// Creation timestamp; present in the upstream payload but ordering
    /// authority stays with the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// User-declared preferences consumed to personalize prompts
///
/// Any failure fetching the profile degrades to the placeholder values
/// rather than failing the turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Favorite sport, free text
    #[serde(default = "default_favorite_sport")]
    pub favorite_sport: String,
    /// Additional free-text details
    #[serde(default = "default_details")]
    pub details: String,
}

fn default_favorite_sport() -> String {
    "Unknown".to_string()
}

fn default_details() -> String {
    "No details available".to_string()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            favorite_sport: default_favorite_sport(),
            details: default_details(),
        }
    }
}

/// Payload for the best-effort history write
///
/// Carries only the user message; the backend pairs it with the reply it
/// proxies back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendExchange {
    /// Verbatim user message text
    pub message: String,
    /// Session the exchange belongs to
    pub session_id: Uuid,
    /// Owning user id
    pub user: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_record_deserializes_minimal() {
        let record: ExchangeRecord = serde_json::from_str(
            r#"{"user_message": "Hello", "bot_message": "Hi there!"}"#,
        )
        .unwrap();
        assert_eq!(record.user_message, "Hello");
        assert_eq!(record.bot_message.as_deref(), Some("Hi there!"));
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_exchange_record_tolerates_null_bot_message() {
        let record: ExchangeRecord =
            serde_json::from_str(r#"{"user_message": "Hello", "bot_message": null}"#).unwrap();
        assert!(record.bot_message.is_none());
    }

    #[test]
    fn test_exchange_record_parses_created_at() {
        let record: ExchangeRecord = serde_json::from_str(
            r#"{"user_message": "Hello", "bot_message": "Hi", "created_at": "2025-06-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(record.created_at.is_some());
    }

    #[test]
    fn test_profile_default_placeholders() {
        let profile = Profile::default();
        assert_eq!(profile.favorite_sport, "Unknown");
        assert_eq!(profile.details, "No details available");
    }

    #[test]
    fn test_profile_deserializes_partial_body() {
        let profile: Profile = serde_json::from_str(r#"{"favorite_sport": "soccer"}"#).unwrap();
        assert_eq!(profile.favorite_sport, "soccer");
        assert_eq!(profile.details, "No details available");
    }

    #[test]
    fn test_append_exchange_serialization() {
        let write = AppendExchange {
            message: "Hello".to_string(),
            session_id: Uuid::nil(),
            user: 42,
        };
        let json = serde_json::to_value(&write).unwrap();
        assert_eq!(json["message"], "Hello");
        assert_eq!(json["user"], 42);
        assert_eq!(json["session_id"], "00000000-0000-0000-0000-000000000000");
    }
}
