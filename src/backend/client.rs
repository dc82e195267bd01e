//! HTTP client for the backend history and profile stores
//!
//! The backend is a hard dependency for the history read (a failed fetch
//! fails the turn, never retried), a soft dependency for the profile read
//! (failures degrade to placeholder preferences), and a best-effort sink
//! for the post-reply history write (failures are logged and swallowed).

use crate::backend::types::{AppendExchange, ExchangeRecord, Profile};
use crate::config::BackendConfig;
use crate::error::{Result, SportmateError};

use reqwest::Client;
use std::time::Duration;
use uuid::Uuid;

/// Typed client for the backend stores
///
/// Cheap to clone; the underlying `reqwest::Client` is shared. All calls
/// forward the caller's bearer token for authorization.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("sportmate/0.1.0")
            .build()
            .map_err(|e| {
                SportmateError::UpstreamUnavailable(format!(
                    "Failed to create HTTP client: {}",
                    e
                ))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the ordered list of prior exchanges for a session
    ///
    /// Hard dependency: a network error or non-success status fails with
    /// `UpstreamUnavailable` and is not retried.
    ///
    /// # Arguments
    ///
    /// * `session_id` - The session to read
    /// * `token` - Caller's bearer token, forwarded for authorization
    pub async fn fetch_history(
        &self,
        session_id: Uuid,
        token: &str,
    ) -> Result<Vec<ExchangeRecord>> {
        let url = format!("{}/c/chat-history/{}/", self.base_url, session_id);
        tracing::debug!("Fetching history: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                SportmateError::UpstreamUnavailable(format!("History fetch failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SportmateError::UpstreamUnavailable(format!(
                "History fetch returned {}",
                status
            ))
            .into());
        }

        let history: Vec<ExchangeRecord> = response.json().await.map_err(|e| {
            SportmateError::UpstreamUnavailable(format!(
                "Failed to parse history response: {}",
                e
            ))
        })?;

        tracing::debug!("Fetched {} prior exchanges", history.len());
        Ok(history)
    }

    /// Fetch the caller's profile, degrading to placeholders on failure
    ///
    /// Soft dependency: any failure (network, non-2xx, malformed body)
    /// returns `Profile::default()` and is logged, never surfaced.
    pub async fn fetch_profile_or_default(&self, token: &str) -> Profile {
        match self.fetch_profile(token).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Profile fetch failed, using placeholders: {}", e);
                Profile::default()
            }
        }
    }

    /// Fetch the caller's profile
    async fn fetch_profile(&self, token: &str) -> Result<Profile> {
        let url = format!("{}/auth/about/", self.base_url);
        tracing::debug!("Fetching profile: {}", url);

        let response = self.client.get(&url).bearer_auth(token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("Profile fetch returned {}", status));
        }

        Ok(response.json().await?)
    }

    /// Append an exchange to the history store
    ///
    /// The response body is ignored; only the status matters.
    pub async fn append_exchange(&self, write: &AppendExchange, token: &str) -> Result<()> {
        let url = format!("{}/chat/history/", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(write)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("History write returned {}", status));
        }

        Ok(())
    }

    /// Dispatch the post-reply history write as a detached task
    ///
    /// Fire-and-forget: the task runs fully decoupled from the response
    /// path and its failure is unobservable to the caller. The returned
    /// handle exists for tests; production callers drop it.
    pub fn spawn_append_exchange(
        &self,
        write: AppendExchange,
        token: String,
    ) -> tokio::task::JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(e) = client.append_exchange(&write, &token).await {
                tracing::warn!("Best-effort history write failed: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 2,
        })
        .unwrap()
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = test_client("http://backend.internal:8000/");
        assert_eq!(client.base_url, "http://backend.internal:8000");
    }

    #[tokio::test]
    async fn test_fetch_history_unreachable_is_upstream_unavailable() {
        // Port 1 is never listening
        let client = test_client("http://127.0.0.1:1");
        let err = client
            .fetch_history(Uuid::nil(), "token")
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SportmateError>(),
            Some(SportmateError::UpstreamUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_profile_unreachable_degrades_to_default() {
        let client = test_client("http://127.0.0.1:1");
        let profile = client.fetch_profile_or_default("token").await;
        assert_eq!(profile.favorite_sport, "Unknown");
        assert_eq!(profile.details, "No details available");
    }

    #[tokio::test]
    async fn test_spawn_append_exchange_swallows_failure() {
        let client = test_client("http://127.0.0.1:1");
        let handle = client.spawn_append_exchange(
            AppendExchange {
                message: "Hello".to_string(),
                session_id: Uuid::nil(),
                user: 1,
            },
            "token".to_string(),
        );
        // The task must complete without panicking even though the write fails
        handle.await.unwrap();
    }
}
