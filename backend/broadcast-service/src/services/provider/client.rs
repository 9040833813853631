//! HTTP client for the streaming provider
//!
//! `POST /session`, `DELETE /session/{id}`, `GET /session/{id}`,
//! `DELETE /asset/{id}`; all wrapped in the configured timeout + retry budget.

use super::{ProviderError, ProviderSession, ProviderSessionStatus, StreamingProvider};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use resilience::{call_with_policy, CallPolicy, RetryDecision, RetryError, TimeoutError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    title: &'a str,
    /// Echoed back in webhooks; lets support staff trace a session to its creator
    passthrough: String,
    playback_policy: [&'a str; 1],
    new_asset_settings: AssetSettings<'a>,
}

#[derive(Debug, Serialize)]
struct AssetSettings<'a> {
    playback_policy: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct SessionResource {
    id: String,
    #[serde(default)]
    stream_key: Option<String>,
    #[serde(default)]
    ingest_url: Option<String>,
    #[serde(default)]
    playback_ids: Vec<PlaybackId>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    viewer_count: Option<i64>,
    #[serde(default)]
    errored: bool,
}

#[derive(Debug, Deserialize)]
struct PlaybackId {
    id: String,
}

/// Provider gateway backed by `reqwest`
pub struct HttpStreamingProvider {
    client: Client,
    config: ProviderConfig,
    policy: CallPolicy,
}

impl HttpStreamingProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        let policy = config.call_policy();

        if !config.has_credentials() {
            warn!("provider credentials not configured; sessions will be created in degraded mode");
        }

        Ok(Self {
            client,
            config,
            policy,
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ProviderError> {
        if !self.config.has_credentials() {
            return Err(ProviderError::NotConfigured);
        }
        let (Some(id), Some(secret)) = (&self.config.token_id, &self.config.token_secret) else {
            return Err(ProviderError::NotConfigured);
        };
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        Ok(self.client.request(method, url).basic_auth(id, Some(secret)))
    }

    /// Run one logical call under the retry/timeout policy
    async fn call<F, Fut, T>(&self, operation: &'static str, f: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        call_with_policy(&self.policy, f, |err: &ProviderError| {
            if err.is_retryable() {
                RetryDecision::Retry
            } else {
                RetryDecision::Abort
            }
        })
        .await
        .map_err(|err: RetryError<TimeoutError<ProviderError>>| {
            let attempts = err.attempts();
            let inner = match err.into_inner() {
                TimeoutError::Elapsed(d) => ProviderError::Timeout(d),
                TimeoutError::OperationFailed(e) => e,
            };
            warn!(operation, attempts, error = %inner, "provider call failed");
            inner
        })
    }

    async fn send_delete(&self, path: String) -> Result<(), ProviderError> {
        let response = self.request(Method::DELETE, &path)?.send().await?;
        match ensure_success(response).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(%path, "provider resource already gone");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn normalize_session(&self, resource: SessionResource) -> Result<ProviderSession, ProviderError> {
        let ingest_credential = resource
            .stream_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Decode("session response missing stream_key".into()))?;
        let playback_id = resource
            .playback_ids
            .first()
            .map(|p| p.id.clone())
            .unwrap_or_else(|| resource.id.clone());

        Ok(ProviderSession {
            playback_url: self.config.playback_url_for(&playback_id),
            ingest_url: resource
                .ingest_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| self.config.ingest_url.clone()),
            provider_session_id: resource.id,
            ingest_credential,
        })
    }
}

fn normalize_status(resource: &SessionResource) -> ProviderSessionStatus {
    let status = resource.status.as_deref().unwrap_or("unknown");
    ProviderSessionStatus {
        is_active: status == "active",
        is_healthy: !resource.errored && matches!(status, "active" | "idle"),
        viewer_count: resource.viewer_count.unwrap_or(0).max(0),
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(ProviderError::Status {
        code: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    })
}

#[async_trait]
impl StreamingProvider for HttpStreamingProvider {
    async fn create_session(
        &self,
        title: &str,
        creator_id: Uuid,
    ) -> Result<ProviderSession, ProviderError> {
        let resource = self
            .call("create_session", move || async move {
                let body = CreateSessionBody {
                    title,
                    passthrough: creator_id.to_string(),
                    playback_policy: ["public"],
                    new_asset_settings: AssetSettings {
                        playback_policy: ["public"],
                    },
                };
                let response = self.request(Method::POST, "session")?.json(&body).send().await?;
                let envelope: Envelope<SessionResource> = ensure_success(response).await?.json().await?;
                Ok::<_, ProviderError>(envelope.data)
            })
            .await?;

        self.normalize_session(resource)
    }

    async fn delete_session(&self, provider_session_id: &str) -> Result<(), ProviderError> {
        self.call("delete_session", move || {
            self.send_delete(format!("session/{provider_session_id}"))
        })
        .await
    }

    async fn get_session_status(
        &self,
        provider_session_id: &str,
    ) -> Result<ProviderSessionStatus, ProviderError> {
        let response = self
            .request(Method::GET, &format!("session/{provider_session_id}"))?
            .send()
            .await?;
        let envelope: Envelope<SessionResource> = ensure_success(response).await?.json().await?;
        Ok(normalize_status(&envelope.data))
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<(), ProviderError> {
        self.call("delete_asset", move || self.send_delete(format!("asset/{asset_id}")))
            .await
    }
}
