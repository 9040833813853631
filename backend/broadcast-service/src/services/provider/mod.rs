//! Provider gateway
//!
//! Thin boundary around the external ingest/transcode provider. Everything
//! above this module sees only the normalized types defined here; provider
//! wire shapes stay inside `client.rs`.

mod client;

pub use client::HttpStreamingProvider;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Normalized result of creating a provider-side session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub provider_session_id: String,
    pub ingest_credential: String,
    pub ingest_url: String,
    pub playback_url: String,
}

/// Normalized provider-side status for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSessionStatus {
    pub is_active: bool,
    pub is_healthy: bool,
    pub viewer_count: i64,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    Decode(String),

    #[error("provider credentials not configured")]
    NotConfigured,
}

impl ProviderError {
    /// Timeouts, connection failures, throttling and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Transport(_) => true,
            ProviderError::Status { code, .. } => *code >= 500 || *code == 429,
            ProviderError::Decode(_) | ProviderError::NotConfigured => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Status { code: 404, .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Status {
                code: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Control-plane operations against the streaming provider
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    async fn create_session(
        &self,
        title: &str,
        creator_id: Uuid,
    ) -> Result<ProviderSession, ProviderError>;

    /// A provider 404 counts as success
    async fn delete_session(&self, provider_session_id: &str) -> Result<(), ProviderError>;

    async fn get_session_status(
        &self,
        provider_session_id: &str,
    ) -> Result<ProviderSessionStatus, ProviderError>;

    /// A provider 404 counts as success
    async fn delete_asset(&self, asset_id: &str) -> Result<(), ProviderError>;
}
