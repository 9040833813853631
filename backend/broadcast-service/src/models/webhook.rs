//! Provider webhook payloads
//!
//! Wire shape: `{event, asset: {id, name, playbackId, playbackUrl, downloadUrl?,
//! status, videoSpec?, size?, source?}, session?: {id}, timestamp}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event kinds this service acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    /// Provider started building an asset from a session
    AssetCreated,
    AssetReady,
    AssetFailed,
    /// Media started arriving on the ingest endpoint
    SessionActive,
    /// Ingest went quiet / disconnected
    SessionIdle,
    Unknown(String),
}

impl WebhookEventKind {
    pub fn parse(event: &str) -> Self {
        match event {
            "asset.created" => Self::AssetCreated,
            "asset.ready" => Self::AssetReady,
            "asset.failed" | "asset.errored" => Self::AssetFailed,
            "session.active" | "live_stream.active" => Self::SessionActive,
            "session.idle" | "live_stream.idle" => Self::SessionIdle,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Metric / audit label
    pub fn label(&self) -> &str {
        match self {
            Self::AssetCreated => "asset.created",
            Self::AssetReady => "asset.ready",
            Self::AssetFailed => "asset.failed",
            Self::SessionActive => "session.active",
            Self::SessionIdle => "session.idle",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub asset: Option<AssetPayload>,
    #[serde(default)]
    pub session: Option<SessionPayload>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WebhookPayload {
    pub fn kind(&self) -> WebhookEventKind {
        WebhookEventKind::parse(&self.event)
    }

    /// Originating provider session ID from either the asset source or the session block
    pub fn source_session_id(&self) -> Option<&str> {
        self.asset
            .as_ref()
            .and_then(|a| a.source.as_ref())
            .and_then(|s| s.session_id.as_deref())
            .or_else(|| self.session.as_ref().map(|s| s.id.as_str()))
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPayload {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub playback_id: Option<String>,
    #[serde(default)]
    pub playback_url: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub video_spec: Option<VideoSpec>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub source: Option<AssetSource>,
    /// Failure description on `asset.failed`
    #[serde(default)]
    pub error: Option<String>,
}

impl AssetPayload {
    pub fn duration_secs(&self) -> Option<f64> {
        self.video_spec.as_ref().and_then(|v| v.duration)
    }

    /// `1920x1080` style string from explicit resolution or track dimensions
    pub fn resolution(&self) -> Option<String> {
        let spec = self.video_spec.as_ref()?;
        if let Some(res) = spec.resolution.as_ref().filter(|r| !r.is_empty()) {
            return Some(res.clone());
        }
        match (spec.width, spec.height) {
            (Some(w), Some(h)) => Some(format!("{w}x{h}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSpec {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSource {
    #[serde(default, alias = "liveStreamId", alias = "id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPayload {
    pub id: String,
}
