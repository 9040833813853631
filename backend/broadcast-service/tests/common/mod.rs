//! Shared harness: the full service stack over in-memory stores and a
//! scriptable provider.

#![allow(dead_code)]

use async_trait::async_trait;
use broadcast_service::config::{PolicyConfig, ProviderConfig};
use broadcast_service::db::MemoryStore;
use broadcast_service::models::{BroadcastMode, CreateSessionRequest, Visibility};
use broadcast_service::services::provider::{
    ProviderError, ProviderSession, ProviderSessionStatus, StreamingProvider,
};
use broadcast_service::services::{RecordingCoordinator, SessionManager, WebhookProcessor};
use broadcast_service::AppState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Provider double. Healthy by default; `set_unavailable(true)` makes every
/// call fail the way a network outage would.
#[derive(Default)]
pub struct FakeProvider {
    unavailable: AtomicBool,
    created: AtomicUsize,
    pub deleted_sessions: Mutex<Vec<String>>,
    pub deleted_assets: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StreamingProvider for FakeProvider {
    async fn create_session(
        &self,
        _title: &str,
        _creator_id: Uuid,
    ) -> Result<ProviderSession, ProviderError> {
        self.check()?;
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ProviderSession {
            provider_session_id: format!("prov_ls_{n}"),
            ingest_credential: format!("provider-key-{n}"),
            ingest_url: "rtmps://ingest.test:443/app".into(),
            playback_url: format!("https://play.test/prov_ls_{n}.m3u8"),
        })
    }

    async fn delete_session(&self, provider_session_id: &str) -> Result<(), ProviderError> {
        self.check()?;
        self.deleted_sessions
            .lock()
            .await
            .push(provider_session_id.to_string());
        Ok(())
    }

    async fn get_session_status(
        &self,
        _provider_session_id: &str,
    ) -> Result<ProviderSessionStatus, ProviderError> {
        self.check()?;
        Ok(ProviderSessionStatus {
            is_active: true,
            is_healthy: true,
            viewer_count: 0,
        })
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<(), ProviderError> {
        self.check()?;
        self.deleted_assets.lock().await.push(asset_id.to_string());
        Ok(())
    }
}

pub struct TestStack {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<FakeProvider>,
    pub sessions: Arc<SessionManager>,
    pub recordings: Arc<RecordingCoordinator>,
    pub webhooks: Arc<WebhookProcessor>,
}

impl TestStack {
    pub fn new() -> Self {
        Self::with_policy(PolicyConfig {
            min_recording_duration_secs: 0,
            ..PolicyConfig::default()
        })
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(FakeProvider::default());
        let provider_config = ProviderConfig::default();

        let recordings = Arc::new(RecordingCoordinator::new(
            store.clone(),
            provider.clone(),
            provider_config.clone(),
            policy.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            store.clone(),
            provider.clone(),
            recordings.clone(),
            provider_config,
            policy,
        ));
        let webhooks = Arc::new(WebhookProcessor::new(
            recordings.clone(),
            sessions.clone(),
            store.clone(),
        ));

        Self {
            store,
            provider,
            sessions,
            recordings,
            webhooks,
        }
    }

    pub fn app_state(&self, webhook_secret: Option<&str>) -> AppState {
        AppState {
            sessions: self.sessions.clone(),
            recordings: self.recordings.clone(),
            webhooks: self.webhooks.clone(),
            webhook_secret: webhook_secret.map(String::from),
        }
    }

    /// Create a session and take it live; returns (session_id, provider_session_id)
    pub async fn live_session(&self, creator_id: Uuid, title: &str) -> (String, String) {
        let created = self
            .sessions
            .create(creator_id, create_request(title))
            .await
            .unwrap();
        let live = self.sessions.mark_live(&created.session_id).await.unwrap();
        (live.id, live.provider_session_id)
    }
}

pub fn create_request(title: &str) -> CreateSessionRequest {
    CreateSessionRequest {
        title: title.to_string(),
        description: Some("integration test".to_string()),
        visibility: Visibility::Public,
        mode: BroadcastMode::Video,
        avatar_ref: None,
    }
}

pub fn asset_ready(source_session_id: Option<&str>, asset_id: &str, name: &str, duration: f64) -> Vec<u8> {
    let source = source_session_id
        .map(|s| format!(r#", "source": {{"sessionId": "{s}"}}"#))
        .unwrap_or_default();
    format!(
        r#"{{"event": "asset.ready", "asset": {{"id": "{asset_id}", "name": "{name}",
            "playbackId": "pb_{asset_id}", "playbackUrl": "https://cdn.test/{asset_id}.m3u8",
            "status": "ready", "videoSpec": {{"duration": {duration}}}{source}}},
            "timestamp": "2026-10-16T10:00:00Z"}}"#
    )
    .into_bytes()
}

pub fn asset_failed(source_session_id: Option<&str>, asset_id: &str, error: &str) -> Vec<u8> {
    let source = source_session_id
        .map(|s| format!(r#", "source": {{"sessionId": "{s}"}}"#))
        .unwrap_or_default();
    format!(
        r#"{{"event": "asset.failed", "asset": {{"id": "{asset_id}", "status": "errored",
            "error": "{error}"{source}}}}}"#
    )
    .into_bytes()
}

pub fn asset_created(source_session_id: &str, asset_id: &str) -> Vec<u8> {
    format!(
        r#"{{"event": "asset.created", "asset": {{"id": "{asset_id}", "status": "preparing",
            "source": {{"sessionId": "{source_session_id}"}}}}}}"#
    )
    .into_bytes()
}

pub fn session_event(event: &str, provider_session_id: &str) -> Vec<u8> {
    format!(r#"{{"event": "{event}", "session": {{"id": "{provider_session_id}"}}}}"#).into_bytes()
}
