//! Persistence seam
//!
//! Services depend on these traits only. Postgres and Redis back them in
//! production; [`memory::MemoryStore`] backs the test suites.
//!
//! Every status change is a conditional write: the store applies it only when
//! the current status is one of `from`, and returns `None` otherwise. This is
//! what makes webhook re-delivery and duplicate lifecycle signals harmless.

pub mod memory;
pub mod recording_repo;
pub mod session_repo;
pub mod webhook_audit;

pub use memory::MemoryStore;
pub use recording_repo::PgRecordingStore;
pub use session_repo::PgSessionStore;
pub use webhook_audit::PgWebhookAuditLog;

use crate::error::Result;
use crate::models::{
    Attribution, IngestCredential, Recording, RecordingPatch, RecordingStatus, SessionStatus,
    StreamSession, ViewerCounts, ViewerJoin,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &StreamSession) -> Result<()>;

    async fn get_session(&self, session_id: &str) -> Result<Option<StreamSession>>;

    async fn find_by_provider_session_id(
        &self,
        provider_session_id: &str,
    ) -> Result<Option<StreamSession>>;

    /// Most recent non-ended session of a creator
    async fn find_open_session(&self, creator_id: Uuid) -> Result<Option<StreamSession>>;

    /// Conditional status change. `at` becomes `started_at` when entering
    /// `live` and `ended_at` when entering `ended`.
    async fn transition_session(
        &self,
        session_id: &str,
        from: &[SessionStatus],
        to: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<StreamSession>>;

    /// Persist a counter snapshot; peak and total never decrease
    async fn save_viewer_counts(&self, session_id: &str, counts: ViewerCounts) -> Result<()>;

    async fn set_suspension(
        &self,
        session_id: &str,
        suspended: bool,
        reason: Option<&str>,
    ) -> Result<Option<StreamSession>>;

    async fn upsert_credential(&self, credential: &IngestCredential) -> Result<()>;

    async fn get_credential(&self, creator_id: Uuid) -> Result<Option<IngestCredential>>;

    async fn insert_viewer_join(&self, join: &ViewerJoin) -> Result<()>;

    /// Close the viewer's open join record. `false` when none was open.
    async fn mark_viewer_left(
        &self,
        session_id: &str,
        viewer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// Atomic viewer counters. Join/leave must be single store-side operations.
#[async_trait]
pub trait ViewerCounterStore: Send + Sync {
    /// current += 1, total += 1, peak = max(peak, current)
    async fn record_join(&self, session_id: &str) -> Result<ViewerCounts>;

    /// current = max(current - 1, 0), peak = max(peak, current)
    async fn record_leave(&self, session_id: &str) -> Result<ViewerCounts>;

    async fn counts(&self, session_id: &str) -> Result<ViewerCounts>;

    async fn clear(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// `Conflict` when a non-deleted recording already holds the same asset ID
    async fn insert_recording(&self, recording: &Recording) -> Result<()>;

    async fn get_recording(&self, recording_id: Uuid) -> Result<Option<Recording>>;

    /// Recording whose session or provider-session ID is `key`. Non-deleted
    /// rows win over deleted ones, then newest first.
    async fn find_by_session_key(&self, key: &str) -> Result<Option<Recording>>;

    /// Recording with this provider asset ID, same precedence as above
    async fn find_by_asset_id(&self, asset_id: &str) -> Result<Option<Recording>>;

    /// Newest-first `pending`/`processing` recordings, at most `limit`
    async fn recent_unfinished(&self, limit: i64) -> Result<Vec<Recording>>;

    /// Conditional status change writing `patch` in the same statement
    async fn transition_recording(
        &self,
        recording_id: Uuid,
        from: &[RecordingStatus],
        to: RecordingStatus,
        patch: &RecordingPatch,
    ) -> Result<Option<Recording>>;

    /// Attach creator/session metadata to a non-deleted recording
    async fn attribute(
        &self,
        recording_id: Uuid,
        attribution: &Attribution,
    ) -> Result<Option<Recording>>;

    async fn set_hidden(
        &self,
        recording_id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> Result<Option<Recording>>;

    /// Non-deleted recordings flagged for attribution, newest first
    async fn list_needing_attribution(&self, limit: i64) -> Result<Vec<Recording>>;

    /// Unfinished recordings created before `cutoff`, oldest first
    async fn list_stale(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Recording>>;

    /// Hard delete. `false` when the row did not exist.
    async fn purge_recording(&self, recording_id: Uuid) -> Result<bool>;
}

/// One webhook delivery as received, with what was done about it
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAuditEntry {
    pub id: Uuid,
    pub event_type: String,
    pub asset_id: Option<String>,
    pub source_session_id: Option<String>,
    pub recording_id: Option<Uuid>,
    pub outcome: String,
    pub error: Option<String>,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

#[async_trait]
pub trait WebhookAuditLog: Send + Sync {
    async fn record_delivery(&self, entry: &WebhookAuditEntry) -> Result<()>;
}
