//! In-memory store
//!
//! Implements every store trait behind `tokio::sync::Mutex`. Used by the
//! integration tests and handy for running the service without Postgres or
//! Redis. Each trait method holds one lock for its whole read-check-write, so
//! the conditional semantics match the SQL versions.

use super::{RecordingStore, SessionStore, ViewerCounterStore, WebhookAuditEntry, WebhookAuditLog};
use crate::error::{AppError, Result};
use crate::models::{
    Attribution, IngestCredential, Recording, RecordingPatch, RecordingStatus, SessionStatus,
    StreamSession, ViewerCounts, ViewerJoin,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, StreamSession>>,
    credentials: Mutex<HashMap<Uuid, IngestCredential>>,
    joins: Mutex<Vec<ViewerJoin>>,
    counters: Mutex<HashMap<String, ViewerCounts>>,
    /// Insertion order doubles as creation order
    recordings: Mutex<Vec<Recording>>,
    audit: Mutex<Vec<WebhookAuditEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all_recordings(&self) -> Vec<Recording> {
        self.recordings.lock().await.clone()
    }

    pub async fn audit_entries(&self) -> Vec<WebhookAuditEntry> {
        self.audit.lock().await.clone()
    }

    pub async fn viewer_joins(&self, session_id: &str) -> Vec<ViewerJoin> {
        self.joins
            .lock()
            .await
            .iter()
            .filter(|j| j.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &StreamSession) -> Result<()> {
        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<StreamSession>> {
        Ok(self.sessions.lock().await.get(session_id).cloned())
    }

    async fn find_by_provider_session_id(
        &self,
        provider_session_id: &str,
    ) -> Result<Option<StreamSession>> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .filter(|s| s.provider_session_id == provider_session_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn find_open_session(&self, creator_id: Uuid) -> Result<Option<StreamSession>> {
        Ok(self
            .sessions
            .lock()
            .await
            .values()
            .filter(|s| s.creator_id == creator_id && !s.status.is_terminal())
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn transition_session(
        &self,
        session_id: &str,
        from: &[SessionStatus],
        to: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<StreamSession>> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        if !from.contains(&session.status) {
            return Ok(None);
        }
        session.status = to;
        match to {
            SessionStatus::Live => {
                session.started_at.get_or_insert(at);
            }
            SessionStatus::Ended => session.ended_at = Some(at),
            _ => {}
        }
        Ok(Some(session.clone()))
    }

    async fn save_viewer_counts(&self, session_id: &str, counts: ViewerCounts) -> Result<()> {
        if let Some(session) = self.sessions.lock().await.get_mut(session_id) {
            let current = counts.current.max(0);
            session.current_viewers = current;
            session.peak_viewers = session.peak_viewers.max(counts.peak).max(current);
            session.total_viewers = session.total_viewers.max(counts.total);
        }
        Ok(())
    }

    async fn set_suspension(
        &self,
        session_id: &str,
        suspended: bool,
        reason: Option<&str>,
    ) -> Result<Option<StreamSession>> {
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(None);
        };
        session.is_suspended = suspended;
        session.suspension_reason = if suspended { reason.map(String::from) } else { None };
        Ok(Some(session.clone()))
    }

    async fn upsert_credential(&self, credential: &IngestCredential) -> Result<()> {
        self.credentials
            .lock()
            .await
            .insert(credential.creator_id, credential.clone());
        Ok(())
    }

    async fn get_credential(&self, creator_id: Uuid) -> Result<Option<IngestCredential>> {
        Ok(self.credentials.lock().await.get(&creator_id).cloned())
    }

    async fn insert_viewer_join(&self, join: &ViewerJoin) -> Result<()> {
        self.joins.lock().await.push(join.clone());
        Ok(())
    }

    async fn mark_viewer_left(
        &self,
        session_id: &str,
        viewer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut joins = self.joins.lock().await;
        let open = joins
            .iter_mut()
            .rev()
            .find(|j| j.session_id == session_id && j.viewer_id == viewer_id && j.left_at.is_none());
        match open {
            Some(join) => {
                join.left_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ViewerCounterStore for MemoryStore {
    async fn record_join(&self, session_id: &str) -> Result<ViewerCounts> {
        let mut counters = self.counters.lock().await;
        let counts = counters.entry(session_id.to_string()).or_default();
        counts.current += 1;
        counts.total += 1;
        counts.peak = counts.peak.max(counts.current);
        Ok(*counts)
    }

    async fn record_leave(&self, session_id: &str) -> Result<ViewerCounts> {
        let mut counters = self.counters.lock().await;
        let counts = counters.entry(session_id.to_string()).or_default();
        counts.current = (counts.current - 1).max(0);
        counts.peak = counts.peak.max(counts.current);
        Ok(*counts)
    }

    async fn counts(&self, session_id: &str) -> Result<ViewerCounts> {
        Ok(self
            .counters
            .lock()
            .await
            .get(session_id)
            .copied()
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        self.counters.lock().await.remove(session_id);
        Ok(())
    }
}

/// Newest non-deleted match, else newest deleted match
fn preferring_live(
    recordings: &[Recording],
    matches: impl Fn(&Recording) -> bool,
) -> Option<Recording> {
    let mut newest_deleted = None;
    for recording in recordings.iter().rev().filter(|r| matches(r)) {
        if !recording.is_deleted() {
            return Some(recording.clone());
        }
        newest_deleted.get_or_insert(recording);
    }
    newest_deleted.cloned()
}

#[async_trait]
impl RecordingStore for MemoryStore {
    async fn insert_recording(&self, recording: &Recording) -> Result<()> {
        let mut recordings = self.recordings.lock().await;
        if let Some(asset_id) = recording.provider_asset_id.as_deref() {
            let taken = recordings
                .iter()
                .any(|r| !r.is_deleted() && r.provider_asset_id.as_deref() == Some(asset_id));
            if taken {
                return Err(AppError::Conflict(format!(
                    "recording for asset {asset_id} already exists"
                )));
            }
        }
        recordings.push(recording.clone());
        Ok(())
    }

    async fn get_recording(&self, recording_id: Uuid) -> Result<Option<Recording>> {
        Ok(self
            .recordings
            .lock()
            .await
            .iter()
            .find(|r| r.id == recording_id)
            .cloned())
    }

    async fn find_by_session_key(&self, key: &str) -> Result<Option<Recording>> {
        let recordings = self.recordings.lock().await;
        Ok(preferring_live(&recordings, |r| r.matches_session_key(key)))
    }

    async fn find_by_asset_id(&self, asset_id: &str) -> Result<Option<Recording>> {
        let recordings = self.recordings.lock().await;
        Ok(preferring_live(&recordings, |r| {
            r.provider_asset_id.as_deref() == Some(asset_id)
        }))
    }

    async fn recent_unfinished(&self, limit: i64) -> Result<Vec<Recording>> {
        Ok(self
            .recordings
            .lock()
            .await
            .iter()
            .rev()
            .filter(|r| RecordingStatus::UNFINISHED.contains(&r.status))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn transition_recording(
        &self,
        recording_id: Uuid,
        from: &[RecordingStatus],
        to: RecordingStatus,
        patch: &RecordingPatch,
    ) -> Result<Option<Recording>> {
        let mut recordings = self.recordings.lock().await;
        let Some(recording) = recordings.iter_mut().find(|r| r.id == recording_id) else {
            return Ok(None);
        };
        if !from.contains(&recording.status) {
            return Ok(None);
        }
        recording.status = to;
        patch.apply_to(recording);
        recording.updated_at = Utc::now();
        Ok(Some(recording.clone()))
    }

    async fn attribute(
        &self,
        recording_id: Uuid,
        attribution: &Attribution,
    ) -> Result<Option<Recording>> {
        let mut recordings = self.recordings.lock().await;
        let Some(recording) = recordings
            .iter_mut()
            .find(|r| r.id == recording_id && !r.is_deleted())
        else {
            return Ok(None);
        };
        attribution.apply_to(recording);
        recording.updated_at = Utc::now();
        Ok(Some(recording.clone()))
    }

    async fn set_hidden(
        &self,
        recording_id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> Result<Option<Recording>> {
        let mut recordings = self.recordings.lock().await;
        let Some(recording) = recordings.iter_mut().find(|r| r.id == recording_id) else {
            return Ok(None);
        };
        recording.is_hidden = hidden;
        recording.hidden_reason = if hidden { reason.map(String::from) } else { None };
        recording.updated_at = Utc::now();
        Ok(Some(recording.clone()))
    }

    async fn list_needing_attribution(&self, limit: i64) -> Result<Vec<Recording>> {
        Ok(self
            .recordings
            .lock()
            .await
            .iter()
            .rev()
            .filter(|r| r.needs_attribution && !r.is_deleted())
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Recording>> {
        Ok(self
            .recordings
            .lock()
            .await
            .iter()
            .filter(|r| RecordingStatus::UNFINISHED.contains(&r.status) && r.created_at < cutoff)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn purge_recording(&self, recording_id: Uuid) -> Result<bool> {
        let mut recordings = self.recordings.lock().await;
        let before = recordings.len();
        recordings.retain(|r| r.id != recording_id);
        Ok(recordings.len() < before)
    }
}

#[async_trait]
impl WebhookAuditLog for MemoryStore {
    async fn record_delivery(&self, entry: &WebhookAuditEntry) -> Result<()> {
        self.audit.lock().await.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_never_negative() {
        let store = MemoryStore::new();
        let counts = store.record_leave("ls_1").await.unwrap();
        assert_eq!(counts, ViewerCounts::default());

        store.record_join("ls_1").await.unwrap();
        store.record_join("ls_1").await.unwrap();
        let counts = store.record_leave("ls_1").await.unwrap();
        assert_eq!(counts.current, 1);
        assert_eq!(counts.peak, 2);
        assert_eq!(counts.total, 2);
    }

    #[tokio::test]
    async fn test_leave_without_open_join() {
        let store = MemoryStore::new();
        assert!(!store.mark_viewer_left("ls_1", "v1", Utc::now()).await.unwrap());
    }
}
