//! Recording models
//!
//! A recording is derived from an ended session and finalized by provider
//! webhooks. Status machine:
//!
//! ```text
//! pending -> processing -> ready
//! pending | processing  -> failed
//! any non-deleted       -> deleted
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::Visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Pending,
    Processing,
    Ready,
    Failed,
    Deleted,
}

impl RecordingStatus {
    pub const UNFINISHED: &'static [RecordingStatus] = &[Self::Pending, Self::Processing];
    pub const NOT_DELETED: &'static [RecordingStatus] =
        &[Self::Pending, Self::Processing, Self::Ready, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }

    /// Statuses from which `next` may be entered
    pub fn sources_for(next: RecordingStatus) -> &'static [RecordingStatus] {
        match next {
            Self::Pending => &[],
            Self::Processing => &[Self::Pending],
            Self::Ready | Self::Failed => Self::UNFINISHED,
            Self::Deleted => Self::NOT_DELETED,
        }
    }

    pub fn can_transition_to(&self, next: RecordingStatus) -> bool {
        Self::sources_for(next).contains(self)
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted recording
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recording {
    pub id: Uuid,
    /// Correlation key: the originating session ID
    pub session_id: Option<String>,
    pub provider_session_id: Option<String>,
    /// Secondary correlation key, known once the provider reports an asset
    pub provider_asset_id: Option<String>,
    pub provider_playback_id: Option<String>,
    /// `None` for recordings synthesized from an unmatched webhook
    pub creator_id: Option<Uuid>,
    /// Set on synthesized recordings until an admin (or a late session end) attributes them
    pub needs_attribution: bool,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub status: RecordingStatus,
    pub failure_reason: Option<String>,
    pub playback_url: Option<String>,
    pub download_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub file_size_bytes: Option<i64>,
    pub resolution: Option<String>,
    pub peak_viewers: i64,
    pub total_viewers: i64,
    pub is_hidden: bool,
    pub hidden_reason: Option<String>,
    pub deleted_by: Option<Uuid>,
    pub deletion_reason: Option<String>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub session_ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Recording {
    pub fn is_deleted(&self) -> bool {
        self.status == RecordingStatus::Deleted
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.creator_id == Some(user_id)
    }

    /// True when `key` is this recording's session or provider-session correlation key
    pub fn matches_session_key(&self, key: &str) -> bool {
        self.session_id.as_deref() == Some(key) || self.provider_session_id.as_deref() == Some(key)
    }
}

/// Fields written by a status transition. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct RecordingPatch {
    pub provider_asset_id: Option<String>,
    pub provider_playback_id: Option<String>,
    pub failure_reason: Option<String>,
    pub playback_url: Option<String>,
    pub download_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub file_size_bytes: Option<i64>,
    pub resolution: Option<String>,
    pub deleted_by: Option<Uuid>,
    pub deletion_reason: Option<String>,
    pub session_ended_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    /// Null out `failure_reason` and `failed_at` before the fields above apply
    pub clear_failure: bool,
}

impl RecordingPatch {
    /// Write `patch` onto `recording` (used by the in-memory store)
    pub fn apply_to(&self, recording: &mut Recording) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *target = Some(v.clone());
            }
        }
        if self.clear_failure {
            recording.failure_reason = None;
            recording.failed_at = None;
        }
        set(&mut recording.provider_asset_id, &self.provider_asset_id);
        set(&mut recording.provider_playback_id, &self.provider_playback_id);
        set(&mut recording.failure_reason, &self.failure_reason);
        set(&mut recording.playback_url, &self.playback_url);
        set(&mut recording.download_url, &self.download_url);
        set(&mut recording.duration_secs, &self.duration_secs);
        set(&mut recording.file_size_bytes, &self.file_size_bytes);
        set(&mut recording.resolution, &self.resolution);
        set(&mut recording.deleted_by, &self.deleted_by);
        set(&mut recording.deletion_reason, &self.deletion_reason);
        set(&mut recording.session_ended_at, &self.session_ended_at);
        set(&mut recording.ready_at, &self.ready_at);
        set(&mut recording.failed_at, &self.failed_at);
        set(&mut recording.deleted_at, &self.deleted_at);
    }
}

/// Values copied onto a pending recording that was synthesized before its session ended
#[derive(Debug, Clone)]
pub struct Attribution {
    pub creator_id: Uuid,
    pub session_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub peak_viewers: Option<i64>,
    pub total_viewers: Option<i64>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub session_ended_at: Option<DateTime<Utc>>,
}

impl Attribution {
    /// Creator-only attribution (admin re-attribution)
    pub fn creator(creator_id: Uuid) -> Self {
        Self {
            creator_id,
            session_id: None,
            title: None,
            description: None,
            visibility: None,
            peak_viewers: None,
            total_viewers: None,
            session_started_at: None,
            session_ended_at: None,
        }
    }

    pub fn apply_to(&self, recording: &mut Recording) {
        recording.creator_id = Some(self.creator_id);
        recording.needs_attribution = false;
        if let Some(session_id) = &self.session_id {
            recording.session_id = Some(session_id.clone());
        }
        if let Some(title) = &self.title {
            recording.title = title.clone();
        }
        if self.description.is_some() {
            recording.description = self.description.clone();
        }
        if let Some(visibility) = self.visibility {
            recording.visibility = visibility;
        }
        if let Some(peak) = self.peak_viewers {
            recording.peak_viewers = peak;
        }
        if let Some(total) = self.total_viewers {
            recording.total_viewers = total;
        }
        if self.session_started_at.is_some() {
            recording.session_started_at = self.session_started_at;
        }
        if self.session_ended_at.is_some() {
            recording.session_ended_at = self.session_ended_at;
        }
    }
}

/// Read-only recording snapshot for viewers
#[derive(Debug, Clone, Serialize)]
pub struct RecordingView {
    pub recording_id: Uuid,
    pub session_id: Option<String>,
    pub creator_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub status: RecordingStatus,
    pub playback_url: Option<String>,
    pub download_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub file_size_bytes: Option<i64>,
    pub resolution: Option<String>,
    pub peak_viewers: i64,
    pub total_viewers: i64,
    pub created_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
}

impl From<&Recording> for RecordingView {
    fn from(r: &Recording) -> Self {
        Self {
            recording_id: r.id,
            session_id: r.session_id.clone(),
            creator_id: r.creator_id,
            title: r.title.clone(),
            description: r.description.clone(),
            visibility: r.visibility,
            status: r.status,
            playback_url: r.playback_url.clone(),
            download_url: r.download_url.clone(),
            duration_secs: r.duration_secs,
            file_size_bytes: r.file_size_bytes,
            resolution: r.resolution.clone(),
            peak_viewers: r.peak_viewers,
            total_viewers: r.total_viewers,
            created_at: r.created_at,
            ready_at: r.ready_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_transitions() {
        use RecordingStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Ready));
        assert!(Processing.can_transition_to(Failed));
        assert!(Ready.can_transition_to(Deleted));
        assert!(Failed.can_transition_to(Deleted));

        assert!(!Ready.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Ready));
        assert!(!Deleted.can_transition_to(Deleted));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let now = Utc::now();
        let mut recording = Recording {
            id: Uuid::new_v4(),
            session_id: Some("ls_1".into()),
            provider_session_id: None,
            provider_asset_id: None,
            provider_playback_id: None,
            creator_id: None,
            needs_attribution: false,
            title: "t".into(),
            description: None,
            visibility: Visibility::Public,
            status: RecordingStatus::Pending,
            failure_reason: None,
            playback_url: None,
            download_url: Some("https://dl/keep".into()),
            duration_secs: None,
            file_size_bytes: None,
            resolution: None,
            peak_viewers: 0,
            total_viewers: 0,
            is_hidden: false,
            hidden_reason: None,
            deleted_by: None,
            deletion_reason: None,
            session_started_at: None,
            session_ended_at: None,
            created_at: now,
            updated_at: now,
            ready_at: None,
            failed_at: None,
            deleted_at: None,
        };

        RecordingPatch {
            playback_url: Some("https://play/x.m3u8".into()),
            duration_secs: Some(61.5),
            ..Default::default()
        }
        .apply_to(&mut recording);

        assert_eq!(recording.playback_url.as_deref(), Some("https://play/x.m3u8"));
        assert_eq!(recording.duration_secs, Some(61.5));
        assert_eq!(recording.download_url.as_deref(), Some("https://dl/keep"));
    }
}
