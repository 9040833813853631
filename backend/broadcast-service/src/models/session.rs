//! Live session models
//!
//! `StreamSession` is the persisted entity; `SessionView` is the read-only
//! snapshot handed to viewers. The ingest credential is never part of either:
//! it lives in [`IngestCredential`], readable by the owning creator only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

// =============================================================================
// Enums
// =============================================================================

/// Session lifecycle: `idle -> configuring -> live -> ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Not yet handed to the provider
    Idle,
    /// Provider accepted the session, waiting for media to arrive
    Configuring,
    /// Media is flowing
    Live,
    /// Terminal
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Live => "live",
            Self::Ended => "ended",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }

    /// Statuses from which `next` may be entered
    pub fn sources_for(next: SessionStatus) -> &'static [SessionStatus] {
        match next {
            Self::Idle => &[],
            Self::Configuring => &[Self::Idle],
            Self::Live => &[Self::Configuring],
            Self::Ended => &[Self::Idle, Self::Configuring, Self::Live],
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        Self::sources_for(next).contains(self)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may watch a session or recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Members,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Members => "members",
            Self::Private => "private",
        }
    }
}

/// Broadcast mode chosen at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BroadcastMode {
    Video,
    AudioOnly,
    Avatar,
}

impl BroadcastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::AudioOnly => "audio_only",
            Self::Avatar => "avatar",
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Persisted live session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StreamSession {
    pub id: String,
    pub provider_session_id: String,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub mode: BroadcastMode,
    pub avatar_ref: Option<String>,
    pub ingest_url: String,
    pub playback_url: String,
    pub status: SessionStatus,
    pub current_viewers: i64,
    pub peak_viewers: i64,
    pub total_viewers: i64,
    pub is_suspended: bool,
    pub suspension_reason: Option<String>,
    /// Created with local fallback credentials because the provider call failed
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl StreamSession {
    /// Seconds between going live and ending; zero if the session never went live
    pub fn broadcast_duration_secs(&self) -> i64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.signed_duration_since(start).num_seconds().max(0),
            _ => 0,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id
    }

    /// Counters as last persisted on the session row
    pub fn stored_counts(&self) -> ViewerCounts {
        ViewerCounts {
            current: self.current_viewers,
            peak: self.peak_viewers,
            total: self.total_viewers,
        }
    }
}

/// Ingest credential record, keyed by creator
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngestCredential {
    pub creator_id: Uuid,
    pub stream_key: String,
    pub ingest_url: String,
    /// Session the key was issued for, if any
    pub session_id: Option<String>,
    pub provider_session_id: Option<String>,
    pub rotated_at: DateTime<Utc>,
}

/// Per-viewer join record (analytics/audit)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ViewerJoin {
    pub id: Uuid,
    pub session_id: String,
    pub viewer_id: String,
    pub anonymous: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// Counter triple maintained atomically by the counter store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerCounts {
    pub current: i64,
    pub peak: i64,
    pub total: i64,
}

/// Metadata handed to the recording pipeline when a session ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub provider_session_id: String,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub peak_viewers: i64,
    pub total_viewers: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
}

impl SessionSnapshot {
    pub fn from_ended(session: &StreamSession, counts: ViewerCounts, ended_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id.clone(),
            provider_session_id: session.provider_session_id.clone(),
            creator_id: session.creator_id,
            title: session.title.clone(),
            description: session.description.clone(),
            visibility: session.visibility,
            peak_viewers: counts.peak.max(session.peak_viewers),
            total_viewers: counts.total.max(session.total_viewers),
            started_at: session.started_at,
            ended_at,
            duration_secs: session.broadcast_duration_secs(),
        }
    }
}

// =============================================================================
// API Request / Response Models
// =============================================================================

/// Request to create a new session
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_mode_fields"))]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default = "default_visibility")]
    pub visibility: Visibility,

    #[serde(default = "default_mode")]
    pub mode: BroadcastMode,

    /// Required when `mode == avatar`
    pub avatar_ref: Option<String>,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

fn default_mode() -> BroadcastMode {
    BroadcastMode::Video
}

fn validate_mode_fields(req: &CreateSessionRequest) -> Result<(), ValidationError> {
    if req.mode == BroadcastMode::Avatar
        && req.avatar_ref.as_deref().map(str::trim).unwrap_or("").is_empty()
    {
        let mut err = ValidationError::new("avatar_ref_required");
        err.message = Some("avatar mode requires an avatar reference".into());
        return Err(err);
    }
    Ok(())
}

/// Read-only session snapshot for viewers and UI collaborators
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub mode: BroadcastMode,
    pub status: SessionStatus,
    pub playback_url: Option<String>,
    pub current_viewers: i64,
    pub peak_viewers: i64,
    pub total_viewers: i64,
    pub is_suspended: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionView {
    pub fn new(session: &StreamSession, counts: ViewerCounts) -> Self {
        Self {
            session_id: session.id.clone(),
            creator_id: session.creator_id,
            title: session.title.clone(),
            description: session.description.clone(),
            visibility: session.visibility,
            mode: session.mode,
            status: session.status,
            playback_url: (session.status == SessionStatus::Live)
                .then(|| session.playback_url.clone()),
            current_viewers: counts.current,
            peak_viewers: counts.peak.max(counts.current),
            total_viewers: counts.total,
            is_suspended: session.is_suspended,
            created_at: session.created_at,
            started_at: session.started_at,
            ended_at: session.ended_at,
        }
    }
}

/// Response after creating a session (owner only)
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// Secret ingest key (only returned to the owner)
    pub stream_key: String,
    pub ingest_url: String,
    pub playback_url: String,
    pub status: SessionStatus,
    /// True when the provider was unreachable and local credentials were issued
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}

/// Response when a viewer joins
#[derive(Debug, Clone, Serialize)]
pub struct JoinSessionResponse {
    /// Echoed back, or a generated pseudo-ID for anonymous viewers
    pub viewer_id: String,
    pub playback_url: String,
    pub counts: ViewerCounts,
}

/// Provider-side health as seen by the status check
#[derive(Debug, Clone, Serialize)]
pub struct SessionHealth {
    pub session_id: String,
    pub is_active: bool,
    pub is_healthy: bool,
    pub viewer_count: i64,
    /// True when the provider could not be reached and stored data was used
    pub from_cache: bool,
}

/// Result of regenerating a creator's ingest credential
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRotation {
    pub stream_key: String,
    pub ingest_url: String,
    pub rotated_at: DateTime<Utc>,
    /// A non-ended session that still uses the previous provider-side key.
    /// Rotation is local only; the provider keeps accepting the old key for it.
    pub unaffected_session_id: Option<String>,
}
