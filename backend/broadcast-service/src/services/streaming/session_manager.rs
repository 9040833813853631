//! Stream session manager (business logic layer)
//!
//! Orchestrates the session store, viewer counters and the provider gateway.
//!
//! State machine: `idle -> configuring -> live -> ended`. Every transition is a
//! conditional store write; a duplicate "went live" or "ended" signal comes
//! back as a `Conflict` carrying the current status and changes nothing.

use super::{RecordingDecision, RecordingHandoff};
use crate::config::{PolicyConfig, ProviderConfig};
use crate::db::{SessionStore, ViewerCounterStore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    CreateSessionRequest, CreateSessionResponse, CredentialRotation, IngestCredential,
    JoinSessionResponse, SessionHealth, SessionSnapshot, SessionStatus, SessionView,
    StreamSession, ViewerCounts, ViewerJoin,
};
use crate::services::access::Viewer;
use crate::services::credentials::CredentialGenerator;
use crate::services::provider::{ProviderSession, StreamingProvider};
use chrono::Utc;
use resilience::with_timeout_result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

/// Result of ending (or force-deleting) a session
#[derive(Debug, Clone, Serialize)]
pub struct EndedSession {
    pub session: SessionView,
    pub recording: RecordingDecision,
}

pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    counters: Arc<dyn ViewerCounterStore>,
    provider: Arc<dyn StreamingProvider>,
    handoff: Arc<dyn RecordingHandoff>,
    credentials: CredentialGenerator,
    provider_config: ProviderConfig,
    policy: PolicyConfig,
}

impl SessionManager {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        counters: Arc<dyn ViewerCounterStore>,
        provider: Arc<dyn StreamingProvider>,
        handoff: Arc<dyn RecordingHandoff>,
        provider_config: ProviderConfig,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            sessions,
            counters,
            provider,
            handoff,
            credentials: CredentialGenerator::new(),
            provider_config,
            policy,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, session_id: &str) -> Result<StreamSession> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))
    }

    /// Session with live counters; stored counters when Redis is unreachable
    pub async fn view(&self, session_id: &str) -> Result<(StreamSession, SessionView)> {
        let session = self.get(session_id).await?;
        let counts = self.live_counts(&session).await;
        let view = SessionView::new(&session, counts);
        Ok((session, view))
    }

    /// Load a session the actor may control: its creator or an admin
    pub async fn authorize_owner(&self, session_id: &str, actor: &Viewer) -> Result<StreamSession> {
        let Some(actor_id) = actor.user_id else {
            return Err(AppError::Authentication("sign-in required".into()));
        };
        let session = self.get(session_id).await?;
        if !actor.is_admin() && !session.is_owned_by(actor_id) {
            return Err(AppError::Authorization(format!(
                "session {session_id} belongs to another creator"
            )));
        }
        Ok(session)
    }

    async fn live_counts(&self, session: &StreamSession) -> ViewerCounts {
        let stored = session.stored_counts();
        if session.status.is_terminal() {
            return stored;
        }
        match self.counters.counts(&session.id).await {
            Ok(counts) => counts,
            Err(err) => {
                warn!(session_id = %session.id, error = %err, "viewer counters unavailable; using stored counts");
                stored
            }
        }
    }

    /// Error for a conditional write that matched nothing
    async fn rejected(&self, session_id: &str) -> AppError {
        match self.sessions.get_session(session_id).await {
            Ok(Some(current)) => AppError::conflict("session", session_id, current.status),
            Ok(None) => AppError::NotFound(format!("session {session_id}")),
            Err(err) => err,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn create(
        &self,
        creator_id: Uuid,
        request: CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        request.validate()?;

        if let Some(open) = self.sessions.find_open_session(creator_id).await? {
            return Err(AppError::Conflict(format!(
                "creator {creator_id} already has an open session {} ({})",
                open.id, open.status
            )));
        }

        let session_id = self.credentials.session_id();
        let (provider_session, degraded) =
            match self.provider.create_session(&request.title, creator_id).await {
                Ok(provider_session) => {
                    metrics::record_provider_call("create_session", true);
                    (provider_session, false)
                }
                Err(err) => {
                    metrics::record_provider_call("create_session", false);
                    metrics::record_degraded_session();
                    warn!(
                        session_id = %session_id,
                        creator_id = %creator_id,
                        degraded = true,
                        error = %err,
                        "provider unavailable; issuing local ingest credentials"
                    );
                    (self.fallback_session(&session_id), true)
                }
            };

        let now = Utc::now();
        let session = StreamSession {
            id: session_id.clone(),
            provider_session_id: provider_session.provider_session_id.clone(),
            creator_id,
            title: request.title,
            description: request.description,
            visibility: request.visibility,
            mode: request.mode,
            avatar_ref: request.avatar_ref,
            ingest_url: provider_session.ingest_url.clone(),
            playback_url: provider_session.playback_url.clone(),
            status: SessionStatus::Configuring,
            current_viewers: 0,
            peak_viewers: 0,
            total_viewers: 0,
            is_suspended: false,
            suspension_reason: None,
            degraded,
            created_at: now,
            started_at: None,
            ended_at: None,
        };
        self.sessions.insert_session(&session).await?;

        self.sessions
            .upsert_credential(&IngestCredential {
                creator_id,
                stream_key: provider_session.ingest_credential.clone(),
                ingest_url: provider_session.ingest_url.clone(),
                session_id: Some(session_id.clone()),
                provider_session_id: Some(provider_session.provider_session_id.clone()),
                rotated_at: now,
            })
            .await?;

        info!(
            session_id = %session_id,
            creator_id = %creator_id,
            provider_session_id = %session.provider_session_id,
            mode = session.mode.as_str(),
            degraded,
            "session created"
        );

        Ok(CreateSessionResponse {
            session_id,
            stream_key: provider_session.ingest_credential,
            ingest_url: provider_session.ingest_url,
            playback_url: provider_session.playback_url,
            status: session.status,
            degraded,
            created_at: now,
        })
    }

    /// Minimally usable fields when the provider cannot be reached
    fn fallback_session(&self, session_id: &str) -> ProviderSession {
        ProviderSession {
            provider_session_id: session_id.to_string(),
            ingest_credential: self.credentials.stream_key(),
            ingest_url: self.provider_config.ingest_url.clone(),
            playback_url: self.provider_config.playback_url_for(session_id),
        }
    }

    /// `configuring -> live`
    pub async fn mark_live(&self, session_id: &str) -> Result<StreamSession> {
        let live = self
            .sessions
            .transition_session(
                session_id,
                SessionStatus::sources_for(SessionStatus::Live),
                SessionStatus::Live,
                Utc::now(),
            )
            .await?;

        match live {
            Some(session) => {
                info!(session_id = %session_id, "session live");
                Ok(session)
            }
            None => Err(self.rejected(session_id).await),
        }
    }

    /// Any non-terminal state -> `ended`, then hand the snapshot to the
    /// recording pipeline unless the broadcast was too short to keep
    pub async fn end(&self, session_id: &str) -> Result<EndedSession> {
        let (session, counts) = self.close(session_id).await?;
        let ended_at = session.ended_at.unwrap_or_else(Utc::now);
        let snapshot = SessionSnapshot::from_ended(&session, counts, ended_at);

        let decision = if snapshot.duration_secs < self.policy.min_recording_duration_secs {
            info!(
                session_id = %session_id,
                duration_secs = snapshot.duration_secs,
                min_duration_secs = self.policy.min_recording_duration_secs,
                "broadcast below minimum duration; no recording"
            );
            RecordingDecision::SkippedTooShort {
                duration_secs: snapshot.duration_secs,
                min_duration_secs: self.policy.min_recording_duration_secs,
            }
        } else {
            match self.handoff.session_ended(&snapshot).await {
                Ok(decision) => decision,
                Err(err) => {
                    error!(
                        session_id = %session_id,
                        error = %err,
                        "recording hand-off failed after session ended"
                    );
                    RecordingDecision::HandoffFailed {
                        error: err.to_string(),
                    }
                }
            }
        };

        info!(
            session_id = %session_id,
            duration_secs = snapshot.duration_secs,
            peak_viewers = snapshot.peak_viewers,
            "session ended"
        );

        Ok(EndedSession {
            session: SessionView::new(&session, session.stored_counts()),
            recording: decision,
        })
    }

    /// End without a recording and tear down the provider-side session
    pub async fn force_delete(&self, session_id: &str) -> Result<EndedSession> {
        let (session, _) = self.close(session_id).await?;

        if !session.degraded {
            match self
                .provider
                .delete_session(&session.provider_session_id)
                .await
            {
                Ok(()) => metrics::record_provider_call("delete_session", true),
                Err(err) => {
                    metrics::record_provider_call("delete_session", false);
                    warn!(
                        session_id = %session_id,
                        provider_session_id = %session.provider_session_id,
                        error = %err,
                        "provider session deletion failed; session is ended locally"
                    );
                }
            }
        }

        info!(session_id = %session_id, "session force-deleted");

        Ok(EndedSession {
            session: SessionView::new(&session, session.stored_counts()),
            recording: RecordingDecision::Discarded,
        })
    }

    /// Transition to `ended` and fold the live counters into the session row
    async fn close(&self, session_id: &str) -> Result<(StreamSession, ViewerCounts)> {
        let Some(mut session) = self
            .sessions
            .transition_session(
                session_id,
                SessionStatus::sources_for(SessionStatus::Ended),
                SessionStatus::Ended,
                Utc::now(),
            )
            .await?
        else {
            return Err(self.rejected(session_id).await);
        };

        let counts = match self.counters.counts(session_id).await {
            Ok(counts) => counts,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "viewer counters unavailable at end");
                session.stored_counts()
            }
        };
        let final_counts = ViewerCounts {
            current: 0,
            peak: counts.peak.max(session.peak_viewers),
            total: counts.total.max(session.total_viewers),
        };
        // The session is already ended; a failed write here must not cost it
        // its recording hand-off.
        if let Err(err) = self
            .sessions
            .save_viewer_counts(session_id, final_counts)
            .await
        {
            error!(
                session_id = %session_id,
                peak = final_counts.peak,
                total = final_counts.total,
                error = %err,
                "failed to persist final viewer counts"
            );
        }
        if let Err(err) = self.counters.clear(session_id).await {
            warn!(session_id = %session_id, error = %err, "failed to clear viewer counters");
        }

        session.current_viewers = final_counts.current;
        session.peak_viewers = final_counts.peak;
        session.total_viewers = final_counts.total;

        Ok((session, final_counts))
    }

    /// Provider `session.active`
    pub async fn mark_live_by_provider_id(
        &self,
        provider_session_id: &str,
    ) -> Result<Option<StreamSession>> {
        match self
            .sessions
            .find_by_provider_session_id(provider_session_id)
            .await?
        {
            Some(session) if !session.status.can_transition_to(SessionStatus::Live) => Err(
                AppError::conflict("session", &session.id, session.status),
            ),
            Some(session) => self.mark_live(&session.id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Provider `session.idle`
    pub async fn end_by_provider_id(
        &self,
        provider_session_id: &str,
    ) -> Result<Option<EndedSession>> {
        match self
            .sessions
            .find_by_provider_session_id(provider_session_id)
            .await?
        {
            Some(session) if !session.status.can_transition_to(SessionStatus::Ended) => Err(
                AppError::conflict("session", &session.id, session.status),
            ),
            Some(session) => self.end(&session.id).await.map(Some),
            None => Ok(None),
        }
    }

    // =========================================================================
    // Viewers
    // =========================================================================

    pub async fn join_viewer(
        &self,
        session_id: &str,
        viewer_id: Option<String>,
    ) -> Result<JoinSessionResponse> {
        let session = self.get(session_id).await?;
        if session.status != SessionStatus::Live {
            return Err(AppError::conflict("session", session_id, session.status));
        }

        let anonymous = viewer_id.is_none();
        let viewer_id = viewer_id.unwrap_or_else(|| self.credentials.anonymous_viewer_id());

        self.sessions
            .insert_viewer_join(&ViewerJoin {
                id: Uuid::new_v4(),
                session_id: session_id.to_string(),
                viewer_id: viewer_id.clone(),
                anonymous,
                joined_at: Utc::now(),
                left_at: None,
            })
            .await?;
        let counts = self.counters.record_join(session_id).await?;

        debug!(
            session_id = %session_id,
            viewer_id = %viewer_id,
            current = counts.current,
            peak = counts.peak,
            "viewer joined"
        );

        Ok(JoinSessionResponse {
            viewer_id,
            playback_url: session.playback_url,
            counts,
        })
    }

    /// Closes the viewer's join record and decrements once per open record,
    /// so repeated leaves cannot drive the counter down twice
    pub async fn leave_viewer(&self, session_id: &str, viewer_id: &str) -> Result<ViewerCounts> {
        let session = self.get(session_id).await?;
        let closed = self
            .sessions
            .mark_viewer_left(session_id, viewer_id, Utc::now())
            .await?;

        if session.status.is_terminal() {
            return Ok(session.stored_counts());
        }
        if !closed {
            debug!(session_id = %session_id, viewer_id = %viewer_id, "leave without open join; ignored");
            return self.counters.counts(session_id).await;
        }

        let counts = self.counters.record_leave(session_id).await?;
        debug!(
            session_id = %session_id,
            viewer_id = %viewer_id,
            current = counts.current,
            "viewer left"
        );
        Ok(counts)
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Owner-only read of the ingest credential
    pub async fn credential(&self, creator_id: Uuid) -> Result<IngestCredential> {
        self.sessions
            .get_credential(creator_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ingest credential for creator {creator_id}")))
    }

    /// Replace the stored key. The provider is not asked to rotate, so an open
    /// session keeps accepting its previous key; that session is reported back.
    pub async fn regenerate_credential(&self, creator_id: Uuid) -> Result<CredentialRotation> {
        let previous = self.sessions.get_credential(creator_id).await?;
        let open = self.sessions.find_open_session(creator_id).await?;

        let rotated = IngestCredential {
            creator_id,
            stream_key: self.credentials.stream_key(),
            ingest_url: previous
                .map(|c| c.ingest_url)
                .unwrap_or_else(|| self.provider_config.ingest_url.clone()),
            session_id: None,
            provider_session_id: None,
            rotated_at: Utc::now(),
        };
        self.sessions.upsert_credential(&rotated).await?;

        let unaffected_session_id = open.map(|s| s.id);
        match &unaffected_session_id {
            Some(open_id) => warn!(
                creator_id = %creator_id,
                session_id = %open_id,
                "ingest credential rotated locally; open session keeps its provider-side key"
            ),
            None => info!(creator_id = %creator_id, "ingest credential rotated"),
        }

        Ok(CredentialRotation {
            stream_key: rotated.stream_key,
            ingest_url: rotated.ingest_url,
            rotated_at: rotated.rotated_at,
            unaffected_session_id,
        })
    }

    // =========================================================================
    // Health & moderation
    // =========================================================================

    /// Provider status under a short deadline; stored data when the provider
    /// is slow, failing, or was never involved (degraded sessions)
    pub async fn health(&self, session_id: &str) -> Result<SessionHealth> {
        let session = self.get(session_id).await?;

        if !session.degraded && !session.status.is_terminal() {
            let checked = with_timeout_result(
                Duration::from_millis(self.policy.status_timeout_ms),
                self.provider
                    .get_session_status(&session.provider_session_id),
            )
            .await;

            match checked {
                Ok(status) => {
                    metrics::record_provider_call("get_session_status", true);
                    return Ok(SessionHealth {
                        session_id: session.id,
                        is_active: status.is_active,
                        is_healthy: status.is_healthy,
                        viewer_count: status.viewer_count,
                        from_cache: false,
                    });
                }
                Err(err) => {
                    metrics::record_provider_call("get_session_status", false);
                    debug!(session_id = %session_id, error = %err, "status check failed; serving stored state");
                }
            }
        }

        let counts = self.live_counts(&session).await;
        let is_active = session.status == SessionStatus::Live;
        Ok(SessionHealth {
            session_id: session.id,
            is_active,
            is_healthy: is_active,
            viewer_count: counts.current,
            from_cache: true,
        })
    }

    /// Moderation flag; allowed after the session ended
    pub async fn set_suspension(
        &self,
        session_id: &str,
        suspended: bool,
        reason: Option<&str>,
    ) -> Result<StreamSession> {
        let session = self
            .sessions
            .set_suspension(session_id, suspended, reason)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;

        info!(session_id = %session_id, suspended, "session suspension updated");
        Ok(session)
    }
}
