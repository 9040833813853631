//! Recording pipeline coordinator
//!
//! Creates pending recordings when sessions end and reconciles provider
//! webhooks against them. Deliveries are at-least-once and unordered, so
//! every mutation here is a conditional store transition:
//!
//! - a repeated `asset.ready` finds the recording already `ready` and stops
//! - a late `asset.failed` never regresses `ready`
//! - `failed` and `deleted` are final for the webhook paths
//!
//! An `asset.ready` nobody can be matched to is kept as a synthesized
//! recording flagged `needs_attribution`; a later session end for the same
//! correlation key adopts it instead of inserting a second row.

use super::correlation::{resolve, CorrelationKeys, MatchStrategy};
use crate::config::{PolicyConfig, ProviderConfig};
use crate::db::RecordingStore;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    AssetPayload, Attribution, Recording, RecordingPatch, RecordingStatus, SessionSnapshot,
    Visibility, WebhookPayload,
};
use crate::services::access::Viewer;
use crate::services::provider::StreamingProvider;
use crate::services::streaming::{RecordingDecision, RecordingHandoff};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const UNTITLED: &str = "Untitled recording";
const STALE_BATCH: i64 = 100;
pub const PROVIDER_TIMEOUT_REASON: &str = "provider_timeout";

/// Source status for finalizing a recording the sweep gave up on
const SWEPT: &[RecordingStatus] = &[RecordingStatus::Failed];

/// What `create_pending` did
#[derive(Debug, Clone)]
pub enum PendingOutcome {
    Created(Recording),
    /// A synthesized recording for the same key was attributed to the session
    Adopted(Recording),
    /// A recording already exists for this session
    Existing(Recording),
}

impl PendingOutcome {
    pub fn recording(&self) -> &Recording {
        match self {
            Self::Created(r) | Self::Adopted(r) | Self::Existing(r) => r,
        }
    }
}

/// Processing result of one webhook event, separate from the HTTP acknowledgement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied {
        recording_id: Uuid,
        strategy: MatchStrategy,
        status: RecordingStatus,
    },
    Synthesized {
        recording_id: Uuid,
        status: RecordingStatus,
    },
    /// Already in the state this event would produce
    Duplicate { recording_id: Uuid },
    Ignored {
        recording_id: Option<Uuid>,
        reason: &'static str,
    },
    Unmatched,
}

impl ReconcileOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Synthesized { .. } => "synthesized",
            Self::Duplicate { .. } => "duplicate",
            Self::Ignored { .. } => "ignored",
            Self::Unmatched => "unmatched",
        }
    }

    pub fn recording_id(&self) -> Option<Uuid> {
        match self {
            Self::Applied { recording_id, .. }
            | Self::Synthesized { recording_id, .. }
            | Self::Duplicate { recording_id } => Some(*recording_id),
            Self::Ignored { recording_id, .. } => *recording_id,
            Self::Unmatched => None,
        }
    }
}

pub struct RecordingCoordinator {
    store: Arc<dyn RecordingStore>,
    provider: Arc<dyn StreamingProvider>,
    provider_config: ProviderConfig,
    policy: PolicyConfig,
}

impl RecordingCoordinator {
    pub fn new(
        store: Arc<dyn RecordingStore>,
        provider: Arc<dyn StreamingProvider>,
        provider_config: ProviderConfig,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            store,
            provider,
            provider_config,
            policy,
        }
    }

    pub async fn get(&self, recording_id: Uuid) -> Result<Recording> {
        self.store
            .get_recording(recording_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recording {recording_id}")))
    }

    /// Error for a conditional write that matched nothing
    async fn rejected(&self, recording_id: Uuid) -> AppError {
        match self.store.get_recording(recording_id).await {
            Ok(Some(current)) => AppError::conflict("recording", recording_id, current.status),
            Ok(None) => AppError::NotFound(format!("recording {recording_id}")),
            Err(err) => err,
        }
    }

    // =========================================================================
    // Session hand-off
    // =========================================================================

    pub async fn create_pending(&self, snapshot: &SessionSnapshot) -> Result<PendingOutcome> {
        let mut existing = self.store.find_by_session_key(&snapshot.session_id).await?;
        if existing.is_none() && snapshot.provider_session_id != snapshot.session_id {
            existing = self
                .store
                .find_by_session_key(&snapshot.provider_session_id)
                .await?;
        }

        if let Some(existing) = existing.filter(|r| !r.is_deleted()) {
            if !existing.needs_attribution {
                debug!(
                    session_id = %snapshot.session_id,
                    recording_id = %existing.id,
                    "recording already exists for session"
                );
                return Ok(PendingOutcome::Existing(existing));
            }

            if let Some(adopted) = self
                .store
                .attribute(existing.id, &attribution_from(snapshot))
                .await?
            {
                info!(
                    session_id = %snapshot.session_id,
                    recording_id = %adopted.id,
                    status = %adopted.status,
                    "adopted synthesized recording"
                );
                return Ok(PendingOutcome::Adopted(adopted));
            }
        }

        let recording = pending_recording(snapshot, Utc::now());
        self.store.insert_recording(&recording).await?;

        info!(
            session_id = %snapshot.session_id,
            recording_id = %recording.id,
            creator_id = %snapshot.creator_id,
            "pending recording created"
        );

        Ok(PendingOutcome::Created(recording))
    }

    /// `pending -> processing` once the duration is known
    pub async fn mark_processing(
        &self,
        recording_id: Uuid,
        ended_at: DateTime<Utc>,
        duration_secs: f64,
    ) -> Result<Recording> {
        let patch = RecordingPatch {
            session_ended_at: Some(ended_at),
            duration_secs: Some(duration_secs),
            ..Default::default()
        };

        match self
            .store
            .transition_recording(
                recording_id,
                RecordingStatus::sources_for(RecordingStatus::Processing),
                RecordingStatus::Processing,
                &patch,
            )
            .await?
        {
            Some(updated) => Ok(updated),
            None => Err(self.rejected(recording_id).await),
        }
    }

    // =========================================================================
    // Webhook reconciliation
    // =========================================================================

    pub async fn handle_asset_created(&self, payload: &WebhookPayload) -> Result<ReconcileOutcome> {
        let Some(asset) = payload.asset.as_ref() else {
            return Ok(ReconcileOutcome::Ignored {
                recording_id: None,
                reason: "missing_asset",
            });
        };

        let keys = CorrelationKeys::from_payload(payload);
        let Some((recording, strategy)) =
            resolve(self.store.as_ref(), &keys, self.policy.heuristic_window).await?
        else {
            info!(asset_id = %asset.id, "asset.created matched no recording");
            return Ok(ReconcileOutcome::Unmatched);
        };

        match recording.status {
            RecordingStatus::Processing
                if recording.provider_asset_id.as_deref() == Some(asset.id.as_str()) =>
            {
                Ok(ReconcileOutcome::Duplicate {
                    recording_id: recording.id,
                })
            }
            RecordingStatus::Pending | RecordingStatus::Processing => {
                let patch = RecordingPatch {
                    provider_asset_id: Some(asset.id.clone()),
                    provider_playback_id: asset.playback_id.clone(),
                    duration_secs: asset.duration_secs(),
                    ..Default::default()
                };
                let updated = self
                    .store
                    .transition_recording(
                        recording.id,
                        RecordingStatus::UNFINISHED,
                        RecordingStatus::Processing,
                        &patch,
                    )
                    .await?;

                Ok(match updated {
                    Some(updated) => {
                        info!(
                            recording_id = %updated.id,
                            asset_id = %asset.id,
                            strategy = %strategy,
                            "recording processing"
                        );
                        ReconcileOutcome::Applied {
                            recording_id: updated.id,
                            strategy,
                            status: updated.status,
                        }
                    }
                    None => ReconcileOutcome::Duplicate {
                        recording_id: recording.id,
                    },
                })
            }
            RecordingStatus::Deleted => Ok(ReconcileOutcome::Ignored {
                recording_id: Some(recording.id),
                reason: "deleted",
            }),
            RecordingStatus::Ready | RecordingStatus::Failed => Ok(ReconcileOutcome::Ignored {
                recording_id: Some(recording.id),
                reason: "already_final",
            }),
        }
    }

    pub async fn handle_asset_ready(&self, payload: &WebhookPayload) -> Result<ReconcileOutcome> {
        let Some(asset) = payload.asset.as_ref() else {
            return Ok(ReconcileOutcome::Ignored {
                recording_id: None,
                reason: "missing_asset",
            });
        };

        let keys = CorrelationKeys::from_payload(payload);
        match resolve(self.store.as_ref(), &keys, self.policy.heuristic_window).await? {
            Some((recording, strategy)) => self.finalize_ready(recording, strategy, asset).await,
            None => self.synthesize(payload, asset).await,
        }
    }

    async fn finalize_ready(
        &self,
        recording: Recording,
        strategy: MatchStrategy,
        asset: &AssetPayload,
    ) -> Result<ReconcileOutcome> {
        match recording.status {
            RecordingStatus::Ready => {
                debug!(recording_id = %recording.id, "duplicate asset.ready");
                return Ok(ReconcileOutcome::Duplicate {
                    recording_id: recording.id,
                });
            }
            RecordingStatus::Failed if failed_by_sweep(&recording) => {
                info!(
                    recording_id = %recording.id,
                    asset_id = %asset.id,
                    "late asset.ready for a timed-out recording"
                );
            }
            RecordingStatus::Failed => {
                info!(
                    recording_id = %recording.id,
                    asset_id = %asset.id,
                    "asset.ready for failed recording ignored"
                );
                return Ok(ReconcileOutcome::Ignored {
                    recording_id: Some(recording.id),
                    reason: "already_failed",
                });
            }
            RecordingStatus::Deleted => {
                return Ok(ReconcileOutcome::Ignored {
                    recording_id: Some(recording.id),
                    reason: "deleted",
                });
            }
            RecordingStatus::Pending | RecordingStatus::Processing => {}
        }

        let from = if recording.status == RecordingStatus::Failed {
            SWEPT
        } else {
            RecordingStatus::UNFINISHED
        };
        let (to, patch) = self.ready_or_failed(asset, Utc::now());
        let updated = self
            .store
            .transition_recording(recording.id, from, to, &patch)
            .await?;

        let Some(updated) = updated else {
            // a concurrent delivery got there first
            return Ok(ReconcileOutcome::Duplicate {
                recording_id: recording.id,
            });
        };

        info!(
            recording_id = %updated.id,
            asset_id = %asset.id,
            strategy = %strategy,
            status = %updated.status,
            "recording finalized"
        );

        Ok(ReconcileOutcome::Applied {
            recording_id: updated.id,
            strategy,
            status: updated.status,
        })
    }

    async fn synthesize(
        &self,
        payload: &WebhookPayload,
        asset: &AssetPayload,
    ) -> Result<ReconcileOutcome> {
        let now = Utc::now();
        let (status, patch) = self.ready_or_failed(asset, now);

        let mut recording = synthesized_recording(payload, asset, status, now);
        patch.apply_to(&mut recording);

        match self.store.insert_recording(&recording).await {
            Ok(()) => {
                warn!(
                    recording_id = %recording.id,
                    asset_id = %asset.id,
                    source_session_id = payload.source_session_id().unwrap_or("-"),
                    status = %status,
                    "asset.ready matched no recording; synthesized one for attribution"
                );
                Ok(ReconcileOutcome::Synthesized {
                    recording_id: recording.id,
                    status,
                })
            }
            Err(AppError::Conflict(_)) => {
                // another delivery inserted the asset between our lookup and insert
                match self.store.find_by_asset_id(&asset.id).await? {
                    Some(existing) => {
                        self.finalize_ready(existing, MatchStrategy::AssetId, asset)
                            .await
                    }
                    None => Ok(ReconcileOutcome::Unmatched),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// `ready` patch, or a `failed` one when the asset breaks the ready invariant
    fn ready_or_failed(
        &self,
        asset: &AssetPayload,
        now: DateTime<Utc>,
    ) -> (RecordingStatus, RecordingPatch) {
        match self.ready_patch(asset, now) {
            Ok(patch) => (RecordingStatus::Ready, patch),
            Err(reason) => {
                warn!(asset_id = %asset.id, reason, "asset cannot be marked ready");
                (
                    RecordingStatus::Failed,
                    failed_patch(Some(asset), reason.to_string(), now),
                )
            }
        }
    }

    fn ready_patch(
        &self,
        asset: &AssetPayload,
        now: DateTime<Utc>,
    ) -> std::result::Result<RecordingPatch, &'static str> {
        let playback_url = asset
            .playback_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| {
                asset
                    .playback_id
                    .as_deref()
                    .filter(|id| !id.trim().is_empty())
                    .map(|id| self.provider_config.playback_url_for(id))
            })
            .ok_or("missing_playback_url")?;

        let duration = asset
            .duration_secs()
            .filter(|d| d.is_finite())
            .ok_or("missing_duration")?;
        if duration < self.policy.min_asset_duration_secs {
            return Err("duration_below_minimum");
        }

        Ok(RecordingPatch {
            provider_asset_id: Some(asset.id.clone()),
            provider_playback_id: asset.playback_id.clone(),
            playback_url: Some(playback_url),
            download_url: asset.download_url.clone(),
            duration_secs: Some(duration),
            file_size_bytes: asset.size,
            resolution: asset.resolution(),
            ready_at: Some(now),
            clear_failure: true,
            ..Default::default()
        })
    }

    pub async fn handle_asset_failed(&self, payload: &WebhookPayload) -> Result<ReconcileOutcome> {
        let keys = CorrelationKeys::from_payload(payload);
        let Some((recording, strategy)) =
            resolve(self.store.as_ref(), &keys, self.policy.heuristic_window).await?
        else {
            warn!(
                asset_id = keys.asset_id.unwrap_or("-"),
                source_session_id = keys.session_key.unwrap_or("-"),
                "asset.failed matched no recording; dropped"
            );
            return Ok(ReconcileOutcome::Unmatched);
        };

        match recording.status {
            RecordingStatus::Ready => {
                info!(recording_id = %recording.id, "late asset.failed ignored; recording is ready");
                return Ok(ReconcileOutcome::Ignored {
                    recording_id: Some(recording.id),
                    reason: "ready_wins",
                });
            }
            RecordingStatus::Failed => {
                return Ok(ReconcileOutcome::Duplicate {
                    recording_id: recording.id,
                });
            }
            RecordingStatus::Deleted => {
                return Ok(ReconcileOutcome::Ignored {
                    recording_id: Some(recording.id),
                    reason: "deleted",
                });
            }
            RecordingStatus::Pending | RecordingStatus::Processing => {}
        }

        let reason = payload
            .asset
            .as_ref()
            .and_then(|a| a.error.clone())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "provider_failed".to_string());
        let patch = failed_patch(payload.asset.as_ref(), reason.clone(), Utc::now());

        let updated = self
            .store
            .transition_recording(
                recording.id,
                RecordingStatus::UNFINISHED,
                RecordingStatus::Failed,
                &patch,
            )
            .await?;

        Ok(match updated {
            Some(updated) => {
                warn!(
                    recording_id = %updated.id,
                    strategy = %strategy,
                    reason = %reason,
                    "recording failed"
                );
                ReconcileOutcome::Applied {
                    recording_id: updated.id,
                    strategy,
                    status: updated.status,
                }
            }
            None => ReconcileOutcome::Duplicate {
                recording_id: recording.id,
            },
        })
    }

    // =========================================================================
    // Creator / admin operations
    // =========================================================================

    /// Soft delete by the owner or an admin; the provider asset is removed best-effort
    pub async fn delete(
        &self,
        recording_id: Uuid,
        actor: &Viewer,
        reason: Option<String>,
    ) -> Result<Recording> {
        let Some(actor_id) = actor.user_id else {
            return Err(AppError::Authentication("sign-in required".into()));
        };
        let recording = self.get(recording_id).await?;
        if !actor.is_admin() && !recording.is_owned_by(actor_id) {
            return Err(AppError::Authorization(
                "only the owner or an admin may delete a recording".into(),
            ));
        }
        if !recording.status.can_transition_to(RecordingStatus::Deleted) {
            return Err(AppError::conflict("recording", recording_id, recording.status));
        }

        let patch = RecordingPatch {
            deleted_by: Some(actor_id),
            deletion_reason: reason,
            deleted_at: Some(Utc::now()),
            ..Default::default()
        };
        let Some(deleted) = self
            .store
            .transition_recording(
                recording_id,
                RecordingStatus::NOT_DELETED,
                RecordingStatus::Deleted,
                &patch,
            )
            .await?
        else {
            return Err(self.rejected(recording_id).await);
        };

        info!(recording_id = %recording_id, actor_id = %actor_id, "recording deleted");

        if let Some(asset_id) = deleted.provider_asset_id.as_deref() {
            self.delete_provider_asset(asset_id).await;
        }

        Ok(deleted)
    }

    async fn delete_provider_asset(&self, asset_id: &str) {
        match self.provider.delete_asset(asset_id).await {
            Ok(()) => metrics::record_provider_call("delete_asset", true),
            Err(err) => {
                metrics::record_provider_call("delete_asset", false);
                warn!(asset_id, error = %err, "provider asset deletion failed");
            }
        }
    }

    pub async fn set_hidden(
        &self,
        recording_id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> Result<Recording> {
        let updated = self
            .store
            .set_hidden(recording_id, hidden, reason)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recording {recording_id}")))?;

        info!(recording_id = %recording_id, hidden, "recording visibility moderated");
        Ok(updated)
    }

    pub async fn list_orphaned(&self, limit: i64) -> Result<Vec<Recording>> {
        self.store.list_needing_attribution(limit.clamp(1, 500)).await
    }

    pub async fn reattribute(&self, recording_id: Uuid, creator_id: Uuid) -> Result<Recording> {
        match self
            .store
            .attribute(recording_id, &Attribution::creator(creator_id))
            .await?
        {
            Some(updated) => {
                info!(recording_id = %recording_id, creator_id = %creator_id, "recording re-attributed");
                Ok(updated)
            }
            None => Err(self.rejected(recording_id).await),
        }
    }

    /// Hard delete, admin only
    pub async fn purge(&self, recording_id: Uuid) -> Result<()> {
        let recording = self.get(recording_id).await?;
        if !recording.is_deleted() {
            if let Some(asset_id) = recording.provider_asset_id.as_deref() {
                self.delete_provider_asset(asset_id).await;
            }
        }

        if !self.store.purge_recording(recording_id).await? {
            return Err(AppError::NotFound(format!("recording {recording_id}")));
        }

        warn!(recording_id = %recording_id, "recording purged");
        Ok(())
    }

    /// Fail unfinished recordings older than the configured timeout.
    /// Returns how many were failed; zero when the sweep is disabled.
    pub async fn sweep_stuck(&self, now: DateTime<Utc>) -> Result<usize> {
        let Some(timeout_secs) = self.policy.stuck_recording_timeout_secs else {
            return Ok(0);
        };
        let cutoff = now - ChronoDuration::seconds(timeout_secs);

        let stale = self.store.list_stale(cutoff, STALE_BATCH).await?;
        let mut failed = 0;
        for recording in stale {
            let patch = failed_patch(None, PROVIDER_TIMEOUT_REASON.to_string(), now);
            if self
                .store
                .transition_recording(
                    recording.id,
                    RecordingStatus::UNFINISHED,
                    RecordingStatus::Failed,
                    &patch,
                )
                .await?
                .is_some()
            {
                warn!(
                    recording_id = %recording.id,
                    created_at = %recording.created_at,
                    "recording never finalized by provider; marked failed"
                );
                failed += 1;
            }
        }

        Ok(failed)
    }
}

#[async_trait]
impl RecordingHandoff for RecordingCoordinator {
    async fn session_ended(&self, snapshot: &SessionSnapshot) -> Result<RecordingDecision> {
        let outcome = self.create_pending(snapshot).await?;

        // The session duration is known now; the asset is not.
        let recording = outcome.recording();
        if recording.status == RecordingStatus::Pending {
            if let Err(err) = self
                .mark_processing(recording.id, snapshot.ended_at, snapshot.duration_secs as f64)
                .await
            {
                warn!(
                    recording_id = %recording.id,
                    session_id = %snapshot.session_id,
                    error = %err,
                    "recording left pending"
                );
            }
        }

        Ok(match outcome {
            PendingOutcome::Created(r) => RecordingDecision::Created { recording_id: r.id },
            PendingOutcome::Adopted(r) => RecordingDecision::Adopted { recording_id: r.id },
            PendingOutcome::Existing(r) => RecordingDecision::AlreadyExists { recording_id: r.id },
        })
    }
}

/// Failed by the stuck sweep rather than by the provider; a real
/// `asset.ready` may still finalize it
fn failed_by_sweep(recording: &Recording) -> bool {
    recording.status == RecordingStatus::Failed
        && recording.failure_reason.as_deref() == Some(PROVIDER_TIMEOUT_REASON)
}

fn failed_patch(asset: Option<&AssetPayload>, reason: String, now: DateTime<Utc>) -> RecordingPatch {
    RecordingPatch {
        provider_asset_id: asset.map(|a| a.id.clone()),
        failure_reason: Some(reason),
        failed_at: Some(now),
        ..Default::default()
    }
}

fn attribution_from(snapshot: &SessionSnapshot) -> Attribution {
    Attribution {
        creator_id: snapshot.creator_id,
        session_id: Some(snapshot.session_id.clone()),
        title: Some(snapshot.title.clone()),
        description: snapshot.description.clone(),
        visibility: Some(snapshot.visibility),
        peak_viewers: Some(snapshot.peak_viewers),
        total_viewers: Some(snapshot.total_viewers),
        session_started_at: snapshot.started_at,
        session_ended_at: Some(snapshot.ended_at),
    }
}

fn pending_recording(snapshot: &SessionSnapshot, now: DateTime<Utc>) -> Recording {
    Recording {
        id: Uuid::new_v4(),
        session_id: Some(snapshot.session_id.clone()),
        provider_session_id: Some(snapshot.provider_session_id.clone()),
        provider_asset_id: None,
        provider_playback_id: None,
        creator_id: Some(snapshot.creator_id),
        needs_attribution: false,
        title: snapshot.title.clone(),
        description: snapshot.description.clone(),
        visibility: snapshot.visibility,
        status: RecordingStatus::Pending,
        failure_reason: None,
        playback_url: None,
        download_url: None,
        duration_secs: None,
        file_size_bytes: None,
        resolution: None,
        peak_viewers: snapshot.peak_viewers,
        total_viewers: snapshot.total_viewers,
        is_hidden: false,
        hidden_reason: None,
        deleted_by: None,
        deletion_reason: None,
        session_started_at: snapshot.started_at,
        session_ended_at: Some(snapshot.ended_at),
        created_at: now,
        updated_at: now,
        ready_at: None,
        failed_at: None,
        deleted_at: None,
    }
}

/// Orphan built from the event alone. Private until someone is attributed.
fn synthesized_recording(
    payload: &WebhookPayload,
    asset: &AssetPayload,
    status: RecordingStatus,
    now: DateTime<Utc>,
) -> Recording {
    Recording {
        id: Uuid::new_v4(),
        session_id: None,
        provider_session_id: payload.source_session_id().map(String::from),
        provider_asset_id: Some(asset.id.clone()),
        provider_playback_id: asset.playback_id.clone(),
        creator_id: None,
        needs_attribution: true,
        title: asset
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string()),
        description: None,
        visibility: Visibility::Private,
        status,
        failure_reason: None,
        playback_url: None,
        download_url: None,
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
    }
}
