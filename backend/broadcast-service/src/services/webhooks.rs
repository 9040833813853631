//! Provider webhook processing
//!
//! Receipt and processing are separate concerns: the HTTP layer acknowledges
//! every delivery it could read, and this module reports what processing did.
//! Failures are logged with the raw payload for manual reconciliation and
//! never propagate back to the provider.

use crate::db::{WebhookAuditEntry, WebhookAuditLog};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{WebhookEventKind, WebhookPayload};
use crate::services::recordings::{ReconcileOutcome, RecordingCoordinator};
use crate::services::streaming::SessionManager;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What processing one delivery amounted to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProcessingResult {
    Recording(ReconcileOutcome),
    SessionLive { session_id: String },
    SessionEnded { session_id: String },
    /// Session event for a provider session this service does not know
    SessionUnknown,
    /// Lifecycle signal rejected by the session state machine
    SessionConflict { message: String },
    Unsupported { event: String },
    Malformed,
    Failed { error: String },
}

impl ProcessingResult {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Recording(outcome) => outcome.label(),
            Self::SessionLive { .. } | Self::SessionEnded { .. } => "applied",
            Self::SessionUnknown => "unmatched",
            Self::SessionConflict { .. } => "duplicate",
            Self::Unsupported { .. } => "unsupported",
            Self::Malformed => "malformed",
            Self::Failed { .. } => "failed",
        }
    }

    fn recording_id(&self) -> Option<Uuid> {
        match self {
            Self::Recording(outcome) => outcome.recording_id(),
            _ => None,
        }
    }

    fn error(&self) -> Option<String> {
        match self {
            Self::Failed { error } => Some(error.clone()),
            Self::SessionConflict { message } => Some(message.clone()),
            _ => None,
        }
    }
}

pub struct WebhookProcessor {
    recordings: Arc<RecordingCoordinator>,
    sessions: Arc<SessionManager>,
    audit: Arc<dyn WebhookAuditLog>,
}

impl WebhookProcessor {
    pub fn new(
        recordings: Arc<RecordingCoordinator>,
        sessions: Arc<SessionManager>,
        audit: Arc<dyn WebhookAuditLog>,
    ) -> Self {
        Self {
            recordings,
            sessions,
            audit,
        }
    }

    /// Process one raw delivery. Never fails; the result is informational.
    pub async fn process(&self, body: &[u8]) -> ProcessingResult {
        let payload = match serde_json::from_slice::<WebhookPayload>(body) {
            Ok(payload) => payload,
            Err(err) => {
                let raw = String::from_utf8_lossy(body);
                error!(error = %err, payload = %raw, "unparseable webhook body");
                metrics::record_webhook_event("unknown", "malformed");
                let raw_json = serde_json::Value::String(raw.into_owned());
                self.audit("unknown", None, &ProcessingResult::Malformed, raw_json)
                    .await;
                return ProcessingResult::Malformed;
            }
        };

        let kind = payload.kind();
        let result = match self.dispatch(&kind, &payload).await {
            Ok(result) => result,
            Err(err) => {
                error!(
                    event = %payload.event,
                    error = %err,
                    payload = %String::from_utf8_lossy(body),
                    "webhook processing failed; acknowledged for manual reconciliation"
                );
                ProcessingResult::Failed {
                    error: err.to_string(),
                }
            }
        };

        metrics::record_webhook_event(kind.label(), result.label());
        let raw_json = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);
        self.audit(&payload.event, Some(&payload), &result, raw_json)
            .await;

        result
    }

    async fn dispatch(
        &self,
        kind: &WebhookEventKind,
        payload: &WebhookPayload,
    ) -> Result<ProcessingResult> {
        match kind {
            WebhookEventKind::AssetCreated => self
                .recordings
                .handle_asset_created(payload)
                .await
                .map(ProcessingResult::Recording),
            WebhookEventKind::AssetReady => self
                .recordings
                .handle_asset_ready(payload)
                .await
                .map(ProcessingResult::Recording),
            WebhookEventKind::AssetFailed => self
                .recordings
                .handle_asset_failed(payload)
                .await
                .map(ProcessingResult::Recording),
            WebhookEventKind::SessionActive => self.session_active(payload).await,
            WebhookEventKind::SessionIdle => self.session_idle(payload).await,
            WebhookEventKind::Unknown(event) => {
                info!(event = %event, "unsupported webhook event acknowledged");
                Ok(ProcessingResult::Unsupported {
                    event: event.clone(),
                })
            }
        }
    }

    async fn session_active(&self, payload: &WebhookPayload) -> Result<ProcessingResult> {
        let Some(provider_session_id) = payload.source_session_id() else {
            return Ok(ProcessingResult::Malformed);
        };
        match self
            .sessions
            .mark_live_by_provider_id(provider_session_id)
            .await
        {
            Ok(Some(session)) => Ok(ProcessingResult::SessionLive {
                session_id: session.id,
            }),
            Ok(None) => Ok(ProcessingResult::SessionUnknown),
            Err(AppError::Conflict(message)) => {
                info!(provider_session_id, %message, "session.active ignored");
                Ok(ProcessingResult::SessionConflict { message })
            }
            Err(err) => Err(err),
        }
    }

    async fn session_idle(&self, payload: &WebhookPayload) -> Result<ProcessingResult> {
        let Some(provider_session_id) = payload.source_session_id() else {
            return Ok(ProcessingResult::Malformed);
        };
        match self.sessions.end_by_provider_id(provider_session_id).await {
            Ok(Some(ended)) => Ok(ProcessingResult::SessionEnded {
                session_id: ended.session.session_id,
            }),
            Ok(None) => Ok(ProcessingResult::SessionUnknown),
            Err(AppError::Conflict(message)) => {
                info!(provider_session_id, %message, "session.idle ignored");
                Ok(ProcessingResult::SessionConflict { message })
            }
            Err(err) => Err(err),
        }
    }

    async fn audit(
        &self,
        event_type: &str,
        payload: Option<&WebhookPayload>,
        result: &ProcessingResult,
        raw: serde_json::Value,
    ) {
        let entry = WebhookAuditEntry {
            id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            asset_id: payload.and_then(|p| p.asset.as_ref()).map(|a| a.id.clone()),
            source_session_id: payload
                .and_then(|p| p.source_session_id())
                .map(String::from),
            recording_id: result.recording_id(),
            outcome: result.label().to_string(),
            error: result.error(),
            payload: raw,
            received_at: Utc::now(),
        };
        if let Err(err) = self.audit.record_delivery(&entry).await {
            warn!(error = %err, event = event_type, "failed to write webhook audit entry");
        }
    }
}
