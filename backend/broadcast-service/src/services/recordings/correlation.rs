//! Webhook-to-recording correlation
//!
//! Strategies are tried in order and the first hit wins:
//!
//! 1. session key: the event's originating provider session ID against the
//!    recording's session / provider-session ID
//! 2. asset ID: covers re-delivery after an earlier partial success
//! 3. title heuristic: exact asset-name match among the most recent
//!    unfinished recordings. Two sessions sharing a title inside the window
//!    can be confused; this is a known limitation, kept on purpose.

use crate::db::RecordingStore;
use crate::error::Result;
use crate::models::{Recording, WebhookPayload};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    SessionKey,
    AssetId,
    TitleHeuristic,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionKey => "session_key",
            Self::AssetId => "asset_id",
            Self::TitleHeuristic => "title_heuristic",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers an event offers for correlation
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationKeys<'a> {
    pub session_key: Option<&'a str>,
    pub asset_id: Option<&'a str>,
    pub title: Option<&'a str>,
}

impl<'a> CorrelationKeys<'a> {
    pub fn from_payload(payload: &'a WebhookPayload) -> Self {
        let asset = payload.asset.as_ref();
        Self {
            session_key: payload.source_session_id(),
            asset_id: asset.map(|a| a.id.as_str()).filter(|id| !id.is_empty()),
            title: asset
                .and_then(|a| a.name.as_deref())
                .filter(|name| !name.trim().is_empty()),
        }
    }
}

/// Run the strategies in order. Deleted recordings are returned as matches
/// so callers can refuse to touch them instead of synthesizing a duplicate.
pub async fn resolve(
    store: &dyn RecordingStore,
    keys: &CorrelationKeys<'_>,
    heuristic_window: i64,
) -> Result<Option<(Recording, MatchStrategy)>> {
    if let Some(key) = keys.session_key {
        if let Some(recording) = store.find_by_session_key(key).await? {
            return Ok(Some((recording, MatchStrategy::SessionKey)));
        }
    }

    if let Some(asset_id) = keys.asset_id {
        if let Some(recording) = store.find_by_asset_id(asset_id).await? {
            return Ok(Some((recording, MatchStrategy::AssetId)));
        }
    }

    if let Some(title) = keys.title {
        let candidates = store.recent_unfinished(heuristic_window).await?;
        debug!(title, candidates = candidates.len(), "trying title heuristic");
        let hit = candidates.into_iter().find(|r| {
            r.title == title
                // a recording already bound to another asset is not a candidate
                && match (r.provider_asset_id.as_deref(), keys.asset_id) {
                    (Some(bound), Some(incoming)) => bound == incoming,
                    (Some(_), None) => false,
                    (None, _) => true,
                }
        });
        if let Some(recording) = hit {
            return Ok(Some((recording, MatchStrategy::TitleHeuristic)));
        }
    }

    Ok(None)
}
