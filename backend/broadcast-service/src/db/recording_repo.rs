//! PostgreSQL recording store
//!
//! There is deliberately no unique index on `session_id`: the coordinator
//! looks the correlation key up before inserting, and synthesized recordings
//! may carry a key that a late session end later adopts.

use super::session_repo::status_list;
use super::RecordingStore;
use crate::error::{AppError, Result};
use crate::models::{Attribution, Recording, RecordingPatch, RecordingStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const RECORDING_COLUMNS: &str = r#"
    id, session_id, provider_session_id, provider_asset_id, provider_playback_id,
    creator_id, needs_attribution, title, description, visibility,
    status, failure_reason, playback_url, download_url,
    duration_secs, file_size_bytes, resolution,
    peak_viewers, total_viewers,
    is_hidden, hidden_reason, deleted_by, deletion_reason,
    session_started_at, session_ended_at,
    created_at, updated_at, ready_at, failed_at, deleted_at
"#;

#[derive(Clone)]
pub struct PgRecordingStore {
    pool: PgPool,
}

impl PgRecordingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordingStore for PgRecordingStore {
    async fn insert_recording(&self, r: &Recording) -> Result<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO recordings ({RECORDING_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                    $21, $22, $23, $24, $25, $26, $27, $28, $29, $30)
            "#
        ))
        .bind(r.id)
        .bind(&r.session_id)
        .bind(&r.provider_session_id)
        .bind(&r.provider_asset_id)
        .bind(&r.provider_playback_id)
        .bind(r.creator_id)
        .bind(r.needs_attribution)
        .bind(&r.title)
        .bind(&r.description)
        .bind(r.visibility)
        .bind(r.status)
        .bind(&r.failure_reason)
        .bind(&r.playback_url)
        .bind(&r.download_url)
        .bind(r.duration_secs)
        .bind(r.file_size_bytes)
        .bind(&r.resolution)
        .bind(r.peak_viewers)
        .bind(r.total_viewers)
        .bind(r.is_hidden)
        .bind(&r.hidden_reason)
        .bind(r.deleted_by)
        .bind(&r.deletion_reason)
        .bind(r.session_started_at)
        .bind(r.session_ended_at)
        .bind(r.created_at)
        .bind(r.updated_at)
        .bind(r.ready_at)
        .bind(r.failed_at)
        .bind(r.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "recording for asset {} already exists",
                r.provider_asset_id.as_deref().unwrap_or("-")
            )),
            other => other.into(),
        })?;

        Ok(())
    }

    async fn get_recording(&self, recording_id: Uuid) -> Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings WHERE id = $1"
        ))
        .bind(recording_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_session_key(&self, key: &str) -> Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS} FROM recordings
            WHERE session_id = $1 OR provider_session_id = $1
            ORDER BY (status = 'deleted'), created_at DESC
            LIMIT 1
            "#
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_asset_id(&self, asset_id: &str) -> Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS} FROM recordings
            WHERE provider_asset_id = $1
            ORDER BY (status = 'deleted'), created_at DESC
            LIMIT 1
            "#
        ))
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn recent_unfinished(&self, limit: i64) -> Result<Vec<Recording>> {
        let rows = sqlx::query_as::<_, Recording>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS} FROM recordings
            WHERE status IN ('pending', 'processing')
            ORDER BY created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn transition_recording(
        &self,
        recording_id: Uuid,
        from: &[RecordingStatus],
        to: RecordingStatus,
        patch: &RecordingPatch,
    ) -> Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(&format!(
            r#"
            UPDATE recordings
            SET status = $3,
                provider_asset_id = COALESCE($4, provider_asset_id),
                provider_playback_id = COALESCE($5, provider_playback_id),
                failure_reason = CASE WHEN $18 THEN $6 ELSE COALESCE($6, failure_reason) END,
                playback_url = COALESCE($7, playback_url),
                download_url = COALESCE($8, download_url),
                duration_secs = COALESCE($9, duration_secs),
                file_size_bytes = COALESCE($10, file_size_bytes),
                resolution = COALESCE($11, resolution),
                deleted_by = COALESCE($12, deleted_by),
                deletion_reason = COALESCE($13, deletion_reason),
                session_ended_at = COALESCE($14, session_ended_at),
                ready_at = COALESCE($15, ready_at),
                failed_at = CASE WHEN $18 THEN $16 ELSE COALESCE($16, failed_at) END,
                deleted_at = COALESCE($17, deleted_at),
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($2)
            RETURNING {RECORDING_COLUMNS}
            "#
        ))
        .bind(recording_id)
        .bind(status_list(from))
        .bind(to)
        .bind(&patch.provider_asset_id)
        .bind(&patch.provider_playback_id)
        .bind(&patch.failure_reason)
        .bind(&patch.playback_url)
        .bind(&patch.download_url)
        .bind(patch.duration_secs)
        .bind(patch.file_size_bytes)
        .bind(&patch.resolution)
        .bind(patch.deleted_by)
        .bind(&patch.deletion_reason)
        .bind(patch.session_ended_at)
        .bind(patch.ready_at)
        .bind(patch.failed_at)
        .bind(patch.deleted_at)
        .bind(patch.clear_failure)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn attribute(
        &self,
        recording_id: Uuid,
        a: &Attribution,
    ) -> Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(&format!(
            r#"
            UPDATE recordings
            SET creator_id = $2,
                needs_attribution = FALSE,
                session_id = COALESCE($3, session_id),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                visibility = COALESCE($6, visibility),
                peak_viewers = COALESCE($7, peak_viewers),
                total_viewers = COALESCE($8, total_viewers),
                session_started_at = COALESCE($9, session_started_at),
                session_ended_at = COALESCE($10, session_ended_at),
                updated_at = NOW()
            WHERE id = $1 AND status <> 'deleted'
            RETURNING {RECORDING_COLUMNS}
            "#
        ))
        .bind(recording_id)
        .bind(a.creator_id)
        .bind(&a.session_id)
        .bind(&a.title)
        .bind(&a.description)
        .bind(a.visibility)
        .bind(a.peak_viewers)
        .bind(a.total_viewers)
        .bind(a.session_started_at)
        .bind(a.session_ended_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_hidden(
        &self,
        recording_id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> Result<Option<Recording>> {
        let row = sqlx::query_as::<_, Recording>(&format!(
            r#"
            UPDATE recordings
            SET is_hidden = $2,
                hidden_reason = CASE WHEN $2 THEN $3 ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RECORDING_COLUMNS}
            "#
        ))
        .bind(recording_id)
        .bind(hidden)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_needing_attribution(&self, limit: i64) -> Result<Vec<Recording>> {
        let rows = sqlx::query_as::<_, Recording>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS} FROM recordings
            WHERE needs_attribution AND status <> 'deleted'
            ORDER BY created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_stale(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Recording>> {
        let rows = sqlx::query_as::<_, Recording>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS} FROM recordings
            WHERE status IN ('pending', 'processing') AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#
        ))
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn purge_recording(&self, recording_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recordings WHERE id = $1")
            .bind(recording_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
