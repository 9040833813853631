//! PostgreSQL session store
//!
//! Sessions, ingest credentials and viewer join records. Pure data access.

use super::SessionStore;
use crate::error::{AppError, Result};
use crate::models::{IngestCredential, SessionStatus, StreamSession, ViewerCounts, ViewerJoin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SESSION_COLUMNS: &str = r#"
    id, provider_session_id, creator_id, title, description,
    visibility, mode, avatar_ref,
    ingest_url, playback_url, status,
    current_viewers, peak_viewers, total_viewers,
    is_suspended, suspension_reason, degraded,
    created_at, started_at, ended_at
"#;

pub(crate) fn status_list<S: ToString>(statuses: &[S]) -> Vec<String> {
    statuses.iter().map(ToString::to_string).collect()
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_session(&self, session: &StreamSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO live_sessions (
                id, provider_session_id, creator_id, title, description,
                visibility, mode, avatar_ref,
                ingest_url, playback_url, status,
                current_viewers, peak_viewers, total_viewers,
                is_suspended, suspension_reason, degraded,
                created_at, started_at, ended_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(&session.id)
        .bind(&session.provider_session_id)
        .bind(session.creator_id)
        .bind(&session.title)
        .bind(&session.description)
        .bind(session.visibility)
        .bind(session.mode)
        .bind(&session.avatar_ref)
        .bind(&session.ingest_url)
        .bind(&session.playback_url)
        .bind(session.status)
        .bind(session.current_viewers)
        .bind(session.peak_viewers)
        .bind(session.total_viewers)
        .bind(session.is_suspended)
        .bind(&session.suspension_reason)
        .bind(session.degraded)
        .bind(session.created_at)
        .bind(session.started_at)
        .bind(session.ended_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(format!(
                "creator {} already has an open session",
                session.creator_id
            )),
            other => other.into(),
        })?;

        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<StreamSession>> {
        let row = sqlx::query_as::<_, StreamSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM live_sessions WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_provider_session_id(
        &self,
        provider_session_id: &str,
    ) -> Result<Option<StreamSession>> {
        let row = sqlx::query_as::<_, StreamSession>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM live_sessions
            WHERE provider_session_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(provider_session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_open_session(&self, creator_id: Uuid) -> Result<Option<StreamSession>> {
        let row = sqlx::query_as::<_, StreamSession>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM live_sessions
            WHERE creator_id = $1 AND status <> 'ended'
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn transition_session(
        &self,
        session_id: &str,
        from: &[SessionStatus],
        to: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<Option<StreamSession>> {
        let row = sqlx::query_as::<_, StreamSession>(&format!(
            r#"
            UPDATE live_sessions
            SET status = $2,
                started_at = CASE WHEN $2 = 'live' THEN COALESCE(started_at, $3) ELSE started_at END,
                ended_at = CASE WHEN $2 = 'ended' THEN $3 ELSE ended_at END
            WHERE id = $1 AND status = ANY($4)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(to)
        .bind(at)
        .bind(status_list(from))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn save_viewer_counts(&self, session_id: &str, counts: ViewerCounts) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE live_sessions
            SET current_viewers = $2,
                peak_viewers = GREATEST(peak_viewers, $3, $2),
                total_viewers = GREATEST(total_viewers, $4)
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .bind(counts.current.max(0))
        .bind(counts.peak)
        .bind(counts.total)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_suspension(
        &self,
        session_id: &str,
        suspended: bool,
        reason: Option<&str>,
    ) -> Result<Option<StreamSession>> {
        let row = sqlx::query_as::<_, StreamSession>(&format!(
            r#"
            UPDATE live_sessions
            SET is_suspended = $2,
                suspension_reason = CASE WHEN $2 THEN $3 ELSE NULL END
            WHERE id = $1
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session_id)
        .bind(suspended)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn upsert_credential(&self, credential: &IngestCredential) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stream_credentials (
                creator_id, stream_key, ingest_url, session_id, provider_session_id, rotated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (creator_id) DO UPDATE
            SET stream_key = EXCLUDED.stream_key,
                ingest_url = EXCLUDED.ingest_url,
                session_id = EXCLUDED.session_id,
                provider_session_id = EXCLUDED.provider_session_id,
                rotated_at = EXCLUDED.rotated_at
            "#,
        )
        .bind(credential.creator_id)
        .bind(&credential.stream_key)
        .bind(&credential.ingest_url)
        .bind(&credential.session_id)
        .bind(&credential.provider_session_id)
        .bind(credential.rotated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_credential(&self, creator_id: Uuid) -> Result<Option<IngestCredential>> {
        let row = sqlx::query_as::<_, IngestCredential>(
            r#"
            SELECT creator_id, stream_key, ingest_url, session_id, provider_session_id, rotated_at
            FROM stream_credentials
            WHERE creator_id = $1
            "#,
        )
        .bind(creator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert_viewer_join(&self, join: &ViewerJoin) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO viewer_joins (id, session_id, viewer_id, anonymous, joined_at, left_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(join.id)
        .bind(&join.session_id)
        .bind(&join.viewer_id)
        .bind(join.anonymous)
        .bind(join.joined_at)
        .bind(join.left_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_viewer_left(
        &self,
        session_id: &str,
        viewer_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        // Close exactly one open record so a concurrent duplicate leave finds nothing
        let result = sqlx::query(
            r#"
            UPDATE viewer_joins
            SET left_at = $3
            WHERE id = (
                SELECT id FROM viewer_joins
                WHERE session_id = $1 AND viewer_id = $2 AND left_at IS NULL
                ORDER BY joined_at DESC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            "#,
        )
        .bind(session_id)
        .bind(viewer_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
