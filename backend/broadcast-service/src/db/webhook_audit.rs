//! Webhook delivery audit log

use super::{WebhookAuditEntry, WebhookAuditLog};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PgWebhookAuditLog {
    pool: PgPool,
}

impl PgWebhookAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookAuditLog for PgWebhookAuditLog {
    async fn record_delivery(&self, entry: &WebhookAuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                id, event_type, asset_id, source_session_id, recording_id,
                outcome, error, payload, received_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.event_type)
        .bind(&entry.asset_id)
        .bind(&entry.source_session_id)
        .bind(entry.recording_id)
        .bind(&entry.outcome)
        .bind(&entry.error)
        .bind(&entry.payload)
        .bind(entry.received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
