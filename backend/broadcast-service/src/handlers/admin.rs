/// Moderation and orphan-management handlers (admin role only)
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::require_admin;
use crate::error::Result;
use crate::models::{RecordingView, SessionView};
use crate::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ModerationRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReattributeRequest {
    pub creator_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct OrphanQuery {
    #[serde(default = "default_orphan_limit")]
    pub limit: i64,
}

fn default_orphan_limit() -> i64 {
    50
}

/// POST /api/v1/admin/sessions/{id}/suspension
pub async fn suspend_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ModerationRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    body.validate()?;

    let session = state
        .sessions
        .set_suspension(&path, true, body.reason.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(SessionView::new(&session, session.stored_counts())))
}

/// DELETE /api/v1/admin/sessions/{id}/suspension
pub async fn unsuspend_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    let session = state.sessions.set_suspension(&path, false, None).await?;
    Ok(HttpResponse::Ok().json(SessionView::new(&session, session.stored_counts())))
}

/// POST /api/v1/admin/recordings/{id}/hidden
pub async fn hide_recording(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ModerationRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    body.validate()?;

    let recording = state
        .recordings
        .set_hidden(path.into_inner(), true, body.reason.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(RecordingView::from(&recording)))
}

/// DELETE /api/v1/admin/recordings/{id}/hidden
pub async fn unhide_recording(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    let recording = state
        .recordings
        .set_hidden(path.into_inner(), false, None)
        .await?;
    Ok(HttpResponse::Ok().json(RecordingView::from(&recording)))
}

/// GET /api/v1/admin/recordings/orphaned
pub async fn list_orphaned(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<OrphanQuery>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    let orphans = state.recordings.list_orphaned(query.limit).await?;
    Ok(HttpResponse::Ok().json(orphans))
}

/// POST /api/v1/admin/recordings/{id}/attribution
pub async fn reattribute_recording(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<ReattributeRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    let recording = state
        .recordings
        .reattribute(path.into_inner(), body.creator_id)
        .await?;
    Ok(HttpResponse::Ok().json(RecordingView::from(&recording)))
}

/// DELETE /api/v1/admin/recordings/{id}
///
/// Hard delete. Soft delete is `DELETE /api/v1/recordings/{id}`.
pub async fn purge_recording(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    require_admin(&req)?;

    state.recordings.purge(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
