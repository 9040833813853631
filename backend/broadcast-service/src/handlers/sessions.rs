/// Live session and ingest credential handlers
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use super::{access_denied, extract_viewer, require_user};
use crate::error::{AppError, Result};
use crate::models::{CreateSessionRequest, SessionView, StreamSession, ViewerCounts};
use crate::services::access::{stream_access, Viewer};
use crate::AppState;

/// Owners and admins always pass; everyone else goes through the stream
/// access rule and gets a reason-coded 403 on denial
fn stream_gate(session: &StreamSession, viewer: &Viewer) -> Option<HttpResponse> {
    let privileged =
        viewer.is_admin() || viewer.user_id.is_some_and(|id| session.is_owned_by(id));
    if privileged {
        return None;
    }
    stream_access(session, viewer.user_id, viewer.tier)
        .err()
        .map(access_denied)
}

/// POST /api/v1/sessions
pub async fn create_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let creator_id = require_user(&viewer)?;

    let created = state.sessions.create(creator_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let (session, view) = state.sessions.view(&path).await?;

    if let Some(denied) = stream_gate(&session, &viewer) {
        return Ok(denied);
    }

    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/v1/sessions/{id}/live
pub async fn mark_live(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    state.sessions.authorize_owner(&path, &viewer).await?;

    let session = state.sessions.mark_live(&path).await?;
    Ok(HttpResponse::Ok().json(SessionView::new(&session, session.stored_counts())))
}

/// POST /api/v1/sessions/{id}/end
pub async fn end_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    state.sessions.authorize_owner(&path, &viewer).await?;

    let ended = state.sessions.end(&path).await?;
    Ok(HttpResponse::Ok().json(ended))
}

/// DELETE /api/v1/sessions/{id}
///
/// Ends the session without keeping a recording.
pub async fn delete_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    state.sessions.authorize_owner(&path, &viewer).await?;

    let ended = state.sessions.force_delete(&path).await?;
    Ok(HttpResponse::Ok().json(ended))
}

/// GET /api/v1/sessions/{id}/health
pub async fn session_health(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let session = state.sessions.get(&path).await?;

    if let Some(denied) = stream_gate(&session, &viewer) {
        return Ok(denied);
    }

    let health = state.sessions.health(&session.id).await?;
    Ok(HttpResponse::Ok().json(health))
}

/// POST /api/v1/sessions/{id}/viewers
pub async fn join_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let session = state.sessions.get(&path).await?;

    if let Some(denied) = stream_gate(&session, &viewer) {
        return Ok(denied);
    }

    let joined = state
        .sessions
        .join_viewer(&session.id, viewer.user_id.map(|id| id.to_string()))
        .await?;
    Ok(HttpResponse::Ok().json(joined))
}

#[derive(Serialize)]
struct LeaveResponse {
    session_id: String,
    counts: ViewerCounts,
}

/// DELETE /api/v1/sessions/{id}/viewers/{viewer_id}
///
/// A signed-in viewer's ID is their user ID, so only that user or an admin
/// may close it. Generated anonymous IDs are bearer-style.
pub async fn leave_session(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let (session_id, viewer_id) = path.into_inner();

    if let Ok(user_id) = Uuid::parse_str(&viewer_id) {
        if !viewer.is_admin() && viewer.user_id != Some(user_id) {
            return Err(AppError::Authorization(
                "viewers may only leave on their own behalf".into(),
            ));
        }
    }

    let counts = state.sessions.leave_viewer(&session_id, &viewer_id).await?;
    Ok(HttpResponse::Ok().json(LeaveResponse { session_id, counts }))
}

/// GET /api/v1/credentials
///
/// The caller's own ingest credential; there is no way to read another
/// creator's key.
pub async fn get_credential(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let creator_id = require_user(&viewer)?;

    let credential = state.sessions.credential(creator_id).await?;
    Ok(HttpResponse::Ok().json(credential))
}

/// POST /api/v1/credentials/regenerate
pub async fn regenerate_credential(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let creator_id = require_user(&viewer)?;

    let rotation = state.sessions.regenerate_credential(creator_id).await?;
    Ok(HttpResponse::Ok().json(rotation))
}
