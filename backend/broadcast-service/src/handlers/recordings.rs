/// Recording read and delete handlers
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use super::{access_denied, extract_viewer};
use crate::error::Result;
use crate::models::RecordingView;
use crate::services::access::recording_access;
use crate::AppState;

/// GET /api/v1/recordings/{id}
///
/// Non-ready recordings answer with a reason-coded 403
/// (`processing`, `failed`, `unavailable`, ...), never a bare error.
pub async fn get_recording(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let recording = state.recordings.get(path.into_inner()).await?;

    if let Err(denial) = recording_access(&recording, &viewer) {
        return Ok(access_denied(denial));
    }

    Ok(HttpResponse::Ok().json(RecordingView::from(&recording)))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteRecordingQuery {
    pub reason: Option<String>,
}

/// DELETE /api/v1/recordings/{id}
pub async fn delete_recording(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    query: web::Query<DeleteRecordingQuery>,
) -> Result<HttpResponse> {
    let viewer = extract_viewer(&req)?;
    let deleted = state
        .recordings
        .delete(path.into_inner(), &viewer, query.into_inner().reason)
        .await?;

    Ok(HttpResponse::Ok().json(RecordingView::from(&deleted)))
}
