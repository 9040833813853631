/// HTTP handlers for broadcast-service
///
/// Caller identity arrives from the upstream gateway in `x-user-id`,
/// `x-user-tier` and `x-user-role`; authentication itself happens there.
pub mod admin;
pub mod recordings;
pub mod sessions;
pub mod webhooks;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::services::access::{AccessDenial, MembershipTier, Viewer, ViewerRole};

const USER_ID_HEADER: &str = "x-user-id";
const USER_TIER_HEADER: &str = "x-user-tier";
const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Caller identity; anonymous when no user header is present
pub(crate) fn extract_viewer(req: &HttpRequest) -> Result<Viewer> {
    let Some(raw_id) = header(req, USER_ID_HEADER) else {
        return Ok(Viewer::anonymous());
    };
    let user_id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::Authentication("Invalid x-user-id header value".into()))?;

    Ok(Viewer {
        user_id: Some(user_id),
        tier: header(req, USER_TIER_HEADER).and_then(MembershipTier::parse),
        role: header(req, USER_ROLE_HEADER)
            .map(ViewerRole::parse)
            .unwrap_or_default(),
    })
}

/// Signed-in caller's ID
pub(crate) fn require_user(viewer: &Viewer) -> Result<Uuid> {
    viewer
        .user_id
        .ok_or_else(|| AppError::Authentication("Missing x-user-id header".into()))
}

pub(crate) fn require_admin(req: &HttpRequest) -> Result<Viewer> {
    let viewer = extract_viewer(req)?;
    require_user(&viewer)?;
    if !viewer.is_admin() {
        return Err(AppError::Authorization("admin role required".into()));
    }
    Ok(viewer)
}

#[derive(Serialize)]
struct AccessDeniedBody {
    error: &'static str,
    reason: &'static str,
    message: String,
}

/// Reason-coded 403 for viewers who may not see an entity
pub(crate) fn access_denied(denial: AccessDenial) -> HttpResponse {
    HttpResponse::Forbidden().json(AccessDeniedBody {
        error: "ACCESS_DENIED",
        reason: denial.as_str(),
        message: denial_message(denial).to_string(),
    })
}

fn denial_message(denial: AccessDenial) -> &'static str {
    match denial {
        AccessDenial::NotAuthenticated => "Sign in to watch this",
        AccessDenial::Suspended => "This content has been suspended",
        AccessDenial::MembersOnly => "Available to members only",
        AccessDenial::Processing => "This recording is still processing",
        AccessDenial::Failed => "This recording could not be processed",
        AccessDenial::Unavailable => "This recording is not available yet",
        AccessDenial::Deleted => "This recording was deleted",
        AccessDenial::Private => "This content is private",
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "broadcast-service",
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));

    cfg.service(
        web::scope("/api/v1")
            // Sessions
            .route("/sessions", web::post().to(sessions::create_session))
            .route("/sessions/{id}", web::get().to(sessions::get_session))
            .route("/sessions/{id}", web::delete().to(sessions::delete_session))
            .route("/sessions/{id}/live", web::post().to(sessions::mark_live))
            .route("/sessions/{id}/end", web::post().to(sessions::end_session))
            .route("/sessions/{id}/health", web::get().to(sessions::session_health))
            .route("/sessions/{id}/viewers", web::post().to(sessions::join_session))
            .route(
                "/sessions/{id}/viewers/{viewer_id}",
                web::delete().to(sessions::leave_session),
            )
            // Credentials
            .route("/credentials", web::get().to(sessions::get_credential))
            .route(
                "/credentials/regenerate",
                web::post().to(sessions::regenerate_credential),
            )
            // Recordings
            .route("/recordings/{id}", web::get().to(recordings::get_recording))
            .route("/recordings/{id}", web::delete().to(recordings::delete_recording))
            // Provider webhooks
            .route("/webhooks/provider", web::post().to(webhooks::provider_webhook))
            // Admin
            .service(
                web::scope("/admin")
                    .route(
                        "/sessions/{id}/suspension",
                        web::post().to(admin::suspend_session),
                    )
                    .route(
                        "/sessions/{id}/suspension",
                        web::delete().to(admin::unsuspend_session),
                    )
                    .route(
                        "/recordings/orphaned",
                        web::get().to(admin::list_orphaned),
                    )
                    .route("/recordings/{id}/hidden", web::post().to(admin::hide_recording))
                    .route(
                        "/recordings/{id}/hidden",
                        web::delete().to(admin::unhide_recording),
                    )
                    .route(
                        "/recordings/{id}/attribution",
                        web::post().to(admin::reattribute_recording),
                    )
                    .route("/recordings/{id}", web::delete().to(admin::purge_recording)),
            ),
    );
}
