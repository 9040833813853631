//! HTTP surface: webhook acknowledgement, signatures and reason-coded access

mod common;

use actix_web::{test, web, App};
use broadcast_service::handlers::{configure_routes, webhooks::sign_body};
use broadcast_service::models::Visibility;
use broadcast_service::services::streaming::RecordingDecision;
use common::{asset_failed, asset_ready, create_request, TestStack};
use serde_json::Value;
use uuid::Uuid;

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_webhook_always_acknowledged() {
    let stack = TestStack::new();
    let app = init_app!(stack.app_state(None));

    for body in [
        b"{ this is not json".to_vec(),
        br#"{"event": "something.else"}"#.to_vec(),
        asset_failed(Some("prov_none"), "as_none", "boom"),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/webhooks/provider")
            .insert_header(("content-type", "application/json"))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }
}

#[actix_web::test]
async fn test_webhook_signature_enforced_when_configured() {
    let stack = TestStack::new();
    let app = init_app!(stack.app_state(Some("whsec_test")));
    let body = asset_ready(Some("prov_sig"), "as_sig", "Signed", 60.0);

    let unsigned = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .set_payload(body.clone())
        .to_request();
    assert_eq!(test::call_service(&app, unsigned).await.status(), 401);

    let forged = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .insert_header(("x-webhook-signature", sign_body("wrong", &body).unwrap()))
        .set_payload(body.clone())
        .to_request();
    assert_eq!(test::call_service(&app, forged).await.status(), 401);
    assert!(stack.store.all_recordings().await.is_empty());

    let signed = test::TestRequest::post()
        .uri("/api/v1/webhooks/provider")
        .insert_header(("x-webhook-signature", sign_body("whsec_test", &body).unwrap()))
        .set_payload(body)
        .to_request();
    let resp: Value = test::call_and_read_body_json(&app, signed).await;
    assert_eq!(resp["outcome"], "synthesized");
}

#[actix_web::test]
async fn test_unfinished_recording_access_is_reason_coded() {
    let stack = TestStack::new();
    let creator = Uuid::new_v4();
    let (session_id, _) = stack.live_session(creator, "Coded").await;
    let RecordingDecision::Created { recording_id } =
        stack.sessions.end(&session_id).await.unwrap().recording
    else {
        panic!("expected a new recording");
    };
    let app = init_app!(stack.app_state(None));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/recordings/{recording_id}"))
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "processing");
}

#[actix_web::test]
async fn test_ready_public_recording_visible_to_anonymous() {
    let stack = TestStack::new();
    let (session_id, provider_session_id) = stack.live_session(Uuid::new_v4(), "Open").await;
    stack.sessions.end(&session_id).await.unwrap();
    stack
        .webhooks
        .process(&asset_ready(Some(&provider_session_id), "as_open", "Open", 300.0))
        .await;
    let recording = stack
        .store
        .all_recordings()
        .await
        .pop()
        .expect("recording exists");
    let app = init_app!(stack.app_state(None));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/recordings/{}", recording.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["playback_url"], "https://cdn.test/as_open.m3u8");
}

#[actix_web::test]
async fn test_create_session_requires_user() {
    let stack = TestStack::new();
    let app = init_app!(stack.app_state(None));

    let anonymous = test::TestRequest::post()
        .uri("/api/v1/sessions")
        .set_json(serde_json::json!({"title": "No user"}))
        .to_request();
    assert_eq!(test::call_service(&app, anonymous).await.status(), 401);

    let creator = test::TestRequest::post()
        .uri("/api/v1/sessions")
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .set_json(serde_json::json!({"title": "Hello", "mode": "audio_only"}))
        .to_request();
    let resp = test::call_service(&app, creator).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "configuring");
    assert_eq!(body["degraded"], false);
}

#[actix_web::test]
async fn test_non_owner_cannot_end_session() {
    let stack = TestStack::new();
    let (session_id, _) = stack.live_session(Uuid::new_v4(), "Mine").await;
    let app = init_app!(stack.app_state(None));

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{session_id}/end"))
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let admin = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{session_id}/end"))
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .insert_header(("x-user-role", "admin"))
        .to_request();
    assert_eq!(test::call_service(&app, admin).await.status(), 200);
}

#[actix_web::test]
async fn test_admin_routes_reject_regular_users() {
    let stack = TestStack::new();
    let app = init_app!(stack.app_state(None));

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/recordings/orphaned")
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/recordings/orphaned?limit=5")
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .insert_header(("x-user-role", "admin"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body.as_array().is_some_and(|a| a.is_empty()));
}

#[actix_web::test]
async fn test_viewer_cannot_leave_for_someone_else() {
    let stack = TestStack::new();
    let (session_id, _) = stack.live_session(Uuid::new_v4(), "Crowd").await;
    let app = init_app!(stack.app_state(None));
    let alice = Uuid::new_v4();
    let leave_uri = format!("/api/v1/sessions/{session_id}/viewers/{alice}");

    let join = test::TestRequest::post()
        .uri(&format!("/api/v1/sessions/{session_id}/viewers"))
        .insert_header(("x-user-id", alice.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, join).await;
    assert_eq!(body["viewer_id"], alice.to_string());
    assert_eq!(body["counts"]["current"], 1);

    let stranger = test::TestRequest::delete()
        .uri(&leave_uri)
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, stranger).await.status(), 403);

    let anonymous = test::TestRequest::delete().uri(&leave_uri).to_request();
    assert_eq!(test::call_service(&app, anonymous).await.status(), 403);

    let (_, view) = stack.sessions.view(&session_id).await.unwrap();
    assert_eq!(view.current_viewers, 1);

    let own = test::TestRequest::delete()
        .uri(&leave_uri)
        .insert_header(("x-user-id", alice.to_string()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, own).await;
    assert_eq!(body["counts"]["current"], 0);
}

#[actix_web::test]
async fn test_private_session_health_hidden_from_strangers() {
    let stack = TestStack::new();
    let creator = Uuid::new_v4();
    let mut request = create_request("Backstage");
    request.visibility = Visibility::Private;
    let created = stack.sessions.create(creator, request).await.unwrap();
    stack.sessions.mark_live(&created.session_id).await.unwrap();
    let app = init_app!(stack.app_state(None));
    let health_uri = format!("/api/v1/sessions/{}/health", created.session_id);

    let stranger = test::TestRequest::get()
        .uri(&health_uri)
        .insert_header(("x-user-id", Uuid::new_v4().to_string()))
        .to_request();
    let resp = test::call_service(&app, stranger).await;
    assert_eq!(resp.status(), 403);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reason"], "private");

    let owner = test::TestRequest::get()
        .uri(&health_uri)
        .insert_header(("x-user-id", creator.to_string()))
        .to_request();
    assert_eq!(test::call_service(&app, owner).await.status(), 200);
}
