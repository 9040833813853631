//! Session lifecycle through the service layer

mod common;

use broadcast_service::config::PolicyConfig;
use broadcast_service::db::RecordingStore;
use broadcast_service::error::AppError;
use broadcast_service::models::{BroadcastMode, RecordingStatus, SessionStatus};
use broadcast_service::services::streaming::RecordingDecision;
use common::{asset_ready, create_request, TestStack};
use uuid::Uuid;

#[tokio::test]
async fn test_happy_path_session_to_ready_recording() {
    let stack = TestStack::new();
    let creator = Uuid::new_v4();
    let (session_id, provider_session_id) = stack.live_session(creator, "Friday jam").await;

    stack
        .sessions
        .join_viewer(&session_id, Some("viewer-a".into()))
        .await
        .unwrap();
    stack
        .sessions
        .join_viewer(&session_id, Some("viewer-b".into()))
        .await
        .unwrap();
    stack
        .sessions
        .leave_viewer(&session_id, "viewer-a")
        .await
        .unwrap();

    let ended = stack.sessions.end(&session_id).await.unwrap();
    let RecordingDecision::Created { recording_id } = ended.recording else {
        panic!("expected a pending recording, got {:?}", ended.recording);
    };

    let processing = stack.recordings.get(recording_id).await.unwrap();
    assert_eq!(processing.status, RecordingStatus::Processing);
    assert_eq!(processing.session_id.as_deref(), Some(session_id.as_str()));
    assert_eq!(processing.creator_id, Some(creator));
    assert!(processing.duration_secs.is_some());
    assert!(processing.playback_url.is_none());

    stack
        .webhooks
        .process(&asset_ready(Some(&provider_session_id), "as_1", "Friday jam", 754.2))
        .await;

    let ready = stack.recordings.get(recording_id).await.unwrap();
    assert_eq!(ready.status, RecordingStatus::Ready);
    assert_eq!(ready.playback_url.as_deref(), Some("https://cdn.test/as_1.m3u8"));
    assert_eq!(ready.duration_secs, Some(754.2));
    assert_eq!(ready.peak_viewers, 2);
    assert_eq!(ready.total_viewers, 2);
    assert_eq!(stack.store.all_recordings().await.len(), 1);
}

#[tokio::test]
async fn test_short_broadcast_produces_no_recording() {
    let stack = TestStack::with_policy(PolicyConfig::default());
    let (session_id, _) = stack.live_session(Uuid::new_v4(), "Quick test").await;

    let ended = stack.sessions.end(&session_id).await.unwrap();
    assert!(matches!(
        ended.recording,
        RecordingDecision::SkippedTooShort { .. }
    ));
    assert!(stack.store.all_recordings().await.is_empty());
    assert!(stack
        .store
        .find_by_session_key(&session_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_counters_stay_consistent_for_every_prefix() {
    let stack = TestStack::new();
    let (session_id, _) = stack.live_session(Uuid::new_v4(), "Counters").await;

    // join a, join b, leave a, leave a, leave ghost, join c, leave b, leave c
    let script: [(&str, bool); 8] = [
        ("a", true),
        ("b", true),
        ("a", false),
        ("a", false),
        ("ghost", false),
        ("c", true),
        ("b", false),
        ("c", false),
    ];

    for (viewer, join) in script {
        let counts = if join {
            stack
                .sessions
                .join_viewer(&session_id, Some(viewer.to_string()))
                .await
                .unwrap()
                .counts
        } else {
            stack
                .sessions
                .leave_viewer(&session_id, viewer)
                .await
                .unwrap()
        };
        assert!(counts.current >= 0, "current went negative: {counts:?}");
        assert!(counts.peak >= counts.current, "peak below current: {counts:?}");
    }

    let (_, view) = stack.sessions.view(&session_id).await.unwrap();
    assert_eq!(view.current_viewers, 0);
    assert_eq!(view.peak_viewers, 2);
    assert_eq!(view.total_viewers, 3);
}

#[tokio::test]
async fn test_degraded_session_still_broadcasts() {
    let stack = TestStack::new();
    stack.provider.set_unavailable(true);
    let creator = Uuid::new_v4();

    let created = stack
        .sessions
        .create(creator, create_request("Offline provider"))
        .await
        .unwrap();
    assert!(created.degraded);
    assert!(!created.stream_key.is_empty());
    assert!(!created.ingest_url.is_empty());

    let live = stack.sessions.mark_live(&created.session_id).await.unwrap();
    assert_eq!(live.status, SessionStatus::Live);

    let health = stack.sessions.health(&created.session_id).await.unwrap();
    assert!(health.from_cache);
    assert!(health.is_active);

    let ended = stack.sessions.end(&created.session_id).await.unwrap();
    assert!(matches!(ended.recording, RecordingDecision::Created { .. }));
}

#[tokio::test]
async fn test_one_open_session_per_creator() {
    let stack = TestStack::new();
    let creator = Uuid::new_v4();
    let (session_id, _) = stack.live_session(creator, "First").await;

    let err = stack
        .sessions
        .create(creator, create_request("Second"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    stack.sessions.end(&session_id).await.unwrap();
    assert!(stack
        .sessions
        .create(creator, create_request("Second"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_avatar_mode_requires_reference() {
    let stack = TestStack::new();
    let mut request = create_request("Avatar show");
    request.mode = BroadcastMode::Avatar;

    let err = stack
        .sessions
        .create(Uuid::new_v4(), request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_go_live_after_end_is_conflict() {
    let stack = TestStack::new();
    let (session_id, _) = stack.live_session(Uuid::new_v4(), "Done").await;
    stack.sessions.end(&session_id).await.unwrap();

    let err = stack.sessions.mark_live(&session_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = stack.sessions.end(&session_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_force_delete_keeps_no_recording() {
    let stack = TestStack::new();
    let (session_id, provider_session_id) = stack.live_session(Uuid::new_v4(), "Oops").await;

    let ended = stack.sessions.force_delete(&session_id).await.unwrap();
    assert_eq!(ended.recording, RecordingDecision::Discarded);
    assert!(stack.store.all_recordings().await.is_empty());
    assert_eq!(
        *stack.provider.deleted_sessions.lock().await,
        vec![provider_session_id]
    );
}
