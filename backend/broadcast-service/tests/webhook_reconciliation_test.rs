//! Recording reconciliation against at-least-once, unordered webhooks

mod common;

use broadcast_service::db::RecordingStore;
use broadcast_service::models::{RecordingStatus, SessionStatus, Visibility};
use broadcast_service::services::access::Viewer;
use broadcast_service::services::recordings::{MatchStrategy, ReconcileOutcome};
use broadcast_service::services::streaming::RecordingDecision;
use broadcast_service::services::ProcessingResult;
use common::{asset_created, asset_failed, asset_ready, session_event, TestStack};
use uuid::Uuid;

async fn ended_with_recording(stack: &TestStack, title: &str) -> (String, String, Uuid) {
    let (session_id, provider_session_id) = stack.live_session(Uuid::new_v4(), title).await;
    let ended = stack.sessions.end(&session_id).await.unwrap();
    let RecordingDecision::Created { recording_id } = ended.recording else {
        panic!("expected a pending recording, got {:?}", ended.recording);
    };
    (session_id, provider_session_id, recording_id)
}

#[tokio::test]
async fn test_duplicate_ready_is_idempotent() {
    let stack = TestStack::new();
    let (_, provider_session_id, recording_id) = ended_with_recording(&stack, "Twice").await;
    let event = asset_ready(Some(&provider_session_id), "as_dup", "Twice", 300.0);

    let first = stack.webhooks.process(&event).await;
    let after_first = stack.recordings.get(recording_id).await.unwrap();

    let second = stack.webhooks.process(&event).await;
    let after_second = stack.recordings.get(recording_id).await.unwrap();

    assert_eq!(
        first,
        ProcessingResult::Recording(ReconcileOutcome::Applied {
            recording_id,
            strategy: MatchStrategy::SessionKey,
            status: RecordingStatus::Ready,
        })
    );
    assert_eq!(
        second,
        ProcessingResult::Recording(ReconcileOutcome::Duplicate { recording_id })
    );
    assert_eq!(after_first.status, after_second.status);
    assert_eq!(after_first.playback_url, after_second.playback_url);
    assert_eq!(after_first.duration_secs, after_second.duration_secs);
    assert_eq!(after_first.ready_at, after_second.ready_at);
    assert_eq!(after_first.updated_at, after_second.updated_at);
}

#[tokio::test]
async fn test_late_failed_does_not_regress_ready() {
    let stack = TestStack::new();
    let (_, provider_session_id, recording_id) = ended_with_recording(&stack, "Order").await;

    stack
        .webhooks
        .process(&asset_ready(Some(&provider_session_id), "as_ord", "Order", 120.0))
        .await;
    let result = stack
        .webhooks
        .process(&asset_failed(Some(&provider_session_id), "as_ord", "transcode crashed"))
        .await;

    assert!(matches!(
        result,
        ProcessingResult::Recording(ReconcileOutcome::Ignored {
            reason: "ready_wins",
            ..
        })
    ));
    let recording = stack.recordings.get(recording_id).await.unwrap();
    assert_eq!(recording.status, RecordingStatus::Ready);
    assert!(recording.failure_reason.is_none());
}

#[tokio::test]
async fn test_failed_then_ready_stays_failed() {
    let stack = TestStack::new();
    let (_, provider_session_id, recording_id) = ended_with_recording(&stack, "Broken").await;

    stack
        .webhooks
        .process(&asset_failed(Some(&provider_session_id), "as_br", "bad input"))
        .await;
    stack
        .webhooks
        .process(&asset_ready(Some(&provider_session_id), "as_br", "Broken", 90.0))
        .await;

    let recording = stack.recordings.get(recording_id).await.unwrap();
    assert_eq!(recording.status, RecordingStatus::Failed);
    assert_eq!(recording.failure_reason.as_deref(), Some("bad input"));
}

#[tokio::test]
async fn test_unmatched_ready_synthesizes_orphan() {
    let stack = TestStack::new();

    let result = stack
        .webhooks
        .process(&asset_ready(Some("prov_unknown"), "as_orphan", "Mystery", 61.0))
        .await;

    let ProcessingResult::Recording(ReconcileOutcome::Synthesized { recording_id, status }) = result
    else {
        panic!("expected synthesized recording, got {result:?}");
    };
    assert_eq!(status, RecordingStatus::Ready);

    let orphan = stack.recordings.get(recording_id).await.unwrap();
    assert!(orphan.needs_attribution);
    assert!(orphan.creator_id.is_none());
    assert_eq!(orphan.visibility, Visibility::Private);
    assert_eq!(orphan.title, "Mystery");

    let listed = stack.recordings.list_orphaned(10).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_session_end_adopts_early_webhook_recording() {
    let stack = TestStack::new();
    let creator = Uuid::new_v4();
    let (session_id, provider_session_id) = stack.live_session(creator, "Race").await;

    // the provider finished the asset before the session-end path ran
    stack
        .webhooks
        .process(&asset_ready(Some(&provider_session_id), "as_race", "Race", 400.0))
        .await;
    let ended = stack.sessions.end(&session_id).await.unwrap();

    let RecordingDecision::Adopted { recording_id } = ended.recording else {
        panic!("expected adoption, got {:?}", ended.recording);
    };
    let recording = stack.recordings.get(recording_id).await.unwrap();
    assert_eq!(recording.status, RecordingStatus::Ready);
    assert_eq!(recording.creator_id, Some(creator));
    assert_eq!(recording.session_id.as_deref(), Some(session_id.as_str()));
    assert!(!recording.needs_attribution);
    assert_eq!(recording.visibility, Visibility::Public);
    assert_eq!(stack.store.all_recordings().await.len(), 1);
}

#[tokio::test]
async fn test_asset_id_match_creates_no_duplicate() {
    let stack = TestStack::new();
    let (_, provider_session_id, recording_id) = ended_with_recording(&stack, "Keys").await;

    stack
        .webhooks
        .process(&asset_created(&provider_session_id, "as_keys"))
        .await;
    // second event carries only the asset id
    let result = stack
        .webhooks
        .process(&asset_ready(None, "as_keys", "Renamed by provider", 200.0))
        .await;

    assert_eq!(
        result,
        ProcessingResult::Recording(ReconcileOutcome::Applied {
            recording_id,
            strategy: MatchStrategy::AssetId,
            status: RecordingStatus::Ready,
        })
    );
    assert_eq!(stack.store.all_recordings().await.len(), 1);
}

#[tokio::test]
async fn test_asset_created_marks_processing() {
    let stack = TestStack::new();
    let (_, provider_session_id, recording_id) = ended_with_recording(&stack, "Proc").await;

    stack
        .webhooks
        .process(&asset_created(&provider_session_id, "as_proc"))
        .await;

    let recording = stack.recordings.get(recording_id).await.unwrap();
    assert_eq!(recording.status, RecordingStatus::Processing);
    assert_eq!(recording.provider_asset_id.as_deref(), Some("as_proc"));
}

#[tokio::test]
async fn test_unmatched_failed_is_dropped() {
    let stack = TestStack::new();

    let result = stack
        .webhooks
        .process(&asset_failed(Some("prov_nobody"), "as_none", "boom"))
        .await;

    assert_eq!(result, ProcessingResult::Recording(ReconcileOutcome::Unmatched));
    assert!(stack.store.all_recordings().await.is_empty());
}

#[tokio::test]
async fn test_deleted_recording_is_not_resurrected() {
    let stack = TestStack::new();
    let creator = Uuid::new_v4();
    let (session_id, provider_session_id) = stack.live_session(creator, "Gone").await;
    let ended = stack.sessions.end(&session_id).await.unwrap();
    let RecordingDecision::Created { recording_id } = ended.recording else {
        panic!("expected a pending recording");
    };

    stack
        .recordings
        .delete(recording_id, &Viewer::user(creator, None), None)
        .await
        .unwrap();
    let result = stack
        .webhooks
        .process(&asset_ready(Some(&provider_session_id), "as_gone", "Gone", 100.0))
        .await;

    assert!(matches!(
        result,
        ProcessingResult::Recording(ReconcileOutcome::Ignored {
            reason: "deleted",
            ..
        })
    ));
    let all = stack.store.all_recordings().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].status, RecordingStatus::Deleted);
}

#[tokio::test]
async fn test_session_webhooks_drive_lifecycle() {
    let stack = TestStack::new();
    let created = stack
        .sessions
        .create(Uuid::new_v4(), common::create_request("Webhook driven"))
        .await
        .unwrap();
    let provider_session_id = stack
        .sessions
        .get(&created.session_id)
        .await
        .unwrap()
        .provider_session_id;

    let active = stack
        .webhooks
        .process(&session_event("session.active", &provider_session_id))
        .await;
    assert_eq!(
        active,
        ProcessingResult::SessionLive {
            session_id: created.session_id.clone()
        }
    );

    let again = stack
        .webhooks
        .process(&session_event("session.active", &provider_session_id))
        .await;
    assert!(matches!(again, ProcessingResult::SessionConflict { .. }));

    stack
        .webhooks
        .process(&session_event("session.idle", &provider_session_id))
        .await;
    let session = stack.sessions.get(&created.session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Ended);
    assert!(stack
        .store
        .find_by_session_key(&created.session_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_every_delivery_is_audited() {
    let stack = TestStack::new();

    stack.webhooks.process(b"not json at all").await;
    stack
        .webhooks
        .process(br#"{"event": "video.upload.created"}"#)
        .await;
    stack
        .webhooks
        .process(&asset_ready(Some("prov_x"), "as_x", "Audit", 10.0))
        .await;

    let entries = stack.store.audit_entries().await;
    let outcomes: Vec<&str> = entries.iter().map(|e| e.outcome.as_str()).collect();
    assert_eq!(outcomes, vec!["malformed", "unsupported", "synthesized"]);
    assert_eq!(entries[2].asset_id.as_deref(), Some("as_x"));
}

#[tokio::test]
async fn test_reattribute_orphan() {
    let stack = TestStack::new();
    let result = stack
        .webhooks
        .process(&asset_ready(None, "as_lost", "Lost", 30.0))
        .await;
    let recording_id = result_recording_id(&result);
    let owner = Uuid::new_v4();

    let attributed = stack
        .recordings
        .reattribute(recording_id, owner)
        .await
        .unwrap();
    assert_eq!(attributed.creator_id, Some(owner));
    assert!(!attributed.needs_attribution);
    assert!(stack.recordings.list_orphaned(10).await.unwrap().is_empty());
}

fn result_recording_id(result: &ProcessingResult) -> Uuid {
    match result {
        ProcessingResult::Recording(outcome) => outcome.recording_id().unwrap(),
        other => panic!("no recording in {other:?}"),
    }
}
